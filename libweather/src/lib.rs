//! This is a library that provides the objects and functionality behind a small weather
//! dashboard: a list of tracked locations, the historical weather samples recorded for them,
//! aggregate statistics, and a client for the external weather/geocoding provider.

use serde::{Deserialize, Deserializer};
use std::str::FromStr;

pub mod core;
pub mod error;
pub mod location;
pub mod provider;
pub mod statistics;
pub mod weather;

pub use crate::core::database::Database;
pub use error::Error;
pub use error::Result;

/// A serde helper for optional query parameters, where an empty value (e.g. `?is_active=`)
/// is treated the same as a missing one
pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let opt = Option::<String>::deserialize(de)?;
    match opt.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => FromStr::from_str(s)
            .map_err(serde::de::Error::custom)
            .map(Some),
    }
}
