//! Objects related to reporting errors from this library

/// A list of error types that can occur within this library
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("can't update the object, no id was specified")]
    InvalidUpdateObjectNotFound,

    #[error("can't insert the object, it already exists in the database with id = {}", .0)]
    InvalidInsertObjectAlreadyExists(i64),

    #[error("invalid value for '{field}': {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    DatabaseMigrationError(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Returns true if this error was caused by looking up a database row that doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::DatabaseError(sqlx::Error::RowNotFound))
    }
}

/// A convenience type alias for a [Result] with [Error] as its error type
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Check that a required text field is not blank and doesn't exceed `max` characters
pub(crate) fn check_text(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "this field may not be blank"));
    }
    check_length(field, value, max)
}

/// Check that a text field doesn't exceed `max` characters
pub(crate) fn check_length(field: &'static str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(Error::validation(
            field,
            format!("ensure this field has no more than {max} characters (it has {len})"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_text() {
        assert!(check_text("name", "London", 100).is_ok());
        assert!(matches!(
            check_text("name", "   ", 100),
            Err(Error::Validation { field: "name", .. })
        ));
        assert!(check_text("name", &"x".repeat(100), 100).is_ok());
        let err = check_text("name", &"x".repeat(101), 100).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value for 'name': ensure this field has no more than 100 characters (it has 101)"
        );
    }

    #[test]
    fn test_check_length_counts_chars() {
        // multi-byte characters count once each
        assert!(check_length("icon", "ééééé", 5).is_ok());
        assert!(check_length("icon", "", 5).is_ok());
    }
}
