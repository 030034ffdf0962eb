use crate::{
    Database,
    error::{Error, Result},
};
use async_trait::async_trait;
use sqlx::sqlite::SqliteQueryResult;

/// A trait for objects that are stored in a single database table and can be
/// loaded and deleted by their ID
#[async_trait]
pub trait Loadable: Sized {
    type Id: Copy + PartialEq + Send + Sync;

    /// The ID of an object that has not been inserted into the database yet
    fn invalid_id() -> Self::Id;

    fn id(&self) -> Self::Id;
    fn set_id(&mut self, id: Self::Id);

    /// Load the object with the given ID from the database
    async fn load(id: Self::Id, db: &Database) -> Result<Self>;

    /// Delete the object with the given ID from the database
    async fn delete_id(id: &Self::Id, db: &Database) -> Result<SqliteQueryResult>;

    /// Delete this object from the database. On success, the id of this object
    /// is reset to [Loadable::invalid_id()]
    async fn delete(&mut self, db: &Database) -> Result<SqliteQueryResult>
    where
        Self: Send,
    {
        if self.id() == Self::invalid_id() {
            return Err(Error::InvalidUpdateObjectNotFound);
        }
        let res = Self::delete_id(&self.id(), db).await?;
        self.set_id(Self::invalid_id());
        Ok(res)
    }
}
