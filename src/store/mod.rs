/// User store
///
/// The auth core talks to persistence only through [`UserStore`]. Two
/// backends are provided (in-memory and Postgres) plus [`TimedUserStore`],
/// which puts a deadline on every call.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{NewUser, ProfileChanges, UserRecord};
use crate::error::StoreError;

mod memory;
mod postgres;
mod timeout;

pub use memory::InMemoryUserStore;
pub use postgres::PgUserStore;
pub use timeout::TimedUserStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new user. Fails with [`StoreError::Duplicate`] if the email exists.
    async fn create(&self, input: NewUser) -> Result<UserRecord, StoreError>;

    /// Persist every field of `record`, including `refresh_token`, in one write.
    /// Unknown ids are left alone; `save` never inserts.
    async fn save(&self, record: &UserRecord) -> Result<(), StoreError>;

    /// Apply `changes` to the stored user in one write and return the result,
    /// or `None` if the user does not exist. Never touches `refresh_token`.
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Overwrite only the stored refresh token. Returns whether the user exists.
    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError>;

    /// Remove a user. Returns whether a user was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Replace the stored refresh token with `replacement` only if it still
    /// equals `expected`. Returns whether the swap happened.
    ///
    /// Implementations must make the compare and the write one atomic step
    /// per user.
    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StoreError>;
}
