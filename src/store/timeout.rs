use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use super::UserStore;
use crate::domain::{NewUser, ProfileChanges, UserRecord};
use crate::error::StoreError;

/// Decorator bounding every store call by `timeout`. An elapsed deadline
/// surfaces as [`StoreError::Unavailable`].
pub struct TimedUserStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: UserStore> TimedUserStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>> + Send,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "User store call timed out"
                );
                Err(StoreError::Unavailable(format!(
                    "{} timed out after {}ms",
                    operation,
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl<S: UserStore> UserStore for TimedUserStore<S> {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        self.bounded("find_by_id", self.inner.find_by_id(id)).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.bounded("find_by_email", self.inner.find_by_email(email)).await
    }

    async fn create(&self, input: NewUser) -> Result<UserRecord, StoreError> {
        self.bounded("create", self.inner.create(input)).await
    }

    async fn save(&self, record: &UserRecord) -> Result<(), StoreError> {
        self.bounded("save", self.inner.save(record)).await
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.bounded("update_profile", self.inner.update_profile(id, changes))
            .await
    }

    async fn set_refresh_token(&self, id: Uuid, token: &str) -> Result<bool, StoreError> {
        self.bounded("set_refresh_token", self.inner.set_refresh_token(id, token))
            .await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.bounded("delete", self.inner.delete(id)).await
    }

    async fn swap_refresh_token(
        &self,
        id: Uuid,
        expected: &str,
        replacement: &str,
    ) -> Result<bool, StoreError> {
        self.bounded(
            "swap_refresh_token",
            self.inner.swap_refresh_token(id, expected, replacement),
        )
        .await
    }
}
