use std::sync::Arc;

use crate::device::store::KeyValueStore;
use crate::error::AppError;
use crate::models::session::{Credentials, LoginToken, VehicleId};

pub const LOGIN_TOKEN_KEY: &str = "login_token";
pub const SELECTED_VEHICLE_KEY: &str = "selected_vehicle_id";

/// Login token and selected vehicle kept in the device store.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn token(&self) -> Result<Option<LoginToken>, AppError> {
        Ok(self
            .store
            .get(LOGIN_TOKEN_KEY)
            .await?
            .filter(|raw| !raw.is_empty())
            .map(LoginToken::new))
    }

    pub async fn require_token(&self) -> Result<LoginToken, AppError> {
        self.token()
            .await?
            .ok_or(AppError::MissingCredential("login token"))
    }

    pub async fn vehicle(&self) -> Result<Option<VehicleId>, AppError> {
        Ok(self
            .store
            .get(SELECTED_VEHICLE_KEY)
            .await?
            .filter(|raw| !raw.is_empty())
            .map(VehicleId))
    }

    /// Token and vehicle together; either missing aborts the caller's cycle.
    pub async fn require(&self) -> Result<Credentials, AppError> {
        let token = self.require_token().await?;
        let vehicle_id = self
            .vehicle()
            .await?
            .ok_or(AppError::MissingCredential("selected vehicle"))?;
        Ok(Credentials { token, vehicle_id })
    }

    pub async fn save_token(&self, token: &LoginToken) -> Result<(), AppError> {
        self.store.set(LOGIN_TOKEN_KEY, token.expose()).await
    }

    pub async fn select_vehicle(&self, vehicle_id: &VehicleId) -> Result<(), AppError> {
        self.store.set(SELECTED_VEHICLE_KEY, vehicle_id.as_str()).await
    }

    pub async fn clear(&self) -> Result<(), AppError> {
        self.store.remove(LOGIN_TOKEN_KEY).await?;
        self.store.remove(SELECTED_VEHICLE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::CredentialStore;
    use crate::device::store::MemoryStore;
    use crate::error::AppError;
    use crate::models::session::{LoginToken, VehicleId};

    #[tokio::test]
    async fn require_reports_which_credential_is_missing() {
        let credentials = CredentialStore::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            credentials.require().await,
            Err(AppError::MissingCredential("login token"))
        ));

        credentials.save_token(&LoginToken::new("tok")).await.unwrap();
        assert!(matches!(
            credentials.require().await,
            Err(AppError::MissingCredential("selected vehicle"))
        ));

        credentials.select_vehicle(&VehicleId("7".to_string())).await.unwrap();
        let loaded = credentials.require().await.unwrap();
        assert_eq!(loaded.vehicle_id.as_str(), "7");

        credentials.clear().await.unwrap();
        assert!(credentials.token().await.unwrap().is_none());
    }
}
