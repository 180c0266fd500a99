use std::fmt;

use serde::{Deserialize, Serialize};

/// Login token issued by the backend. Never printed in full.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoginToken(String);

impl LoginToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for LoginToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoginToken([REDACTED])")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token and active vehicle, read from the local store at the start of every cycle.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub token: LoginToken,
    pub vehicle_id: VehicleId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnlineStatus {
    Online,
    #[default]
    Offline,
}

impl OnlineStatus {
    pub fn is_online(self) -> bool {
        self == OnlineStatus::Online
    }
}

/// Status string reported with every presence update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Active,
    Inactive,
}

impl PresenceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PresenceStatus::Active => "active",
            PresenceStatus::Inactive => "inactive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LoginToken;

    #[test]
    fn token_debug_is_redacted() {
        let token = LoginToken::new("a36794049e76cb136e09e723e5431baf");
        assert_eq!(format!("{token:?}"), "LoginToken([REDACTED])");
        assert_eq!(token.expose(), "a36794049e76cb136e09e723e5431baf");
    }
}
