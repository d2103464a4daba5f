use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Display preferences owned by the user service; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserPreference {
    pub user_id: Uuid,
    pub currency: String,
    pub is_premium: bool,
}

impl UserPreference {
    pub fn new(user_id: Uuid, currency: impl Into<String>) -> Self {
        Self {
            user_id,
            currency: currency.into(),
            is_premium: false,
        }
    }

    pub fn premium(mut self) -> Self {
        self.is_premium = true;
        self
    }
}
