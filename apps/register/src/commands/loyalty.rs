//! # Loyalty Commands
//!
//! Customer lookup and registration for the checkout screen. Points move
//! only through checkout.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::DbState;
use till_core::validation::normalize_customer_key;
use till_core::{CoreError, Customer};
use till_db::LoyaltyMovement;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCustomerRequest {
    pub phone: String,
    pub name: String,
}

fn customer_key(phone: &str) -> Result<String, ApiError> {
    Ok(normalize_customer_key(phone).map_err(CoreError::from)?)
}

/// Looks a customer up by phone; `None` when not enrolled.
pub async fn find_customer(db: &DbState, phone: &str) -> Result<Option<Customer>, ApiError> {
    let key = customer_key(phone)?;
    debug!(customer_key = %key, "find_customer command");
    Ok(db.inner().loyalty().get_customer(&key).await?)
}

/// Enrolls a customer, or renames an enrolled one.
pub async fn register_customer(
    db: &DbState,
    request: RegisterCustomerRequest,
) -> Result<Customer, ApiError> {
    let key = customer_key(&request.phone)?;
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::validation("customer name is required"));
    }

    let customer = db.inner().loyalty().register_customer(&key, name).await?;
    info!(customer_key = %key, "Customer registered");
    Ok(customer)
}

/// Points history of a customer, newest first.
pub async fn customer_movements(
    db: &DbState,
    phone: &str,
) -> Result<Vec<LoyaltyMovement>, ApiError> {
    let key = customer_key(phone)?;
    Ok(db.inner().loyalty().movements(&key).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use till_db::{Database, DbConfig};

    async fn db() -> DbState {
        DbState::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    #[tokio::test]
    async fn test_register_then_find_with_other_punctuation() {
        let db = db().await;
        register_customer(
            &db,
            RegisterCustomerRequest {
                phone: "(11) 98765-4321".to_string(),
                name: " Dora ".to_string(),
            },
        )
        .await
        .unwrap();

        let found = find_customer(&db, "11 987654321").await.unwrap().unwrap();
        assert_eq!(found.name, "Dora");
        assert_eq!(found.points, 0);
        assert!(customer_movements(&db, "11987654321")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_bad_phone_is_validation_error() {
        let db = db().await;
        let err = find_customer(&db, "12-34").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
