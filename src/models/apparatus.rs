//! Lab apparatus model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Apparatus record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Apparatus {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
    /// One-time fine charged when a unit comes back damaged
    pub damage_fine: Decimal,
    pub created_at: DateTime<Utc>,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("damage_fine must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Create apparatus request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateApparatus {
    #[validate(length(min = 1, max = 100, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "category is required"))]
    pub category: String,
    #[validate(range(min = 1, message = "total_quantity must be at least 1"))]
    pub total_quantity: Option<i32>,
    #[validate(custom(function = "non_negative"))]
    pub damage_fine: Option<Decimal>,
}

/// Update apparatus request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateApparatus {
    #[validate(length(min = 1, max = 100, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "category must not be empty"))]
    pub category: Option<String>,
    #[validate(range(min = 1, message = "total_quantity must be at least 1"))]
    pub total_quantity: Option<i32>,
    #[validate(custom(function = "non_negative"))]
    pub damage_fine: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_damage_fine_rejected() {
        let data = CreateApparatus {
            name: "Oscilloscope".into(),
            category: "Electronics".into(),
            total_quantity: Some(2),
            damage_fine: Some(Decimal::new(-5, 0)),
        };
        assert!(data.validate().is_err());

        let data = CreateApparatus {
            damage_fine: Some(Decimal::new(50, 0)),
            ..data
        };
        assert!(data.validate().is_ok());
    }
}
