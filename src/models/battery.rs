// src/models/battery.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'batteries' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Battery {
    pub id: i64,
    pub name: String,
    /// Rated capacity in mAh.
    pub capacity: i32,
}

/// DTO for registering a battery.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatteryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters."))]
    pub name: String,
    #[validate(range(min = 1, message = "Capacity must be a positive number."))]
    pub capacity: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_must_be_positive() {
        let req = CreateBatteryRequest {
            name: "LFP-280".to_string(),
            capacity: 0,
        };
        assert!(req.validate().is_err());

        let req = CreateBatteryRequest {
            name: "LFP-280".to_string(),
            capacity: 280_000,
        };
        assert!(req.validate().is_ok());
    }
}
