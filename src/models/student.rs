//! Student model and registration types

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

/// Department recorded on auto-registered students
pub const PLACEHOLDER_DEPARTMENT: &str = "Auto-Registered";

static RFID_UID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Z:\-]{1,50}$").expect("valid RFID UID pattern"));

/// Normalize a badge UID read from a scanner or typed by an admin.
///
/// Readers report the same card with varying case and surrounding whitespace,
/// so UIDs are trimmed and upper-cased before every lookup or write.
pub fn normalize_rfid_uid(raw: &str) -> AppResult<String> {
    let uid = raw.trim().to_uppercase();
    if uid.is_empty() {
        return Err(AppError::Validation("RFID UID required".to_string()));
    }
    if !RFID_UID_RE.is_match(&uid) {
        return Err(AppError::Validation(format!("Invalid RFID UID: {}", uid)));
    }
    Ok(uid)
}

/// Names and roll numbers are stored trimmed, so whitespace alone is empty
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Student model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: i32,
    pub rfid_uid: String,
    pub name: String,
    pub roll_number: String,
    pub department: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    /// Global presence flag
    pub is_inside: bool,
    /// Auto-created for an unknown badge, pending admin completion
    pub is_placeholder: bool,
    pub created_at: DateTime<Utc>,
}

/// Compact student representation embedded in scan and loan payloads
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StudentShort {
    pub id: i32,
    pub name: String,
    pub roll_number: String,
    pub department: Option<String>,
}

impl From<&Student> for StudentShort {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            roll_number: s.roll_number.clone(),
            department: s.department.clone(),
        }
    }
}

/// Values for a placeholder student created on first scan of an unknown badge
#[derive(Debug, Clone)]
pub struct NewPlaceholder {
    pub rfid_uid: String,
    pub name: String,
    pub roll_number: String,
    pub department: String,
}

impl NewPlaceholder {
    pub fn for_uid(rfid_uid: &str) -> Self {
        Self {
            rfid_uid: rfid_uid.to_string(),
            name: format!("New Student ({})", rfid_uid),
            roll_number: format!("TEMP-{}", rfid_uid),
            department: PLACEHOLDER_DEPARTMENT.to_string(),
        }
    }
}

/// Register student request (also used to take over a placeholder)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStudent {
    #[validate(length(min = 1, max = 50, message = "rfid_uid is required"))]
    pub rfid_uid: String,
    #[validate(
        length(max = 100, message = "name is too long"),
        custom(function = "not_blank", message = "name is required")
    )]
    pub name: String,
    #[validate(
        length(max = 50, message = "roll_number is too long"),
        custom(function = "not_blank", message = "roll_number is required")
    )]
    pub roll_number: String,
    #[validate(length(max = 100, message = "department is too long"))]
    pub department: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

/// Update student request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStudent {
    #[validate(length(min = 1, max = 50, message = "rfid_uid must not be empty"))]
    pub rfid_uid: Option<String>,
    #[validate(
        length(max = 100, message = "name is too long"),
        custom(function = "not_blank", message = "name must not be empty")
    )]
    pub name: Option<String>,
    #[validate(
        length(max = 50, message = "roll_number is too long"),
        custom(function = "not_blank", message = "roll_number must not be empty")
    )]
    pub roll_number: Option<String>,
    pub department: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateStudent {
    /// Whether the update completes the identity of a placeholder record
    pub fn sets_identity(&self) -> bool {
        self.name.is_some() || self.roll_number.is_some()
    }
}

/// Student list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct StudentQuery {
    /// Case-insensitive match on name, roll number or RFID UID
    pub search: Option<String>,
    /// Include deactivated students (default: false)
    pub include_inactive: Option<bool>,
}

/// Outcome of a registration request
#[derive(Debug, Clone)]
pub enum Registration {
    Created(Student),
    /// An auto-registered placeholder was completed in place
    Merged(Student),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rfid_uid() {
        assert_eq!(normalize_rfid_uid("  ab12 ").unwrap(), "AB12");
        assert_eq!(normalize_rfid_uid("04:a3:1f").unwrap(), "04:A3:1F");
        assert!(matches!(normalize_rfid_uid("   "), Err(AppError::Validation(_))));
        assert!(matches!(normalize_rfid_uid("AB 12"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_placeholder_for_uid() {
        let p = NewPlaceholder::for_uid("AB12");
        assert_eq!(p.name, "New Student (AB12)");
        assert_eq!(p.roll_number, "TEMP-AB12");
        assert_eq!(p.department, PLACEHOLDER_DEPARTMENT);
    }

    #[test]
    fn test_create_student_validation() {
        let ok = CreateStudent {
            rfid_uid: "AB12".into(),
            name: "Asha Rao".into(),
            roll_number: "CS-042".into(),
            department: Some("CS".into()),
            email: Some("asha@example.edu".into()),
        };
        assert!(ok.validate().is_ok());

        let bad = CreateStudent {
            rfid_uid: "AB12".into(),
            name: String::new(),
            roll_number: "CS-042".into(),
            department: None,
            email: Some("not-an-email".into()),
        };
        let err = AppError::from(bad.validate().unwrap_err());
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("name is required"));
                assert!(msg.contains("Invalid email format"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_only_fields_are_blank() {
        let update = UpdateStudent {
            rfid_uid: None,
            name: Some("   ".into()),
            roll_number: Some("\t".into()),
            department: None,
            email: None,
            is_active: None,
        };
        match AppError::from(update.validate().unwrap_err()) {
            AppError::Validation(msg) => {
                assert!(msg.contains("name must not be empty"));
                assert!(msg.contains("roll_number must not be empty"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let rename = UpdateStudent {
            rfid_uid: None,
            name: Some("  Asha Rao ".into()),
            roll_number: None,
            department: None,
            email: None,
            is_active: None,
        };
        assert!(rename.validate().is_ok());
    }
}
