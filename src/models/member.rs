//! Member model: a library membership wrapping a user identity

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Member joined with its user account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub membership_date: NaiveDate,
}

/// Name used to greet a member, falling back to the username
pub fn display_name(username: &str, first_name: Option<&str>, last_name: Option<&str>) -> String {
    let parts: Vec<&str> = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        username.to_string()
    } else {
        parts.join(" ")
    }
}

/// Create member request (creates the user account too)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Update member request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("jdoe", Some("Jane"), Some("Doe")), "Jane Doe");
        assert_eq!(display_name("jdoe", Some("Jane"), None), "Jane");
        assert_eq!(display_name("jdoe", Some("  "), None), "jdoe");
        assert_eq!(display_name("jdoe", None, None), "jdoe");
    }

    #[test]
    fn test_create_member_validation() {
        let member = CreateMember {
            username: "jdoe".to_string(),
            email: "jane@example.org".to_string(),
            first_name: None,
            last_name: None,
        };
        assert!(member.validate().is_ok());

        let bad_email = CreateMember {
            email: "not-an-email".to_string(),
            ..member
        };
        let errors = bad_email.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));

        let short = UpdateMember {
            username: Some("jd".to_string()),
            email: None,
            first_name: None,
            last_name: None,
        };
        assert!(short.validate().is_err());
    }
}
