//! User domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::UserId;

/// A registered account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Data for inserting a user; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

/// Public view of another user, as shown in friend and participant lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserProfile {
    /// Case-insensitive match on name, username or email.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [&self.username, &self.first_name, &self.last_name, &self.email]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Request body for account registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RegisterRequest {
    #[validate(custom(function = "shared::validation::validate_username"))]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    #[validate(
        length(min = 1, max = 50, message = "First name must be 1-50 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub first_name: String,
    #[validate(
        length(min = 1, max = 50, message = "Last name must be 1-50 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub last_name: String,
}

/// Request body for login; `identifier` is an email or a username.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    #[validate(length(min = 1, max = 255, message = "Identifier is required"))]
    pub identifier: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for changing the caller's own password.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// Query for looking a user up by email.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EmailLookupQuery {
    #[serde(default)]
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

/// Response for login and registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthResponse {
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Query for user search.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: 7,
            username: "giulia".to_string(),
            email: "giulia@example.com".to_string(),
            first_name: "Giulia".to_string(),
            last_name: "Bianchi".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_admin: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"username\":\"giulia\""));
    }

    #[test]
    fn test_profile_matches() {
        let profile = sample_user().profile();
        assert!(profile.matches("BIAN"));
        assert!(profile.matches("example.com"));
        assert!(!profile.matches("rossi"));
    }

    #[test]
    fn test_register_request_validation() {
        let ok = RegisterRequest {
            username: "giulia_b".to_string(),
            email: "giulia@example.com".to_string(),
            password: "long-enough".to_string(),
            first_name: "Giulia".to_string(),
            last_name: "Bianchi".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = RegisterRequest {
            username: "g!".to_string(),
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            ..ok
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_blank_names_rejected() {
        let req = RegisterRequest {
            username: "giulia_b".to_string(),
            email: "giulia@example.com".to_string(),
            password: "long-enough".to_string(),
            first_name: "   ".to_string(),
            last_name: "Bianchi".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("first_name"));
    }

    #[test]
    fn test_change_password_request_validation() {
        let ok = ChangePasswordRequest {
            current_password: "old".to_string(),
            new_password: "brand-new-secret".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = ChangePasswordRequest {
            current_password: String::new(),
            new_password: "short".to_string(),
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("current_password"));
        assert!(fields.contains_key("new_password"));
    }

    #[test]
    fn test_email_lookup_requires_email() {
        let missing: EmailLookupQuery = serde_json::from_str("{}").unwrap();
        assert!(missing.validate().is_err());

        let ok: EmailLookupQuery = serde_json::from_str(r#"{"email":"a@x.com"}"#).unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_login_request_accepts_email_alias() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw"}"#).unwrap();
        assert_eq!(req.identifier, "a@x.com");
    }
}
