use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use crate::{CoreError, CoreResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Identity established by the auth layer. Booking code trusts it as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Stored account. `password_hash` is a PHC string, never the raw secret.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
}

impl User {
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn avatar_url(&self) -> String {
        avatar_url(&self.name)
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            avatar_url: self.avatar_url(),
        }
    }

    pub fn identity(&self) -> AuthenticatedUser {
        AuthenticatedUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Emails are unique case-insensitively; store and compare them lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Initials avatar derived from the display name.
pub fn avatar_url(name: &str) -> String {
    let seed: String = name
        .trim()
        .chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            c if c.is_ascii_alphanumeric() || "-_.~".contains(c) => c.to_string(),
            c => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect();
    format!("https://api.dicebear.com/8.x/initials/svg?seed={}", seed)
}

pub fn validate_registration(name: &str, email: &str, password: &str) -> CoreResult<()> {
    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(CoreError::ValidationError("All fields are required".to_string()));
    }
    let email = email.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(CoreError::ValidationError("Email address is not valid".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_is_normalized() {
        let user = User::new(" Priya ", " Priya@Example.COM ", "hash".into());
        assert_eq!(user.email, "priya@example.com");
        assert_eq!(user.name, "Priya");
    }

    #[test]
    fn test_avatar_url_encodes_name() {
        assert_eq!(
            avatar_url("Ravi Kumar"),
            "https://api.dicebear.com/8.x/initials/svg?seed=Ravi%20Kumar"
        );
        assert_eq!(avatar_url("Zoë"), "https://api.dicebear.com/8.x/initials/svg?seed=Zo%C3%AB");
    }

    #[test]
    fn test_registration_rules() {
        assert!(validate_registration("Ravi", "ravi@example.com", "secret1").is_ok());
        assert!(validate_registration("", "ravi@example.com", "secret1").is_err());
        assert!(validate_registration("Ravi", "ravi.example.com", "secret1").is_err());
        assert_eq!(
            validate_registration("Ravi", "ravi@example.com", "12345"),
            Err(CoreError::ValidationError("Password must be at least 6 characters".into()))
        );
    }

    #[test]
    fn test_profile_shape() {
        let user = User::new("Asha", "asha@example.com", "hash".into());
        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(json["email"], "asha@example.com");
        assert!(json["avatarUrl"].as_str().unwrap().ends_with("seed=Asha"));
        assert!(json.get("passwordHash").is_none());
    }
}
