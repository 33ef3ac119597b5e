//! Identity claims carried by a verified mini-app launch payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::UserId;

/// The `user` document embedded in a signed launch payload.
///
/// Only `id` and `first_name` are guaranteed by the chat platform; the rest
/// depends on the user's privacy settings and client version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub id: UserId,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Remaining platform fields (`photo_url`, `is_premium`, ...), echoed back as is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionClaims {
    /// Full display name, or `None` if both parts are blank.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let full = format!(
            "{} {}",
            self.first_name,
            self.last_name.as_deref().unwrap_or_default()
        );
        let trimmed = full.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Locally stored user, created on first successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub first_name: String,
}

impl From<&SessionClaims> for UserRecord {
    fn from(claims: &SessionClaims) -> Self {
        Self {
            id: claims.id,
            first_name: claims.first_name.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_platform_user_document() {
        let claims: SessionClaims = serde_json::from_str(
            r#"{"id":279058397,"first_name":"Vlad","last_name":"","username":"vdkfrost","language_code":"ru","is_premium":true}"#,
        )
        .unwrap();
        assert_eq!(claims.id, UserId::new(279_058_397));
        assert_eq!(claims.username.as_deref(), Some("vdkfrost"));
        assert_eq!(claims.display_name().as_deref(), Some("Vlad"));
    }

    #[test]
    fn test_display_name_blank() {
        let claims = SessionClaims {
            id: UserId::new(1),
            first_name: "  ".to_string(),
            last_name: None,
            username: None,
            language_code: None,
            phone: None,
            extra: Map::new(),
        };
        assert_eq!(claims.display_name(), None);
    }

    #[test]
    fn test_unknown_platform_fields_round_trip() {
        let raw = serde_json::json!({
            "id": 1,
            "first_name": "A",
            "photo_url": "https://t.me/i/userpic/1.jpg",
            "is_premium": true,
            "allows_write_to_pm": true
        });
        let claims: SessionClaims = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(claims.extra["is_premium"], true);
        assert_eq!(serde_json::to_value(&claims).unwrap(), raw);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(serde_json::from_str::<SessionClaims>(r#"{"first_name":"A"}"#).is_err());
    }
}
