// Session models
// Authenticated user profile and the persisted login token

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile of the signed-in user, derived from identity-token claims
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Claims not mapped into the fields above, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl UserProfile {
    /// Map parsed id-token claims: `picture` becomes the avatar and `aud` the user id
    pub fn from_claims(claims: &Value) -> Self {
        let text = |key: &str| claims.get(key).and_then(Value::as_str).map(str::to_string);

        let mut extra = claims.as_object().cloned().unwrap_or_default();
        for key in ["name", "picture", "avatar", "aud", "userid", "email"] {
            extra.remove(key);
        }

        Self {
            name: text("name"),
            avatar: text("picture").or_else(|| text("avatar")),
            userid: text("aud").or_else(|| text("userid")),
            email: text("email"),
            extra,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.avatar.is_none()
            && self.userid.is_none()
            && self.email.is_none()
            && self.extra.is_empty()
    }
}

/// Established login: the identity provider's token plus the user profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSession {
    pub token: Value,
    pub user: UserProfile,
}
