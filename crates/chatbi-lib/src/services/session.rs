// Session Service
// Login state persisted under fixed keys in the settings table

use serde_json::Value;

use crate::models::session::{AuthSession, UserProfile};
use crate::repositories::SettingsRepository;

/// Settings key holding the identity provider's token
pub const TOKEN_KEY: &str = "authing_token";

/// Settings key holding the user profile
pub const USER_KEY: &str = "authing_user";

/// Explicit session context with create / destroy lifecycle
#[derive(Clone)]
pub struct SessionStore {
    settings: SettingsRepository,
}

impl SessionStore {
    pub fn new(settings: SettingsRepository) -> Self {
        Self { settings }
    }

    /// Restore the persisted session, if a token is stored
    pub fn load(&self) -> Result<Option<AuthSession>, String> {
        let Some(token) = self.settings.get::<Value>(TOKEN_KEY)? else {
            return Ok(None);
        };
        let user = self.settings.get::<UserProfile>(USER_KEY)?.unwrap_or_default();
        Ok(Some(AuthSession { token, user }))
    }

    /// Establish a session after a successful login callback.
    ///
    /// `claims` are the parsed id-token claims. They are mapped into a
    /// `UserProfile`, which is stored together with the token in one
    /// transaction.
    pub fn create(&self, token: Value, claims: &Value) -> Result<AuthSession, String> {
        let user = UserProfile::from_claims(claims);
        let user_value = serde_json::to_value(&user)
            .map_err(|e| format!("Failed to serialize user profile: {}", e))?;
        self.settings
            .set_many(&[(TOKEN_KEY, token.clone()), (USER_KEY, user_value)])?;
        log::info!(
            "[session] Signed in {}",
            user.email.as_deref().or(user.name.as_deref()).unwrap_or("unknown user")
        );
        Ok(AuthSession { token, user })
    }

    /// Establish a session from a token carrying `parsedIdToken` claims
    pub fn create_from_token(&self, token: Value) -> Result<AuthSession, String> {
        let claims = token.get("parsedIdToken").cloned().unwrap_or(Value::Null);
        self.create(token, &claims)
    }

    /// Remove both persisted keys. Returns true when a session existed.
    pub fn destroy(&self) -> Result<bool, String> {
        let removed = self.settings.delete_many(&[TOKEN_KEY, USER_KEY])?;
        if removed > 0 {
            log::info!("[session] Signed out");
        }
        Ok(removed > 0)
    }

    /// The stored profile, or an empty profile
    pub fn current_user(&self) -> Result<UserProfile, String> {
        Ok(self.settings.get::<UserProfile>(USER_KEY)?.unwrap_or_default())
    }

    pub fn token(&self) -> Result<Option<Value>, String> {
        self.settings.get(TOKEN_KEY)
    }

    pub fn is_authenticated(&self) -> Result<bool, String> {
        Ok(self.token()?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::database::Database;
    use serde_json::json;

    fn store() -> SessionStore {
        SessionStore::new(SettingsRepository::new(Database::new_in_memory().unwrap()))
    }

    #[test]
    fn test_create_is_atomic() {
        let db = Database::new_in_memory().unwrap();
        db.with_connection(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_user BEFORE INSERT ON settings WHEN NEW.key = 'authing_user'
                 BEGIN SELECT RAISE(ABORT, 'profile rejected'); END;",
            )
            .map_err(|e| e.to_string())
        })
        .unwrap();
        let store = SessionStore::new(SettingsRepository::new(db));

        assert!(store.create(json!("t"), &json!({"name": "A"})).is_err());
        assert!(store.token().unwrap().is_none());
        assert!(!store.is_authenticated().unwrap());
    }

    #[test]
    fn test_lifecycle() {
        let store = store();
        assert!(store.load().unwrap().is_none());
        assert!(store.current_user().unwrap().is_empty());

        let token = json!({
            "accessToken": "at",
            "parsedIdToken": {"name": "Lin", "picture": "p.png", "aud": "app-1", "email": "lin@example.com"}
        });
        let session = store.create_from_token(token.clone()).unwrap();
        assert_eq!(session.user.userid.as_deref(), Some("app-1"));

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.token, token);
        assert_eq!(loaded.user.avatar.as_deref(), Some("p.png"));
        assert!(store.is_authenticated().unwrap());

        assert!(store.destroy().unwrap());
        assert!(store.load().unwrap().is_none());
        assert!(!store.destroy().unwrap());
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");

        {
            let store = SessionStore::new(SettingsRepository::new(Database::new(path.clone()).unwrap()));
            store.create(json!("opaque"), &json!({"name": "A"})).unwrap();
        }

        let store = SessionStore::new(SettingsRepository::new(Database::new(path).unwrap()));
        assert_eq!(store.current_user().unwrap().name.as_deref(), Some("A"));
        assert_eq!(store.token().unwrap(), Some(json!("opaque")));
    }
}
