//! The signed-in session.
//!
//! `SessionStore` is the only process-wide state in the client. It is owned
//! by `AppState` and handed to views explicitly. Token and user are held as a
//! single `Option<Session>` so a half-populated session cannot exist.

pub mod storage;

use crate::api::models::{LoginCredentials, RegisterData, User};
use crate::api::{ApiClient, ApiResult};
use tracing::{info, warn};

pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

pub struct SessionStore {
    storage: Box<dyn SessionStorage + Send>,
    session: Option<Session>,
    loading: bool,
}

impl SessionStore {
    /// A store that has not yet looked at storage. Call [`restore`] next.
    ///
    /// [`restore`]: SessionStore::restore
    pub fn new(storage: Box<dyn SessionStorage + Send>) -> Self {
        Self {
            storage,
            session: None,
            loading: true,
        }
    }

    /// Load a previously persisted session. Anything unreadable or partial
    /// is wiped and treated as "no session"; nothing is reported upward.
    pub fn restore(&mut self) {
        let token = self.storage.get(TOKEN_KEY);
        let user = self.storage.get(USER_KEY);

        match (token, user) {
            (Ok(Some(token)), Ok(Some(user_json))) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => {
                    info!(user = %user.username, "restored stored session");
                    self.session = Some(Session { token, user });
                }
                Err(e) => {
                    warn!(error = %e, "stored user is malformed, clearing session");
                    self.clear_storage();
                    self.session = None;
                }
            },
            (Ok(None), Ok(None)) => {}
            (Ok(_), Ok(_)) => {
                warn!("stored session is incomplete, clearing it");
                self.clear_storage();
                self.session = None;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "could not read stored session, clearing it");
                self.clear_storage();
                self.session = None;
            }
        }

        self.loading = false;
    }

    /// Authenticate against the backend. Errors come back exactly as the
    /// API client produced them.
    pub async fn login(&mut self, api: &ApiClient, username: &str, password: &str) -> ApiResult<()> {
        let credentials = LoginCredentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = api.login(&credentials).await?;
        info!(user = %response.user.username, "login successful");
        self.set_auth_data(response.access_token, response.user);
        Ok(())
    }

    /// Create an account and sign in as it. The session is live by the time
    /// this returns, so callers can navigate immediately.
    pub async fn register(&mut self, api: &ApiClient, data: &RegisterData) -> ApiResult<()> {
        let response = api.register(data).await?;
        info!(user = %response.user.username, "registration successful");
        self.set_auth_data(response.access_token, response.user);
        Ok(())
    }

    pub fn set_auth_data(&mut self, token: String, user: User) {
        if let Err(e) = self.persist(&token, &user) {
            warn!(error = %e, "failed to persist session; it will not survive a restart");
        }
        self.session = Some(Session { token, user });
    }

    /// Swap in a fresher copy of the signed-in user, keeping the token.
    pub fn update_user(&mut self, user: User) {
        if let Some(session) = self.session.take() {
            self.set_auth_data(session.token, user);
        }
    }

    pub fn logout(&mut self) {
        if self.session.is_some() {
            info!("logged out");
        }
        self.clear_storage();
        self.session = None;
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some() && self.user().is_some()
    }

    fn persist(&mut self, token: &str, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        self.storage.set(TOKEN_KEY, token)?;
        self.storage.set(USER_KEY, &user_json)?;
        Ok(())
    }

    fn clear_storage(&mut self) {
        for key in [TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "failed to clear stored session key");
            }
        }
    }

    #[cfg(test)]
    fn storage(&self) -> &dyn SessionStorage {
        self.storage.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Role;
    use crate::api::stub;

    const USER_JSON: &str = r#"{"id":5,"username":"eve","email":"e@x.io","role":"employee","manager_id":1,"created_at":"2024-02-02T09:00:00"}"#;

    fn user() -> User {
        serde_json::from_str(USER_JSON).unwrap()
    }

    fn store_with(entries: &[(&str, &str)]) -> SessionStore {
        let mut store = SessionStore::new(Box::new(MemoryStorage::with_entries(entries)));
        store.restore();
        store
    }

    fn assert_consistent(store: &SessionStore) {
        assert_eq!(
            store.is_authenticated(),
            store.token().is_some() && store.user().is_some()
        );
    }

    #[test]
    fn test_loading_until_restored() {
        let mut store = SessionStore::new(Box::new(MemoryStorage::new()));
        assert!(store.loading());
        store.restore();
        assert!(!store.loading());
        assert!(!store.is_authenticated());
        assert_consistent(&store);
    }

    #[test]
    fn test_restore_valid_session() {
        let store = store_with(&[(TOKEN_KEY, "tok"), (USER_KEY, USER_JSON)]);
        assert!(store.is_authenticated());
        assert_eq!(store.token(), Some("tok"));
        assert_eq!(store.user().map(|u| u.manager_id), Some(Some(1)));
        assert_consistent(&store);
    }

    #[test]
    fn test_restore_corrupt_user_clears_storage() {
        let store = store_with(&[(TOKEN_KEY, "tok"), (USER_KEY, "{oops")]);
        assert!(!store.is_authenticated());
        assert_eq!(store.token(), None);
        assert_eq!(store.storage().get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.storage().get(USER_KEY).unwrap(), None);
        assert_consistent(&store);
    }

    #[test]
    fn test_restore_partial_session_is_discarded() {
        let store = store_with(&[(TOKEN_KEY, "tok")]);
        assert!(!store.is_authenticated());
        assert_eq!(store.storage().get(TOKEN_KEY).unwrap(), None);
        assert_consistent(&store);
    }

    #[test]
    fn test_restore_unreadable_file_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "garbage").unwrap();
        let mut store = SessionStore::new(Box::new(FileStorage::new(&path)));
        store.restore();
        assert!(!store.is_authenticated());
        assert!(!path.exists());
    }

    #[test]
    fn test_set_auth_data_persists_both_keys() {
        let mut store = store_with(&[]);
        store.set_auth_data("tok-2".into(), user());
        assert!(store.is_authenticated());
        assert_eq!(store.storage().get(TOKEN_KEY).unwrap().as_deref(), Some("tok-2"));
        let stored: User =
            serde_json::from_str(&store.storage().get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, user());
    }

    #[test]
    fn test_logout_is_unconditional_and_idempotent() {
        let mut store = store_with(&[(TOKEN_KEY, "tok"), (USER_KEY, USER_JSON)]);
        store.logout();
        assert_eq!(store.token(), None);
        assert_eq!(store.user(), None);
        assert_eq!(store.storage().get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.storage().get(USER_KEY).unwrap(), None);

        store.logout();
        assert!(!store.is_authenticated());
        assert_consistent(&store);
    }

    #[test]
    fn test_update_user_keeps_token() {
        let mut store = store_with(&[(TOKEN_KEY, "tok"), (USER_KEY, USER_JSON)]);
        let mut renamed = user();
        renamed.username = "eve2".into();
        store.update_user(renamed);
        assert_eq!(store.token(), Some("tok"));
        assert_eq!(store.user().map(|u| u.username.as_str()), Some("eve2"));

        let mut signed_out = store_with(&[]);
        signed_out.update_user(user());
        assert!(!signed_out.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_success_establishes_session() {
        let (base, _request) = stub::serve_once(
            "200 OK",
            r#"{"access_token": "jwt-1", "user": {"id": 2, "username": "max", "email": "m@x.io", "role": "manager", "created_at": "2024-01-01T00:00:00"}}"#,
        )
        .await;
        let mut store = store_with(&[]);
        store.login(&stub::client(&base), "max", "pw").await.unwrap();
        assert!(store.is_authenticated());
        assert_eq!(store.user().map(|u| u.role), Some(Role::Manager));
        assert_eq!(store.storage().get(TOKEN_KEY).unwrap().as_deref(), Some("jwt-1"));
    }

    #[tokio::test]
    async fn test_login_failure_propagates_and_leaves_state() {
        let (base, _request) =
            stub::serve_once("401 UNAUTHORIZED", r#"{"error": "Invalid username or password"}"#)
                .await;
        let mut store = store_with(&[]);
        let err = store.login(&stub::client(&base), "max", "bad").await.unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert!(!store.is_authenticated());
        assert_consistent(&store);
    }
}
