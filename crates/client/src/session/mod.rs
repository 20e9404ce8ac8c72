//! Auth session store.
//!
//! Holds the current user and bearer token, persists them across restarts,
//! and exposes login/register/logout plus the local merge updates the
//! profile and verification flows need.
//!
//! # Persistence
//!
//! Three fixed keys in durable local storage, always written and cleared
//! together:
//!
//! - `"user"` - serialized [`UserProfile`]
//! - `"token"` - raw bearer token string
//! - `"isLoggedIn"` - boolean flag, stored as `"true"`
//!
//! # Lifecycle
//!
//! The store starts in a `loading` state; [`SessionStore::restore`] reads the
//! persisted session synchronously and clears the flag, so consumers can
//! defer auth-gated rendering until the initial read completes. The session
//! is created on login/register, mutated on verification or profile updates,
//! and destroyed on logout.

mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument};

use zafaran_core::{Email, EmailError, PhoneNumber, PhoneNumberError, UserId};

use crate::api::{ApiClient, ApiError, Envelope};

/// Storage key for the serialized user profile.
const USER_KEY: &str = "user";
/// Storage key for the raw bearer token.
const TOKEN_KEY: &str = "token";
/// Storage key for the login flag.
const LOGGED_IN_KEY: &str = "isLoggedIn";

/// Minimum accepted password length for registration pre-validation.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur in session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Persisted state could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Persisted user record is not valid JSON.
    #[error("Persisted session is corrupt: {0}")]
    CorruptSession(#[from] serde_json::Error),

    /// Email failed format pre-validation.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Phone number failed format pre-validation.
    #[error("Invalid phone number: {0}")]
    InvalidPhone(#[from] PhoneNumberError),

    /// A required field is empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Password is shorter than the accepted minimum.
    #[error("Password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum accepted length.
        min: usize,
    },

    /// Password and confirmation do not match.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Operation requires an authenticated session.
    #[error("Not logged in")]
    NotLoggedIn,
}

/// The authenticated user's profile as the backend reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend identifier.
    #[serde(alias = "_id")]
    pub id: UserId,
    /// Display name.
    pub full_name: String,
    /// Contact email; also the login identifier.
    pub email: String,
    /// Contact phone number.
    pub phone_number: String,
    /// Whether the email address has been verified.
    #[serde(default)]
    pub verified: bool,
}

/// The client's record of the current authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    /// Current user, when logged in.
    pub user: Option<UserProfile>,
    /// Bearer token for authenticated calls.
    pub token: Option<String>,
    /// Whether a user is logged in.
    pub is_logged_in: bool,
}

impl Session {
    /// Whether the session belongs to a logged-in, email-verified user.
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.is_logged_in && self.user.as_ref().is_some_and(|u| u.verified)
    }
}

/// Login request body.
#[derive(Debug, Serialize)]
pub struct LoginCredentials {
    /// Login email.
    pub email: String,
    /// Plain-text password; checked server-side only.
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDetails {
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Partial profile update applied locally after a confirmed backend call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    /// New display name, if changed.
    pub full_name: Option<String>,
    /// New phone number, if changed.
    pub phone_number: Option<String>,
}

/// Auth payload returned by `/auth/login` and `/auth/register`.
#[derive(Debug, Deserialize)]
struct AuthPayload {
    user: UserProfile,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UpdatedProfilePayload {
    user: ProfileFields,
}

// =============================================================================
// SessionStore
// =============================================================================

/// Owned session store: one logical session per running app.
///
/// Cheaply cloneable via `Arc`. All mutation goes through store methods;
/// consumers observe snapshots through [`SessionStore::subscribe`].
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    api: ApiClient,
    storage: Arc<dyn SessionStorage>,
    state: Mutex<SessionState>,
    tx: watch::Sender<Session>,
}

struct SessionState {
    session: Session,
    loading: bool,
}

impl SessionStore {
    /// Create a session store over the given API client and storage.
    ///
    /// The store starts in the `loading` state; call
    /// [`SessionStore::restore`] before relying on [`Self::session`].
    #[must_use]
    pub fn new(api: ApiClient, storage: Arc<dyn SessionStorage>) -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self {
            inner: Arc::new(SessionStoreInner {
                api,
                storage,
                state: Mutex::new(SessionState {
                    session: Session::default(),
                    loading: true,
                }),
                tx,
            }),
        }
    }

    /// Create a session store backed by file storage under `data_dir`.
    #[must_use]
    pub fn with_data_dir(api: ApiClient, data_dir: impl Into<std::path::PathBuf>) -> Self {
        Self::new(api, Arc::new(FileStorage::new(data_dir.into())))
    }

    /// Read the persisted session from storage, synchronously.
    ///
    /// Clears the `loading` flag whether or not a session was found. When a
    /// session is restored, the bearer token is installed on the API client.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the persisted user record is
    /// corrupt; the store is left logged out (and no longer loading) in
    /// either case.
    pub fn restore(&self) -> Result<Session, SessionError> {
        let result = self.read_persisted();

        let session = match &result {
            Ok(Some(session)) => session.clone(),
            _ => Session::default(),
        };

        if let Some(token) = &session.token {
            self.inner.api.set_token(token);
        }

        {
            let mut state = self.lock_state();
            state.session = session.clone();
            state.loading = false;
        }
        self.notify();

        result.map(|_| session)
    }

    fn read_persisted(&self) -> Result<Option<Session>, SessionError> {
        let storage = &self.inner.storage;

        let flag = storage.read(LOGGED_IN_KEY)?;
        if flag.as_deref() != Some("true") {
            return Ok(None);
        }

        let user = match storage.read(USER_KEY)? {
            Some(raw) => Some(serde_json::from_str::<UserProfile>(&raw)?),
            None => None,
        };
        let token = storage.read(TOKEN_KEY)?;

        Ok(Some(Session {
            user,
            token,
            is_logged_in: true,
        }))
    }

    /// Log in with email and password.
    ///
    /// On success the session is stored in memory, persisted, and the token
    /// installed on the API client. Invalid credentials surface as
    /// [`SessionError::Api`]; the call is not retried.
    ///
    /// # Errors
    ///
    /// Returns an error on backend rejection, transport failure, or a
    /// storage failure while persisting.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Session, SessionError> {
        let envelope: Envelope<AuthPayload> =
            self.inner.api.post("/auth/login", credentials).await?;
        let payload = envelope.into_result()?;

        info!(user = %payload.user.id, "logged in");
        self.install(payload)
    }

    /// Register a new account.
    ///
    /// Performs lightweight format pre-validation (to avoid a needless round
    /// trip, not as a security boundary), then registers and stores the
    /// resulting session exactly as [`Self::login`] does.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any network call, or an API/storage
    /// error afterwards.
    #[instrument(skip(self, details), fields(email = %details.email))]
    pub async fn register(&self, details: &RegisterDetails) -> Result<Session, SessionError> {
        validate_registration(details)?;

        let envelope: Envelope<AuthPayload> =
            self.inner.api.post("/auth/register", details).await?;
        let payload = envelope.into_result()?;

        info!(user = %payload.user.id, "registered");
        self.install(payload)
    }

    /// Clear the in-memory and persisted session unconditionally.
    ///
    /// Idempotent: logging out twice is a no-op. Memory and the API client
    /// token are cleared even if storage removal fails.
    ///
    /// # Errors
    ///
    /// Returns an error only if removing the persisted keys fails.
    pub fn logout(&self) -> Result<(), SessionError> {
        {
            let mut state = self.lock_state();
            state.session = Session::default();
        }
        self.inner.api.clear_token();
        self.notify();

        let storage = &self.inner.storage;
        storage.remove(USER_KEY)?;
        storage.remove(TOKEN_KEY)?;
        storage.remove(LOGGED_IN_KEY)?;
        Ok(())
    }

    /// Merge a confirmed verification status into the current user record.
    ///
    /// Does not call the backend; callers perform the backend call and pass
    /// the confirmed result in. No-op when logged out.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the updated record fails.
    pub fn update_verification_status(&self, verified: bool) -> Result<(), SessionError> {
        self.merge_user(|user| user.verified = verified)
    }

    /// Merge confirmed profile fields into the current user record.
    ///
    /// Does not call the backend. No-op when logged out.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting the updated record fails.
    pub fn update_profile_fields(&self, fields: &ProfileFields) -> Result<(), SessionError> {
        self.merge_user(|user| {
            if let Some(full_name) = &fields.full_name {
                user.full_name = full_name.clone();
            }
            if let Some(phone_number) = &fields.phone_number {
                user.phone_number = phone_number.clone();
            }
        })
    }

    /// Submit the email verification code, marking the user verified on
    /// success.
    ///
    /// # Errors
    ///
    /// Returns an error on backend rejection or persistence failure.
    #[instrument(skip(self, code))]
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<(), SessionError> {
        let body = serde_json::json!({ "email": email, "code": code });
        let envelope: Envelope<serde_json::Value> =
            self.inner.api.post("/auth/verify-email", &body).await?;
        let _ = envelope.into_optional()?;

        self.update_verification_status(true)
    }

    /// Ask the backend to send a fresh verification code.
    ///
    /// # Errors
    ///
    /// Returns an error on backend rejection or transport failure.
    #[instrument(skip(self))]
    pub async fn send_verification(&self, email: &str) -> Result<(), SessionError> {
        let body = serde_json::json!({ "email": email });
        let envelope: Envelope<serde_json::Value> =
            self.inner.api.post("/auth/send-verification", &body).await?;
        let _ = envelope.into_optional()?;
        Ok(())
    }

    /// Change the account password.
    ///
    /// The new password and confirmation are compared client-side before any
    /// network call; the old password is checked server-side only.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::PasswordMismatch`] before the network call,
    /// or an API error afterwards.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), SessionError> {
        if new_password != confirm_password {
            return Err(SessionError::PasswordMismatch);
        }

        let body = serde_json::json!({
            "oldPassword": old_password,
            "newPassword": new_password,
            "confirmPassword": confirm_password,
        });
        let envelope: Envelope<serde_json::Value> =
            self.inner.api.post("/auth/change-password", &body).await?;
        let _ = envelope.into_optional()?;
        Ok(())
    }

    /// Update the profile on the backend, then merge the confirmed fields
    /// into the local record.
    ///
    /// # Errors
    ///
    /// Returns a validation error before the network call, or an API/storage
    /// error afterwards.
    #[instrument(skip(self))]
    pub async fn update_profile(
        &self,
        full_name: &str,
        phone_number: &str,
    ) -> Result<(), SessionError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(SessionError::MissingField("Full name"));
        }
        let phone_number = PhoneNumber::parse(phone_number)?;

        let body = serde_json::json!({
            "fullName": full_name,
            "phoneNumber": phone_number.as_str(),
        });
        let envelope: Envelope<UpdatedProfilePayload> =
            self.inner.api.post("/auth/update-profile", &body).await?;
        let confirmed = envelope.into_result()?;

        self.update_profile_fields(&confirmed.user)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.lock_state().session.clone()
    }

    /// The current user, when logged in.
    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.lock_state().session.user.clone()
    }

    /// Whether a user is logged in.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.lock_state().session.is_logged_in
    }

    /// True until the initial [`Self::restore`] read has completed.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock_state().loading
    }

    /// Subscribe to session snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.tx.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn install(&self, payload: AuthPayload) -> Result<Session, SessionError> {
        let session = Session {
            user: Some(payload.user),
            token: Some(payload.token.clone()),
            is_logged_in: true,
        };

        self.inner.api.set_token(&payload.token);
        {
            let mut state = self.lock_state();
            state.session = session.clone();
            state.loading = false;
        }
        self.notify();

        self.persist(&session)?;
        Ok(session)
    }

    /// Write all three keys together.
    fn persist(&self, session: &Session) -> Result<(), SessionError> {
        let storage = &self.inner.storage;

        if let Some(user) = &session.user {
            storage.write(USER_KEY, &serde_json::to_string(user)?)?;
        }
        if let Some(token) = &session.token {
            storage.write(TOKEN_KEY, token)?;
        }
        storage.write(LOGGED_IN_KEY, "true")?;
        Ok(())
    }

    fn merge_user(&self, apply: impl FnOnce(&mut UserProfile)) -> Result<(), SessionError> {
        let updated = {
            let mut state = self.lock_state();
            let Some(user) = state.session.user.as_mut() else {
                return Ok(());
            };
            apply(user);
            user.clone()
        };
        self.notify();

        self.inner
            .storage
            .write(USER_KEY, &serde_json::to_string(&updated)?)?;
        Ok(())
    }

    fn notify(&self) {
        let session = self.lock_state().session.clone();
        self.inner.tx.send_replace(session);
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        match self.inner.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Format checks only; the backend performs the authoritative validation.
fn validate_registration(details: &RegisterDetails) -> Result<(), SessionError> {
    if details.full_name.trim().is_empty() {
        return Err(SessionError::MissingField("Full name"));
    }
    PhoneNumber::parse(&details.phone_number)?;
    Email::parse(&details.email)?;
    if details.password.len() < MIN_PASSWORD_LENGTH {
        return Err(SessionError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if details.password != details.confirm_password {
        return Err(SessionError::PasswordMismatch);
    }
    Ok(())
}
