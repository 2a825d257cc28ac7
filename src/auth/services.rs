use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        password::{hash_password_blocking, verify_dummy_blocking, verify_password_blocking},
        repo::UserStore,
        repo_types::{CreateUser, User},
        session::{IssuedSession, SessionManager},
    },
    error::{AppError, AppResult, FieldError},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub(crate) fn validate_registration(username: &str, password: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if !is_valid_username(username) {
        errors.push(FieldError::new(
            "username",
            "username must be 3-32 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new(
            "password",
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    errors
}

/// A user together with the session just opened for them.
#[derive(Debug)]
pub struct Authenticated {
    pub user: User,
    pub session: IssuedSession,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.users.clone(), SessionManager::from_ref(state))
    }
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, sessions: SessionManager) -> Self {
        Self { users, sessions }
    }

    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> AppResult<Authenticated> {
        let errors = validate_registration(username, password);
        if !errors.is_empty() {
            warn!("invalid registration payload");
            return Err(AppError::Validation(errors));
        }

        if self.users.find_by_username(username).await?.is_some() {
            warn!("username already registered");
            return Err(AppError::Conflict("Username already exists".into()));
        }

        let hash = hash_password_blocking(password.to_owned()).await?;
        let user = match self.users.create(username, &hash).await? {
            CreateUser::Created(u) => u,
            // lost a race with a concurrent registration
            CreateUser::UsernameTaken => {
                warn!("username taken on insert");
                return Err(AppError::Conflict("Username already exists".into()));
            }
        };

        let session = self.sessions.issue(user.id).await?;
        info!(user_id = user.id, expires_at = %session.session.expires_at, "user registered");
        Ok(Authenticated { user, session })
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> AppResult<Authenticated> {
        let Some(user) = self.users.find_by_username(username).await? else {
            verify_dummy_blocking(password.to_owned()).await?;
            warn!("login unknown username");
            return Err(AppError::InvalidCredentials);
        };

        let ok = verify_password_blocking(password.to_owned(), user.password_hash.clone()).await?;
        if !ok {
            warn!(user_id = user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let session = self.sessions.issue(user.id).await?;
        info!(user_id = user.id, expires_at = %session.session.expires_at, "user logged in");
        Ok(Authenticated { user, session })
    }

    /// Idempotent: a missing or already destroyed token is not an error.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: Option<&str>) -> AppResult<()> {
        if let Some(token) = token {
            let destroyed = self.sessions.destroy(token).await?;
            info!(destroyed, "logout");
        }
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn current_user(&self, token: &str) -> AppResult<Option<User>> {
        let Some(session) = self.sessions.resolve(token).await? else {
            return Ok(None);
        };
        let user = self.users.find_by_id(session.user_id).await?;
        if user.is_none() {
            warn!(user_id = session.user_id, "session refers to missing user");
        }
        Ok(user)
    }
}
