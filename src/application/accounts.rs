//! Accounts and cookie sessions.
//!
//! Passwords are stored as Argon2id PHC strings. A session token has the form
//! `ls_<prefix>_<secret>`; only the prefix and a SHA-256 digest of the secret
//! are persisted, and digests are compared in constant time.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::repos::{CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo},
    domain::{
        access::Viewer,
        entities::UserRecord,
        error::DomainError,
        users::{normalize_full_name, validate_password, validate_username},
    },
};

const TOKEN_PREFIX: &str = "ls";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid session token")]
    Invalid,
    #[error("expired session")]
    Expired,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct SignupCommand {
    pub username: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SessionIssued {
    pub user: UserRecord,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Create an account and open a session for it.
    pub async fn signup(&self, cmd: SignupCommand) -> Result<SessionIssued, AccountError> {
        let username = validate_username(&cmd.username)?;
        let full_name = normalize_full_name(&cmd.full_name)?;
        validate_password(&cmd.password)?;

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AccountError::UsernameTaken(username));
        }

        let password_hash = hash_password(&cmd.password)?;
        let user = match self
            .users
            .create_user(CreateUserParams {
                username: username.clone(),
                full_name,
                password_hash,
            })
            .await
        {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => return Err(AccountError::UsernameTaken(username)),
            Err(err) => return Err(err.into()),
        };

        info!(
            target = "lectern::application::accounts",
            user_id = user.id,
            username = %user.username,
            "account created"
        );
        self.open_session(user).await
    }

    /// Check credentials and open a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionIssued, AccountError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AccountError::InvalidCredentials);
        }

        self.open_session(user).await
    }

    /// Resolve a session token into the viewer it belongs to.
    pub async fn authenticate(&self, token: &str) -> Result<Viewer, SessionError> {
        let parsed = parse_token(token).ok_or(SessionError::Invalid)?;
        let record = self
            .sessions
            .find_by_prefix(&parsed.prefix)
            .await?
            .ok_or(SessionError::Invalid)?;

        let hashed_input = hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(SessionError::Invalid);
        }
        if record.expires_at <= OffsetDateTime::now_utc() {
            return Err(SessionError::Expired);
        }

        let user = self
            .users
            .find_by_id(record.user_id)
            .await?
            .ok_or(SessionError::Invalid)?;

        Ok(Viewer {
            user_id: user.id,
            username: user.username,
        })
    }

    /// Drop the session behind `token`. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        if let Some(parsed) = parse_token(token) {
            self.sessions.delete_by_prefix(&parsed.prefix).await?;
        }
        Ok(())
    }

    async fn open_session(&self, user: UserRecord) -> Result<SessionIssued, AccountError> {
        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;

        self.sessions
            .create_session(CreateSessionParams {
                prefix,
                hashed_secret: hash_secret(&secret),
                user_id: user.id,
                expires_at,
            })
            .await?;

        Ok(SessionIssued {
            user,
            token,
            expires_at,
        })
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::PasswordHash(err.to_string()))
}

pub fn verify_password(password: &str, stored: &str) -> Result<bool, AccountError> {
    let parsed = match PasswordHash::new(stored) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(
                target = "lectern::application::accounts",
                error = %err,
                "stored password hash is unreadable"
            );
            return Ok(false);
        }
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AccountError::PasswordHash(err.to_string())),
    }
}

fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}
