//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{AuthScheme, CreateUser, CurrentUser, Identity, TokenClaims, UpdateUser, User},
    repository::Repository,
    services::redis::{random_key, RedisService},
};

/// Same message for unknown users, wrong passwords and inactive accounts
pub const LOGIN_FAILED: &str = "Access denied: wrong username or password.";

/// Verified against when the username is unknown, so both failure paths
/// do the same work
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("not-a-real-password").ok());

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string
pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Session opened by a successful login
pub struct Session {
    pub user: CurrentUser,
    pub session_key: String,
    pub csrf_token: String,
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
    redis: RedisService,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig, redis: RedisService) -> Self {
        Self { repository, config, redis }
    }

    /// Check credentials. Every failure yields the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<User> {
        let user = self.repository.users.find_by_username(username).await?;

        let verified = match &user {
            Some(user) => verify_password(&user.password, password),
            None => {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    verify_password(dummy, password);
                }
                false
            }
        };

        match user {
            Some(user) if verified && user.is_active => Ok(user),
            _ => {
                tracing::warn!(username = %username, "Failed login attempt");
                Err(AppError::Authentication(LOGIN_FAILED.to_string()))
            }
        }
    }

    /// Authenticate and open a browser session
    pub async fn login(&self, username: &str, password: &str) -> AppResult<Session> {
        let user = self.authenticate(username, password).await?;
        self.repository.users.touch_last_login(user.id).await?;

        let session_key = self
            .redis
            .create_session(user.id, self.config.session_ttl_hours * 3600)
            .await?;
        let user = self.current_user(user, AuthScheme::Session).await?;

        tracing::info!(user_id = user.id, "User logged in");

        Ok(Session {
            user,
            session_key,
            csrf_token: random_key(),
        })
    }

    /// Authenticate and issue a bearer token
    pub async fn issue_token(&self, username: &str, password: &str) -> AppResult<String> {
        let user = self.authenticate(username, password).await?;
        self.repository.users.touch_last_login(user.id).await?;

        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = TokenClaims {
            sub: user.username.clone(),
            user_id: user.id,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub async fn logout(&self, session_key: &str) -> AppResult<()> {
        self.redis.delete_session(session_key).await
    }

    /// Identity behind a session cookie. Expired or unknown sessions and
    /// deactivated users resolve to anonymous.
    pub async fn resolve_session(&self, session_key: &str) -> AppResult<Identity> {
        let Some(user_id) = self.redis.session_user(session_key).await? else {
            return Ok(Identity::Anonymous);
        };
        match self.repository.users.find_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(Identity::User(
                self.current_user(user, AuthScheme::Session).await?,
            )),
            _ => Ok(Identity::Anonymous),
        }
    }

    /// Identity behind a bearer token. Invalid tokens are rejected.
    pub async fn resolve_token(&self, token: &str) -> AppResult<Identity> {
        let claims = TokenClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;

        match self.repository.users.find_by_id(claims.user_id).await? {
            Some(user) if user.is_active => Ok(Identity::User(
                self.current_user(user, AuthScheme::Token).await?,
            )),
            _ => Err(AppError::Authentication("User inactive or deleted.".to_string())),
        }
    }

    async fn current_user(&self, user: User, scheme: AuthScheme) -> AppResult<CurrentUser> {
        let permissions = self.repository.users.permissions(user.id).await?;
        Ok(CurrentUser {
            id: user.id,
            username: user.username,
            email: user.email,
            is_superuser: user.is_superuser,
            permissions,
            scheme,
        })
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.repository.users.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Create a new user (registration and the users resource)
    pub async fn create_user(&self, mut input: CreateUser) -> AppResult<User> {
        input.normalize();
        input.validate()?;

        if self.repository.users.username_exists(&input.username, None).await? {
            return Err(AppError::field("username", "A user with that username already exists."));
        }
        if let Some(ref email) = input.email {
            if self.repository.users.email_exists(email, None).await? {
                return Err(AppError::field("email", "A user with that email already exists."));
            }
        }

        let user = User {
            id: 0,
            username: input.username,
            email: input.email.unwrap_or_default(),
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            password: hash_password(&input.password)?,
            is_active: true,
            is_superuser: false,
            date_joined: Utc::now(),
            last_login: None,
        };

        let created = self.repository.users.create(&user).await?;
        tracing::info!(user_id = created.id, "User created");
        Ok(created)
    }

    /// Update an existing user. A full update must carry username and password.
    pub async fn update_user(&self, id: i32, input: UpdateUser, partial: bool) -> AppResult<User> {
        if !partial {
            input.require_full()?;
        }
        input.validate()?;

        let mut user = self.repository.users.get_by_id(id).await?;

        if let Some(username) = input.username {
            let username = username.trim().to_string();
            if self.repository.users.username_exists(&username, Some(id)).await? {
                return Err(AppError::field("username", "A user with that username already exists."));
            }
            user.username = username;
        }
        if let Some(email) = input.email {
            let email = email.trim().to_string();
            if self.repository.users.email_exists(&email, Some(id)).await? {
                return Err(AppError::field("email", "A user with that email already exists."));
            }
            user.email = email;
        }
        if let Some(first_name) = input.first_name {
            user.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = input.last_name {
            user.last_name = last_name.trim().to_string();
        }
        if let Some(password) = input.password {
            user.password = hash_password(&password)?;
        }

        self.repository.users.update(&user).await
    }

    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "correct horse"));
        assert!(!verify_password(&hash, "wrong horse"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("", "anything"));
        assert!(!verify_password("plaintext", "plaintext"));
    }

    #[test]
    fn test_dummy_hash_is_available() {
        assert!(DUMMY_HASH.is_some());
    }
}
