//! User model, request identity and access checks

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::AppError;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));

/// Named permissions that can be granted to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Librarian permission: see every borrowed copy and mark copies returned
    CanMarkReturned,
}

impl Permission {
    pub fn codename(&self) -> &'static str {
        match self {
            Permission::CanMarkReturned => "books.can_mark_returned",
        }
    }
}

/// Full user row
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string
    pub password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// User as exposed by the users resource and registration.
/// The password is write-only and never part of this projection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

/// Minimal public subset embedded in copies (borrower) and reviews (author)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl PublicUser {
    /// Builds the projection from the nullable columns of a LEFT JOIN
    pub fn from_parts(
        id: Option<i32>,
        username: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            id: id?,
            username: username.unwrap_or_default(),
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
        })
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        let mut err = ValidationError::new("username");
        err.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(err)
    }
}

/// Registration / user creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    #[serde(default)]
    pub first_name: String,
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    #[serde(default)]
    pub last_name: String,
    /// Write-only; hashed before storage
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
}

impl CreateUser {
    /// Blank emails are stored as "no email"
    pub fn normalize(&mut self) {
        self.username = self.username.trim().to_string();
        self.email = self
            .email
            .take()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
    }
}

/// Update user request. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has no more than 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: Option<String>,
}

impl UpdateUser {
    /// Fields a full (PUT) update must carry
    pub fn require_full(&self) -> Result<(), AppError> {
        let mut missing = crate::error::FieldErrors::new();
        if self.username.is_none() {
            missing.insert("username".into(), vec!["This field is required.".into()]);
        }
        if self.password.is_none() {
            missing.insert("password".into(), vec!["This field is required.".into()]);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Fields(missing))
        }
    }
}

/// How the current request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Session,
    Token,
}

/// Authenticated user resolved for one request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_superuser: bool,
    pub permissions: Vec<String>,
    pub scheme: AuthScheme,
}

impl CurrentUser {
    /// Superusers hold every permission
    pub fn has_perm(&self, permission: Permission) -> bool {
        self.is_superuser || self.permissions.iter().any(|p| p == permission.codename())
    }

    pub fn is_librarian(&self) -> bool {
        self.has_perm(Permission::CanMarkReturned)
    }
}

/// Identity of the caller, passed explicitly to every handler
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    User(CurrentUser),
}

impl Identity {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Identity::User(user) => Some(user),
            Identity::Anonymous => None,
        }
    }

    pub fn require_authenticated(&self) -> Result<&CurrentUser, AppError> {
        self.user().ok_or_else(|| {
            AppError::Authentication("Authentication credentials were not provided.".to_string())
        })
    }

    pub fn require_perm(&self, permission: Permission) -> Result<&CurrentUser, AppError> {
        let user = self.require_authenticated()?;
        if user.has_perm(permission) {
            Ok(user)
        } else {
            Err(AppError::Authorization(
                "You do not have permission to perform this action.".to_string(),
            ))
        }
    }

    /// Writes to authors, genres, languages, users and copies
    pub fn require_reference_write(&self, open_writes: bool) -> Result<(), AppError> {
        if open_writes {
            Ok(())
        } else {
            self.require_authenticated().map(|_| ())
        }
    }

    /// Only the author of a review may change it. Reviews whose author was
    /// deleted can no longer be changed through the API.
    pub fn require_review_owner(&self, review_author: Option<i32>) -> Result<&CurrentUser, AppError> {
        let user = self.require_authenticated()?;
        match review_author {
            Some(author_id) if author_id == user.id => Ok(user),
            _ => Err(AppError::Authorization(
                "You do not have permission to perform this action.".to_string(),
            )),
        }
    }
}

/// JWT claims for bearer-token clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub user_id: i32,
    pub exp: i64,
    pub iat: i64,
}

impl TokenClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: i32, permissions: &[&str]) -> Identity {
        Identity::User(CurrentUser {
            id,
            username: format!("reader{id}"),
            email: String::new(),
            is_superuser: false,
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            scheme: AuthScheme::Session,
        })
    }

    #[test]
    fn test_anonymous_is_not_authenticated() {
        let err = Identity::Anonymous.require_authenticated().unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[test]
    fn test_permission_check() {
        assert!(member(1, &["books.can_mark_returned"])
            .require_perm(Permission::CanMarkReturned)
            .is_ok());
        assert!(matches!(
            member(1, &[]).require_perm(Permission::CanMarkReturned),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            Identity::Anonymous.require_perm(Permission::CanMarkReturned),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_superuser_has_every_permission() {
        let admin = CurrentUser {
            id: 1,
            username: "admin".into(),
            email: String::new(),
            is_superuser: true,
            permissions: vec![],
            scheme: AuthScheme::Token,
        };
        assert!(admin.is_librarian());
    }

    #[test]
    fn test_review_owner() {
        assert!(member(7, &[]).require_review_owner(Some(7)).is_ok());
        assert!(matches!(
            member(8, &[]).require_review_owner(Some(7)),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            member(8, &[]).require_review_owner(None),
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            Identity::Anonymous.require_review_owner(Some(7)),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn test_reference_write_policy() {
        assert!(Identity::Anonymous.require_reference_write(true).is_ok());
        assert!(Identity::Anonymous.require_reference_write(false).is_err());
        assert!(member(3, &[]).require_reference_write(false).is_ok());
    }

    #[test]
    fn test_registration_validation() {
        let mut user = CreateUser {
            username: " new reader ".into(),
            email: Some("  ".into()),
            first_name: String::new(),
            last_name: String::new(),
            password: "short".into(),
        };
        user.normalize();
        assert_eq!(user.email, None);
        let errors = user.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn test_token_roundtrip() {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            sub: "reader".into(),
            user_id: 5,
            exp: now + 3600,
            iat: now,
        };
        let token = claims.create_token("secret").unwrap();
        assert_eq!(TokenClaims::from_token(&token, "secret").unwrap().user_id, 5);
        assert!(TokenClaims::from_token(&token, "other").is_err());
    }
}
