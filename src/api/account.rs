//! Login, logout, registration and token endpoints

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        require_present,
        user::{CreateUser, UserView},
    },
};

use super::{JsonBody, CSRF_COOKIE, SESSION_COOKIE};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    fn credentials(self) -> AppResult<(String, String)> {
        require_present(&[
            ("username", self.username.is_some()),
            ("password", self.password.is_some()),
        ])?;
        Ok((self.username.unwrap_or_default(), self.password.unwrap_or_default()))
    }
}

/// Identity summary returned by a successful login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub username: String,
    pub email: String,
    /// Holds the `can_mark_returned` permission
    pub is_librarian: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
}

fn session_cookie(name: &'static str, value: String, http_only: bool, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Log in and open a session
///
/// Sets the `sessionid` and `csrftoken` cookies. Later unsafe requests made
/// with the session must echo the CSRF token in `X-CSRFToken`.
#[utoipa::path(
    post,
    path = "/account/login",
    tag = "account",
    request_body = LoginRequest,
    responses(
        (status = 202, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Access denied")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    jar: CookieJar,
    JsonBody(request): JsonBody<LoginRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<LoginResponse>)> {
    let (username, password) = request.credentials()?;
    let session = state.services.users.login(&username, &password).await?;

    let secure = state.config.auth.secure_cookies;
    let jar = jar
        .add(session_cookie(SESSION_COOKIE, session.session_key, true, secure))
        .add(session_cookie(CSRF_COOKIE, session.csrf_token, false, secure));

    let is_librarian = session.user.is_librarian();
    Ok((
        StatusCode::ACCEPTED,
        jar,
        Json(LoginResponse {
            username: session.user.username,
            email: session.user.email,
            is_librarian,
        }),
    ))
}

/// End the current session. Needs no CSRF token.
#[utoipa::path(
    post,
    path = "/accounts/logout",
    tag = "account",
    responses(
        (status = 204, description = "Logged out")
    )
)]
pub async fn logout(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> AppResult<(StatusCode, CookieJar)> {
    if let Some(session) = jar.get(SESSION_COOKIE) {
        state.services.users.logout(session.value()).await?;
    }

    let jar = jar
        .remove(Cookie::build(SESSION_COOKIE).path("/"))
        .remove(Cookie::build(CSRF_COOKIE).path("/"));
    Ok((StatusCode::NO_CONTENT, jar))
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/account/register",
    tag = "account",
    request_body = CreateUser,
    responses(
        (status = 201, description = "Account created", body = UserView),
        (status = 400, description = "Invalid input or username taken")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    JsonBody(user): JsonBody<CreateUser>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    let created = state.services.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Issue a bearer token for API clients
#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "account",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Access denied")
    )
)]
pub async fn token(
    State(state): State<crate::AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let (username, password) = request.credentials()?;
    let token = state.services.users.issue_token(&username, &password).await?;

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_credentials_require_both_fields() {
        let request = LoginRequest {
            username: Some("reader".into()),
            password: None,
        };
        match request.credentials() {
            Err(AppError::Fields(fields)) => {
                assert!(fields.contains_key("password"));
                assert!(!fields.contains_key("username"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie(SESSION_COOKIE, "key".into(), true, false);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
        let csrf = session_cookie(CSRF_COOKIE, "token".into(), false, true);
        assert_eq!(csrf.http_only(), Some(false));
        assert_eq!(csrf.secure(), Some(true));
    }
}
