use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jwt_simple::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::AppState;
use crate::error::{AppError, AppResult};
use crate::model::User;
use crate::seed::CURATOR_ID;

/// Profile fields carried in the token next to the `sub` claim
#[derive(Serialize, Deserialize, Debug, Clone)]
struct ProfileClaims {
    username: String,
    #[serde(default)]
    avatar: String,
    #[serde(default)]
    email: String,
}

/// The authenticated caller, attached to every `/api/links` request
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub avatar: String,
    pub email: String,
}

impl From<CurrentUser> for User {
    fn from(user: CurrentUser) -> Self {
        User {
            id: user.id,
            username: user.username,
            avatar: user.avatar,
            email: user.email,
        }
    }
}

/// Signs and verifies HS256 bearer tokens
#[derive(Clone)]
pub struct TokenAuth {
    key: HS256Key,
}

impl TokenAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            key: HS256Key::from_bytes(secret.as_bytes()),
        }
    }

    /// Issues a token for `user`, valid for `valid_for_hours`.
    pub fn issue(&self, user: &User, valid_for_hours: u64) -> AppResult<String> {
        let custom = ProfileClaims {
            username: user.username.clone(),
            avatar: user.avatar.clone(),
            email: user.email.clone(),
        };
        let claims = Claims::with_custom_claims(custom, Duration::from_hours(valid_for_hours))
            .with_subject(&user.id);
        self.key
            .authenticate(claims)
            .map_err(|err| AppError::Internal(err.to_string()))
    }

    /// Returns the caller behind `token`, or `None` if it does not verify.
    ///
    /// The curator id is reserved for seeded links and never accepted as a subject.
    pub fn verify(&self, token: &str) -> Option<CurrentUser> {
        let claims = self
            .key
            .verify_token::<ProfileClaims>(token, None)
            .map_err(|err| tracing::debug!(error = %err, "rejected bearer token"))
            .ok()?;
        let id = claims
            .subject
            .filter(|id| !id.is_empty() && id != CURATOR_ID)?;

        Some(CurrentUser {
            id,
            username: claims.custom.username,
            avatar: claims.custom.avatar,
            email: claims.custom.email,
        })
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware that requires a valid `Authorization: Bearer <token>` header
///
/// On success the caller's profile is recorded (so listings can show the
/// owner's username and avatar) and a [`CurrentUser`] is attached to the
/// request extensions. Otherwise the request is rejected with 401 before
/// any handler runs.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = bearer_token(&request)
        .and_then(|token| state.auth.verify(token))
        .ok_or(AppError::Unauthorized)?;

    state.store.remember_user(&User::from(user.clone()))?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
