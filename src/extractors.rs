use axum::extract::{FromRequest, Request};
use axum::Json;

use crate::error::AppError;

/// JSON request body whose parse failures are answered as `ValidationError`
///
/// Works like [`axum::Json`], but a missing content type, malformed JSON or
/// a body of the wrong shape becomes a 400 with the usual error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}
