use std::marker::PhantomData;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, UserError};

/// Query string whose rejection is rendered as a validation envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// Request body buffered as-is and decoded only when the handler asks for it,
/// so lookups on the path id run before the body is judged. The content type
/// is not checked and an empty body reads as `{}`.
pub struct JsonBody<T> {
    raw: Bytes,
    _target: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonBody<T> {
    pub fn parse(&self) -> Result<T, UserError> {
        let raw: &[u8] = if self.raw.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &self.raw
        };
        serde_json::from_slice(raw).map_err(|e| {
            UserError::invalid(
                "body",
                format!("Failed to parse the request body as JSON: {e}"),
            )
        })
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let raw = Bytes::from_request(req, state)
            .await
            .map_err(|e| UserError::invalid("body", e.body_text()))?;
        Ok(Self {
            raw,
            _target: PhantomData,
        })
    }
}
