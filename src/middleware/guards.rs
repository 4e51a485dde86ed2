//! Caller identity extraction.
//!
//! Credential verification lives in the upstream auth gateway; by the time a
//! request reaches this service the gateway has resolved the session token
//! and stamped the caller's id into the `x-user-id` header. This extractor
//! is the seam between that external concern and the handlers.

use crate::error::AppError;
use actix_web::{Error, FromRequest, HttpRequest};
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// The authenticated user a request acts on behalf of.
#[derive(Debug, Clone, Copy)]
pub struct User {
    pub id: Uuid,
}

impl FromRequest for User {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok());

        Box::pin(async move {
            let id = user_id.ok_or(AppError::Unauthorized)?;
            Ok(User { id })
        })
    }
}
