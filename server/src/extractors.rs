//! Custom Axum extractors.
//!
//! Identity is resolved by the upstream auth gateway, which verifies the
//! caller's token and forwards the result as `X-User-Id` / `X-User-Role`
//! headers. [`AuthContext`] turns those trusted headers into the explicit
//! [`Actor`] every core operation takes; no handler reads identity any
//! other way.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use tutorlink_core::types::{Actor, Role, UserId};
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying the authenticated user role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// The authenticated caller.
///
/// Use as a handler parameter to require authentication:
///
/// ```ignore
/// async fn handler(auth: AuthContext) -> Result<Json<Response>, AppError> {
///     let actor = auth.actor();
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    /// Authenticated user id.
    pub user_id: UserId,
    /// Authenticated role.
    pub role: Role,
}

impl AuthContext {
    /// The caller as a core [`Actor`].
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing X-User-Id header"))?;
        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| AppError::unauthorized("Malformed X-User-Id header"))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing X-User-Role header"))?;
        let role = Role::parse(role)
            .ok_or_else(|| AppError::unauthorized("Unknown X-User-Role value"))?;

        Ok(Self {
            user_id: UserId::from_uuid(user_id),
            role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<AuthContext, AppError> {
        let (mut parts, ()) = req.into_parts();
        AuthContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_valid_headers_produce_an_actor() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ROLE_HEADER, "tutor")
            .body(())
            .expect("valid request");

        let auth = extract(req).await.expect("should extract");
        assert_eq!(auth.user_id, UserId::from_uuid(id));
        assert_eq!(auth.role, Role::Tutor);
    }

    #[tokio::test]
    async fn test_missing_headers_are_unauthorized() {
        let req = Request::builder().body(()).expect("valid request");
        assert!(extract(req).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_role_is_unauthorized() {
        let req = Request::builder()
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_ROLE_HEADER, "admin")
            .body(())
            .expect("valid request");
        assert!(extract(req).await.is_err());
    }
}
