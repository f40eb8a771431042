//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`Identity`]: caller id and role attached by the upstream gateway
//! - [`ApiJson`]: JSON body whose rejections use the error envelope
//!
//! Authentication itself happens upstream. The gateway forwards the verified
//! caller as `X-User-Id` (UUID) and `X-User-Role` (`USER`, `MENTOR`, `ADMIN`);
//! a request without both is rejected with 401.
//!
//! # Examples
//!
//! ```ignore
//! async fn handler(identity: Identity) -> Result<Json<Body>, AppError> {
//!     let mentor_id = identity.require(Role::Mentor)?;
//!     ...
//! }
//! ```

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use mentorship_core::{Role, UserId};
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Correlation ID for request tracing.
///
/// Prefers the id stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and generates a fresh UUID v4 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }

        let correlation_id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// JSON request body.
///
/// Same as [`axum::Json`], but a body that is not JSON or does not match the
/// target type is rejected with a 400 [`AppError`] instead of axum's
/// plain-text response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    /// Caller's user id
    pub user_id: UserId,
    /// Caller's role
    pub role: Role,
}

impl Identity {
    /// The caller's id if they have `role`.
    ///
    /// # Errors
    ///
    /// 403 for any other role.
    pub fn require(&self, role: Role) -> Result<UserId, AppError> {
        self.require_any(&[role])
    }

    /// The caller's id if their role is one of `roles`.
    ///
    /// # Errors
    ///
    /// 403 for any other role.
    pub fn require_any(&self, roles: &[Role]) -> Result<UserId, AppError> {
        if roles.contains(&self.role) {
            Ok(self.user_id)
        } else {
            Err(AppError::forbidden(format!(
                "Role {} may not perform this action",
                self.role
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized("Missing user identity"))?
            .parse::<UserId>()
            .map_err(|_| AppError::unauthorized("Invalid user identity"))?;

        let role = header(USER_ROLE_HEADER)
            .ok_or_else(|| AppError::unauthorized("Missing user role"))?
            .parse::<Role>()
            .map_err(|_| AppError::unauthorized("Invalid user role"))?;

        Ok(Self { user_id, role })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).expect("Valid request").into_parts().0
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let mut parts = parts(&[(CORRELATION_ID_HEADER, &uuid.to_string())]);

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = CorrelationId(Uuid::new_v4());
        let mut parts = parts(&[(CORRELATION_ID_HEADER, &Uuid::new_v4().to_string())]);
        parts.extensions.insert(stored);

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id, stored);
    }

    #[tokio::test]
    async fn test_identity_from_headers() {
        let user_id = UserId::new();
        let mut parts = parts(&[
            (USER_ID_HEADER, &user_id.to_string()),
            (USER_ROLE_HEADER, "MENTOR"),
        ]);

        let identity = Identity::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.role, Role::Mentor);
        assert_eq!(identity.require(Role::Mentor).unwrap(), user_id);
        assert_eq!(
            identity.require(Role::Admin).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_identity_missing_or_invalid_is_unauthorized() {
        let cases: [&[(&str, &str)]; 4] = [
            &[],
            &[(USER_ROLE_HEADER, "USER")],
            &[(USER_ID_HEADER, "not-a-uuid"), (USER_ROLE_HEADER, "USER")],
            &[(USER_ID_HEADER, "6f1c1c56-0e2f-4a53-a7a5-9f3f1b1c2d3e"), (USER_ROLE_HEADER, "ROOT")],
        ];

        for headers in cases {
            let mut parts = parts(headers);
            let rejection = Identity::from_request_parts(&mut parts, &())
                .await
                .unwrap_err();
            assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
