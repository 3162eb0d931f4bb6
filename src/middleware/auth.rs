//! Auth middleware: bearer-token verification and the request identity it yields.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::auth::TokenService;
use crate::error::AppError;
use crate::handlers::http::AppState;

/// Identity decoded from a verified access token, stored in request extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IdentityContext {
    pub user_id: Uuid,
}

/// Resolve the caller from `Authorization: Bearer <token>` as of `now`.
///
/// Every failure collapses to `Unauthorized`; the specific reason is only logged.
pub fn authenticate(
    headers: &HeaderMap,
    tokens: &TokenService,
    now: DateTime<Utc>,
) -> Result<IdentityContext, AppError> {
    let Some(bearer) = headers.typed_get::<Authorization<Bearer>>() else {
        debug!("rejected request: missing or non-bearer Authorization header");
        return Err(AppError::Unauthorized);
    };

    match tokens.verify_access_at(bearer.token(), now) {
        Ok(user_id) => Ok(IdentityContext { user_id }),
        Err(reason) => {
            debug!(%reason, "rejected request: access token verification failed");
            Err(AppError::Unauthorized)
        }
    }
}

/// Middleware for the protected router: verifies the token and attaches `IdentityContext`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let identity = authenticate(request.headers(), state.tokens(), Utc::now())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extractor: authenticated user ID placed by `require_auth`.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<IdentityContext>()
            .map(|ctx| AuthUser(ctx.user_id))
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;
    use axum::http::HeaderValue;
    use chrono::Duration;

    fn tokens() -> TokenService {
        TokenService::new("middleware-access", "middleware-refresh")
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn valid_bearer_token_yields_identity() {
        let svc = tokens();
        let id = Uuid::new_v4();
        let pair = svc.issue_pair(id).unwrap();
        let headers = headers_with(&format!("Bearer {}", pair.access_token));
        let ctx = authenticate(&headers, &svc, Utc::now()).unwrap();
        assert_eq!(ctx.user_id, id);
    }

    #[test]
    fn missing_header_is_unauthorized() {
        let result = authenticate(&HeaderMap::new(), &tokens(), Utc::now());
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn non_bearer_scheme_is_unauthorized() {
        let svc = tokens();
        let pair = svc.issue_pair(Uuid::new_v4()).unwrap();
        let headers = headers_with(&format!("Basic {}", pair.access_token));
        assert!(matches!(
            authenticate(&headers, &svc, Utc::now()),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let svc = tokens();
        let pair = svc.issue_pair(Uuid::new_v4()).unwrap();
        let headers = headers_with(&format!("Bearer {}", pair.refresh_token));
        assert!(matches!(
            authenticate(&headers, &svc, Utc::now()),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let svc = tokens();
        let issued = Utc::now();
        let pair = svc.issue_pair_at(Uuid::new_v4(), issued).unwrap();
        let headers = headers_with(&format!("Bearer {}", pair.access_token));
        let later = issued + Duration::minutes(16);
        assert!(matches!(
            authenticate(&headers, &svc, later),
            Err(AppError::Unauthorized)
        ));
    }
}
