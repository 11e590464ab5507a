use std::str::FromStr;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use strata_core::{AppError, CallerIdentity, DomainId, SubjectKind};
use subtle::ConstantTimeEq;

use crate::error::ApiResult;
use crate::state::AppState;

/// Subject authenticated by the gateway.
pub const SUBJECT_ID_HEADER: &str = "x-subject-id";
/// Subject kind, `user` when absent.
pub const SUBJECT_TYPE_HEADER: &str = "x-subject-type";
/// Domain the request acts in.
pub const DOMAIN_ID_HEADER: &str = "x-domain-id";

pub async fn require_caller(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = caller_from_headers(request.headers())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn require_internal_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(expected) = state.internal_api_token.as_deref() else {
        return Err(AppError::Unauthorized("internal api is disabled".to_owned()).into());
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("bearer token required".to_owned()))?;

    if !tokens_match(presented.trim().as_bytes(), expected.as_bytes()) {
        return Err(AppError::Unauthorized("invalid internal api token".to_owned()).into());
    }

    Ok(next.run(request).await)
}

fn caller_from_headers(headers: &HeaderMap) -> Result<CallerIdentity, AppError> {
    let subject = header_text(headers, SUBJECT_ID_HEADER)?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;
    let kind = header_text(headers, SUBJECT_TYPE_HEADER)?
        .map(SubjectKind::from_str)
        .transpose()?
        .unwrap_or(SubjectKind::User);
    let domain_id = header_text(headers, DOMAIN_ID_HEADER)?
        .map(DomainId::new)
        .transpose()?;

    Ok(CallerIdentity::new(subject, kind, domain_id))
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AppError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Validation(format!("header '{name}' is not valid text")))?
        .trim();

    Ok((!value.is_empty()).then_some(value))
}

fn tokens_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.ct_eq(expected).into()
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use strata_core::{ErrorKind, SubjectKind};

    use super::{
        DOMAIN_ID_HEADER, SUBJECT_ID_HEADER, SUBJECT_TYPE_HEADER, caller_from_headers,
        tokens_match,
    };

    #[test]
    fn caller_is_built_from_gateway_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(SUBJECT_ID_HEADER, HeaderValue::from_static("alice"));
        headers.insert(DOMAIN_ID_HEADER, HeaderValue::from_static(" domain-1 "));

        let caller = caller_from_headers(&headers).unwrap_or_else(|error| panic!("{error}"));
        assert_eq!(caller.subject(), "alice");
        assert_eq!(caller.kind(), SubjectKind::User);
        assert_eq!(caller.domain_id().map(|domain| domain.as_str()), Some("domain-1"));
    }

    #[test]
    fn missing_subject_is_unauthenticated_and_bad_kind_is_malformed() {
        let headers = HeaderMap::new();
        assert_eq!(
            caller_from_headers(&headers).map_err(|error| error.kind()).err(),
            Some(ErrorKind::Unauthenticated)
        );

        let mut headers = HeaderMap::new();
        headers.insert(SUBJECT_ID_HEADER, HeaderValue::from_static("alice"));
        headers.insert(SUBJECT_TYPE_HEADER, HeaderValue::from_static("robot"));
        assert_eq!(
            caller_from_headers(&headers).map_err(|error| error.kind()).err(),
            Some(ErrorKind::Malformed)
        );
    }

    #[test]
    fn token_comparison_requires_exact_match() {
        assert!(tokens_match(b"secret", b"secret"));
        assert!(!tokens_match(b"secret", b"secreT"));
        assert!(!tokens_match(b"secret", b"secret-longer"));
        assert!(!tokens_match(b"", b"secret"));
    }
}
