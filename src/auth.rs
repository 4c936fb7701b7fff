use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims
///
/// The payload expected inside a session token. Tokens are issued and signed elsewhere; this
/// crate only ever decodes them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the issuer's user id, carried through for handlers that want it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// The identity that the allow-list is checked against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration Time (exp): always validated.
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<usize>,
}

/// Principal
///
/// The verified identity behind a request. Only ever constructed from a token that passed
/// verification, so holding one means the caller is authenticated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    /// Email-like identity exactly as the token carried it. Empty when the token had no email
    /// claim; an empty identity matches no allow-list entry.
    pub identity: String,
    pub subject: Option<String>,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Principal {
            identity: claims.email.unwrap_or_default(),
            subject: claims.sub,
        }
    }
}

/// VerifyError
///
/// Why a presented token was not accepted. Used for logging only: every variant is handled
/// the same way as a missing token.
#[derive(Debug, Error, PartialEq)]
pub enum VerifyError {
    #[error("token expired")]
    Expired,
    #[error("token rejected: {0}")]
    Rejected(String),
    #[error("verification timed out")]
    TimedOut,
}

/// TokenVerifier
///
/// Seam between the gate and whatever can vouch for a token. The gate awaits the result
/// before making any authorization decision.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError>;
}

/// JwtVerifier
///
/// HS256 verification against the shared session secret, with expiry enforced.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, VerifyError> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(Principal::from(data.claims)),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(VerifyError::Expired),
                // Bad signature, malformed token, wrong algorithm, missing exp...
                _ => Err(VerifyError::Rejected(e.to_string())),
            },
        }
    }
}

/// read_credential
///
/// Finds the raw session token on a request. A `Bearer` value in the `Authorization` header
/// wins; otherwise every `Cookie` header is scanned for `cookie_name`. Blank values count as
/// no credential.
pub fn read_credential<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}

/// Principal Extractor
///
/// Handlers behind the gate take a `Principal` argument. The gate stores it in the request
/// extensions on forward; if it is missing the route was not gated, and the handler refuses
/// with 401 rather than serving principal-specific content anonymously.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session_token=xyz"));
        assert_eq!(read_credential(&headers, "session_token"), Some("abc"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("lang=en; session_token=xyz; other=1"),
        );
        assert_eq!(read_credential(&headers, "session_token"), Some("xyz"));
    }

    #[test]
    fn non_bearer_authorization_falls_back_to_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        headers.insert(header::COOKIE, HeaderValue::from_static("session_token=xyz"));
        assert_eq!(read_credential(&headers, "session_token"), Some("xyz"));
    }

    #[test]
    fn blank_values_are_no_credential() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        headers.insert(header::COOKIE, HeaderValue::from_static("session_token="));
        assert_eq!(read_credential(&headers, "session_token"), None);
        assert_eq!(read_credential(&HeaderMap::new(), "session_token"), None);
    }

    #[test]
    fn cookie_name_must_match_exactly() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session_token_old=xyz"));
        assert_eq!(read_credential(&headers, "session_token"), None);
    }

    #[test]
    fn principal_from_claims_without_email() {
        let principal = Principal::from(Claims {
            sub: Some("42".to_string()),
            email: None,
            exp: 0,
            iat: None,
        });
        assert_eq!(principal.identity, "");
        assert_eq!(principal.subject.as_deref(), Some("42"));
    }
}
