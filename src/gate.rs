use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Uri, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::{
    auth::{JwtVerifier, Principal, TokenVerifier, VerifyError, read_credential},
    config::AppConfig,
    matcher::RouteMatcher,
    policy::AccessPolicy,
};

pub const CACHE_CONTROL_VALUE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";
pub const PRAGMA_VALUE: &str = "no-cache";
pub const EXPIRES_VALUE: &str = "0";

/// Denial
///
/// The routine ways a gated request can be turned away. None of them is an error in the
/// operational sense; each one becomes a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The request carried no session token.
    NoCredential,
    /// A token was presented but did not verify (signature, expiry, format, timeout).
    InvalidCredential,
    /// The token is valid but the identity is not allow-listed for a privileged path.
    InsufficientPrivilege,
}

/// Session
///
/// Output of the token stage. Missing and invalid credentials collapse into `Anonymous`; the
/// attached `Denial` is kept for logging and never changes the redirect.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Anonymous(Denial),
    Authenticated(Principal),
}

/// Where a single evaluation ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unauthenticated,
    Forbidden,
    Authorized,
}

/// GateDecision
///
/// The one result of evaluating a request. Built fresh for every request, never cached.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// Let the request through; `headers` are merged into whatever response it produces.
    Forward {
        principal: Principal,
        headers: HeaderMap,
    },
    /// Send the caller to `location` instead.
    Redirect { location: String, denial: Denial },
}

impl GateDecision {
    pub fn state(&self) -> GateState {
        match self {
            GateDecision::Forward { .. } => GateState::Authorized,
            GateDecision::Redirect {
                denial: Denial::InsufficientPrivilege,
                ..
            } => GateState::Forbidden,
            GateDecision::Redirect { .. } => GateState::Unauthenticated,
        }
    }
}

/// Gate
///
/// Request gatekeeper. Holds only immutable configuration and the verifier, so one instance
/// is shared by all concurrent requests behind an `Arc`.
pub struct Gate {
    verifier: Arc<dyn TokenVerifier>,
    policy: AccessPolicy,
    matcher: RouteMatcher,
    session_cookie: String,
    sign_in_path: String,
    denied_path: String,
    verify_timeout: Duration,
}

impl Gate {
    pub fn new(config: &AppConfig, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            policy: config.access.clone(),
            matcher: config.matcher.clone(),
            session_cookie: config.session_cookie.clone(),
            sign_in_path: config.sign_in_path.clone(),
            denied_path: config.denied_path.clone(),
            verify_timeout: config.verify_timeout,
        }
    }

    /// Gate backed by HS256 verification with the configured secret.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config, Arc::new(JwtVerifier::new(&config.jwt_secret)))
    }

    /// Whether the gate inspects `path` at all.
    pub fn applies_to(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }

    /// read_session
    ///
    /// Token stage. Never fails: no token, a bad token and a verifier that does not answer
    /// within the timeout all yield `Session::Anonymous`.
    pub async fn read_session(&self, headers: &HeaderMap) -> Session {
        let Some(token) = read_credential(headers, &self.session_cookie) else {
            return Session::Anonymous(Denial::NoCredential);
        };

        let verified = timeout(self.verify_timeout, self.verifier.verify(token))
            .await
            .unwrap_or(Err(VerifyError::TimedOut));

        match verified {
            Ok(principal) => Session::Authenticated(principal),
            Err(reason) => {
                debug!(%reason, "session token not accepted");
                Session::Anonymous(Denial::InvalidCredential)
            }
        }
    }

    /// evaluate
    ///
    /// Runs the full decision for one request: token stage first, then the allow-list check on
    /// the path. The query string only matters for the callback of a sign-in redirect.
    pub async fn evaluate(&self, uri: &Uri, headers: &HeaderMap) -> GateDecision {
        let principal = match self.read_session(headers).await {
            Session::Authenticated(principal) => principal,
            Session::Anonymous(denial) => {
                return GateDecision::Redirect {
                    location: sign_in_location(&self.sign_in_path, uri),
                    denial,
                };
            }
        };

        if self.policy.authorize(&principal.identity, uri.path()) {
            GateDecision::Forward {
                principal,
                headers: cache_headers(),
            }
        } else {
            GateDecision::Redirect {
                location: self.denied_path.clone(),
                denial: Denial::InsufficientPrivilege,
            }
        }
    }
}

/// sign_in_location
///
/// `<sign_in_path>?callbackUrl=<path+query>`, with the original target percent-encoded once
/// so it survives as a single parameter value.
pub fn sign_in_location(sign_in_path: &str, uri: &Uri) -> String {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    format!(
        "{}?callbackUrl={}",
        sign_in_path,
        urlencoding::encode(target)
    )
}

/// Headers that keep an authorized, principal-specific response out of every cache.
pub fn cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(CACHE_CONTROL_VALUE),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static(PRAGMA_VALUE));
    headers.insert(header::EXPIRES, HeaderValue::from_static(EXPIRES_VALUE));
    headers
}

/// gate_middleware
///
/// Axum middleware wrapping the whole router. Paths outside the matcher pass straight through.
/// For gated paths a forward stores the `Principal` in the request extensions and overwrites
/// the cache headers on the response; every other outcome is a 307 redirect.
pub async fn gate_middleware(
    State(gate): State<Arc<Gate>>,
    request: Request,
    next: Next,
) -> Response {
    if !gate.applies_to(request.uri().path()) {
        return next.run(request).await;
    }

    // The body is not Sync, so only the head is borrowed across the verification await.
    let (mut parts, body) = request.into_parts();
    let decision = gate.evaluate(&parts.uri, &parts.headers).await;
    let state = decision.state();

    match decision {
        GateDecision::Forward { principal, headers } => {
            debug!(?state, path = %parts.uri.path(), "forwarding gated request");
            parts.extensions.insert(principal);

            let mut response = next.run(Request::from_parts(parts, body)).await;
            response.headers_mut().extend(headers);
            response
        }
        GateDecision::Redirect { location, denial } => {
            if denial == Denial::InsufficientPrivilege {
                info!(?state, path = %parts.uri.path(), "privileged path denied");
            } else {
                debug!(?state, ?denial, path = %parts.uri.path(), "redirecting to sign-in");
            }
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_is_encoded_once() {
        let uri: Uri = "/admin/dashboard".parse().unwrap();
        assert_eq!(
            sign_in_location("/auth/signin", &uri),
            "/auth/signin?callbackUrl=%2Fadmin%2Fdashboard"
        );
    }

    #[test]
    fn callback_keeps_query_string() {
        let uri: Uri = "/admin/client/abc?tab=notes&x=%20".parse().unwrap();
        assert_eq!(
            sign_in_location("/auth/signin", &uri),
            "/auth/signin?callbackUrl=%2Fadmin%2Fclient%2Fabc%3Ftab%3Dnotes%26x%3D%2520"
        );
    }

    #[test]
    fn cache_headers_have_exact_values() {
        let headers = cache_headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[header::CACHE_CONTROL], CACHE_CONTROL_VALUE);
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
    }

    #[test]
    fn decision_states() {
        let forbidden = GateDecision::Redirect {
            location: "/".to_string(),
            denial: Denial::InsufficientPrivilege,
        };
        let anonymous = GateDecision::Redirect {
            location: "/auth/signin".to_string(),
            denial: Denial::InvalidCredential,
        };
        assert_eq!(forbidden.state(), GateState::Forbidden);
        assert_eq!(anonymous.state(), GateState::Unauthenticated);
    }
}
