//! Bearer-token session middleware and the operator gate.
//!
//! Every request through [`AuthLayer`] is verified independently: the
//! access token is decoded and checked, and on success an
//! [`AuthContext`] is attached to the request extensions. Nothing is
//! cached and account status is not re-read here.
//!
//! [`AdminLayer`] sits inside the session layer on routes that change
//! another account's status. It admits only requests presenting the
//! configured operator key.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{Request, header},
    response::{IntoResponse, Response},
};
use devgate_auth::{TokenKind, TokenService};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use uuid::Uuid;

use crate::config::ADMIN_KEY_HEADER;
use crate::error::ApiError;

/// Verified identity of the caller, available to handlers as
/// `Extension<AuthContext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub email: String,
}

// =============================================================================
// AuthLayer
// =============================================================================

#[derive(Clone)]
pub struct AuthLayer {
    tokens: TokenService,
}

impl AuthLayer {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

// =============================================================================
// AuthMiddleware
// =============================================================================

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    tokens: TokenService,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let context = authenticate(&self.tokens, &req);

        // Take the instance that was polled ready and leave a fresh clone.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match context {
                Ok(context) => {
                    req.extensions_mut().insert(context);
                    inner.call(req).await
                }
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}

fn authenticate<B>(tokens: &TokenService, req: &Request<B>) -> Result<AuthContext, ApiError> {
    let Some(token) = extract_bearer_token(req) else {
        tracing::debug!("no bearer token on protected route");
        return Err(ApiError::unauthorized(
            "MISSING_TOKEN",
            "authorization header with bearer token required",
        ));
    };

    let claims = tokens.validate_kind(token, TokenKind::Access).map_err(|e| {
        tracing::debug!(error = %e, "token validation failed");
        ApiError::from(e)
    })?;
    let account_id = claims.account_id()?;

    Ok(AuthContext {
        account_id,
        email: claims.email,
    })
}

// =============================================================================
// AdminLayer
// =============================================================================

#[derive(Clone)]
pub struct AdminLayer {
    key: Option<Arc<str>>,
}

impl AdminLayer {
    /// With no key every request is refused.
    pub fn new(key: Option<&str>) -> Self {
        Self {
            key: key.map(Arc::from),
        }
    }
}

impl<S> Layer<S> for AdminLayer {
    type Service = AdminMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdminMiddleware {
            inner,
            key: self.key.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AdminMiddleware<S> {
    inner: S,
    key: Option<Arc<str>>,
}

impl<S> Service<Request<Body>> for AdminMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let admitted = holds_admin_key(self.key.as_deref(), &req);

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            if admitted {
                inner.call(req).await
            } else {
                Ok(ApiError::Forbidden {
                    code: "ADMIN_REQUIRED",
                    message: "operator key required".into(),
                }
                .into_response())
            }
        })
    }
}

fn holds_admin_key<B>(expected: Option<&str>, req: &Request<B>) -> bool {
    let Some(expected) = expected else {
        tracing::debug!("operator route refused: no operator key configured");
        return false;
    };
    let Some(presented) = req.headers().get(ADMIN_KEY_HEADER) else {
        tracing::debug!("operator route refused: no operator key presented");
        return false;
    };
    let matched: bool = presented.as_bytes().ct_eq(expected.as_bytes()).into();
    if !matched {
        tracing::warn!("operator route refused: wrong operator key");
    }
    matched
}

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
