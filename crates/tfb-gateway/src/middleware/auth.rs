//! Basic-Authentication middleware.
//!
//! Decodes the `Authorization: Basic` header and checks the credentials
//! through the `CredentialVerifier` port. Anything short of a verified
//! user — missing header, undecodable payload, rejected credentials, or a
//! verifier failure — is a 401.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, StatusCode},
    response::Response,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tower::{Layer, Service};
use tracing::{info, warn};

use crate::ports::CredentialVerifier;

/// Basic-Auth layer.
#[derive(Clone)]
pub struct BasicAuthLayer {
    verifier: Arc<dyn CredentialVerifier>,
}

impl BasicAuthLayer {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S> Layer<S> for BasicAuthLayer {
    type Service = BasicAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BasicAuthService {
            inner,
            verifier: Arc::clone(&self.verifier),
        }
    }
}

/// Basic-Auth service.
#[derive(Clone)]
pub struct BasicAuthService<S> {
    inner: S,
    verifier: Arc<dyn CredentialVerifier>,
}

impl<S> Service<Request<Body>> for BasicAuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let verifier = Arc::clone(&self.verifier);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let (username, password) = match decode_basic_auth(&req) {
                Some(credentials) => credentials,
                None => {
                    warn!("authorization header missing or undecodable");
                    return Ok(unauthorized_response("Authorization required"));
                }
            };

            match verifier.verify(&username, &password).await {
                Ok(true) => {
                    info!(user = %username, "authorized request");
                    inner.call(req).await
                }
                Ok(false) => {
                    warn!(user = %username, "invalid credentials provided");
                    Ok(unauthorized_response("Not authorized"))
                }
                Err(err) => {
                    warn!(user = %username, error = %err, "credential verification failed");
                    Ok(unauthorized_response("Not authorized"))
                }
            }
        })
    }
}

/// Extract the username/password pair from a Basic Authorization header.
fn decode_basic_auth<B>(req: &Request<B>) -> Option<(String, String)> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let payload = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(payload).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn unauthorized_response(message: &str) -> Response {
    let mut response = Response::new(Body::from(message.to_string()));
    *response.status_mut() = StatusCode::UNAUTHORIZED;
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"state\""),
    );
    response
}
