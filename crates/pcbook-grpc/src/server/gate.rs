//! Per-method access control in front of the generated services.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;

use tonic::Status;
use tonic::body::BoxBody;
use tonic::codegen::http::{self, HeaderMap, HeaderValue};
use tonic::codegen::{BoxFuture, Context, Poll, Service, empty_body};
use tonic::server::NamedService;

use pcbook::{Claims, JwtManager, Role};

use crate::proto::methods;

/// Which roles may call which full method paths.
///
/// Methods absent from the map are open to everyone. The default is
/// [`AccessRules::default_policy`].
#[derive(Clone, Debug)]
pub struct AccessRules {
    rules: HashMap<String, HashSet<Role>>,
}

impl Default for AccessRules {
    fn default() -> Self {
        Self::default_policy()
    }
}

impl AccessRules {
    /// An empty map: every method is open.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Creating laptops and uploading images need `admin`; rating needs
    /// `admin` or `user`. Login and search are open.
    pub fn default_policy() -> Self {
        Self::new()
            .allow(methods::CREATE_LAPTOP, [Role::Admin])
            .allow(methods::UPLOAD_IMAGE, [Role::Admin])
            .allow(methods::RATE_LAPTOP, [Role::Admin, Role::User])
    }

    /// Restrict `method` to `roles`, replacing any earlier entry.
    pub fn allow(mut self, method: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        self.rules.insert(method.into(), roles.into_iter().collect());
        self
    }

    /// The roles permitted for `method`, or `None` if it is open.
    pub fn roles_for(&self, method: &str) -> Option<&HashSet<Role>> {
        self.rules.get(method)
    }
}

/// Decides, before any handler runs, whether a call may proceed.
#[derive(Clone, Debug)]
pub struct AccessGate {
    jwt: JwtManager,
    rules: Arc<AccessRules>,
}

impl AccessGate {
    /// Create a gate verifying tokens with `jwt` against `rules`.
    pub fn new(jwt: JwtManager, rules: AccessRules) -> Self {
        Self {
            jwt,
            rules: Arc::new(rules),
        }
    }

    /// Authorize a call to `method` carrying `headers`.
    ///
    /// Returns the verified claims for restricted methods and `None` for
    /// open ones.
    pub fn authorize(&self, method: &str, headers: &HeaderMap) -> Result<Option<Claims>, Status> {
        let Some(allowed) = self.rules.roles_for(method) else {
            return Ok(None);
        };

        let token = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Status::unauthenticated("authorization token is not provided"))?;

        let claims = self.jwt.verify(token).map_err(|e| {
            tracing::debug!(method, error = %e, "token rejected");
            Status::unauthenticated("access token is invalid")
        })?;

        if !allowed.contains(&claims.role) {
            tracing::debug!(method, user = %claims.sub, role = %claims.role, "permission denied");
            return Err(Status::permission_denied("no permission to access this RPC"));
        }
        Ok(Some(claims))
    }

    /// Wrap a generated service so every call is authorized first.
    pub fn intercept<S>(&self, inner: S) -> Gated<S> {
        Gated {
            inner,
            gate: self.clone(),
        }
    }
}

/// A service behind an [`AccessGate`].
///
/// Verified [`Claims`] are placed in the request extensions for handlers.
#[derive(Clone, Debug)]
pub struct Gated<S> {
    inner: S,
    gate: AccessGate,
}

impl<S, B> Service<http::Request<B>> for Gated<S>
where
    S: Service<http::Request<B>, Response = http::Response<BoxBody>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = http::Response<BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        match self.gate.authorize(req.uri().path(), req.headers()) {
            Ok(claims) => {
                if let Some(claims) = claims {
                    req.extensions_mut().insert(claims);
                }
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(inner.call(req))
            }
            Err(status) => {
                tracing::debug!(method = req.uri().path(), code = ?status.code(), "call rejected");
                Box::pin(async move { Ok(rejection(status)) })
            }
        }
    }
}

impl<S: NamedService> NamedService for Gated<S> {
    const NAME: &'static str = S::NAME;
}

/// A trailers-only response carrying `status`.
fn rejection(status: Status) -> http::Response<BoxBody> {
    let mut response = http::Response::new(empty_body());
    let headers = response.headers_mut();
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/grpc"),
    );
    if let Err(e) = status.add_header(headers) {
        tracing::error!(error = %e, "cannot encode rejection status");
    }
    response
}
