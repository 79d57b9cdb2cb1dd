//! Client-side token attachment and background refresh.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::{CancellationToken, DropGuard};
use tonic::codegen::GrpcMethod;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};

use super::Authenticator;

/// How often the access token is renewed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Wait between successful refreshes
    pub interval: Duration,
    /// Wait before retrying a failed refresh
    pub retry_backoff: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Attaches the current access token to calls that need one.
///
/// Construction logs in once; a background task then keeps the token fresh
/// until [`AuthInterceptor::shutdown`] is called or the last clone is
/// dropped. Refresh failures are retried and never surface to callers, who
/// keep using the previous token.
#[derive(Clone)]
pub struct AuthInterceptor {
    token: Arc<RwLock<String>>,
    methods: Arc<HashSet<String>>,
    cancel: CancellationToken,
    _stop_on_drop: Arc<DropGuard>,
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

impl AuthInterceptor {
    /// Log in with `auth` and start refreshing per `policy`.
    ///
    /// `methods` are full paths like `/pcbook.LaptopService/CreateLaptop`.
    pub async fn new<A, M>(auth: A, methods: M, policy: RefreshPolicy) -> Result<Self, Status>
    where
        A: Authenticator,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        let token = Arc::new(RwLock::new(auth.login().await?));
        let cancel = CancellationToken::new();
        tokio::spawn(refresh_loop(
            auth,
            Arc::clone(&token),
            cancel.clone(),
            policy,
        ));
        tracing::debug!(?policy, "access token acquired");

        Ok(Self {
            token,
            methods: Arc::new(methods.into_iter().map(Into::into).collect()),
            _stop_on_drop: Arc::new(cancel.clone().drop_guard()),
            cancel,
        })
    }

    /// Stop the background refresh. Calls keep using the last token.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// The token currently attached to calls.
    pub fn token(&self) -> String {
        self.token.read().clone()
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let Some(method) = request.extensions().get::<GrpcMethod>() else {
            return Ok(request);
        };
        let path = format!("/{}/{}", method.service(), method.method());
        if !self.methods.contains(&path) {
            return Ok(request);
        }

        let value: MetadataValue<Ascii> = self
            .token
            .read()
            .parse()
            .map_err(|_| Status::unauthenticated("access token is not valid metadata"))?;
        request.metadata_mut().insert("authorization", value);
        Ok(request)
    }
}

async fn refresh_loop<A: Authenticator>(
    auth: A,
    token: Arc<RwLock<String>>,
    cancel: CancellationToken,
    policy: RefreshPolicy,
) {
    let mut wait = policy.interval;
    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = async {
                tokio::time::sleep(wait).await;
                auth.login().await
            } => result,
        };
        match result {
            Ok(fresh) => {
                *token.write() = fresh;
                tracing::debug!("access token refreshed");
                wait = policy.interval;
            }
            Err(status) => {
                tracing::warn!(code = ?status.code(), message = status.message(), "cannot refresh access token");
                wait = policy.retry_backoff;
            }
        }
    }
    tracing::debug!("token refresh stopped");
}
