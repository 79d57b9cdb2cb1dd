use std::sync::Arc;

use tonic::{Request, Response, Status};

use pcbook::{AuthError, JwtManager, Role, User, UserStore};

use super::status_from_store;
use crate::proto::{LoginRequest, LoginResponse, auth_service_server::AuthService};

/// Accounts created at startup: `admin1` (admin) and `user1` (user).
pub fn seed_users(store: &dyn UserStore) -> anyhow::Result<()> {
    for (username, role) in [("admin1", Role::Admin), ("user1", Role::User)] {
        store.save(&User::new(username, "secret", role)?)?;
        tracing::debug!(username, %role, "seeded user");
    }
    Ok(())
}

/// Exchanges a username and password for an access token.
#[derive(Clone)]
pub struct AuthServer {
    users: Arc<dyn UserStore>,
    jwt: JwtManager,
    /// Verified against when the username is unknown, so that both
    /// failure paths cost one hash verification.
    decoy: Arc<User>,
}

impl std::fmt::Debug for AuthServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthServer").field("jwt", &self.jwt).finish_non_exhaustive()
    }
}

impl AuthServer {
    /// Create the login handler over `users`.
    pub fn new(users: Arc<dyn UserStore>, jwt: JwtManager) -> Result<Self, AuthError> {
        let decoy = User::new("", "decoy-password", Role::User)?;
        Ok(Self {
            users,
            jwt,
            decoy: Arc::new(decoy),
        })
    }
}

#[tonic::async_trait]
impl AuthService for AuthServer {
    async fn login(&self, request: Request<LoginRequest>) -> Result<Response<LoginResponse>, Status> {
        let LoginRequest { username, password } = request.into_inner();

        let found = self.users.find(&username).map_err(status_from_store)?;
        let known = found.is_some();
        let candidate = found.unwrap_or_else(|| User::clone(&self.decoy));

        let (user, correct) = tokio::task::spawn_blocking(move || {
            let correct = candidate.is_correct_password(&password);
            (candidate, correct)
        })
        .await
        .map_err(|e| Status::internal(format!("password check failed: {e}")))?;

        if !(known && correct) {
            tracing::info!(%username, "login failed");
            return Err(Status::not_found("incorrect username/password"));
        }

        let access_token = self.jwt.generate(&user).map_err(|e| {
            tracing::error!(error = %e, "cannot generate access token");
            Status::internal("cannot generate access token")
        })?;
        tracing::info!(%username, role = %user.role, "login succeeded");

        Ok(Response::new(LoginResponse { access_token }))
    }
}
