use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::{Request, Status};

use super::CALL_TIMEOUT;
use crate::proto::{LoginRequest, auth_service_client::AuthServiceClient};

/// Something that can obtain a fresh access token.
#[async_trait]
pub trait Authenticator: Send + Sync + 'static {
    /// Log in and return a new access token.
    async fn login(&self) -> Result<String, Status>;
}

/// Logs in over `AuthService/Login` with fixed credentials.
#[derive(Clone)]
pub struct AuthClient {
    client: AuthServiceClient<Channel>,
    username: String,
    password: String,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    /// Create a login client on `channel`.
    pub fn new(channel: Channel, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            client: AuthServiceClient::new(channel),
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl Authenticator for AuthClient {
    async fn login(&self) -> Result<String, Status> {
        let mut request = Request::new(LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        });
        request.set_timeout(CALL_TIMEOUT);

        let mut client = self.client.clone();
        let response = client.login(request).await?;
        Ok(response.into_inner().access_token)
    }
}
