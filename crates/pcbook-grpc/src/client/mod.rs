//! Clients for the laptop catalog, with transparent token handling.

mod auth;
mod interceptor;
mod laptop;

use std::time::Duration;

use crate::proto::methods;

pub use auth::{AuthClient, Authenticator};
pub use interceptor::{AuthInterceptor, RefreshPolicy};
pub use laptop::{ClientError, IMAGE_CHUNK_SIZE, LaptopClient};

/// Per-call timeout applied by the typed clients.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Methods the client attaches its access token to.
pub fn auth_methods() -> [&'static str; 3] {
    [
        methods::CREATE_LAPTOP,
        methods::UPLOAD_IMAGE,
        methods::RATE_LAPTOP,
    ]
}
