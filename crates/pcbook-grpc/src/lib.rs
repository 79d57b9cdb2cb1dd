//! pcbook gRPC Service
//!
//! Serves the laptop catalog over gRPC and provides the matching client.
//!
//! # Architecture
//!
//! Every call passes through an [`AccessGate`] before reaching a handler. The
//! gate looks the method up in a static role map; listed methods need a
//! bearer token in the `authorization` metadata whose role is permitted.
//! Tokens come from `AuthService/Login` and are refreshed in the background
//! by the client-side [`AuthInterceptor`].
//!
//! # Example Flow
//!
//! ```text
//! Client                                    Server
//! │                                           │
//! │  Login{username, password}                │
//! │ ─────────────────────────────────────────>│  AuthServer
//! │       LoginResponse{access_token}         │
//! │<───────────────────────────────────────── │
//! │                                           │
//! │  RateLaptop (authorization: token)        │
//! │ ─────────────────────────────────────────>│  AccessGate ─> LaptopServer
//! │  RateLaptopRequest{id, score}             │
//! │ ─────────────────────────────────────────>│
//! │       RateLaptopResponse{id, count, avg}  │
//! │<───────────────────────────────────────── │
//! │  (half-close)                             │
//! │ ─────────────────────────────────────────>│
//! │       OK                                  │
//! │<───────────────────────────────────────── │
//! ```

pub mod client;
pub mod proto;
pub mod server;

pub use client::{AuthClient, AuthInterceptor, Authenticator, LaptopClient, RefreshPolicy};
pub use server::{AccessGate, AccessRules, AuthServer, LaptopServer, PcbookServer, ServerConfig};

// Re-export generated types for convenience
pub use proto::{
    auth_service_client::AuthServiceClient, auth_service_server::AuthServiceServer,
    laptop_service_client::LaptopServiceClient, laptop_service_server::LaptopServiceServer,
};
