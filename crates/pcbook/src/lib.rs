//! pcbook: Laptop Catalog Core
//!
//! The data model of the catalog together with the concurrent stores that
//! hold it and the credential primitives that guard access to it. The gRPC
//! surface lives in `pcbook-grpc`; nothing in this crate knows about the wire.
//!
//! Every store hands out independently owned copies of what it holds, so a
//! caller mutating a returned value can never corrupt stored state.

pub mod auth;
mod interrupt;
pub mod model;
pub mod sample;
pub mod serializer;
pub mod store;

pub use auth::{AuthError, Claims, JwtManager, Role, User};
pub use interrupt::{CallScope, Interrupt, Interruption};
pub use model::{Filter, Laptop, Memory, MemoryUnit};
pub use store::{
    DiskImageStore, ImageRecord, ImageStore, InMemoryLaptopStore, InMemoryRatingStore,
    InMemoryUserStore, LaptopStore, Rating, RatingStore, StoreError, UserStore,
};
