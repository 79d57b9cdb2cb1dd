//! Concurrent stores for laptops, accounts, images and ratings.
//!
//! Each store owns its backing collection behind a single reader/writer
//! lock: writes take it exclusively, reads share it. Nothing inside a store
//! is ever handed out by reference; every read returns an owned copy.

mod image;
mod laptop;
mod rating;
mod user;

use thiserror::Error;

pub use image::{DiskImageStore, ImageRecord, ImageStore};
pub use laptop::{InMemoryLaptopStore, LaptopStore};
pub use rating::{InMemoryRatingStore, Rating, RatingStore};
pub use user::{InMemoryUserStore, UserStore};

use crate::interrupt::Interruption;

/// Errors returned by the stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this key is already present
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    /// A client-supplied identifier is not a UUID
    #[error("invalid id {id:?}: {reason}")]
    InvalidId {
        /// The rejected identifier
        id: String,
        /// Why it was rejected
        reason: String,
    },
    /// An image extension that cannot safely be used in a file name
    #[error("invalid image type: {0:?}")]
    InvalidImageType(String),
    /// A counter has reached its largest value
    #[error("too many ratings for {0}")]
    RatingLimit(String),
    /// The caller cancelled the operation
    #[error("operation was cancelled")]
    Cancelled,
    /// The caller's deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,
    /// Backing storage failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Interruption> for StoreError {
    fn from(interruption: Interruption) -> Self {
        match interruption {
            Interruption::Cancelled => StoreError::Cancelled,
            Interruption::DeadlineExceeded => StoreError::DeadlineExceeded,
        }
    }
}
