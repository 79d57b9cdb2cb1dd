//! Wire messages for the `pcbook` gRPC package and the generated stubs.
//!
//! Messages are plain prost structs (standard protobuf wire format, no
//! `.proto` file); `build.rs` generates the service traits, servers and
//! clients from a manual description of the two services.

#![allow(missing_docs)]
#![allow(clippy::doc_markdown)]

pub use pcbook::model::{Filter, Laptop};

/// Full method paths, as seen in the `:path` pseudo-header.
pub mod methods {
    /// `AuthService/Login`
    pub const LOGIN: &str = "/pcbook.AuthService/Login";
    /// `LaptopService/CreateLaptop`
    pub const CREATE_LAPTOP: &str = "/pcbook.LaptopService/CreateLaptop";
    /// `LaptopService/SearchLaptop`
    pub const SEARCH_LAPTOP: &str = "/pcbook.LaptopService/SearchLaptop";
    /// `LaptopService/UploadImage`
    pub const UPLOAD_IMAGE: &str = "/pcbook.LaptopService/UploadImage";
    /// `LaptopService/RateLaptop`
    pub const RATE_LAPTOP: &str = "/pcbook.LaptopService/RateLaptop";
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LoginRequest {
    #[prost(string, tag = "1")]
    pub username: String,
    #[prost(string, tag = "2")]
    pub password: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LoginResponse {
    #[prost(string, tag = "1")]
    pub access_token: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateLaptopRequest {
    #[prost(message, optional, tag = "1")]
    pub laptop: Option<Laptop>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateLaptopResponse {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SearchLaptopRequest {
    #[prost(message, optional, tag = "1")]
    pub filter: Option<Filter>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SearchLaptopResponse {
    #[prost(message, optional, tag = "1")]
    pub laptop: Option<Laptop>,
}

/// Metadata sent as the first message of an upload.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ImageInfo {
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    /// Extension including the dot, e.g. ".jpg"
    #[prost(string, tag = "2")]
    pub image_type: String,
}

/// One message of an upload stream: image info first, then chunks.
#[derive(Clone, PartialEq, prost::Message)]
pub struct UploadImageRequest {
    #[prost(oneof = "upload_image_request::Data", tags = "1, 2")]
    pub data: Option<upload_image_request::Data>,
}

pub mod upload_image_request {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "1")]
        Info(super::ImageInfo),
        #[prost(bytes = "vec", tag = "2")]
        ChunkData(Vec<u8>),
    }
}

impl UploadImageRequest {
    /// The opening message of an upload.
    pub fn info(laptop_id: impl Into<String>, image_type: impl Into<String>) -> Self {
        Self {
            data: Some(upload_image_request::Data::Info(ImageInfo {
                laptop_id: laptop_id.into(),
                image_type: image_type.into(),
            })),
        }
    }

    /// A chunk of image bytes.
    pub fn chunk(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(upload_image_request::Data::ChunkData(data.into())),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UploadImageResponse {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(uint32, tag = "2")]
    pub size: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RateLaptopRequest {
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    #[prost(double, tag = "2")]
    pub score: f64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RateLaptopResponse {
    #[prost(string, tag = "1")]
    pub laptop_id: String,
    #[prost(uint32, tag = "2")]
    pub rated_count: u32,
    #[prost(double, tag = "3")]
    pub average_score: f64,
}

include!(concat!(env!("OUT_DIR"), "/pcbook.AuthService.rs"));
include!(concat!(env!("OUT_DIR"), "/pcbook.LaptopService.rs"));
