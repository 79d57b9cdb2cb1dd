//! Generates the tonic service and client stubs for the hand-written prost
//! messages in `src/proto.rs`. No `.proto` file or `protoc` is involved.

use tonic_build::manual::{Builder, Method, Service};

fn method(name: &str, route: &str, input: &str, output: &str) -> tonic_build::manual::MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::proto::{input}"))
        .output_type(format!("crate::proto::{output}"))
        .codec_path("tonic::codec::ProstCodec")
}

fn main() {
    let auth = Service::builder()
        .name("AuthService")
        .package("pcbook")
        .method(method("login", "Login", "LoginRequest", "LoginResponse").build())
        .build();

    let laptop = Service::builder()
        .name("LaptopService")
        .package("pcbook")
        .method(
            method(
                "create_laptop",
                "CreateLaptop",
                "CreateLaptopRequest",
                "CreateLaptopResponse",
            )
            .build(),
        )
        .method(
            method(
                "search_laptop",
                "SearchLaptop",
                "SearchLaptopRequest",
                "SearchLaptopResponse",
            )
            .server_streaming()
            .build(),
        )
        .method(
            method(
                "upload_image",
                "UploadImage",
                "UploadImageRequest",
                "UploadImageResponse",
            )
            .client_streaming()
            .build(),
        )
        .method(
            method(
                "rate_laptop",
                "RateLaptop",
                "RateLaptopRequest",
                "RateLaptopResponse",
            )
            .client_streaming()
            .server_streaming()
            .build(),
        )
        .build();

    Builder::new().compile(&[auth, laptop]);
}
