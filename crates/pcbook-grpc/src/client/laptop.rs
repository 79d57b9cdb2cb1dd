use std::path::Path;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tonic::codegen::InterceptedService;
use tonic::transport::Channel;
use tonic::{Request, Status};

use pcbook::{Filter, Laptop};

use super::{AuthInterceptor, CALL_TIMEOUT};
use crate::proto::{
    CreateLaptopRequest, RateLaptopRequest, RateLaptopResponse, SearchLaptopRequest,
    UploadImageRequest, UploadImageResponse, laptop_service_client::LaptopServiceClient,
};

/// Bytes per upload message.
pub const IMAGE_CHUNK_SIZE: usize = 1024;

const RATE_BUFFER: usize = 16;

/// Errors from client operations that touch the local filesystem.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Reading a local file failed
    #[error("cannot read {path}: {source}")]
    Io {
        /// The file being read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
    /// The remote call failed
    #[error("remote call failed: {0}")]
    Rpc(#[from] Status),
}

/// Typed client for `pcbook.LaptopService`.
#[derive(Clone, Debug)]
pub struct LaptopClient {
    client: LaptopServiceClient<InterceptedService<Channel, AuthInterceptor>>,
}

impl LaptopClient {
    /// Create a client whose calls pass through `interceptor`.
    pub fn new(channel: Channel, interceptor: AuthInterceptor) -> Self {
        Self {
            client: LaptopServiceClient::with_interceptor(channel, interceptor),
        }
    }

    /// Store `laptop`, returning its id.
    pub async fn create_laptop(&self, laptop: Laptop) -> Result<String, Status> {
        let mut request = Request::new(CreateLaptopRequest {
            laptop: Some(laptop),
        });
        request.set_timeout(CALL_TIMEOUT);

        let id = self.client.clone().create_laptop(request).await?.into_inner().id;
        tracing::info!(%id, "created laptop");
        Ok(id)
    }

    /// Every laptop matching `filter`, in stream order.
    pub async fn search_laptop(&self, filter: Filter) -> Result<Vec<Laptop>, Status> {
        let mut request = Request::new(SearchLaptopRequest {
            filter: Some(filter),
        });
        request.set_timeout(CALL_TIMEOUT);

        let mut stream = self.client.clone().search_laptop(request).await?.into_inner();
        let mut found = Vec::new();
        while let Some(response) = stream.message().await? {
            if let Some(laptop) = response.laptop {
                tracing::debug!(id = %laptop.id, "found laptop");
                found.push(laptop);
            }
        }
        Ok(found)
    }

    /// Upload `data` as an image of `laptop_id` in [`IMAGE_CHUNK_SIZE`] chunks.
    pub async fn upload_image(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: &[u8],
    ) -> Result<UploadImageResponse, Status> {
        let messages: Vec<_> = std::iter::once(UploadImageRequest::info(laptop_id, image_type))
            .chain(data.chunks(IMAGE_CHUNK_SIZE).map(UploadImageRequest::chunk))
            .collect();
        let mut request = Request::new(tokio_stream::iter(messages));
        request.set_timeout(CALL_TIMEOUT);

        let response = self.client.clone().upload_image(request).await?.into_inner();
        tracing::info!(id = %response.id, size = response.size, "uploaded image");
        Ok(response)
    }

    /// Upload the file at `path`; its extension becomes the image type.
    pub async fn upload_image_file(
        &self,
        laptop_id: &str,
        path: impl AsRef<Path>,
    ) -> Result<UploadImageResponse, ClientError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let image_type = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        Ok(self.upload_image(laptop_id, &image_type, &data).await?)
    }

    /// Rate each `(laptop_id, score)` pair in order, collecting one response
    /// per rating.
    pub async fn rate_laptop(
        &self,
        ratings: impl IntoIterator<Item = (String, f64)>,
    ) -> Result<Vec<RateLaptopResponse>, Status> {
        let (tx, rx) = mpsc::channel(RATE_BUFFER);
        let mut request = Request::new(ReceiverStream::new(rx));
        request.set_timeout(CALL_TIMEOUT);

        let mut responses = self.client.clone().rate_laptop(request).await?.into_inner();

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut received = Vec::new();
            let result = loop {
                match responses.message().await {
                    Ok(Some(response)) => {
                        tracing::debug!(
                            laptop_id = %response.laptop_id,
                            count = response.rated_count,
                            average = response.average_score,
                            "received rating"
                        );
                        received.push(response);
                    }
                    Ok(None) => break Ok(received),
                    Err(status) => break Err(status),
                }
            };
            let _ = done_tx.send(result);
        });

        for (laptop_id, score) in ratings {
            if tx.send(RateLaptopRequest { laptop_id, score }).await.is_err() {
                // The call is over; the receiver has the reason.
                break;
            }
        }
        drop(tx);

        done_rx
            .await
            .map_err(|_| Status::internal("rating receiver stopped unexpectedly"))?
    }
}
