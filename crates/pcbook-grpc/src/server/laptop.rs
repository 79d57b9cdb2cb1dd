use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use pcbook::{CallScope, Claims, ImageStore, Interrupt, Laptop, LaptopStore, RatingStore, StoreError};

use super::{DEFAULT_MAX_IMAGE_SIZE, request_deadline, status_from_store};
use crate::proto::{
    CreateLaptopRequest, CreateLaptopResponse, RateLaptopRequest, RateLaptopResponse,
    SearchLaptopRequest, SearchLaptopResponse, UploadImageRequest, UploadImageResponse,
    laptop_service_server::LaptopService, upload_image_request::Data,
};

/// Responses buffered per streaming call before the producer waits.
const STREAM_BUFFER: usize = 16;

type ResponseStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// Handlers for `pcbook.LaptopService`.
#[derive(Clone)]
pub struct LaptopServer {
    laptops: Arc<dyn LaptopStore>,
    images: Arc<dyn ImageStore>,
    ratings: Arc<dyn RatingStore>,
    max_image_size: usize,
}

impl std::fmt::Debug for LaptopServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaptopServer")
            .field("max_image_size", &self.max_image_size)
            .finish_non_exhaustive()
    }
}

impl LaptopServer {
    /// Create the handlers over the given stores.
    pub fn new(
        laptops: Arc<dyn LaptopStore>,
        images: Arc<dyn ImageStore>,
        ratings: Arc<dyn RatingStore>,
    ) -> Self {
        Self {
            laptops,
            images,
            ratings,
            max_image_size: DEFAULT_MAX_IMAGE_SIZE,
        }
    }

    /// Cap the total size of one uploaded image.
    pub fn with_max_image_size(mut self, max_image_size: usize) -> Self {
        self.max_image_size = max_image_size;
        self
    }

    fn ensure_laptop_exists(&self, laptop_id: &str) -> Result<(), Status> {
        match self.laptops.find(laptop_id).map_err(status_from_store)? {
            Some(_) => Ok(()),
            None => Err(Status::not_found(format!(
                "laptop {laptop_id} doesn't exist"
            ))),
        }
    }
}

fn interrupted(scope: &CallScope) -> Result<(), Status> {
    match scope.check() {
        Some(interruption) => Err(status_from_store(interruption.into())),
        None => Ok(()),
    }
}

#[tonic::async_trait]
impl LaptopService for LaptopServer {
    async fn create_laptop(
        &self,
        request: Request<CreateLaptopRequest>,
    ) -> Result<Response<CreateLaptopResponse>, Status> {
        let scope = CallScope::new(request_deadline(request.metadata()));
        let user = request.extensions().get::<Claims>().map(|claims| claims.sub.clone());
        let laptop = request
            .into_inner()
            .laptop
            .ok_or_else(|| Status::invalid_argument("laptop is required"))?;
        tracing::info!(id = %laptop.id, user = ?user, "create laptop");

        interrupted(&scope)?;
        let id = self.laptops.save(&laptop).map_err(status_from_store)?;
        tracing::info!(%id, "saved laptop");

        Ok(Response::new(CreateLaptopResponse { id }))
    }

    type SearchLaptopStream = ResponseStream<SearchLaptopResponse>;

    async fn search_laptop(
        &self,
        request: Request<SearchLaptopRequest>,
    ) -> Result<Response<Self::SearchLaptopStream>, Status> {
        let scope = CallScope::new(request_deadline(request.metadata()));
        let filter = request.into_inner().filter.unwrap_or_default();
        tracing::info!(?filter, "search laptop");

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        // Cancel the scan once the client stops listening.
        let watcher = tx.clone();
        let token = scope.token();
        tokio::spawn(async move {
            tokio::select! {
                _ = watcher.closed() => token.cancel(),
                _ = token.cancelled() => {}
            }
        });

        let laptops = Arc::clone(&self.laptops);
        tokio::task::spawn_blocking(move || {
            let _done = scope.token().drop_guard();
            let result = laptops.search(&scope, &filter, &mut |laptop: Laptop| {
                tracing::debug!(id = %laptop.id, "found laptop");
                tx.blocking_send(Ok(SearchLaptopResponse {
                    laptop: Some(laptop),
                }))
                .map_err(|_| StoreError::Cancelled)
            });
            match result {
                Ok(()) => tracing::debug!("search finished"),
                Err(StoreError::Cancelled) if tx.is_closed() => {
                    tracing::debug!("client went away, search stopped");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "search failed");
                    let _ = tx.blocking_send(Err(status_from_store(e)));
                }
            }
        });

        let stream: Self::SearchLaptopStream = Box::pin(ReceiverStream::new(rx));
        Ok(Response::new(stream))
    }

    async fn upload_image(
        &self,
        request: Request<Streaming<UploadImageRequest>>,
    ) -> Result<Response<UploadImageResponse>, Status> {
        let scope = CallScope::new(request_deadline(request.metadata()));
        let mut stream = request.into_inner();

        let info = match stream.message().await {
            Ok(Some(UploadImageRequest {
                data: Some(Data::Info(info)),
            })) => info,
            Ok(_) => return Err(Status::invalid_argument("first message must be image info")),
            Err(e) => {
                return Err(Status::internal(format!(
                    "cannot receive image info: {}",
                    e.message()
                )));
            }
        };
        tracing::info!(laptop_id = %info.laptop_id, image_type = %info.image_type, "upload image");
        self.ensure_laptop_exists(&info.laptop_id)?;

        let mut image = Vec::new();
        loop {
            interrupted(&scope)?;
            let message = stream.message().await.map_err(|e| {
                Status::internal(format!("cannot receive chunk data: {}", e.message()))
            })?;
            let Some(message) = message else {
                tracing::debug!("no more data");
                break;
            };
            match message.data {
                Some(Data::ChunkData(chunk)) => {
                    let size = image.len() + chunk.len();
                    tracing::debug!(chunk = chunk.len(), total = size, "received chunk");
                    if size > self.max_image_size {
                        return Err(Status::invalid_argument(format!(
                            "image is too large: {size} > {}",
                            self.max_image_size
                        )));
                    }
                    image.extend_from_slice(&chunk);
                }
                Some(Data::Info(_)) => {
                    return Err(Status::invalid_argument("image info sent more than once"));
                }
                None => return Err(Status::invalid_argument("upload message has no data")),
            }
        }

        let size = u32::try_from(image.len())
            .map_err(|_| Status::invalid_argument("image is too large"))?;
        let images = Arc::clone(&self.images);
        let id = tokio::task::spawn_blocking(move || {
            images.save(&info.laptop_id, &info.image_type, &image)
        })
        .await
        .map_err(|e| Status::internal(format!("image save task failed: {e}")))?
        .map_err(|e| match e {
            StoreError::InvalidImageType(_) => status_from_store(e),
            other => {
                tracing::error!(error = %other, "cannot save image");
                Status::internal("cannot save image to the store")
            }
        })?;
        tracing::info!(%id, size, "saved image");

        Ok(Response::new(UploadImageResponse { id, size }))
    }

    type RateLaptopStream = ResponseStream<RateLaptopResponse>;

    async fn rate_laptop(
        &self,
        request: Request<Streaming<RateLaptopRequest>>,
    ) -> Result<Response<Self::RateLaptopStream>, Status> {
        Ok(Response::new(self.rate_stream(request.into_inner())))
    }
}

impl LaptopServer {
    /// Answer each inbound rating in order. The first failure ends the call.
    fn rate_stream<S>(&self, mut inbound: S) -> ResponseStream<RateLaptopResponse>
    where
        S: Stream<Item = Result<RateLaptopRequest, Status>> + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let server = self.clone();

        tokio::spawn(async move {
            loop {
                let request = match inbound.next().await {
                    Some(Ok(request)) => request,
                    None => {
                        tracing::debug!("no more ratings");
                        break;
                    }
                    Some(Err(e)) => {
                        let status =
                            Status::internal(format!("cannot receive request: {}", e.message()));
                        let _ = tx.send(Err(status)).await;
                        break;
                    }
                };

                let response = server.rate(request);
                let failed = response.is_err();
                if tx.send(response).await.is_err() {
                    tracing::debug!("client stopped reading ratings");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }

    fn rate(&self, request: RateLaptopRequest) -> Result<RateLaptopResponse, Status> {
        let RateLaptopRequest { laptop_id, score } = request;
        tracing::debug!(%laptop_id, score, "rate laptop");
        self.ensure_laptop_exists(&laptop_id)?;

        let rating = self
            .ratings
            .add(&laptop_id, score)
            .map_err(status_from_store)?;
        Ok(RateLaptopResponse {
            laptop_id,
            rated_count: rating.count,
            average_score: rating.average().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::time::Duration;

    use pcbook::{
        DiskImageStore, Filter, InMemoryLaptopStore, InMemoryRatingStore, Memory, MemoryUnit,
        sample,
    };
    use tonic::Code;

    use super::*;

    fn server(dir: &tempfile::TempDir) -> LaptopServer {
        LaptopServer::new(
            Arc::new(InMemoryLaptopStore::new()),
            Arc::new(DiskImageStore::new(dir.path()).unwrap()),
            Arc::new(InMemoryRatingStore::new()),
        )
    }

    fn search_everything() -> Request<SearchLaptopRequest> {
        Request::new(SearchLaptopRequest {
            filter: Some(Filter {
                max_price_usd: f64::MAX,
                min_cpu_cores: 0,
                min_cpu_ghz: 0.0,
                min_ram: Some(Memory::new(0, MemoryUnit::Byte)),
            }),
        })
    }

    fn create_request(laptop: Laptop) -> Request<CreateLaptopRequest> {
        Request::new(CreateLaptopRequest {
            laptop: Some(laptop),
        })
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let mut laptop = sample::new_laptop();
        laptop.id.clear();

        let id = server.create_laptop(create_request(laptop)).await.unwrap().into_inner().id;
        assert!(!id.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_and_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);

        let mut bad = sample::new_laptop();
        bad.id = "not-a-uuid".to_string();
        let err = server.create_laptop(create_request(bad)).await.unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);

        let laptop = sample::new_laptop();
        server.create_laptop(create_request(laptop.clone())).await.unwrap();
        let err = server.create_laptop(create_request(laptop)).await.unwrap_err();
        assert_eq!(err.code(), Code::AlreadyExists);
    }

    #[tokio::test]
    async fn test_create_without_laptop_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = server(&dir)
            .create_laptop(Request::new(CreateLaptopRequest { laptop: None }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_expired_deadline_is_reported_before_saving() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let laptop = sample::new_laptop();
        let id = laptop.id.clone();

        let mut request = create_request(laptop);
        request
            .metadata_mut()
            .insert("grpc-timeout", "0n".parse().unwrap());
        let err = server.create_laptop(request).await.unwrap_err();

        assert_eq!(err.code(), Code::DeadlineExceeded);
        assert!(server.laptops.find(&id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_streams_every_match() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        for _ in 0..5 {
            server.create_laptop(create_request(sample::new_laptop())).await.unwrap();
        }

        let stream = server
            .search_laptop(search_everything())
            .await
            .unwrap()
            .into_inner();
        let found: Vec<_> = stream.collect::<Result<_, _>>().await.unwrap();
        assert_eq!(found.len(), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dropped_search_releases_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        for _ in 0..3 * STREAM_BUFFER {
            server.laptops.save(&sample::new_laptop()).unwrap();
        }

        let mut stream = server
            .search_laptop(search_everything())
            .await
            .unwrap()
            .into_inner();
        assert!(stream.next().await.unwrap().is_ok());
        drop(stream);

        // A writer only gets through once the scan has let go of the read lock.
        let laptops = Arc::clone(&server.laptops);
        let laptop = sample::new_laptop();
        let id = tokio::time::timeout(
            Duration::from_secs(5),
            tokio::task::spawn_blocking(move || laptops.save(&laptop)),
        )
        .await
        .unwrap()
        .unwrap()
        .unwrap();
        assert!(server.laptops.find(&id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_search_past_deadline_streams_deadline_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        server.laptops.save(&sample::new_laptop()).unwrap();

        let mut request = search_everything();
        request
            .metadata_mut()
            .insert("grpc-timeout", "0n".parse().unwrap());
        let items: Vec<_> = server
            .search_laptop(request)
            .await
            .unwrap()
            .into_inner()
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        let err = items.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.code(), Code::DeadlineExceeded);
        assert_eq!(err.message(), "deadline is exceeded");
    }

    #[tokio::test]
    async fn test_rate_unknown_laptop_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = server(&dir)
            .rate(RateLaptopRequest {
                laptop_id: "missing".to_string(),
                score: 5.0,
            })
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_rate_stream_answers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let id = server.laptops.save(&sample::new_laptop()).unwrap();

        let inbound = tokio_stream::iter([4.0, 8.0].map(|score| {
            Ok::<_, Status>(RateLaptopRequest {
                laptop_id: id.clone(),
                score,
            })
        }));
        let responses: Vec<_> = server
            .rate_stream(inbound)
            .collect::<Result<_, _>>()
            .await
            .unwrap();

        let summary: Vec<_> = responses
            .iter()
            .map(|r| (r.rated_count, r.average_score))
            .collect();
        assert_eq!(summary, vec![(1, 4.0), (2, 6.0)]);
    }

    #[tokio::test]
    async fn test_rate_stream_read_failure_is_internal() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(&dir);
        let id = server.laptops.save(&sample::new_laptop()).unwrap();

        let inbound = tokio_stream::iter(vec![
            Ok(RateLaptopRequest {
                laptop_id: id.clone(),
                score: 7.0,
            }),
            Err(Status::unavailable("connection reset")),
            Ok(RateLaptopRequest {
                laptop_id: id,
                score: 1.0,
            }),
        ]);
        let items: Vec<_> = server.rate_stream(inbound).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap().rated_count, 1);
        let err = items[1].as_ref().unwrap_err();
        assert_eq!(err.code(), Code::Internal);
        assert_eq!(err.message(), "cannot receive request: connection reset");
    }
}
