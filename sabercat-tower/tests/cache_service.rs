//! End-to-end behavior of the cache layer around a counting backend.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http::header::{CACHE_CONTROL, CONTENT_LENGTH, EXPIRES, PRAGMA};
use http::{Request, Response, StatusCode};
use http_body::Frame;
use http_body_util::{BodyExt, Full, StreamBody};
use sabercat::DEFAULT_MAX_CACHEABLE_SIZE;
use sabercat_tower::{Cache, CacheBody};
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt, service_fn};

const DATA_LENGTH: usize = 8 * (1 << 10);
const TTL: Duration = Duration::from_secs(60);

/// Backend that declares `announced` bytes, writes `actual` bytes and
/// answers with `status`, counting every invocation.
fn dummy_handler(
    announced: usize,
    actual: usize,
    status: StatusCode,
    counter: Arc<AtomicUsize>,
) -> BoxCloneService<Request<()>, Response<Full<Bytes>>, Infallible> {
    BoxCloneService::new(service_fn(move |_req: Request<()>| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            let response = Response::builder()
                .status(status)
                .header(CONTENT_LENGTH, announced)
                .body(Full::new(Bytes::from(vec![0u8; actual])))
                .unwrap();
            Ok::<_, Infallible>(response)
        }
    }))
}

fn get(path: &str) -> Request<()> {
    Request::get(path).body(()).unwrap()
}

async fn body_bytes<B>(response: Response<CacheBody<B>>) -> Bytes
where
    B: http_body::Body,
    B::Error: std::fmt::Debug,
{
    response.into_body().collect().await.unwrap().to_bytes()
}

fn cache(ttl: Duration) -> Cache {
    Cache::builder().ttl(ttl).build().unwrap()
}

#[tokio::test]
async fn test_caching() {
    let counter = Arc::new(AtomicUsize::new(0));
    let service = cache(TTL).layer(dummy_handler(
        DATA_LENGTH,
        DATA_LENGTH,
        StatusCode::OK,
        counter.clone(),
    ));

    let first = service.clone().oneshot(get("/blob")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[CONTENT_LENGTH], DATA_LENGTH.to_string());
    let first_status = first.status();
    let mut first_headers = first.headers().clone();
    first_headers.remove(EXPIRES);
    let first_body = body_bytes(first).await;
    assert_eq!(first_body.len(), DATA_LENGTH);

    let second = service.clone().oneshot(get("/blob")).await.unwrap();
    assert_eq!(second.status(), first_status);
    let mut second_headers = second.headers().clone();
    second_headers.remove(EXPIRES);
    assert_eq!(second_headers, first_headers);
    let second_body = body_bytes(second).await;
    assert_eq!(second_body, first_body);

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_write_abort() {
    let counter = Arc::new(AtomicUsize::new(0));
    let service = cache(TTL).layer(dummy_handler(
        DATA_LENGTH,
        DATA_LENGTH / 2,
        StatusCode::OK,
        counter.clone(),
    ));

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/blob")).await.unwrap();
        assert_eq!(response.headers()[CONTENT_LENGTH], DATA_LENGTH.to_string());
        assert_eq!(body_bytes(response).await.len(), DATA_LENGTH / 2);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cache_only_200() {
    let counter = Arc::new(AtomicUsize::new(0));
    let service = cache(TTL).layer(dummy_handler(
        DATA_LENGTH,
        DATA_LENGTH,
        StatusCode::CREATED,
        counter.clone(),
    ));

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/blob")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_bytes(response).await.len(), DATA_LENGTH);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_above_cache_limit() {
    let counter = Arc::new(AtomicUsize::new(0));
    let size = DEFAULT_MAX_CACHEABLE_SIZE as usize + 1;
    let service = cache(TTL).layer(dummy_handler(size, size, StatusCode::OK, counter.clone()));

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/big")).await.unwrap();
        assert_eq!(body_bytes(response).await.len(), size);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_error_status_is_passed_through() {
    let counter = Arc::new(AtomicUsize::new(0));
    let service = cache(TTL).layer(dummy_handler(
        9,
        9,
        StatusCode::NOT_FOUND,
        counter.clone(),
    ));

    for _ in 0..3 {
        let response = service.clone().oneshot(get("/missing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_zero_ttl_passes_through() {
    let counter = Arc::new(AtomicUsize::new(0));
    let service = cache(Duration::ZERO).layer(dummy_handler(
        DATA_LENGTH,
        DATA_LENGTH,
        StatusCode::OK,
        counter.clone(),
    ));

    for i in 1..=5 {
        let response = service.clone().oneshot(get("/blob")).await.unwrap();
        assert!(!response.headers().contains_key(EXPIRES));
        assert!(!response.headers().contains_key(CACHE_CONTROL));
        assert!(!response.headers().contains_key(PRAGMA));
        assert!(matches!(response.body(), CacheBody::Passthrough(_)));
        assert_eq!(body_bytes(response).await.len(), DATA_LENGTH);
        assert_eq!(counter.load(Ordering::SeqCst), i);
    }
}

#[tokio::test(start_paused = true)]
async fn test_entry_evicted_after_ttl() {
    let counter = Arc::new(AtomicUsize::new(0));
    let layer = cache(TTL);
    let service = layer.layer(dummy_handler(
        DATA_LENGTH,
        DATA_LENGTH,
        StatusCode::OK,
        counter.clone(),
    ));

    service.clone().oneshot(get("/blob")).await.unwrap();
    tokio::time::sleep(TTL - Duration::from_secs(1)).await;
    service.clone().oneshot(get("/blob")).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(layer.store().unwrap().is_empty());

    service.clone().oneshot(get("/blob")).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);

    service.clone().oneshot(get("/blob")).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unbounded_ttl_caches_without_overflow() {
    let counter = Arc::new(AtomicUsize::new(0));
    let service = cache(Duration::MAX).layer(dummy_handler(2, 2, StatusCode::OK, counter.clone()));

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/forever")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await.len(), 2);
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_client_cache_headers_on_hit_and_miss() {
    let counter = Arc::new(AtomicUsize::new(0));
    let service = cache(TTL).layer(dummy_handler(4, 4, StatusCode::OK, counter.clone()));

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/small")).await.unwrap();
        let headers = response.headers();
        assert_eq!(headers[CACHE_CONTROL], "private,max-age=2592000");
        assert_eq!(headers[PRAGMA], "no-cache");
        let expires = headers[EXPIRES].to_str().unwrap();
        let expires = chrono::DateTime::parse_from_rfc2822(expires).unwrap();
        assert!(expires > chrono::Utc::now() + chrono::TimeDelta::days(29));
    }

    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_key_ignores_query_and_method() {
    let counter = Arc::new(AtomicUsize::new(0));
    let service = cache(TTL).layer(dummy_handler(4, 4, StatusCode::OK, counter.clone()));

    service.clone().oneshot(get("/doc?v=1")).await.unwrap();
    service.clone().oneshot(get("/doc?v=2")).await.unwrap();
    let head = Request::head("/doc").body(()).unwrap();
    service.clone().oneshot(head).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    service.clone().oneshot(get("/other")).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_content_length_not_cached() {
    let counter = Arc::new(AtomicUsize::new(0));
    let backend = {
        let counter = counter.clone();
        service_fn(move |_req: Request<()>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(Response::new(Full::new(Bytes::from_static(b"no length"))))
            }
        })
    };
    let service = cache(TTL).layer(backend);

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/x")).await.unwrap();
        assert_eq!(body_bytes(response).await.as_ref(), b"no length");
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_multi_value_headers_survive_cache() {
    let counter = Arc::new(AtomicUsize::new(0));
    let backend = {
        let counter = counter.clone();
        service_fn(move |_req: Request<()>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let response = Response::builder()
                    .header(CONTENT_LENGTH, 2)
                    .header("link", "</a>; rel=preload")
                    .header("link", "</b>; rel=preload")
                    .header("link", "</c>; rel=preload")
                    .body(Full::new(Bytes::from_static(b"ok")))
                    .unwrap();
                Ok::<_, Infallible>(response)
            }
        })
    };
    let service = cache(TTL).layer(backend);

    service.clone().oneshot(get("/page")).await.unwrap();
    let hit = service.clone().oneshot(get("/page")).await.unwrap();

    let links: Vec<_> = hit.headers().get_all("link").iter().collect();
    assert_eq!(
        links,
        ["</a>; rel=preload", "</b>; rel=preload", "</c>; rel=preload"]
    );
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_aborted_stream_not_cached() {
    let counter = Arc::new(AtomicUsize::new(0));
    let backend = {
        let counter = counter.clone();
        service_fn(move |_req: Request<()>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let frames: Vec<Result<Frame<Bytes>, std::io::Error>> = vec![
                    Ok(Frame::data(Bytes::from(vec![1u8; 4]))),
                    Err(std::io::Error::other("backend went away")),
                ];
                let response = Response::builder()
                    .header(CONTENT_LENGTH, 4)
                    .body(StreamBody::new(futures::stream::iter(frames)))
                    .unwrap();
                Ok::<_, Infallible>(response)
            }
        })
    };
    let service = cache(TTL).layer(backend);

    for _ in 0..2 {
        let response = service.clone().oneshot(get("/flaky")).await.unwrap();
        assert_eq!(body_bytes(response).await.len(), 4);
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_upstream_error_propagates() {
    #[derive(Debug, PartialEq)]
    struct Unavailable;

    let counter = Arc::new(AtomicUsize::new(0));
    let backend = {
        let counter = counter.clone();
        service_fn(move |_req: Request<()>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<Response<Full<Bytes>>, _>(Unavailable)
            }
        })
    };
    let layer = cache(TTL);
    let service = layer.layer(backend);

    for _ in 0..2 {
        let error = service.clone().oneshot(get("/down")).await.unwrap_err();
        assert_eq!(error, Unavailable);
    }
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(layer.store().unwrap().is_empty());
}

#[tokio::test]
async fn test_layers_share_store() {
    let counter = Arc::new(AtomicUsize::new(0));
    let first = cache(TTL);
    let second = Cache::builder()
        .ttl(TTL)
        .store(first.store().unwrap().clone())
        .build()
        .unwrap();

    let handler = dummy_handler(4, 4, StatusCode::OK, counter.clone());
    let a = first.layer(handler.clone());
    let b = second.layer(handler);

    a.oneshot(get("/shared")).await.unwrap();
    b.oneshot(get("/shared")).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_both_fetch() {
    let counter = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(tokio::sync::Barrier::new(2));
    let backend = {
        let counter = counter.clone();
        let release = release.clone();
        service_fn(move |_req: Request<()>| {
            let counter = Arc::clone(&counter);
            let release = Arc::clone(&release);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                // Hold both fetches open until both have started.
                release.wait().await;
                let response = Response::builder()
                    .header(CONTENT_LENGTH, 4)
                    .body(Full::new(Bytes::from_static(b"race")))
                    .unwrap();
                Ok::<_, Infallible>(response)
            }
        })
    };
    let layer = cache(TTL);
    let service = layer.layer(backend);

    let (a, b) = tokio::join!(
        service.clone().oneshot(get("/race")),
        service.clone().oneshot(get("/race")),
    );
    assert_eq!(body_bytes(a.unwrap()).await.as_ref(), b"race");
    assert_eq!(body_bytes(b.unwrap()).await.as_ref(), b"race");
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(layer.store().unwrap().len(), 1);

    service.clone().oneshot(get("/race")).await.unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}
