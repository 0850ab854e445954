//! Blob Server Example
//!
//! Serves files from a directory behind the sabercat cache layer.
//!
//! Features shown:
//!   - `tower-http` `ServeDir` as the slow backend (it sends `Content-Length`)
//!   - Prefixing request paths before the backend sees them
//!   - Hyper HTTP server integration via `TowerToHyperService`
//!
//! Run:
//!   cargo run -p sabercat-demos --example blob_server -- <root> [prefix] [ttl-seconds]
//!
//! With `prefix` set to `/assets`, a request for `/logo.png` reads
//! `<root>/assets/logo.png`. A `ttl-seconds` of `0` turns caching off.
//!
//! Try it:
//!   curl -v http://localhost:7000/some-file   # Cache miss, then hit
//!   RUST_LOG=sabercat_tower=debug ...         # Show hit/miss events

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use http::Request;
use http::uri::{PathAndQuery, Uri};
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use sabercat_tower::Cache;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Rewrites `uri` so its path starts with `prefix`. The query is kept.
fn add_prefix(prefix: &str, uri: Uri) -> Uri {
    if prefix.is_empty() {
        return uri;
    }
    let mut parts = uri.into_parts();
    let rewritten = match parts.path_and_query.as_ref() {
        Some(pq) => match pq.query() {
            Some(query) => format!("{prefix}{}?{query}", pq.path()),
            None => format!("{prefix}{}", pq.path()),
        },
        None => format!("{prefix}/"),
    };
    match rewritten.parse::<PathAndQuery>() {
        Ok(pq) => parts.path_and_query = Some(pq),
        Err(err) => tracing::warn!(%err, "prefixed path is not a valid uri"),
    }
    Uri::from_parts(parts).unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sabercat=debug,sabercat_tower=debug")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let mut args = std::env::args().skip(1);
    let root = PathBuf::from(args.next().unwrap_or_else(|| ".".to_owned()));
    let prefix = args.next().unwrap_or_default();
    let ttl = match args.next() {
        Some(secs) => Duration::from_secs(secs.parse()?),
        None => DEFAULT_TTL,
    };

    let cache = Cache::builder().ttl(ttl).build()?;

    let service = ServiceBuilder::new()
        .layer(cache)
        .map_request(move |mut req: Request<hyper::body::Incoming>| {
            let uri = std::mem::take(req.uri_mut());
            *req.uri_mut() = add_prefix(&prefix, uri);
            req
        })
        .service(ServeDir::new(&root));

    let addr = SocketAddr::from(([127, 0, 0, 1], 7000));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(root = %root.display(), ?ttl, "Listening on http://{}", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let svc = service.clone();

        tokio::task::spawn(async move {
            let hyper_service = TowerToHyperService::new(svc);

            if let Err(err) = http1::Builder::new()
                .serve_connection(io, hyper_service)
                .await
            {
                tracing::error!(?err, "Error serving connection");
            }
        });
    }
}
