use std::convert::Infallible;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode, header};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;

const METRICS_PATH: &str = "/metrics";

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static CACHE_LOOKUP_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("cache_lookup_total", "Cache lookups by result");
    let vec = IntCounterVec::new(opts, &["result"]).expect("create counter vec");
    REGISTRY
        .register(Box::new(vec.clone()))
        .expect("register cache_lookup_total");
    vec
});

static CACHE_STORE_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("cache_store_total", "Origin bodies stored in the cache")
        .expect("create cache_store_total");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("register cache_store_total");
    counter
});

static CACHE_CLEAR_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("cache_clear_total", "Cache clear operations")
        .expect("create cache_clear_total");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("register cache_clear_total");
    counter
});

static CACHE_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    let gauge = IntGauge::new("cache_entries", "Entries currently held in the cache")
        .expect("create cache_entries");
    REGISTRY
        .register(Box::new(gauge.clone()))
        .expect("register cache_entries");
    gauge
});

static ORIGIN_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("origin_errors_total", "Origin fetches that failed")
        .expect("create origin_errors_total");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("register origin_errors_total");
    counter
});

pub fn record_cache_lookup(hit: bool) {
    let label = if hit { "hit" } else { "miss" };
    CACHE_LOOKUP_TOTAL.with_label_values(&[label]).inc();
}

pub fn record_cache_store(entries: usize) {
    CACHE_STORE_TOTAL.inc();
    CACHE_ENTRIES.set(entries as i64);
}

pub fn record_cache_clear() {
    CACHE_CLEAR_TOTAL.inc();
    CACHE_ENTRIES.set(0);
}

pub fn record_origin_error() {
    ORIGIN_ERRORS_TOTAL.inc();
}

pub fn gather() -> Vec<u8> {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("encode metrics");
    buffer
}

pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {addr}"))?;
    loop {
        let (stream, _) = listener.accept().await?;
        tokio::spawn(async move {
            let service = service_fn(|req: Request<Incoming>| async move {
                Ok::<_, Infallible>(respond(&req))
            });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(error = %err, "metrics handler error");
            }
        });
    }
}

fn respond<B>(req: &Request<B>) -> Response<Full<Bytes>> {
    if req.method() == Method::GET && req.uri().path() == METRICS_PATH {
        build_response(
            StatusCode::OK,
            TextEncoder::new().format_type(),
            Bytes::from(gather()),
        )
    } else {
        build_response(
            StatusCode::NOT_FOUND,
            "text/plain",
            Bytes::from_static(b"not found"),
        )
    }
}

fn build_response(status: StatusCode, content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Ok(value) = header::HeaderValue::from_str(content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}
