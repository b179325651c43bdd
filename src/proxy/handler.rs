use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{HeaderValue, Request, Response, StatusCode, header};
use http_body_util::Full;
use tracing::{info, warn};

use crate::logging::{AccessLogBuilder, CacheStatus};

use super::cache::ResponseCache;
use super::origin::OriginFetcher;

pub const X_CACHE: &str = "x-cache";

const ORIGIN_ERROR_BODY: &[u8] = b"Error reaching origin server\n";

/// Resolves inbound requests against one origin and answers them from the
/// cache when possible.
#[derive(Clone)]
pub struct ProxyHandler {
    origin_base: Arc<str>,
    cache: ResponseCache,
    origin: Arc<dyn OriginFetcher>,
}

impl ProxyHandler {
    pub fn new(
        origin_base: impl Into<Arc<str>>,
        cache: ResponseCache,
        origin: Arc<dyn OriginFetcher>,
    ) -> Self {
        Self {
            origin_base: origin_base.into(),
            cache,
            origin,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Origin base followed by the request path exactly as received. The
    /// query string is not part of the path and is dropped.
    pub fn target_url<B>(&self, req: &Request<B>) -> String {
        format!("{}{}", self.origin_base, req.uri().path())
    }

    /// The inbound method and body are ignored: every miss becomes a plain
    /// GET towards the origin.
    pub async fn handle<B>(&self, req: &Request<B>, peer: SocketAddr) -> Response<Full<Bytes>> {
        let start = Instant::now();
        let target_url = self.target_url(req);
        let log = AccessLogBuilder::new(peer)
            .method(req.method().as_str())
            .path(req.uri().path())
            .target_url(target_url.as_str());

        if let Some(body) = self.cache.get(&target_url) {
            crate::metrics::record_cache_lookup(true);
            info!(url = %target_url, "cache HIT");
            log.cache(CacheStatus::Hit)
                .status(StatusCode::OK)
                .bytes_out(body.len() as u64)
                .elapsed(start.elapsed())
                .log();
            return cached_response(CacheStatus::Hit, body);
        }
        crate::metrics::record_cache_lookup(false);

        let body = match self.origin.fetch(&target_url).await {
            Ok(body) => body,
            Err(err) => {
                crate::metrics::record_origin_error();
                warn!(url = %target_url, error = %err, "error reaching origin server");
                log.status(StatusCode::BAD_GATEWAY)
                    .bytes_out(ORIGIN_ERROR_BODY.len() as u64)
                    .elapsed(start.elapsed())
                    .error_detail(err.to_string())
                    .log();
                return origin_error_response();
            }
        };

        let entries = self.cache.put(target_url.as_str(), body.clone());
        crate::metrics::record_cache_store(entries);
        info!(url = %target_url, "cache MISS");
        log.cache(CacheStatus::Miss)
            .status(StatusCode::OK)
            .bytes_out(body.len() as u64)
            .elapsed(start.elapsed())
            .log();
        cached_response(CacheStatus::Miss, body)
    }
}

fn cached_response(cache: CacheStatus, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    response
        .headers_mut()
        .insert(X_CACHE, HeaderValue::from_static(cache.as_str()));
    response
}

fn origin_error_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(ORIGIN_ERROR_BODY)));
    *response.status_mut() = StatusCode::BAD_GATEWAY;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}
