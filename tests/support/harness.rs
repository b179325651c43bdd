use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use anyhow::Result;
use tokio::task::JoinHandle;

use caching_proxy::{
    cli::LogFormat,
    proxy::{self, AppContext, cache::ResponseCache, origin::HttpOrigin},
    settings::Settings,
};

use super::http_utils::{RawResponse, send_request};
use super::net::{unused_local_addr, wait_until_accepting};

pub fn default_test_settings(port: u16, origin: &str) -> Settings {
    Settings {
        listen_host: "127.0.0.1".parse().expect("valid listen host"),
        port,
        origin: origin.to_string(),
        clear_cache: false,
        log: LogFormat::Text,
        origin_timeout: Some(5),
        metrics_listen: None,
    }
}

pub struct ProxyHarness {
    pub addr: SocketAddr,
    pub settings: Arc<Settings>,
    pub cache: ResponseCache,
    handle: JoinHandle<()>,
}

impl ProxyHarness {
    pub async fn spawn(origin: &str) -> Result<Self> {
        let port = unused_local_addr()?.port();
        let settings = Arc::new(default_test_settings(port, origin));
        let fetcher = Arc::new(HttpOrigin::new(settings.origin_timeout())?);
        let app = AppContext::new(settings.clone(), ResponseCache::new(), fetcher);
        let cache = app.cache().clone();
        let addr = settings.listen_addr();

        let handle = tokio::spawn(async move {
            if let Err(err) = proxy::run(app).await {
                tracing::error!(error = ?err, "proxy run failed");
            }
        });

        wait_until_accepting(addr, StdDuration::from_secs(3)).await?;

        Ok(Self {
            addr,
            settings,
            cache,
            handle,
        })
    }

    pub async fn get(&self, path: &str) -> Result<RawResponse> {
        send_request(self.addr, "GET", path).await
    }

    pub async fn request(&self, method: &str, path: &str) -> Result<RawResponse> {
        send_request(self.addr, method, path).await
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}
