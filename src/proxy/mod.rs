pub mod cache;
pub mod handler;
pub mod listener;
pub mod origin;

use std::sync::Arc;

use anyhow::Result;

use crate::settings::Settings;

use self::cache::ResponseCache;
use self::handler::ProxyHandler;
use self::origin::OriginFetcher;

#[derive(Clone)]
pub struct AppContext {
    pub settings: Arc<Settings>,
    pub handler: ProxyHandler,
}

impl AppContext {
    pub fn new(
        settings: Arc<Settings>,
        cache: ResponseCache,
        origin: Arc<dyn OriginFetcher>,
    ) -> Self {
        let handler = ProxyHandler::new(settings.origin.as_str(), cache, origin);
        Self { settings, handler }
    }

    pub fn cache(&self) -> &ResponseCache {
        self.handler.cache()
    }
}

pub async fn run(app: AppContext) -> Result<()> {
    listener::start_listener(app).await
}
