use std::sync::Arc;

use super::{config::ProxyConfig, upstream::Upstream};

pub struct AppState {
    pub upstream: Upstream,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Arc<Self>, reqwest::Error> {
        let upstream = Upstream::new(Arc::new(config))?;
        Ok(Arc::new(Self { upstream }))
    }
}
