use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::{
    FacebookMonitor, InstagramMonitor, LinkScraper, MetadataExtractor, PlatformMonitor,
    TikTokMonitor, YouTubeMonitor,
};
use crate::domain::Platform;
use crate::{Error, Result};

/// Maps each platform tag to the monitor that serves it.
#[derive(Default, Clone)]
pub struct MonitorRegistry {
    monitors: HashMap<Platform, Arc<dyn PlatformMonitor>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in monitor for every platform.
    pub fn with_defaults(
        extractor: Arc<dyn MetadataExtractor>,
        scraper: Arc<dyn LinkScraper>,
        selector_timeout: Duration,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(YouTubeMonitor::new(extractor.clone())));
        registry.register(Arc::new(TikTokMonitor::new(extractor)));
        registry.register(Arc::new(InstagramMonitor::new(
            scraper.clone(),
            selector_timeout,
        )));
        registry.register(Arc::new(FacebookMonitor::new(scraper, selector_timeout)));
        registry
    }

    /// Register a monitor under its own platform, replacing any previous one.
    pub fn register(&mut self, monitor: Arc<dyn PlatformMonitor>) {
        self.monitors.insert(monitor.platform(), monitor);
    }

    pub fn resolve(&self, platform: Platform) -> Result<Arc<dyn PlatformMonitor>> {
        self.monitors
            .get(&platform)
            .cloned()
            .ok_or_else(|| Error::UnknownPlatform(platform.to_string()))
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.monitors.keys().copied().collect();
        platforms.sort_by_key(|p| p.as_str());
        platforms
    }
}
