use std::sync::Arc;

use anyhow::Context;
use shelfwise_common::Database;

use crate::config::Config;
use crate::link_preview::LinkPreviewer;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub previewer: LinkPreviewer,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> anyhow::Result<Self> {
        let previewer = LinkPreviewer::new(config.preview_timeout(), config.preview_max_bytes)
            .context("Failed to build link preview client")?;

        Ok(Self {
            db,
            previewer,
            config: Arc::new(config),
        })
    }
}
