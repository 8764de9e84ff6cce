pub mod config;
pub mod init;
pub mod serve;
pub mod stats;
pub mod ticket;

use anyhow::Context;
use helpdesk_core::config::{Config, StoreConfig};
use helpdesk_core::store::{FileStore, HttpStore, TicketStore};
use helpdesk_core::types::Role;
use helpdesk_core::Actor;
use std::path::Path;

/// `--actor` / `--role` as given on the command line, not yet validated.
pub struct Identity {
    pub actor: Option<String>,
    pub role: Option<String>,
}

impl Identity {
    pub fn resolve(&self) -> anyhow::Result<Actor> {
        let id = self
            .actor
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .context("--actor is required (or set HELPDESK_ACTOR)")?;
        let role: Role = self
            .role
            .as_deref()
            .context("--role is required (or set HELPDESK_ROLE)")?
            .parse()?;
        Ok(Actor::new(id, role))
    }
}

/// The store named by `.helpdesk/config.yaml`.
pub fn open_store(root: &Path) -> anyhow::Result<Box<dyn TicketStore>> {
    let config = Config::load(root).context("failed to load config")?;
    let store: Box<dyn TicketStore> = match &config.store {
        StoreConfig::File => {
            Box::new(FileStore::new(root).with_page_size(config.page_size()))
        }
        StoreConfig::Http { url, .. } => {
            let url = url
                .as_deref()
                .context("store.type is 'http' but store.url is not set")?;
            tracing::debug!(%url, "using http store");
            Box::new(HttpStore::new(url, config.store.token())?)
        }
    };
    Ok(store)
}
