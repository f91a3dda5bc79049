use std::io::Write;

use anyhow::{Context, Result};
use tracing::warn;
use trustie_core::{KeyTree, SecuritySettings, SiteStore, StoreKind};

use super::open_store;
use crate::cli::ListArgs;
use crate::config::AppConfig;

pub fn list<T: KeyTree>(
    args: ListArgs,
    config: &AppConfig,
    tree: T,
    out: &mut dyn Write,
) -> Result<()> {
    let kind = args.store.map(StoreKind::from).unwrap_or(config.default_store);
    let zone = args.zone.unwrap_or(config.zone);
    let store = open_store(kind, zone, tree, config)?;

    if let SiteStore::Java(list) = &store {
        if !list.exists() {
            warn!("No exception list at {}", list.path().display());
        }
    }

    let sites = store.query_sites().context("failed to list sites")?;
    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&sites)?)?;
    } else {
        for site in &sites {
            writeln!(out, "{site}")?;
        }
    }

    Ok(())
}
