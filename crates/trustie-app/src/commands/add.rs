use std::io::Write;

use anyhow::{Context, Result};
use tracing::warn;
use trustie_core::{KeyTree, SecuritySettings, SiteStore, StoreKind};

use super::{describe, open_store};
use crate::cli::AddArgs;
use crate::config::AppConfig;

pub fn add<T: KeyTree>(args: AddArgs, config: &AppConfig, tree: T, out: &mut dyn Write) -> Result<()> {
    let kind = args.store.map(StoreKind::from).unwrap_or(config.default_store);
    let zone = args.zone.unwrap_or(config.zone);
    let store = open_store(kind, zone, tree, config)?;

    // Java only reads an existing list, so there is nothing to append to.
    if let SiteStore::Java(list) = &store {
        if !list.exists() {
            warn!(
                "No exception list at {}; {} not added",
                list.path().display(),
                args.site
            );
            return Ok(());
        }
    }

    store
        .add_site(&args.site)
        .with_context(|| format!("failed to add {}", args.site))?;

    writeln!(out, "Added {} to {}", args.site, describe(&store))?;
    Ok(())
}
