use std::io::Write;

use anyhow::{Context, Result};
use trustie_core::{KeyTree, SecuritySettings, StoreKind};

use super::{describe, open_store};
use crate::cli::RemoveArgs;
use crate::config::AppConfig;

pub fn remove<T: KeyTree>(
    args: RemoveArgs,
    config: &AppConfig,
    tree: T,
    out: &mut dyn Write,
) -> Result<()> {
    let kind = args.store.map(StoreKind::from).unwrap_or(config.default_store);
    // Deleting ignores the zone; whatever zone the site is in, it goes.
    let store = open_store(kind, config.zone, tree, config)?;

    let removed = store
        .delete_site(&args.site)
        .with_context(|| format!("failed to remove {}", args.site))?;

    if removed {
        writeln!(out, "Removed {} from {}", args.site, describe(&store))?;
    } else {
        writeln!(out, "{} was not in {}", args.site, describe(&store))?;
    }
    Ok(())
}
