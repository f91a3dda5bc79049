//! Subcommand implementations.
//!
//! Every command writes its results to `out` and logs through `tracing`;
//! the tree backend is chosen by the caller.

pub mod add;
pub mod list;
pub mod locate;
pub mod parse;
pub mod remove;

use std::io::Write;

use anyhow::{anyhow, Context, Result};
use trustie_core::{
    ExceptionSites, JavaRuntime, KeyTree, SiteStore, StoreKind, TrustedSites, TrustieError,
    UserIdentity, Zone,
};

use crate::cli::Command;
use crate::config::AppConfig;

/// Runs a command against `tree`.
pub fn run<T: KeyTree>(
    command: Command,
    config: &AppConfig,
    tree: T,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::List(args) => list::list(args, config, tree, out),
        Command::Add(args) => add::add(args, config, tree, out),
        Command::Remove(args) => remove::remove(args, config, tree, out),
        Command::Parse(args) => parse::parse(args, out),
        Command::Where => locate::locate(config, tree, out),
    }
}

/// The identity used to find the per-user policy zone map.
pub fn identity(config: &AppConfig) -> Box<dyn UserIdentity> {
    if let Some(identity) = config.identity() {
        return Box::new(identity);
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(trustie_core::DesktopUser)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(trustie_core::FixedIdentity::anonymous())
    }
}

/// The exception list path, without checking for a Java install.
///
/// Unless configured, this is the list in the profile of the user from
/// [`identity`], or of the current user when no name is known.
pub fn exception_sites_path(config: &AppConfig) -> Result<ExceptionSites> {
    if let Some(path) = &config.exception_sites {
        return Ok(ExceptionSites::new(path));
    }

    let list = match identity(config).user_name() {
        Ok(name) => ExceptionSites::for_user(&name),
        Err(e) => {
            tracing::debug!("No user name ({}), using the current profile", e);
            None
        }
    };
    list.or_else(ExceptionSites::for_current_user)
        .ok_or_else(|| anyhow!("could not determine the user profile directory"))
}

/// The exception list to edit.
///
/// A configured path is used as is; the one in the user profile needs Java.
pub fn exception_sites<T: KeyTree>(tree: &T, config: &AppConfig) -> Result<ExceptionSites> {
    let list = exception_sites_path(config)?;
    if config.exception_sites.is_some() {
        return Ok(list);
    }
    require_java(tree, list)
}

/// Accepts `list` if it exists or a Java runtime is registered.
fn require_java<T: KeyTree>(tree: &T, list: ExceptionSites) -> Result<ExceptionSites> {
    if list.exists() {
        return Ok(list);
    }

    match JavaRuntime::detect(tree).context("failed to look up the Java runtime")? {
        Some(runtime) => {
            tracing::debug!("Java runtime at {:?}", runtime.home());
            Ok(list)
        }
        None => Err(TrustieError::JavaNotInstalled.into()),
    }
}

/// Opens the store of the given kind.
pub fn open_store<T: KeyTree>(
    kind: StoreKind,
    zone: Zone,
    tree: T,
    config: &AppConfig,
) -> Result<SiteStore<T>> {
    match kind {
        StoreKind::InternetExplorer => {
            let identity = identity(config);
            let sites = TrustedSites::open(tree, identity.as_ref())
                .context("failed to open the zone map")?
                .with_zone(zone);
            Ok(SiteStore::InternetExplorer(sites))
        }
        StoreKind::Java => Ok(SiteStore::Java(exception_sites(&tree, config)?)),
    }
}

/// Human-readable name of the list a store edits.
pub fn describe<T: KeyTree>(store: &SiteStore<T>) -> String {
    match store {
        SiteStore::InternetExplorer(sites) => {
            format!("{} zone ({})", sites.zone(), sites.location())
        }
        SiteStore::Java(list) => list.path().display().to_string(),
    }
}
