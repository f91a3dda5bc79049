//! `trustie where`.

use std::io::Write;

use anyhow::{Context, Result};
use trustie_core::{JavaRuntime, KeyTree, TrustedSites};

use super::{exception_sites_path, identity};
use crate::config::AppConfig;

pub fn locate<T: KeyTree>(config: &AppConfig, tree: T, out: &mut dyn Write) -> Result<()> {
    let runtime = JavaRuntime::detect(&tree).context("failed to look up the Java runtime")?;

    let identity = identity(config);
    let sites =
        TrustedSites::open(tree, identity.as_ref()).context("failed to open the zone map")?;
    let location = sites.location();
    let source = if location.is_policy() {
        "group policy"
    } else {
        "user settings"
    };
    writeln!(out, "Zone map:       {location} ({source})")?;

    match runtime {
        Some(runtime) => writeln!(out, "Java home:      {}", runtime.home().display())?,
        None => writeln!(out, "Java home:      not installed")?,
    }

    let list = exception_sites_path(config)?;
    let state = if list.exists() { "present" } else { "missing" };
    writeln!(out, "Exception list: {} ({state})", list.path().display())?;

    Ok(())
}
