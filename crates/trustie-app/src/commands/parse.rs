use std::io::Write;

use anyhow::{Context, Result};
use trustie_core::Site;

use crate::cli::ParseArgs;

pub fn parse(args: ParseArgs, out: &mut dyn Write) -> Result<()> {
    let site: Site = args
        .site
        .parse()
        .with_context(|| format!("failed to parse {}", args.site))?;

    if args.json {
        writeln!(out, "{}", serde_json::to_string_pretty(&site)?)?;
        return Ok(());
    }

    writeln!(out, "site:        {site}")?;
    writeln!(out, "protocol:    {}", site.protocol().unwrap_or("(any)"))?;
    writeln!(out, "subdomain:   {}", site.subdomain().unwrap_or("(none)"))?;
    writeln!(out, "root domain: {}", site.root_domain())?;
    writeln!(out, "value name:  {}", site.value_name())?;
    Ok(())
}
