use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use trustie_core::{StoreKind, Zone};

/// TrustIE - edit the IE zone map and the Java exception site list
#[derive(Parser, Debug)]
#[command(name = "trustie", version, about)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Load configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep the zone map in this SQLite database instead of the registry
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the sites in a store
    List(ListArgs),
    /// Add a site to a store
    Add(AddArgs),
    /// Remove a site from a store
    Remove(RemoveArgs),
    /// Show how a site is decomposed
    Parse(ParseArgs),
    /// Show where the zone map and Java exception list live
    Where,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, value_enum)]
    pub store: Option<StoreArg>,

    /// Security zone (name or id); defaults to the configured zone
    #[arg(long)]
    pub zone: Option<Zone>,

    /// Print as a JSON array
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Site to add, e.g. `https://portal.example.com` or `*.example.com`
    pub site: String,

    #[arg(long, value_enum)]
    pub store: Option<StoreArg>,

    /// Security zone (name or id); defaults to the configured zone
    #[arg(long)]
    pub zone: Option<Zone>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Site to remove
    pub site: String,

    #[arg(long, value_enum)]
    pub store: Option<StoreArg>,
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Site to decompose
    pub site: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreArg {
    /// Internet Explorer zone map
    Ie,
    /// Java exception.sites
    Java,
}

impl From<StoreArg> for StoreKind {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Ie => StoreKind::InternetExplorer,
            StoreArg::Java => StoreKind::Java,
        }
    }
}
