//! armory - package manager for C2 aliases and extensions
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Discovers, verifies, installs and updates aliases and extensions
//! published by one or more signed armories.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.armory/
//! ├── armories.json   # Configured armory sources
//! ├── settings.toml   # Optional client settings
//! ├── aliases/        # One directory per installed alias
//! ├── extensions/     # One directory per installed extension
//! └── tmp/            # Staging area for installs
//! ```

pub mod cmd;
pub mod ops;
pub mod ui;

pub use armory_core::USER_AGENT;
pub use armory_core::paths::*;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "armory")]
#[command(author, version, about = "armory - signed package sources for C2 aliases and extensions")]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// With no command, list available packages
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Per-invocation overrides of `settings.toml`.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Proxy URL for armory requests
    #[arg(long, global = true, env = "ARMORY_PROXY")]
    pub proxy: Option<String>,
    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,
    /// Refetch everything, ignoring cached entries
    #[arg(long, global = true)]
    pub ignore_cache: bool,
    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List available aliases, extensions and bundles
    List {
        /// Only show packages from this armory
        #[arg(long)]
        armory: Option<String>,
    },
    /// Install a package, a bundle, or `all`
    Install {
        /// Command name, bundle name or `all`
        name: String,
        /// Overwrite installed packages without asking
        #[arg(long, short)]
        force: bool,
        /// Only install from this armory
        #[arg(long)]
        armory: Option<String>,
    },
    /// Check installed packages for updates
    Update {
        /// Only consider updates from this armory
        #[arg(long)]
        armory: Option<String>,
        /// Apply every update without prompting
        #[arg(long, short)]
        all: bool,
    },
    /// Search packages by regular expression
    Search {
        /// Pattern matched against command and package names
        pattern: String,
    },
    /// Show details of a package
    Info {
        /// Command name
        name: String,
    },
    /// Fetch every enabled armory and report its state
    Refresh,
    /// Show configured armories
    Sources,
    /// Add an armory
    Add {
        /// Unique armory name
        #[arg(long)]
        name: String,
        /// Index URL
        #[arg(long)]
        url: String,
        /// Minisign public key
        #[arg(long)]
        pubkey: String,
        /// Static authorization token
        #[arg(long)]
        auth: Option<String>,
        /// Command whose output is the authorization token
        #[arg(long = "auth-cmd")]
        auth_cmd: Option<String>,
    },
    /// Remove an armory
    Remove {
        /// Armory name
        name: String,
    },
    /// Enable an armory
    Enable {
        /// Armory name
        name: String,
    },
    /// Disable an armory without removing it
    Disable {
        /// Armory name
        name: String,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
