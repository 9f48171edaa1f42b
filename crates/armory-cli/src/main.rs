//! armory - signed package sources CLI

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use armory_cli::cmd;
use armory_cli::ops::Context;
use armory_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Ctrl-C abandons in-flight fetches
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let command = cli.command.unwrap_or(Commands::List { armory: None });
    match command {
        Commands::Sources => cmd::sources::show(),
        Commands::Add {
            name,
            url,
            pubkey,
            auth,
            auth_cmd,
        } => cmd::sources::add(&name, &url, &pubkey, auth, auth_cmd),
        Commands::Remove { name } => cmd::sources::remove(&name),
        Commands::Enable { name } => cmd::sources::set_enabled(&name, true),
        Commands::Disable { name } => cmd::sources::set_enabled(&name, false),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
        Commands::List { armory } => {
            let ctx = Context::load(&cli.connection, cancel)?;
            cmd::list::list(&ctx, armory.as_deref()).await
        }
        Commands::Install {
            name,
            force,
            armory,
        } => {
            let ctx = Context::load(&cli.connection, cancel)?;
            cmd::install::install(&ctx, &name, force, armory.as_deref()).await
        }
        Commands::Update { armory, all } => {
            let ctx = Context::load(&cli.connection, cancel)?;
            cmd::update::update(&ctx, armory.as_deref(), all).await
        }
        Commands::Search { pattern } => {
            let ctx = Context::load(&cli.connection, cancel)?;
            cmd::search::search(&ctx, &pattern).await
        }
        Commands::Info { name } => {
            let ctx = Context::load(&cli.connection, cancel)?;
            cmd::info::info(&ctx, &name).await
        }
        Commands::Refresh => {
            let ctx = Context::load(&cli.connection, cancel)?;
            cmd::refresh::refresh(&ctx).await
        }
    }
}
