//! Shared command context.
//!
//! Groups the on-disk layout, settings, armory sources and the fetcher so
//! command handlers don't each rebuild them.

use std::fmt;
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use tokio_util::sync::CancellationToken;

use armory_core::install::{Confirm, Installer};
use armory_core::{ArmoryCache, ArmoryRefresh, ArmorySources, FetchOptions, Fetcher, Layout, Reporter, Settings};

use crate::ConnectionArgs;
use crate::ui::Output;

/// Groups common state used by commands that talk to armories.
pub struct Context {
    pub layout: Layout,
    pub settings: Settings,
    pub sources: ArmorySources,
    pub fetcher: Fetcher,
    pub output: Arc<Output>,
    cancel: CancellationToken,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("layout", &self.layout)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Locate the client directory.
pub fn layout() -> Result<Layout> {
    Layout::from_env().context("Could not determine home directory; set ARMORY_HOME")
}

impl Context {
    /// Load settings and sources, applying command-line overrides.
    pub fn load(connection: &ConnectionArgs, cancel: CancellationToken) -> Result<Self> {
        let layout = layout()?;
        let mut settings = Settings::load(&layout.settings_file())
            .with_context(|| format!("Failed to load {}", layout.settings_file().display()))?;
        if let Some(proxy) = &connection.proxy {
            settings.proxy = Some(proxy.clone());
        }
        if connection.insecure {
            settings.insecure = true;
        }
        if let Some(secs) = connection.timeout {
            settings.timeout_secs = secs;
        }

        let mut options = FetchOptions::from_settings(&settings);
        options.ignore_cache = connection.ignore_cache;

        let sources = ArmorySources::load(&layout.armories_file());
        let fetcher = Fetcher::new(Arc::new(ArmoryCache::new()), options)
            .context("Failed to build HTTP client")?
            .with_cancellation(cancel.clone());

        Ok(Self {
            layout,
            settings,
            sources,
            fetcher,
            output: Arc::new(Output::new()),
            cancel,
        })
    }

    /// Public key of the armory called `name`, for filtering lookups.
    pub fn armory_key(&self, name: Option<&str>) -> Result<Option<String>> {
        let Some(name) = name else {
            return Ok(None);
        };
        match self.sources.find(name) {
            Some(armory) => Ok(Some(armory.public_key)),
            None => bail!("Unknown armory '{name}'"),
        }
    }

    /// Refresh every enabled armory, reporting index failures.
    pub async fn refresh(&self) -> Result<Vec<ArmoryRefresh>> {
        let armories = self.sources.enabled();
        if armories.is_empty() {
            self.output
                .warning("No armories enabled. Add one with 'armory add' or 'armory enable'.");
        }
        let results = self.fetcher.refresh(&armories).await;
        if self.cancel.is_cancelled() {
            bail!("Interrupted");
        }
        for result in &results {
            if let Some(e) = &result.index_error {
                self.output
                    .warning(&format!("Armory '{}' unavailable: {e}", result.armory.name));
            }
        }
        Ok(results)
    }

    pub fn installer(&self, confirm: Arc<dyn Confirm>) -> Installer {
        Installer::new(
            self.fetcher.clone(),
            self.layout.clone(),
            self.output.clone(),
            confirm,
        )
        .with_max_depth(self.settings.max_dependency_depth)
    }
}
