//! Reporter trait for dependency injection
//!
//! Core logic reports progress through this trait so it stays decoupled from
//! the terminal UI.

/// Progress sink for fetches and installs.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Fetching", "Installing").
    fn section(&self, title: &str);

    /// Updates the state of a package to 'installing'.
    fn installing(&self, name: &str, version: &str);

    /// Marks a package operation as successfully completed.
    fn done(&self, name: &str, version: &str, detail: &str);

    /// Marks a package operation as skipped (already installed, declined).
    fn skipped(&self, name: &str, reason: &str);

    /// Marks a package operation as failed with a specific reason.
    fn failed(&self, name: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display a final summary of multiple operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn installing(&self, name: &str, version: &str) {
        (**self).installing(name, version)
    }
    fn done(&self, name: &str, version: &str, detail: &str) {
        (**self).done(name, version, detail)
    }
    fn skipped(&self, name: &str, reason: &str) {
        (**self).skipped(name, reason)
    }
    fn failed(&self, name: &str, reason: &str) {
        (**self).failed(name, reason)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn success(&self, msg: &str) {
        (**self).success(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn error(&self, msg: &str) {
        (**self).error(msg)
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs)
    }
}

/// Reporter that discards everything. Used by tests and headless callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _title: &str) {}
    fn installing(&self, _name: &str, _version: &str) {}
    fn done(&self, _name: &str, _version: &str, _detail: &str) {}
    fn skipped(&self, _name: &str, _reason: &str) {}
    fn failed(&self, _name: &str, _reason: &str) {}
    fn info(&self, _msg: &str) {}
    fn success(&self, _msg: &str) {}
    fn warning(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
    fn summary(&self, _count: usize, _action: &str, _elapsed_secs: f64) {}
}
