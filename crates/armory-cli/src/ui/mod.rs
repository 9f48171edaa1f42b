//! Terminal output.
//!
//! [`Output`] is the console [`Reporter`]; [`StdinConfirm`] asks the operator
//! before an installed package is replaced.

pub mod table;
pub mod theme;

use std::io::{self, Write};

use crossterm::style::Stylize;

use armory_core::Reporter;
use armory_core::install::Confirm;

pub use theme::Theme;

/// Console reporter. Progress goes to stdout, problems to stderr.
#[derive(Debug, Default)]
pub struct Output {
    theme: Theme,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(&self, icon: &str, name: &str, version: &str, detail: &str) -> String {
        let layout = &self.theme.layout;
        let name_col = format!("{name:<width$}", width = layout.name_width);
        let version_col = format!("{version:<width$}", width = layout.version_width);
        format!(
            "  {icon} {} {} {}",
            name_col.with(self.theme.colors.package_name),
            version_col.with(self.theme.colors.version),
            detail.with(self.theme.colors.secondary)
        )
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        println!();
        println!("{}", title.bold());
    }

    fn installing(&self, name: &str, version: &str) {
        let icon = self.theme.icons.pending.dark_grey().to_string();
        println!("{}", self.row(&icon, name, version, "installing"));
    }

    fn done(&self, name: &str, version: &str, detail: &str) {
        let icon = self.theme.icons.success.with(self.theme.colors.success).to_string();
        println!("{}", self.row(&icon, name, version, detail));
    }

    fn skipped(&self, name: &str, reason: &str) {
        let icon = self.theme.icons.skipped.dark_grey().to_string();
        println!("{}", self.row(&icon, name, "", reason));
    }

    fn failed(&self, name: &str, reason: &str) {
        let icon = self.theme.icons.error.with(self.theme.colors.error).to_string();
        eprintln!("{}", self.row(&icon, name, "", reason));
    }

    fn info(&self, msg: &str) {
        println!("  {} {msg}", self.theme.icons.info.blue());
    }

    fn success(&self, msg: &str) {
        println!(
            "  {} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            msg.with(self.theme.colors.success)
        );
    }

    fn warning(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    fn error(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        println!();
        println!(
            "{} COMPLETE {count}, elapsed {elapsed_secs:.2}s",
            action.to_uppercase()
        );
    }
}

/// Read one trimmed line after printing `question`. `None` on end of input.
pub fn prompt(question: &str) -> io::Result<Option<String>> {
    print!("{question}");
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

/// Asks on stdin before overwriting. Anything but `y`/`yes` declines.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm_overwrite(&self, name: &str) -> bool {
        let question = format!("  '{name}' is already installed. Overwrite? (y/N): ");
        match prompt(&question) {
            Ok(Some(answer)) => matches!(answer.to_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}
