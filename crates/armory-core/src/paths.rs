//! Client directory layout.

use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Returns the armory root directory, or None if the user's home cannot be resolved.
///
/// `ARMORY_HOME` overrides the default `~/.armory`.
pub fn try_armory_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("ARMORY_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".armory"))
}

/// On-disk layout of the client state.
///
/// Every path hangs off one root so tests can point the whole client at a
/// temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at [`try_armory_home`].
    pub fn from_env() -> Option<Self> {
        try_armory_home().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Armory sources: <root>/armories.json
    pub fn armories_file(&self) -> PathBuf {
        self.root.join("armories.json")
    }

    /// Client settings: <root>/settings.toml
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.toml")
    }

    /// Installed aliases: <root>/aliases
    pub fn aliases_dir(&self) -> PathBuf {
        self.root.join("aliases")
    }

    /// Installed extensions: <root>/extensions
    pub fn extensions_dir(&self) -> PathBuf {
        self.root.join("extensions")
    }

    /// Staging area for installs (same volume as the install roots).
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Install directory of a package.
    pub fn package_dir(&self, is_alias: bool, dir_name: &str) -> PathBuf {
        if is_alias {
            self.aliases_dir().join(dir_name)
        } else {
            self.extensions_dir().join(dir_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_root() {
        let layout = Layout::new("/srv/armory");
        assert_eq!(
            layout.armories_file(),
            PathBuf::from("/srv/armory/armories.json")
        );
        assert_eq!(
            layout.package_dir(true, "seatbelt"),
            PathBuf::from("/srv/armory/aliases/seatbelt")
        );
        assert_eq!(
            layout.package_dir(false, "coff-loader"),
            PathBuf::from("/srv/armory/extensions/coff-loader")
        );
    }
}
