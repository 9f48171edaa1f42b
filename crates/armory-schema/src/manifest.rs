//! Alias and extension manifests.
//!
//! A manifest travels twice: base64-encoded inside the trusted comment of a
//! package signature (so listings can show metadata without downloading the
//! archive), and as `alias.json` / `extension.json` inside the archive and in
//! the local install directory.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::Platform;
use crate::{ALIAS_MANIFEST_FILE, EXTENSION_MANIFEST_FILE};

/// Errors raised while decoding a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest JSON could not be decoded.
    #[error("Invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// An extension manifest in neither the current nor the legacy layout.
    #[error("Extension manifest '{0}' declares no commands")]
    NoCommands(String),
}

/// A platform-specific artifact referenced by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    /// Target operating system (`windows`, `linux`, `darwin`).
    pub os: String,
    /// Target architecture (`amd64`, `386`, `arm64`).
    pub arch: String,
    /// Path of the artifact relative to the package root.
    pub path: String,
}

/// Manifest of an alias package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasManifest {
    /// Package name.
    pub name: String,
    /// Published version string.
    #[serde(default)]
    pub version: String,
    /// Console command the alias registers.
    pub command_name: String,
    /// Author of the wrapped tool.
    #[serde(default)]
    pub original_author: String,
    /// Source repository.
    #[serde(default)]
    pub repo_url: String,
    /// One-line help.
    #[serde(default)]
    pub help: String,
    /// Full help text.
    #[serde(default)]
    pub long_help: String,
    /// Entry point inside the artifact.
    #[serde(default)]
    pub entrypoint: String,
    /// Whether the operator may pass arguments.
    #[serde(default)]
    pub allow_args: bool,
    /// Arguments used when none are given.
    #[serde(default)]
    pub default_args: String,
    /// Load the artifact reflectively.
    #[serde(default)]
    pub is_reflective: bool,
    /// The artifact is a .NET assembly.
    #[serde(default)]
    pub is_assembly: bool,
    /// Artifacts per OS and architecture.
    #[serde(default)]
    pub files: Vec<ManifestFile>,

    /// Name of the armory this manifest was fetched from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub armory_name: String,
    /// Public key of the armory this manifest was fetched from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub armory_pk: String,
}

/// A single argument accepted by an extension command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionArgument {
    /// Argument name.
    pub name: String,
    /// Argument type (`string`, `int`, `file`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Description shown in help.
    #[serde(default)]
    pub desc: String,
    /// May be omitted.
    #[serde(default)]
    pub optional: bool,
}

/// One console command provided by an extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionCommand {
    /// Console command name.
    pub command_name: String,
    /// One-line help.
    #[serde(default)]
    pub help: String,
    /// Full help text.
    #[serde(default)]
    pub long_help: String,
    /// Exported function to call.
    #[serde(default)]
    pub entrypoint: String,
    /// Artifacts per OS and architecture.
    #[serde(default)]
    pub files: Vec<ManifestFile>,
    /// Arguments the command accepts.
    #[serde(default)]
    pub arguments: Vec<ExtensionArgument>,
}

/// Manifest of an extension package, always in the multi-command layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionManifest {
    /// Package name, also the install directory.
    pub name: String,
    /// Published version string.
    pub version: String,
    /// Author of the extension packaging.
    pub extension_author: String,
    /// Author of the wrapped tool.
    pub original_author: String,
    /// Source repository.
    pub repo_url: String,
    /// Command name of the extension this one requires, if any.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub depends_on: String,
    /// Commands the extension registers.
    pub commands: Vec<ExtensionCommand>,

    /// Name of the armory this manifest was fetched from.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub armory_name: String,
    /// Public key of the armory this manifest was fetched from.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub armory_pk: String,
}

/// Wire layout accepting both the multi-command and the legacy
/// single-command manifest.
#[derive(Deserialize)]
struct RawExtensionManifest {
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    extension_author: String,
    #[serde(default)]
    original_author: String,
    #[serde(default)]
    repo_url: String,
    #[serde(default)]
    depends_on: String,
    #[serde(default)]
    commands: Vec<ExtensionCommand>,
    #[serde(default)]
    armory_name: String,
    #[serde(default)]
    armory_pk: String,

    // legacy single-command layout
    #[serde(default)]
    command_name: String,
    #[serde(default)]
    help: String,
    #[serde(default)]
    long_help: String,
    #[serde(default)]
    entrypoint: String,
    #[serde(default)]
    files: Vec<ManifestFile>,
    #[serde(default)]
    arguments: Vec<ExtensionArgument>,
}

impl<'de> Deserialize<'de> for ExtensionManifest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawExtensionManifest::deserialize(deserializer)?;
        let mut commands = raw.commands;
        if commands.is_empty() && !raw.command_name.is_empty() {
            commands.push(ExtensionCommand {
                command_name: raw.command_name,
                help: raw.help,
                long_help: raw.long_help,
                entrypoint: raw.entrypoint,
                files: raw.files,
                arguments: raw.arguments,
            });
        }
        Ok(Self {
            name: raw.name,
            version: raw.version,
            extension_author: raw.extension_author,
            original_author: raw.original_author,
            repo_url: raw.repo_url,
            depends_on: raw.depends_on,
            commands,
            armory_name: raw.armory_name,
            armory_pk: raw.armory_pk,
        })
    }
}

impl AliasManifest {
    /// Decode an alias manifest from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] on malformed input.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl ExtensionManifest {
    /// Decode an extension manifest, normalising the legacy layout.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] on malformed input and
    /// [`ManifestError::NoCommands`] if no command is declared.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        if manifest.commands.is_empty() {
            return Err(ManifestError::NoCommands(manifest.name));
        }
        Ok(manifest)
    }

    /// Returns `true` if one of the commands is called `command_name`.
    pub fn provides(&self, command_name: &str) -> bool {
        self.commands.iter().any(|c| c.command_name == command_name)
    }
}

/// Decoded manifest of either package kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageManifest {
    Alias(AliasManifest),
    Extension(ExtensionManifest),
}

impl PackageManifest {
    /// Decode manifest bytes for a package of the given kind.
    ///
    /// # Errors
    ///
    /// Propagates the [`ManifestError`] of the selected decoder.
    pub fn from_slice(bytes: &[u8], is_alias: bool) -> Result<Self, ManifestError> {
        if is_alias {
            AliasManifest::from_slice(bytes).map(Self::Alias)
        } else {
            ExtensionManifest::from_slice(bytes).map(Self::Extension)
        }
    }

    /// Package name.
    pub fn name(&self) -> &str {
        match self {
            Self::Alias(m) => &m.name,
            Self::Extension(m) => &m.name,
        }
    }

    /// Published version string.
    pub fn version(&self) -> &str {
        match self {
            Self::Alias(m) => &m.version,
            Self::Extension(m) => &m.version,
        }
    }

    /// Source repository.
    pub fn repo_url(&self) -> &str {
        match self {
            Self::Alias(m) => &m.repo_url,
            Self::Extension(m) => &m.repo_url,
        }
    }

    /// Author shown in listings; extensions prefer the extension author.
    pub fn author(&self) -> &str {
        match self {
            Self::Alias(m) => &m.original_author,
            Self::Extension(m) if !m.extension_author.is_empty() => &m.extension_author,
            Self::Extension(m) => &m.original_author,
        }
    }

    /// Short help of the first command.
    pub fn help(&self) -> &str {
        match self {
            Self::Alias(m) => &m.help,
            Self::Extension(m) => m.commands.first().map_or("", |c| c.help.as_str()),
        }
    }

    /// Declared dependency (extensions only).
    pub fn depends_on(&self) -> Option<&str> {
        match self {
            Self::Alias(_) => None,
            Self::Extension(m) if m.depends_on.is_empty() => None,
            Self::Extension(m) => Some(&m.depends_on),
        }
    }

    /// `true` for aliases.
    pub fn is_alias(&self) -> bool {
        matches!(self, Self::Alias(_))
    }

    /// File name the manifest is stored under inside archives and installs.
    pub fn file_name(&self) -> &'static str {
        if self.is_alias() {
            ALIAS_MANIFEST_FILE
        } else {
            EXTENSION_MANIFEST_FILE
        }
    }

    /// Record which armory vouched for this manifest.
    pub fn stamp(&mut self, armory_name: &str, armory_pk: &str) {
        let (name, pk) = match self {
            Self::Alias(m) => (&mut m.armory_name, &mut m.armory_pk),
            Self::Extension(m) => (&mut m.armory_name, &mut m.armory_pk),
        };
        armory_name.clone_into(name);
        armory_pk.clone_into(pk);
    }

    /// Public key of the armory this manifest was stamped with.
    pub fn armory_pk(&self) -> &str {
        match self {
            Self::Alias(m) => &m.armory_pk,
            Self::Extension(m) => &m.armory_pk,
        }
    }

    /// Name of the armory this manifest was stamped with.
    pub fn armory_name(&self) -> &str {
        match self {
            Self::Alias(m) => &m.armory_name,
            Self::Extension(m) => &m.armory_name,
        }
    }

    /// Artifact paths that apply to `platform`, across all commands.
    pub fn files_for(&self, platform: &Platform) -> Vec<&str> {
        let files: Vec<&ManifestFile> = match self {
            Self::Alias(m) => m.files.iter().collect(),
            Self::Extension(m) => m.commands.iter().flat_map(|c| c.files.iter()).collect(),
        };
        let mut paths: Vec<&str> = files
            .into_iter()
            .filter(|f| platform.matches(&f.os, &f.arch))
            .map(|f| f.path.as_str())
            .collect();
        paths.sort_unstable();
        paths.dedup();
        paths
    }

    /// Serialise for writing to disk.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Json`] if serialisation fails.
    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        let json = match self {
            Self::Alias(m) => serde_json::to_string_pretty(m)?,
            Self::Extension(m) => serde_json::to_string_pretty(m)?,
        };
        Ok(json)
    }
}
