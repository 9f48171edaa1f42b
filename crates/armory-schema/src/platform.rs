//! Target platform of installed artifacts.

/// Operating system and architecture used to pick artifacts from a manifest.
///
/// Manifests use Go-style names (`windows`/`linux`/`darwin`,
/// `amd64`/`386`/`arm64`); both sides are normalised before comparing so
/// `x86_64` and `amd64` match.
///
/// # Example
///
/// ```
/// use armory_schema::Platform;
///
/// let p = Platform::new("Windows", "x86_64");
/// assert!(p.matches("windows", "amd64"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Platform {
    os: String,
    arch: String,
}

impl Platform {
    /// Create a platform from any common spelling of os and arch.
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: normalize_os(os),
            arch: normalize_arch(arch),
        }
    }

    /// Get the platform this binary runs on.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Go-style OS name.
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Go-style architecture name.
    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// Returns `true` if a manifest entry for `os`/`arch` targets this platform.
    pub fn matches(&self, os: &str, arch: &str) -> bool {
        normalize_os(os) == self.os && normalize_arch(arch) == self.arch
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn normalize_os(os: &str) -> String {
    match os.to_lowercase().as_str() {
        "macos" | "darwin" | "osx" => "darwin".to_string(),
        "win" | "windows" => "windows".to_string(),
        other => other.to_string(),
    }
}

fn normalize_arch(arch: &str) -> String {
    match arch.to_lowercase().as_str() {
        "x86_64" | "amd64" | "x64" => "amd64".to_string(),
        "x86" | "386" | "i386" | "i686" => "386".to_string(),
        "aarch64" | "arm64" => "arm64".to_string(),
        other => other.to_string(),
    }
}
