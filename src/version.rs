//! Version and build information

use std::fmt;

/// Version of the `FusionPromptBlock` JSON layout handed to the generative client.
///
/// Bumped whenever a field is added, renamed, or its synthesized text changes,
/// since pre-generated payloads keyed by fingerprint become stale.
pub const FUSION_FORMAT_VERSION: u32 = 1;

/// Build information embedded at compile time
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub name: &'static str,
    pub git_hash: &'static str,
    git_dirty_str: &'static str,
    pub build_timestamp: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
}

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            name: env!("CARGO_PKG_NAME"),
            git_hash: env!("ROLESIM_GIT_HASH"),
            git_dirty_str: env!("ROLESIM_GIT_DIRTY"),
            build_timestamp: env!("ROLESIM_BUILD_TIMESTAMP"),
            target: env!("ROLESIM_TARGET"),
            profile: env!("ROLESIM_PROFILE"),
        }
    }

    pub fn git_dirty(&self) -> bool {
        self.git_dirty_str == "true"
    }

    /// Full version string, e.g. "0.1.0-abc12345"
    pub fn full_version(&self) -> String {
        if self.git_dirty() {
            format!("{}-{}-dirty", self.version, self.git_hash)
        } else {
            format!("{}-{}", self.version, self.git_hash)
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.full_version())?;
        writeln!(f)?;
        writeln!(f, "Build Information:")?;
        writeln!(f, "  Version:        {}", self.version)?;
        writeln!(f, "  Git Hash:       {}", self.git_hash)?;
        writeln!(f, "  Built:          {}", self.build_timestamp)?;
        writeln!(f, "  Profile:        {}", self.profile)?;
        writeln!(f, "  Target:         {}", self.target)?;
        writeln!(f)?;
        writeln!(f, "Payload Formats:")?;
        writeln!(f, "  Fusion block:   v{}", FUSION_FORMAT_VERSION)?;
        Ok(())
    }
}

pub fn build_info() -> BuildInfo {
    BuildInfo::current()
}

/// Print version information to stdout
pub fn print_version() {
    print!("{}", build_info());
}
