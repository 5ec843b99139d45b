//! Common test utilities and fixtures
//!
//! A throwaway environment holding a config file plus whatever JSON inputs a
//! test writes next to it.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Temp directory with a rolesim config pointing its log file inside it
pub struct TestEnvironment {
    pub root: TempDir,
    pub config_path: PathBuf,
}

impl TestEnvironment {
    /// Bundled catalog and rubric, quiet console logging
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory");
        let config_path = root.path().join("config.toml");
        let env = Self { root, config_path };
        env.write_config("");
        env
    }

    /// Environment whose config carries `sections` ahead of the logging section
    pub fn with_sections(sections: &str) -> Self {
        let env = Self::new();
        env.write_config(sections);
        env
    }

    fn write_config(&self, sections: &str) {
        let config = format!(
            "{}\n[logging]\nlevel = \"warn\"\nfile = \"{}\"\nmax_files = 2\n",
            sections,
            self.root.path().join("logs").join("rolesim.log").display()
        );
        fs::write(&self.config_path, config).expect("Failed to write config");
    }

    /// Get the config path as a string
    pub fn config(&self) -> &str {
        self.config_path.to_str().unwrap()
    }

    /// Write a file into the environment and return its path
    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).expect("Failed to write fixture file");
        path
    }

    /// A rolesim command configured with this environment
    pub fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("rolesim").unwrap();
        cmd.arg("--config").arg(self.config());
        cmd
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

/// Small catalog with one entry per fusion dimension
pub const MINI_CATALOG: &str = r#"
version = "0.9.0"

[[moods]]
key = "wary"
label = "Wary"
description = "Guarded and slow to trust"

[[communication_styles]]
key = "terse"
label = "Terse"
description = "Short answers"
example = "Fine."

[[archetypes]]
key = "saver"
name = "The Saver"

[[age_groups]]
key = "any"
name = "Any Adult"
range = "18+"
"#;

/// Persona arguments valid against the bundled catalog
pub fn bundled_persona_args() -> Vec<&'static str> {
    vec![
        "--mood",
        "calm",
        "--style",
        "direct",
        "--archetype",
        "skeptic",
        "--age",
        "42",
        "--industry",
        "insurance",
    ]
}
