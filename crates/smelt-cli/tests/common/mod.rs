//! Common test utilities for CLI tests.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Compiler section that echoes the source back unchanged.
pub const CAT_COMPILER: &str = r#"
[tools.compiler]
program = "cat"
args = []
strip_types_args = []
"#;

/// A scratch project directory the binary runs in.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    /// Empty project without a config file.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Project with `smelt.toml` holding `config`.
    pub fn with_config(config: &str) -> Self {
        let project = Self::new();
        project.write("smelt.toml", config);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `name`, creating parent directories.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Canonical form of `name`, as the binary sees it.
    pub fn canonical(&self, name: &str) -> PathBuf {
        fs::canonicalize(self.path().join(name)).unwrap()
    }

    /// The binary, running inside the project with a clean environment.
    pub fn smelt(&self) -> Command {
        let mut cmd = Command::cargo_bin("smelt").unwrap();
        cmd.current_dir(self.path())
            .env_remove("SMELT_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }
}
