//! External tool commands used by the CLI
//!
//! The library crates talk to the compiler and the declaration generator
//! through traits; the CLI implements those traits by spawning the commands
//! configured here.
//!
//! ```toml
//! [tools.compiler]
//! program = "civet"
//! args = ["--compile", "--inline-map", "--filename", "{filename}"]
//! strip_types_args = ["--js"]
//!
//! [tools.declaration_generator]
//! program = "node"
//! args = ["scripts/declarations.mjs"]
//! ```

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Placeholder replaced by the source file name in command arguments
pub const FILENAME_PLACEHOLDER: &str = "{filename}";

/// Commands the CLI spawns
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Alternate-syntax compiler: source on stdin, code on stdout
    pub compiler: CompilerCommand,
    /// Declaration generator: JSON request on stdin, JSON output on stdout
    pub declaration_generator: Option<CommandConfig>,
}

impl ToolsConfig {
    /// Check that every configured command names a program
    pub fn validate(&self) -> ConfigResult<()> {
        self.compiler.command.validate("tools.compiler.program")?;
        if let Some(generator) = &self.declaration_generator {
            generator.validate("tools.declaration_generator.program")?;
        }
        Ok(())
    }
}

/// A program and its arguments
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandConfig {
    /// Executable name or path
    pub program: String,
    /// Arguments; `{filename}` is replaced by the source file
    pub args: Vec<String>,
}

impl CommandConfig {
    /// Arguments with the file name placeholder filled in
    pub fn args_for(&self, filename: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(FILENAME_PLACEHOLDER, filename))
            .collect()
    }

    fn validate(&self, field: &str) -> ConfigResult<()> {
        if self.program.trim().is_empty() {
            return Err(ConfigError::invalid_value(field, "program must not be empty"));
        }
        Ok(())
    }
}

/// The compiler command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompilerCommand {
    /// Program and base arguments
    #[serde(flatten)]
    pub command: CommandConfig,
    /// Extra arguments passed when type annotations must be stripped
    pub strip_types_args: Vec<String>,
}

impl Default for CompilerCommand {
    fn default() -> Self {
        Self {
            command: CommandConfig {
                program: "civet".to_string(),
                args: vec![
                    "--compile".to_string(),
                    "--inline-map".to_string(),
                    "--filename".to_string(),
                    FILENAME_PLACEHOLDER.to_string(),
                ],
            },
            strip_types_args: vec!["--js".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_placeholder_is_substituted() {
        let compiler = CompilerCommand::default();
        let args = compiler.command.args_for("/src/a.civet");

        assert_eq!(args.last().map(String::as_str), Some("/src/a.civet"));
        assert!(!args.iter().any(|a| a.contains(FILENAME_PLACEHOLDER)));
    }

    #[test]
    fn test_empty_program_rejected() {
        let tools = ToolsConfig {
            declaration_generator: Some(CommandConfig::default()),
            ..Default::default()
        };

        let err = tools.validate().unwrap_err();
        assert!(err.to_string().contains("tools.declaration_generator.program"));
    }

    #[test]
    fn test_compiler_table_flattens_command() {
        let compiler: CompilerCommand = toml::from_str(
            r#"
            program = "npx"
            args = ["civet", "-c"]
            "#,
        )
        .unwrap();

        assert_eq!(compiler.command.program, "npx");
        assert_eq!(compiler.command.args, vec!["civet", "-c"]);
        assert_eq!(compiler.strip_types_args, vec!["--js"]);
    }
}
