//! Process-backed compiler adapter

use crate::process::run_with_stdin;
use async_trait::async_trait;
use regex::Regex;
use smelt_config::CompilerCommand;
use smelt_core::{CompileError, CompileOptions, CompileOutput, Compiler};
use std::sync::LazyLock;

static POSITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+):(\d+)\b").expect("valid regex"));

/// Runs the configured compiler command once per file
///
/// The source goes in on stdin and the compiled code is read from stdout.
/// A non-zero exit is a compile error; the first `line:column` found on
/// stderr becomes its position.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    command: CompilerCommand,
}

impl CommandCompiler {
    /// Compiler spawning `command`
    pub fn new(command: CompilerCommand) -> Self {
        Self { command }
    }

    fn args(&self, options: &CompileOptions) -> Vec<String> {
        let mut args = self.command.command.args_for(&options.filename);
        if options.strip_types {
            args.extend(self.command.strip_types_args.iter().cloned());
        }
        args
    }
}

#[async_trait]
impl Compiler for CommandCompiler {
    async fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompileError> {
        let program = &self.command.command.program;
        let output = run_with_stdin(&self.command.command, &self.args(options), source.to_string())
            .await
            .map_err(|e| {
                CompileError::new(&options.filename, format!("failed to run '{}': {}", program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(parse_diagnostic(&options.filename, &stderr, output.status.code()));
        }

        let code = String::from_utf8(output.stdout).map_err(|e| {
            CompileError::new(&options.filename, format!("compiler output is not UTF-8: {}", e))
        })?;
        Ok(CompileOutput::code(code))
    }
}

/// Turn compiler stderr into a positioned error
pub fn parse_diagnostic(filename: &str, stderr: &str, status: Option<i32>) -> CompileError {
    let message = stderr
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| match status {
            Some(code) => format!("compiler exited with status {}", code),
            None => "compiler terminated by signal".to_string(),
        });

    let error = CompileError::new(filename, message);
    let position = POSITION.captures(stderr).and_then(|caps| {
        let line = caps[1].parse::<u32>().ok()?;
        let column = caps[2].parse::<u32>().ok()?;
        Some((line, column))
    });

    match position {
        Some((line, column)) => error.at(line, column),
        None => error,
    }
}
