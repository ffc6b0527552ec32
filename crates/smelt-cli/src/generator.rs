//! Process-backed declaration generator

use crate::process::run_with_stdin;
use async_trait::async_trait;
use smelt_config::CommandConfig;
use smelt_core::{DeclarationGenerator, DeclarationOutput, DeclarationRequest, GeneratorError};

/// Sends each request as JSON on stdin and reads a JSON
/// `{ "text": ..., "map": ... }` object from stdout
#[derive(Debug, Clone)]
pub struct CommandDeclarationGenerator {
    command: CommandConfig,
}

impl CommandDeclarationGenerator {
    /// Generator spawning `command`
    pub fn new(command: CommandConfig) -> Self {
        Self { command }
    }
}

#[async_trait]
impl DeclarationGenerator for CommandDeclarationGenerator {
    async fn generate(
        &self,
        request: DeclarationRequest,
    ) -> Result<DeclarationOutput, GeneratorError> {
        let file = request.file_name.clone();
        let failed = |message: String| GeneratorError::Failed {
            file: file.clone(),
            message,
        };

        let input = serde_json::to_string(&request).map_err(|e| failed(e.to_string()))?;
        let args = self.command.args_for(&request.file_name);
        let output = run_with_stdin(&self.command, &args, input)
            .await
            .map_err(|e| {
                GeneratorError::Unavailable(format!("'{}': {}", self.command.program, e))
            })?;

        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| failed(format!("unreadable generator output: {}", e)))
    }
}
