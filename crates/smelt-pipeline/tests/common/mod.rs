//! Common test utilities for pipeline tests.

use smelt_config::PipelineConfig;
use smelt_core::test_support::mocks::{
    MapResolver, MemoryStorage, MockCompiler, MockDeclarationGenerator, RecordingStage,
};
use smelt_core::{HostPlugin, StagePlugin};
use smelt_pipeline::{DiagnosticsReceiver, DiagnosticsSink, Pipeline, PipelineBuilder};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Mocks shared by a pipeline under test, kept for assertions.
pub struct Harness {
    pub compiler: Arc<MockCompiler>,
    pub resolver: Arc<MapResolver>,
    pub storage: Arc<MemoryStorage>,
    pub generator: Arc<MockDeclarationGenerator>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            compiler: Arc::new(MockCompiler::new()),
            resolver: Arc::new(MapResolver::new()),
            storage: Arc::new(MemoryStorage::new()),
            generator: Arc::new(MockDeclarationGenerator::new()),
        }
    }

    /// Builder wired to every mock.
    pub fn builder(&self, config: PipelineConfig) -> PipelineBuilder {
        Pipeline::builder(config, self.compiler.clone())
            .resolver(self.resolver.clone())
            .source_reader(self.storage.clone())
            .declarations(self.generator.clone(), self.storage.clone())
    }

    /// Pipeline wired to every mock, reporting diagnostics to the returned receiver.
    pub fn pipeline(&self, config: PipelineConfig) -> (Pipeline, DiagnosticsReceiver) {
        let (sink, rx) = DiagnosticsSink::channel();
        let pipeline = self
            .builder(config)
            .diagnostics(sink)
            .build()
            .expect("pipeline should build");
        (pipeline, rx)
    }
}

/// Host plugin list exposing each stage under its own name.
pub fn host_plugins(stages: &[Arc<RecordingStage>]) -> Vec<Arc<dyn HostPlugin>> {
    stages
        .iter()
        .map(|stage| {
            let name = smelt_core::Stage::name(stage.as_ref()).to_string();
            Arc::new(StagePlugin::new(name, stage.clone())) as Arc<dyn HostPlugin>
        })
        .collect()
}

/// Create a temporary project with one source file.
///
/// Returns the temp directory (which must be kept alive) and the file path.
pub fn create_source_file(name: &str, content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("temp dir");
    let file_path = temp_dir.path().join(name);
    std::fs::write(&file_path, content).expect("write source");
    (temp_dir, file_path)
}
