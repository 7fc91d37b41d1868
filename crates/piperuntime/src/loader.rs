// crates/piperuntime/src/loader.rs
use crate::PipelineConfig;
use pipecore::{FlowError, PipelineSpec};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read a JSON pipeline definition from disk.
pub fn load_spec(path: impl AsRef<Path>) -> Result<PipelineSpec, FlowError> {
    let path = path.as_ref();
    tracing::debug!("Loading pipeline spec from {}", path.display());
    let spec = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(spec)
}

/// Read a JSON pipeline configuration from disk. Missing fields take their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig, FlowError> {
    let config = serde_json::from_reader(BufReader::new(File::open(path.as_ref())?))?;
    Ok(config)
}
