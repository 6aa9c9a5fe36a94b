//! Durable storage of trained pipelines

use super::pipeline::TrainedPipeline;
use crate::error::{AttritionError, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// File magic of a pipeline artifact
pub const ARTIFACT_MAGIC: [u8; 4] = *b"ATRP";

/// Payload layout version; bump on any change to the serialized types
pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

/// Reads and writes single-file pipeline artifacts.
///
/// Layout: 4-byte magic, little-endian `u32` format version, bincode payload.
/// Writes land in a temp file next to the target and are renamed into place,
/// so readers never observe a partial artifact.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    path: PathBuf,
}

impl ArtifactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn save(&self, pipeline: &TrainedPipeline) -> Result<()> {
        save(pipeline, &self.path)
    }

    pub fn load(&self) -> Result<TrainedPipeline> {
        load(&self.path)
    }
}

/// Serialize `pipeline` to `path` atomically, creating parent directories
pub fn save(pipeline: &TrainedPipeline, path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let payload = bincode::serialize(pipeline)
        .map_err(|e| AttritionError::SerializationError(format!("Failed to serialize pipeline: {}", e)))?;

    let tmp = NamedTempFile::new_in(&parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        writer.write_all(&ARTIFACT_MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&payload)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AttritionError::IoError(e.error))?;

    info!(
        path = %path.display(),
        bytes = payload.len() + HEADER_LEN,
        family = %pipeline.metadata().family,
        "Pipeline artifact saved"
    );
    Ok(())
}

/// Read a pipeline saved by [`save`]. Every failure, a missing file
/// included, is `ArtifactCorrupt`.
pub fn load(path: &Path) -> Result<TrainedPipeline> {
    let mut bytes = Vec::new();
    File::open(path)
        .and_then(|mut f| f.read_to_end(&mut bytes))
        .map_err(|e| AttritionError::ArtifactCorrupt(format!("{}: {}", path.display(), e)))?;
    decode(&bytes).map_err(|reason| AttritionError::ArtifactCorrupt(format!("{}: {}", path.display(), reason)))
}

fn decode(bytes: &[u8]) -> std::result::Result<TrainedPipeline, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("truncated header ({} bytes)", bytes.len()));
    }
    if bytes[..4] != ARTIFACT_MAGIC {
        return Err("not a pipeline artifact".to_string());
    }
    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[4..HEADER_LEN]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(format!(
            "unsupported format version {} (expected {})",
            version, FORMAT_VERSION
        ));
    }
    let pipeline: TrainedPipeline =
        bincode::deserialize(&bytes[HEADER_LEN..]).map_err(|e| format!("undecodable payload: {}", e))?;
    if !pipeline.preprocessor().is_fitted() {
        return Err("preprocessor is not fitted".to_string());
    }
    Ok(pipeline)
}
