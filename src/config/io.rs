use crate::codec::{self, DocumentFormat};
use crate::error::{EditorError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::types::ConfigDocument;

/// Maximum size for an imported config file (10 MB).
pub const MAX_CONFIG_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Read and parse a configuration file picked by the user.
///
/// The format is chosen from the extension (JSON, JSON5, YAML, TOML).
/// Oversized files are rejected before they are read.
pub async fn read_document_file(path: &Path) -> Result<ConfigDocument> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_FILE_BYTES {
        return Err(EditorError::validation(
            path.display().to_string(),
            format!(
                "file is {} bytes, exceeds limit of {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_BYTES
            ),
        ));
    }

    let content = tokio::fs::read_to_string(path).await?;
    debug!("Read {} bytes from {}", content.len(), path.display());
    codec::deserialize_as(&content, DocumentFormat::from_path(path))
}

/// Write a document in canonical form.
pub async fn write_document_file(path: &Path, doc: &ConfigDocument) -> Result<()> {
    tokio::fs::write(path, codec::serialize(doc)?).await?;
    info!("Wrote configuration to {}", path.display());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
