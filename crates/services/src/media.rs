//! Local media storage for uploaded audio chunks. Files land under
//! `{root}/{salon}/{date}/{session}/chunk_NNNN.wav` and are served back
//! over the `/media` static mount, so the stored URL is the same one
//! handed to the diarization service.

use bson::oid::ObjectId;
use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub path: PathBuf,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a chunk's audio to disk and returns its path and public
    /// URL. Re-uploading the same chunk overwrites in place.
    pub async fn store_chunk(
        &self,
        salon_id: ObjectId,
        session_id: ObjectId,
        chunk_index: i32,
        bytes: &[u8],
    ) -> io::Result<StoredAudio> {
        let rel = format!(
            "{}/{}/{}/chunk_{:04}.wav",
            salon_id.to_hex(),
            Utc::now().format("%Y-%m-%d"),
            session_id.to_hex(),
            chunk_index
        );
        let path = self.root.join(&rel);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "Stored audio chunk");

        Ok(StoredAudio {
            path,
            url: format!("{}/media/{rel}", self.public_base_url.trim_end_matches('/')),
        })
    }
}
