//! Writes an OCI image layout to a tar file on disk (§4.11): `oci-layout`,
//! `blobs/<algo>/<hex>` for every blob, and the index duplicated at
//! `index.json` for tools that read a layout directly off disk without
//! unpacking the archive.
//!
//! Write-only: `blob_exists` always answers `false`, so the orchestrator's
//! base-layer copy step (§4.12 step 7) never skips a layer when the
//! destination is a fresh tar file.

use crate::digest::Digest;
use crate::error::Result;
use crate::oci::{ImageIndex, ImageManifest};
use crate::source::ImageDestination;
use crate::tar::TarWriter;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

const OCI_LAYOUT_CONTENTS: &str = r#"{"imageLayoutVersion":"1.0.0"}"#;

struct State {
    writer: TarWriter,
    initialized: bool,
}

pub struct TarFileDestination {
    output_path: PathBuf,
    state: Mutex<State>,
}

impl TarFileDestination {
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            output_path,
            state: Mutex::new(State {
                writer: TarWriter::new(),
                initialized: false,
            }),
        }
    }

    fn ensure_initialized(state: &mut State) -> Result<()> {
        if state.initialized {
            return Ok(());
        }
        state.writer.add_file("oci-layout", OCI_LAYOUT_CONTENTS.as_bytes())?;
        state.writer.add_directory("blobs/")?;
        state.initialized = true;
        Ok(())
    }

    /// Finalize the archive and write it to `output_path`. Consumes `self`
    /// because the `TarWriter` trailer can only be emitted once.
    pub fn finish(self) -> Result<()> {
        let mut state = self.state.into_inner().map_err(|_| {
            crate::error::ContainerToolError::Io("tar file destination lock was poisoned".to_string())
        })?;
        Self::ensure_initialized(&mut state)?;
        let bytes = state.writer.into_bytes();
        std::fs::write(&self.output_path, bytes)?;
        Ok(())
    }
}

#[async_trait]
impl ImageDestination for TarFileDestination {
    async fn blob_exists(&self, _repository: &str, _digest: &Digest) -> Result<bool> {
        Ok(false)
    }

    async fn put_blob(&self, _repository: &str, _media_type: &str, data: Vec<u8>) -> Result<Digest> {
        let digest = Digest::sha256(&data);
        let mut state = self.state.lock().unwrap();
        Self::ensure_initialized(&mut state)?;
        let path = format!("blobs/{}/{}", digest.algorithm().as_str(), digest.hex());
        state.writer.add_file(&path, &data)?;
        Ok(digest)
    }

    async fn put_manifest(
        &self,
        repository: &str,
        _reference: Option<&str>,
        manifest: &ImageManifest,
    ) -> Result<Digest> {
        let bytes = crate::json::encode(manifest)?;
        self.put_blob(repository, crate::oci::MEDIA_TYPE_OCI_MANIFEST, bytes).await
    }

    async fn put_index(&self, repository: &str, _reference: Option<&str>, index: &ImageIndex) -> Result<Digest> {
        let bytes = crate::json::encode(index)?;
        let digest = self.put_blob(repository, crate::oci::MEDIA_TYPE_OCI_INDEX, bytes.clone()).await?;
        let mut state = self.state.lock().unwrap();
        state.writer.add_file("index.json", &bytes)?;
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::{ContentDescriptor, Platform};

    #[tokio::test]
    async fn writes_layout_manifest_and_index_json() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("image.tar");
        let dest = TarFileDestination::new(out.clone());

        let blob_digest = dest.put_blob("repo", "application/octet-stream", b"hello".to_vec()).await.unwrap();
        let config = ContentDescriptor::new(crate::oci::MEDIA_TYPE_OCI_CONFIG, blob_digest.clone(), 5);
        let manifest = ImageManifest::new(config, Vec::new());
        let manifest_digest = dest.put_manifest("repo", None, &manifest).await.unwrap();

        let manifest_descriptor = ContentDescriptor::new(crate::oci::MEDIA_TYPE_OCI_MANIFEST, manifest_digest, 2)
            .with_platform(Platform::new("amd64", "linux"));
        let index = ImageIndex::single(manifest_descriptor);
        dest.put_index("repo", Some("latest"), &index).await.unwrap();
        dest.finish().unwrap();

        let bytes = std::fs::read(&out).unwrap();
        let mut archive = ::tar::Archive::new(std::io::Cursor::new(bytes));
        let mut names = Vec::new();
        for entry in archive.entries().unwrap() {
            let entry = entry.unwrap();
            names.push(entry.path().unwrap().to_string_lossy().to_string());
        }
        assert!(names.contains(&"oci-layout".to_string()));
        assert!(names.contains(&"index.json".to_string()));
        assert!(names.iter().any(|n| n.starts_with("blobs/sha256/")));
    }
}
