//! `ImageSource`/`ImageDestination` over a remote registry (C10).

use crate::digest::Digest;
use crate::error::{ContainerToolError, Result};
use crate::oci::{ImageConfiguration, ImageIndex, ImageManifest};
use crate::registry::{ManifestOrIndex, RegistryClient};
use crate::source::{ImageDestination, ImageSource};
use async_trait::async_trait;
use std::sync::Arc;

/// Wraps a single registry connection so it can act as a source, a
/// destination, or both — the two halves of a publish run are typically
/// two different `RemoteRegistry` values over two different registries.
pub struct RemoteRegistry {
    client: Arc<RegistryClient>,
}

impl RemoteRegistry {
    pub fn new(client: Arc<RegistryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageSource for RemoteRegistry {
    async fn get_blob(&self, repository: &str, digest: &Digest) -> Result<Vec<u8>> {
        self.client.get_blob(repository, digest).await
    }

    async fn get_manifest(&self, repository: &str, reference: &str) -> Result<ImageManifest> {
        match self.client.get_manifest_or_index(repository, reference).await? {
            ManifestOrIndex::Manifest(m) => Ok(m),
            ManifestOrIndex::Index(_) => Err(ContainerToolError::ManifestIndexMismatch(format!(
                "{repository}:{reference} is an index, not a manifest"
            ))),
        }
    }

    async fn get_index(&self, repository: &str, reference: &str) -> Result<ImageIndex> {
        match self.client.get_manifest_or_index(repository, reference).await? {
            ManifestOrIndex::Index(i) => Ok(i),
            ManifestOrIndex::Manifest(_) => Err(ContainerToolError::ManifestIndexMismatch(format!(
                "{repository}:{reference} is a manifest, not an index"
            ))),
        }
    }

    async fn get_manifest_or_index(&self, repository: &str, reference: &str) -> Result<ManifestOrIndex> {
        self.client.get_manifest_or_index(repository, reference).await
    }

    async fn get_image_configuration(&self, repository: &str, digest: &Digest) -> Result<ImageConfiguration> {
        self.client.get_image_configuration(repository, digest).await
    }
}

#[async_trait]
impl ImageDestination for RemoteRegistry {
    async fn blob_exists(&self, repository: &str, digest: &Digest) -> Result<bool> {
        self.client.head_blob(repository, digest).await
    }

    async fn put_blob(&self, repository: &str, _media_type: &str, data: Vec<u8>) -> Result<Digest> {
        let digest = Digest::sha256(&data);
        self.client.upload_blob(repository, &digest, data).await?;
        Ok(digest)
    }

    async fn put_manifest(
        &self,
        repository: &str,
        reference: Option<&str>,
        manifest: &ImageManifest,
    ) -> Result<Digest> {
        self.client.put_manifest(repository, reference, manifest).await
    }

    async fn put_index(&self, repository: &str, reference: Option<&str>, index: &ImageIndex) -> Result<Digest> {
        self.client.put_index(repository, reference, index).await
    }
}
