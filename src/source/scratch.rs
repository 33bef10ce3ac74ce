//! The synthetic `scratch` base image (§4.11): an empty layer list, a
//! single-entry index pointing at that empty manifest, and a minimal
//! configuration with no `diff_ids`. Used whenever `--from scratch` is
//! given, so the publish pipeline produces an image containing nothing but
//! the caller's own layers.

use crate::digest::Digest;
use crate::error::Result;
use crate::oci::{ContentDescriptor, ImageConfiguration, ImageIndex, ImageManifest, Platform, RootFs};
use crate::registry::ManifestOrIndex;
use crate::source::ImageSource;
use async_trait::async_trait;

pub struct ScratchSource {
    architecture: String,
    os: String,
}

impl ScratchSource {
    pub fn new(architecture: impl Into<String>, os: impl Into<String>) -> Self {
        Self {
            architecture: architecture.into(),
            os: os.into(),
        }
    }

    fn empty_manifest(&self) -> Result<ImageManifest> {
        let config = ImageConfiguration {
            created: None,
            author: None,
            architecture: self.architecture.clone(),
            os: self.os.clone(),
            config: None,
            rootfs: RootFs::layers(Vec::new()),
            history: Vec::new(),
        };
        let config_bytes = crate::json::encode(&config)?;
        let config_digest = Digest::sha256(&config_bytes);
        let config_descriptor =
            ContentDescriptor::new(crate::oci::MEDIA_TYPE_OCI_CONFIG, config_digest, config_bytes.len() as u64);
        Ok(ImageManifest::new(config_descriptor, Vec::new()))
    }
}

#[async_trait]
impl ImageSource for ScratchSource {
    async fn get_blob(&self, _repository: &str, _digest: &Digest) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    async fn get_manifest(&self, _repository: &str, _reference: &str) -> Result<ImageManifest> {
        self.empty_manifest()
    }

    async fn get_index(&self, _repository: &str, _reference: &str) -> Result<ImageIndex> {
        let manifest = self.empty_manifest()?;
        let bytes = crate::json::encode(&manifest)?;
        let digest = Digest::sha256(&bytes);
        let descriptor = ContentDescriptor::new(crate::oci::MEDIA_TYPE_OCI_MANIFEST, digest, bytes.len() as u64)
            .with_platform(Platform::new(self.architecture.clone(), self.os.clone()));
        Ok(ImageIndex::single(descriptor))
    }

    async fn get_manifest_or_index(&self, repository: &str, reference: &str) -> Result<ManifestOrIndex> {
        Ok(ManifestOrIndex::Manifest(self.get_manifest(repository, reference).await?))
    }

    async fn get_image_configuration(&self, _repository: &str, _digest: &Digest) -> Result<ImageConfiguration> {
        Ok(ImageConfiguration {
            created: None,
            author: None,
            architecture: self.architecture.clone(),
            os: self.os.clone(),
            config: None,
            rootfs: RootFs::layers(Vec::new()),
            history: Vec::new(),
        })
    }
}
