//! Polymorphic image source/sink abstractions (C11).
//!
//! Generalizes `registry/oci_client.rs`'s variant-dispatch style (one
//! struct branching internally on where an image came from) into an
//! explicit capability-set split: the publish orchestrator (C12) is
//! written against these two traits only and never knows whether it is
//! talking to a remote registry, the synthetic `scratch` base, or a tar
//! file on disk.

mod remote;
mod scratch;
mod tar_file;

pub use remote::RemoteRegistry;
pub use scratch::ScratchSource;
pub use tar_file::TarFileDestination;

use crate::digest::Digest;
use crate::error::Result;
use crate::oci::{ImageConfiguration, ImageIndex, ImageManifest};
use crate::registry::ManifestOrIndex;
use async_trait::async_trait;

/// Read side of the image graph: manifests, indexes, configs, and blobs by
/// digest. Every operation listed in §4.11.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn get_blob(&self, repository: &str, digest: &Digest) -> Result<Vec<u8>>;
    async fn get_manifest(&self, repository: &str, reference: &str) -> Result<ImageManifest>;
    async fn get_index(&self, repository: &str, reference: &str) -> Result<ImageIndex>;
    /// Fetch `reference` without committing to manifest-vs-index up front,
    /// for the base-image step in §4.12 that must discover which one it got.
    async fn get_manifest_or_index(&self, repository: &str, reference: &str) -> Result<ManifestOrIndex>;
    async fn get_image_configuration(&self, repository: &str, digest: &Digest) -> Result<ImageConfiguration>;
}

/// Write side of the image graph.
#[async_trait]
pub trait ImageDestination: Send + Sync {
    async fn blob_exists(&self, repository: &str, digest: &Digest) -> Result<bool>;
    /// Upload `data` under `media_type`, returning the digest it was stored
    /// under (computed locally from `data`, per I1/I2 — callers use this
    /// return value as the descriptor's digest rather than recomputing it).
    async fn put_blob(&self, repository: &str, media_type: &str, data: Vec<u8>) -> Result<Digest>;
    async fn put_manifest(
        &self,
        repository: &str,
        reference: Option<&str>,
        manifest: &ImageManifest,
    ) -> Result<Digest>;
    async fn put_index(&self, repository: &str, reference: Option<&str>, index: &ImageIndex) -> Result<Digest>;
}
