//! In-memory model of the OCI image graph (C3): manifests, indexes,
//! configurations, descriptors, platforms, and distribution error payloads.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod index;
pub mod manifest;
pub mod platform;

pub use config::{ImageConfiguration, ImageConfigurationSpec, RootFs};
pub use descriptor::ContentDescriptor;
pub use index::ImageIndex;
pub use manifest::ImageManifest;
pub use platform::Platform;

pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
pub const MEDIA_TYPE_OCI_CONFIG: &str = "application/vnd.oci.image.config.v1+json";
pub const MEDIA_TYPE_LAYER_GZIP: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
pub const MEDIA_TYPE_OCTET_STREAM: &str = "application/octet-stream";

pub fn manifest_accept_types() -> Vec<&'static str> {
    vec![MEDIA_TYPE_OCI_MANIFEST, MEDIA_TYPE_DOCKER_MANIFEST]
}

pub fn index_accept_types() -> Vec<&'static str> {
    vec![MEDIA_TYPE_OCI_INDEX, MEDIA_TYPE_DOCKER_MANIFEST_LIST]
}
