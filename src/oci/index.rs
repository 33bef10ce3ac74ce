use crate::oci::descriptor::ContentDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A multi-platform manifest list (§3): a set of platform-specific manifest
/// descriptors used to select the right one at pull time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageIndex {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub manifests: Vec<ContentDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl ImageIndex {
    pub fn single(manifest: ContentDescriptor) -> Self {
        Self {
            schema_version: 2,
            media_type: Some(crate::oci::MEDIA_TYPE_OCI_INDEX.to_string()),
            manifests: vec![manifest],
            annotations: None,
        }
    }

    /// Select the manifest descriptor whose `platform.architecture` matches,
    /// per the base-image platform-selection step in §4.12 step 1 — `os` is
    /// not part of the match.
    pub fn select(&self, architecture: &str) -> Option<&ContentDescriptor> {
        self.manifests.iter().find(|m| {
            m.platform
                .as_ref()
                .map(|p| p.architecture == architecture)
                .unwrap_or(false)
        })
    }
}
