use crate::oci::descriptor::ContentDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `{ schemaVersion=2, mediaType?, config, layers, annotations? }` (§3).
/// Layer order is significant: entry 0 is the base layer, the last entry is
/// the top layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageManifest {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub config: ContentDescriptor,
    pub layers: Vec<ContentDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

impl ImageManifest {
    pub fn new(config: ContentDescriptor, layers: Vec<ContentDescriptor>) -> Self {
        Self {
            schema_version: 2,
            media_type: Some(crate::oci::MEDIA_TYPE_OCI_MANIFEST.to_string()),
            config,
            layers,
            annotations: None,
        }
    }
}
