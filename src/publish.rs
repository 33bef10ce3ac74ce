//! Publish orchestrator (C12): composes C1–C11 into the base-image →
//! new-image pipeline described in §4.12. Grounded on `cli/runner.rs`'s
//! phase-by-phase flow, generalized from cache-replay push to base-image
//! layering and from a single registry to independent source/destination
//! endpoints.

use crate::digest::Digest;
use crate::elf;
use crate::error::{ContainerToolError, Result};
use crate::logging::Logger;
use crate::oci::{
    ContentDescriptor, ImageConfiguration, ImageConfigurationSpec, ImageIndex, ImageManifest, Platform, RootFs,
};
use crate::reference::ImageReference;
use crate::registry::ManifestOrIndex;
use crate::source::{ImageDestination, ImageSource};
use crate::tar::TarWriter;
use chrono::Utc;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};

const CREATED_BY: &str = "containertool";

/// One `--resources` entry: a bare path archived under its own basename, or
/// an explicit `SRC:DST` pair archived at `DST` (§4.12 step 3).
#[derive(Debug, Clone)]
pub enum Resource {
    Path(PathBuf),
    Mapped { src: PathBuf, dst: String },
}

impl Resource {
    /// Parse a `--resources` CLI value: `path` or `src:dst`.
    pub fn parse(raw: &str) -> Resource {
        match raw.split_once(':') {
            Some((src, dst)) if !src.is_empty() && !dst.is_empty() => Resource::Mapped {
                src: PathBuf::from(src),
                dst: dst.to_string(),
            },
            _ => Resource::Path(PathBuf::from(raw)),
        }
    }

    fn source_path(&self) -> &Path {
        match self {
            Resource::Path(p) => p,
            Resource::Mapped { src, .. } => src,
        }
    }

    fn archive_name(&self) -> Result<String> {
        match self {
            Resource::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| ContainerToolError::InvalidTarName(p.display().to_string())),
            Resource::Mapped { dst, .. } => Ok(dst.clone()),
        }
    }
}

/// Input to a single publish run (§4.12).
pub struct PublishRequest {
    pub base: ImageReference,
    pub destination: ImageReference,
    pub executable: PathBuf,
    pub architecture: Option<String>,
    pub os: String,
    pub entrypoint: Option<Vec<String>>,
    pub cmd: Vec<String>,
    pub resources: Vec<Resource>,
    pub tag: Option<String>,
}

struct BuiltLayer {
    descriptor: ContentDescriptor,
    diff_id: Digest,
}

/// Run the full publish pipeline and return the image reference the caller
/// can now pull. `source` must resolve `request.base`'s repository/tag
/// (either a `RemoteRegistry` for the base's registry, or a `ScratchSource`
/// when `request.base.is_scratch()`); `destination` is the sink for
/// `request.destination`'s repository.
pub async fn publish(
    request: &PublishRequest,
    source: &dyn ImageSource,
    destination: &dyn ImageDestination,
    logger: &Logger,
) -> Result<ImageReference> {
    let architecture = resolve_architecture(request)?;
    logger.verbose(&format!("target architecture: {architecture}"));

    let base_repo = request.base.repository.as_str();
    let dest_repo = request.destination.repository.as_str();
    let base_ref = request.base.reference.to_string();

    logger.step(&format!("fetching base image {}", request.base));
    let base_manifest = fetch_base_manifest(source, base_repo, &base_ref, &architecture).await?;
    let base_config = source.get_image_configuration(base_repo, &base_manifest.config.digest).await?;

    logger.step("building resource layers");
    let resource_layers = try_join_all(
        request
            .resources
            .iter()
            .map(|resource| build_and_upload_layer_from_resource(resource, dest_repo, destination)),
    )
    .await?;

    logger.step("building executable layer");
    let exe_layer = build_and_upload_executable_layer(&request.executable, dest_repo, destination).await?;

    logger.step("composing image configuration");
    let diff_ids: Vec<Digest> = base_config
        .rootfs
        .diff_ids
        .iter()
        .cloned()
        .chain(resource_layers.iter().map(|l| l.diff_id.clone()))
        .chain(std::iter::once(exe_layer.diff_id.clone()))
        .collect();

    let exe_basename = request
        .executable
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ContainerToolError::InvalidTarName(request.executable.display().to_string()))?;
    let entrypoint = request
        .entrypoint
        .clone()
        .unwrap_or_else(|| vec![format!("/{exe_basename}")]);

    let mut config_spec = base_config.config.clone().unwrap_or_default();
    config_spec.entrypoint = Some(entrypoint);
    config_spec.cmd = request.cmd.clone();
    config_spec.working_dir = Some("/".to_string());

    let mut history = base_config.history.clone();
    history.push(crate::oci::config::HistoryEntry {
        created: Some(Utc::now()),
        author: None,
        created_by: Some(CREATED_BY.to_string()),
        comment: None,
        empty_layer: None,
    });

    let new_config = ImageConfiguration {
        created: Some(Utc::now()),
        author: base_config.author.clone(),
        architecture: architecture.clone(),
        os: request.os.clone(),
        config: Some(config_spec),
        rootfs: RootFs::layers(diff_ids),
        history,
    };
    let config_bytes = crate::json::encode(&new_config)?;
    let config_digest = destination
        .put_blob(dest_repo, crate::oci::MEDIA_TYPE_OCI_CONFIG, config_bytes.clone())
        .await?;
    let config_descriptor =
        ContentDescriptor::new(crate::oci::MEDIA_TYPE_OCI_CONFIG, config_digest, config_bytes.len() as u64);

    let layers: Vec<ContentDescriptor> = base_manifest
        .layers
        .iter()
        .cloned()
        .chain(resource_layers.iter().map(|l| l.descriptor.clone()))
        .chain(std::iter::once(exe_layer.descriptor.clone()))
        .collect();
    let new_manifest = ImageManifest::new(config_descriptor, layers);

    logger.step("copying base image layers");
    copy_base_layers(&base_manifest, base_repo, dest_repo, source, destination, logger).await?;

    logger.step("uploading manifest");
    let manifest_bytes = crate::json::encode(&new_manifest)?;
    let manifest_digest = Digest::sha256(&manifest_bytes);
    let uploaded_manifest_digest = destination
        .put_manifest(dest_repo, request.tag.as_deref(), &new_manifest)
        .await?;
    if uploaded_manifest_digest != manifest_digest {
        return Err(ContainerToolError::DigestMismatch {
            what: "manifest".to_string(),
            expected: manifest_digest.to_string(),
            actual: uploaded_manifest_digest.to_string(),
        });
    }

    logger.step("uploading image index");
    let manifest_descriptor = ContentDescriptor::new(
        new_manifest
            .media_type
            .clone()
            .unwrap_or_else(|| crate::oci::MEDIA_TYPE_OCI_MANIFEST.to_string()),
        manifest_digest.clone(),
        manifest_bytes.len() as u64,
    )
    .with_platform(Platform::new(architecture.clone(), request.os.clone()));
    let new_index = ImageIndex::single(manifest_descriptor);
    let index_digest = destination.put_index(dest_repo, request.tag.as_deref(), &new_index).await?;

    let reference = match &request.tag {
        Some(tag) => crate::reference::Reference::Tag(tag.clone()),
        None => crate::reference::Reference::Digest(index_digest),
    };
    Ok(ImageReference {
        registry: request.destination.registry.clone(),
        repository: request.destination.repository.clone(),
        reference,
    })
}

/// Resolve the image configuration's target architecture: the explicit
/// `--architecture` override, or auto-detection from the executable's ELF
/// header per §4.7 (only `x86_64`/`aarch64` auto-detect; anything else is
/// an error asking the caller to pass `--architecture`).
fn resolve_architecture(request: &PublishRequest) -> Result<String> {
    if let Some(arch) = &request.architecture {
        return Ok(arch.clone());
    }
    let elf = elf::read_elf_file(&request.executable)?;
    elf.machine.container_architecture().map(|s| s.to_string()).ok_or_else(|| {
        ContainerToolError::Config(format!(
            "cannot auto-detect container architecture for ELF machine {:?}; pass --architecture explicitly",
            elf.machine
        ))
    })
}

/// §4.12 step 1: fetch the base manifest, resolving through an index by
/// platform if the base reference names a multi-platform image.
async fn fetch_base_manifest(
    source: &dyn ImageSource,
    base_repo: &str,
    base_ref: &str,
    architecture: &str,
) -> Result<ImageManifest> {
    match source.get_manifest_or_index(base_repo, base_ref).await? {
        ManifestOrIndex::Manifest(m) => Ok(m),
        ManifestOrIndex::Index(index) => {
            let descriptor = index
                .select(architecture)
                .ok_or_else(|| ContainerToolError::NoSuitableBaseImage(architecture.to_string()))?;
            source.get_manifest(base_repo, &descriptor.digest.to_string()).await
        }
    }
}

async fn build_and_upload_layer_from_resource(
    resource: &Resource,
    dest_repo: &str,
    destination: &dyn ImageDestination,
) -> Result<BuiltLayer> {
    let archive_name = resource.archive_name()?;
    let mut writer = TarWriter::new();
    let path = resource.source_path();
    if path.is_dir() {
        writer.add_dir_recursive(path, &archive_name)?;
    } else {
        let data = std::fs::read(path)?;
        writer.add_file(&archive_name, &data)?;
    }
    build_and_upload_layer(writer, dest_repo, destination).await
}

async fn build_and_upload_executable_layer(
    executable: &Path,
    dest_repo: &str,
    destination: &dyn ImageDestination,
) -> Result<BuiltLayer> {
    let basename = executable
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ContainerToolError::InvalidTarName(executable.display().to_string()))?;
    let data = std::fs::read(executable)?;
    let mut writer = TarWriter::new();
    writer.add_file(&basename, &data)?;
    build_and_upload_layer(writer, dest_repo, destination).await
}

/// Shared tail of layer construction: tar the contents (uncompressed
/// `diff_id`), gzip it (compressed blob digest), and upload (§4.5, §4.6,
/// §4.10, invariant I1).
async fn build_and_upload_layer(
    writer: TarWriter,
    dest_repo: &str,
    destination: &dyn ImageDestination,
) -> Result<BuiltLayer> {
    let tar_bytes = writer.into_bytes();
    let diff_id = Digest::sha256(&tar_bytes);
    let blob = crate::gzip::compress(&tar_bytes)?;
    let digest = destination.put_blob(dest_repo, crate::oci::MEDIA_TYPE_LAYER_GZIP, blob.clone()).await?;
    let descriptor = ContentDescriptor::new(crate::oci::MEDIA_TYPE_LAYER_GZIP, digest, blob.len() as u64);
    Ok(BuiltLayer { descriptor, diff_id })
}

/// §4.12 step 7: HEAD-then-copy every base layer to the destination,
/// fanned out over independent requests since their upload targets are
/// disjoint by digest (§5).
async fn copy_base_layers(
    base_manifest: &ImageManifest,
    base_repo: &str,
    dest_repo: &str,
    source: &dyn ImageSource,
    destination: &dyn ImageDestination,
    logger: &Logger,
) -> Result<()> {
    try_join_all(base_manifest.layers.iter().map(|descriptor| async move {
        if destination.blob_exists(dest_repo, &descriptor.digest).await? {
            logger.verbose(&format!("layer {} already present at destination", descriptor.digest));
            return Ok(());
        }
        logger.verbose(&format!("copying layer {}", descriptor.digest));
        let data = source.get_blob(base_repo, &descriptor.digest).await?;
        let uploaded = destination.put_blob(dest_repo, &descriptor.media_type, data).await?;
        if uploaded != descriptor.digest {
            return Err(ContainerToolError::DigestMismatch {
                what: format!("base layer in {dest_repo}"),
                expected: descriptor.digest.to_string(),
                actual: uploaded.to_string(),
            });
        }
        Ok::<(), ContainerToolError>(())
    }))
    .await?;
    Ok(())
}
