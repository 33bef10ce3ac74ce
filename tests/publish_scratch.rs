//! Black-box publish tests against endpoints that need no network: the
//! synthetic `scratch` base (§4.11) as source, and an on-disk OCI layout
//! tar (§4.11 item 3) as destination. Exercises the full §4.12 pipeline —
//! ELF auto-detection, tar/gzip layer construction, manifest/config/index
//! composition — without a registry.

use containertool::logging::Logger;
use containertool::publish::{publish, PublishRequest, Resource};
use containertool::reference::{ImageReference, Reference};
use containertool::source::{ScratchSource, TarFileDestination};
use std::io::Write;

fn write_fake_elf(path: &std::path::Path, machine: u16) {
    let mut header = vec![0u8; 64];
    header[0..4].copy_from_slice(&[0x7F, 0x45, 0x4C, 0x46]);
    header[4] = 2; // ELF64
    header[5] = 1; // little-endian
    header[6] = 1; // version
    header[16..18].copy_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    header[18..20].copy_from_slice(&machine.to_le_bytes());
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(&header).unwrap();
    file.write_all(b"rest of the fake executable body").unwrap();
}

fn destination_reference(tag: Option<&str>) -> ImageReference {
    ImageReference {
        registry: String::new(),
        repository: "local/app".to_string(),
        reference: match tag {
            Some(t) => Reference::Tag(t.to_string()),
            None => Reference::Tag("latest".to_string()),
        },
    }
}

#[tokio::test]
async fn publishes_scratch_base_with_executable_only() {
    let dir = tempfile::tempdir().unwrap();
    let exe_path = dir.path().join("hello");
    write_fake_elf(&exe_path, 0xB7); // aarch64 -> arm64

    let out_path = dir.path().join("image.tar");
    let destination = TarFileDestination::new(out_path.clone());
    let source = ScratchSource::new("unknown", "linux");
    let logger = Logger::new(false);

    let request = PublishRequest {
        base: ImageReference::scratch(),
        destination: destination_reference(Some("v1")),
        executable: exe_path,
        architecture: None,
        os: "linux".to_string(),
        entrypoint: None,
        cmd: Vec::new(),
        resources: Vec::new(),
        tag: Some("v1".to_string()),
    };

    let result = publish(&request, &source, &destination, &logger).await.unwrap();
    destination.finish().unwrap();

    assert_eq!(result.repository, "local/app");
    assert_eq!(result.reference, Reference::Tag("v1".to_string()));

    let bytes = std::fs::read(&out_path).unwrap();
    let mut archive = ::tar::Archive::new(std::io::Cursor::new(bytes));
    let mut saw_oci_layout = false;
    let mut saw_index_json = false;
    let mut blob_count = 0;
    for entry in archive.entries().unwrap() {
        let entry = entry.unwrap();
        let path = entry.path().unwrap().to_string_lossy().to_string();
        if path == "oci-layout" {
            saw_oci_layout = true;
        }
        if path == "index.json" {
            saw_index_json = true;
        }
        if path.starts_with("blobs/sha256/") {
            blob_count += 1;
        }
    }
    assert!(saw_oci_layout);
    assert!(saw_index_json);
    // config blob + one executable layer blob + manifest blob + index blob.
    assert_eq!(blob_count, 4);
}

#[tokio::test]
async fn publishes_with_a_resource_layer() {
    let dir = tempfile::tempdir().unwrap();
    let exe_path = dir.path().join("hello");
    write_fake_elf(&exe_path, 0x3E); // x86_64 -> amd64

    let resource_path = dir.path().join("config.json");
    std::fs::write(&resource_path, b"{\"key\":\"value\"}").unwrap();

    let out_path = dir.path().join("image.tar");
    let destination = TarFileDestination::new(out_path);
    let source = ScratchSource::new("unknown", "linux");
    let logger = Logger::new(false);

    let request = PublishRequest {
        base: ImageReference::scratch(),
        destination: destination_reference(None),
        executable: exe_path,
        architecture: None,
        os: "linux".to_string(),
        entrypoint: None,
        cmd: vec!["--flag".to_string()],
        resources: vec![Resource::parse(&format!("{}:etc/config.json", resource_path.display()))],
        tag: None,
    };

    let result = publish(&request, &source, &destination, &logger).await.unwrap();
    // No tag was given, so the result is addressed by the uploaded index digest.
    assert!(matches!(result.reference, Reference::Digest(_)));
}

#[tokio::test]
async fn rejects_architecture_that_cannot_be_auto_detected() {
    let dir = tempfile::tempdir().unwrap();
    let exe_path = dir.path().join("hello");
    write_fake_elf(&exe_path, 0x28); // 32-bit arm, not auto-detectable

    let out_path = dir.path().join("image.tar");
    let destination = TarFileDestination::new(out_path);
    let source = ScratchSource::new("unknown", "linux");
    let logger = Logger::new(false);

    let request = PublishRequest {
        base: ImageReference::scratch(),
        destination: destination_reference(Some("v1")),
        executable: exe_path,
        architecture: None,
        os: "linux".to_string(),
        entrypoint: None,
        cmd: Vec::new(),
        resources: Vec::new(),
        tag: Some("v1".to_string()),
    };

    let err = publish(&request, &source, &destination, &logger).await.unwrap_err();
    assert!(err.to_string().contains("architecture"));
}
