//! Black-box tests of the Distribution-Spec client (C10) against a mock
//! HTTP registry, grounded on the `httpmock`-based OCI registry test in
//! `examples/other_examples`'s `oci.rs` (`FakeOciServer`/`MockServer`
//! pattern). Exercises the two-shot blob upload, the Basic-auth
//! challenge/retry flow, and cross-origin redirect credential scrubbing
//! (§8 scenarios 6 and 8) against a real `reqwest` client and a real TCP
//! socket rather than unit-level fakes.

use base64::Engine;
use containertool::digest::Digest;
use containertool::http::auth::{Credential, CredentialProvider, NoCredentials};
use containertool::oci::{ContentDescriptor, ImageManifest};
use containertool::registry::{ManifestOrIndex, RegistryClient};
use httpmock::{Method::GET, Method::HEAD, Method::POST, Method::PUT, MockServer};
use std::sync::Arc;

struct StaticCredentials(Credential);

impl CredentialProvider for StaticCredentials {
    fn credentials_for(&self, _registry_host: &str) -> Option<Credential> {
        Some(self.0.clone())
    }
}

fn basic_auth_header(username: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn two_shot_blob_upload_preserves_location_query_and_appends_digest() {
    let server = MockServer::start();
    let data = b"layer contents".to_vec();
    let digest = Digest::sha256(&data);
    let digest_str = digest.to_string();

    let check_api = server.mock(|when, then| {
        when.method(GET).path("/v2/");
        then.status(200);
    });
    let head = server.mock(|when, then| {
        when.method(HEAD).path(format!("/v2/testrepo/blobs/{digest_str}"));
        then.status(404);
    });
    let start_upload = server.mock(|when, then| {
        when.method(POST).path("/v2/testrepo/blobs/uploads/");
        then.status(202)
            .header("Location", "/v2/testrepo/blobs/uploads/abc?state=xyz");
    });
    let put_data = server.mock(|when, then| {
        when.method(PUT)
            .path("/v2/testrepo/blobs/uploads/abc")
            .query_param("state", "xyz")
            .query_param("digest", &digest_str);
        then.status(201).header("Docker-Content-Digest", &digest_str);
    });

    let client = RegistryClient::connect(&server.address().to_string(), false, Arc::new(NoCredentials))
        .await
        .unwrap();
    client.upload_blob("testrepo", &digest, data).await.unwrap();

    check_api.assert();
    head.assert();
    start_upload.assert();
    put_data.assert();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn basic_challenge_on_connect_is_cached_and_attached_to_later_requests() {
    let server = MockServer::start();
    let credential = Credential {
        username: "alice".to_string(),
        password: "s3cr3t".to_string(),
    };
    let auth_header = basic_auth_header(&credential.username, &credential.password);

    let config_digest = Digest::sha256(b"{}");
    let manifest = ImageManifest::new(
        ContentDescriptor::new(containertool::oci::MEDIA_TYPE_OCI_CONFIG, config_digest.clone(), 2),
        Vec::new(),
    );
    let manifest_bytes = serde_json::to_vec(&manifest).unwrap();

    let check_api = server.mock(|when, then| {
        when.method(GET).path("/v2/");
        then.status(401).header("WWW-Authenticate", r#"Basic realm="registry.test""#);
    });
    let get_manifest = server.mock(|when, then| {
        when.method(GET)
            .path("/v2/testrepo/manifests/latest")
            .header("Authorization", &auth_header);
        then.status(200)
            .header("Content-Type", containertool::oci::MEDIA_TYPE_OCI_MANIFEST)
            .body(&manifest_bytes);
    });

    let client = RegistryClient::connect(
        &server.address().to_string(),
        false,
        Arc::new(StaticCredentials(credential)),
    )
    .await
    .unwrap();

    let result = client.get_manifest_or_index("testrepo", "latest").await.unwrap();
    match result {
        ManifestOrIndex::Manifest(m) => assert_eq!(m.config.digest, config_digest),
        ManifestOrIndex::Index(_) => panic!("expected a manifest"),
    }

    check_api.assert();
    get_manifest.assert();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn cross_origin_redirect_strips_authorization_header() {
    let registry = MockServer::start();
    let object_store = MockServer::start();

    let credential = Credential {
        username: "alice".to_string(),
        password: "s3cr3t".to_string(),
    };
    let auth_header = basic_auth_header(&credential.username, &credential.password);

    let blob = b"base layer bytes".to_vec();
    let digest = Digest::sha256(&blob);
    let digest_str = digest.to_string();
    let redirect_target = format!("http://{}/objects/{digest_str}", object_store.address());

    let check_api = registry.mock(|when, then| {
        when.method(GET).path("/v2/");
        then.status(401).header("WWW-Authenticate", r#"Basic realm="registry.test""#);
    });
    let get_blob = registry.mock(|when, then| {
        when.method(GET)
            .path(format!("/v2/testrepo/blobs/{digest_str}"))
            .header("Authorization", &auth_header);
        then.status(302).header("Location", &redirect_target);
    });
    let rejects_if_authorized = object_store.mock(|when, then| {
        when.method(GET)
            .path(format!("/objects/{digest_str}"))
            .header_exists("Authorization");
        then.status(400);
    });
    let serves_without_auth = object_store.mock(|when, then| {
        when.method(GET).path(format!("/objects/{digest_str}"));
        then.status(200).body(&blob);
    });

    let client = RegistryClient::connect(
        &registry.address().to_string(),
        false,
        Arc::new(StaticCredentials(credential)),
    )
    .await
    .unwrap();

    let fetched = client.get_blob("testrepo", &digest).await.unwrap();
    assert_eq!(fetched, blob);

    check_api.assert();
    get_blob.assert();
    rejects_if_authorized.assert_hits(0);
    serves_without_auth.assert();
}
