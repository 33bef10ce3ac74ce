//! High-level Distribution-Spec operations (C10): content negotiation,
//! two-shot blob upload, error decoding, and the authorize/retry-once flow
//! that ties C8 and C9 together for every request this client makes.

use crate::digest::Digest;
use crate::error::{ContainerToolError, Result};
use crate::http::auth::{parse_challenge, AuthChallenge, AuthHandler, CredentialProvider};
use crate::http::transport::{HttpResponse, RequestSpec, Transport};
use crate::oci::error::{DistributionErrors, Tags};
use crate::oci::{ImageConfiguration, ImageIndex, ImageManifest};
use reqwest::Method;
use std::sync::{Arc, Mutex};
use url::Url;

pub enum ManifestOrIndex {
    Manifest(ImageManifest),
    Index(ImageIndex),
}

pub struct RegistryClient {
    transport: Transport,
    base_url: Url,
    registry_host: String,
    credential_provider: Arc<dyn CredentialProvider + Send + Sync>,
    challenge: Mutex<Option<AuthChallenge>>,
}

impl RegistryClient {
    /// Connects to `registry_host`, scheme chosen per §4.10 (`http://` for
    /// `localhost`/`127.0.0.1`/`::1` or when `insecure` is set, `https://`
    /// otherwise), and verifies connectivity with a GET on `/v2/`, caching
    /// whatever `AuthChallenge` that request provokes.
    pub async fn connect(
        registry_host: &str,
        insecure: bool,
        credential_provider: Arc<dyn CredentialProvider + Send + Sync>,
    ) -> Result<Self> {
        let scheme = if insecure || is_local_host(registry_host) {
            "http"
        } else {
            "https"
        };
        let base_url = Url::parse(&format!("{scheme}://{registry_host}"))?;
        let transport = Transport::new(insecure)?;

        let client = Self {
            transport,
            base_url,
            registry_host: registry_host.to_string(),
            credential_provider,
            challenge: Mutex::new(None),
        };
        client.check_api().await?;
        Ok(client)
    }

    async fn check_api(&self) -> Result<()> {
        let url = self.base_url.join("/v2/")?;
        let spec = RequestSpec::new(Method::GET, url.to_string());
        match self.transport.execute(spec, 200).await {
            Ok(_) => Ok(()),
            Err(ContainerToolError::Unauthorized { www_authenticate, .. }) => {
                let raw = www_authenticate.ok_or_else(|| {
                    ContainerToolError::AuthChallenge("401 on /v2/ with no WWW-Authenticate header".to_string())
                })?;
                let challenge = parse_challenge(&raw)?;
                *self.challenge.lock().unwrap() = Some(challenge);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn repo_url(&self, repo: &str, rest: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!("/v2/{repo}/{rest}"))?)
    }

    async fn authorize(&self, challenge: &AuthChallenge, repo: &str, actions: &str) -> Result<String> {
        let credential = self.credential_provider.credentials_for(&self.registry_host);
        let scope = format!("repository:{repo}:{actions}");
        let handler = AuthHandler::new(&self.transport);
        handler.resolve(challenge, credential.as_ref(), Some(&scope)).await
    }

    /// Attach a cached authorization to `spec` if one exists, execute, and
    /// on a 401 parse the challenge from the response, cache it, and retry
    /// exactly once — at most one auth re-challenge per request.
    /// Any non-matching status is given a chance to decode as a
    /// `DistributionErrors` payload before it's surfaced to the caller.
    async fn call(
        &self,
        spec: RequestSpec,
        repo: &str,
        actions: &str,
        operation: &str,
        expected_status: u16,
    ) -> Result<HttpResponse> {
        let cached = self.challenge.lock().unwrap().clone();

        let result = if let Some(challenge) = &cached {
            let header = self.authorize(challenge, repo, actions).await?;
            let authorized = spec.clone().header("Authorization", header);
            match self.transport.execute(authorized, expected_status).await {
                Err(ContainerToolError::Unauthorized { www_authenticate, .. }) => {
                    self.retry_with_fresh_challenge(spec, www_authenticate, repo, actions, expected_status)
                        .await
                }
                other => other,
            }
        } else {
            match self.transport.execute(spec.clone(), expected_status).await {
                Err(ContainerToolError::Unauthorized { www_authenticate, .. }) => {
                    self.retry_with_fresh_challenge(spec, www_authenticate, repo, actions, expected_status)
                        .await
                }
                other => other,
            }
        };

        if let Err(ContainerToolError::UnexpectedStatus { body, .. }) = &result {
            if let Some(distribution_error) = decode_distribution_errors(repo, operation, body) {
                return Err(distribution_error);
            }
        }
        result
    }

    async fn retry_with_fresh_challenge(
        &self,
        spec: RequestSpec,
        www_authenticate: Option<String>,
        repo: &str,
        actions: &str,
        expected_status: u16,
    ) -> Result<HttpResponse> {
        let raw = www_authenticate
            .ok_or_else(|| ContainerToolError::AuthChallenge("401 with no WWW-Authenticate header".to_string()))?;
        let challenge = parse_challenge(&raw)?;
        let header = self.authorize(&challenge, repo, actions).await?;
        *self.challenge.lock().unwrap() = Some(challenge);
        let retried = spec.header("Authorization", header);
        self.transport.execute(retried, expected_status).await
    }

    pub async fn head_blob(&self, repo: &str, digest: &Digest) -> Result<bool> {
        let url = self.repo_url(repo, &format!("blobs/{digest}"))?;
        let spec = RequestSpec::new(Method::HEAD, url.to_string());
        match self.call(spec, repo, "pull", "head_blob", 200).await {
            Ok(_) => Ok(true),
            Err(ContainerToolError::UnexpectedStatus { status, .. }) if status == 404 => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn get_blob(&self, repo: &str, digest: &Digest) -> Result<Vec<u8>> {
        let url = self.repo_url(repo, &format!("blobs/{digest}"))?;
        let spec = RequestSpec::new(Method::GET, url.to_string())
            .header("Accept", crate::oci::MEDIA_TYPE_OCTET_STREAM);
        let response = self.call(spec, repo, "pull", "get_blob", 200).await?;
        Ok(response.body)
    }

    async fn start_blob_upload(&self, repo: &str) -> Result<Url> {
        let url = self.repo_url(repo, "blobs/uploads/")?;
        let spec = RequestSpec::new(Method::POST, url.to_string());
        let response = self.call(spec, repo, "push,pull", "start_blob_upload", 202).await?;
        let location = response
            .header("Location")
            .ok_or_else(|| ContainerToolError::MissingResponseHeader("Location".to_string()))?;
        resolve_against(&self.base_url, &location)
    }

    /// PUT the blob body to the POST-chosen location, appending `?digest=`
    /// as an additional query parameter — any existing ones (e.g. `state`,
    /// `uuid`) are left untouched (§4.10).
    async fn put_blob_data(&self, repo: &str, location: &Url, digest: &Digest, data: Vec<u8>) -> Result<()> {
        let mut put_url = location.clone();
        put_url.query_pairs_mut().append_pair("digest", &digest.to_string());

        let spec = RequestSpec::new(Method::PUT, put_url.to_string())
            .header("Content-Type", crate::oci::MEDIA_TYPE_OCTET_STREAM)
            .body(data);
        let response = self.call(spec, repo, "push,pull", "put_blob_data", 201).await?;

        if let Some(server_digest) = response.header("Docker-Content-Digest") {
            if server_digest != digest.to_string() {
                return Err(ContainerToolError::DigestMismatch {
                    what: format!("blob in {repo}"),
                    expected: digest.to_string(),
                    actual: server_digest,
                });
            }
        }
        Ok(())
    }

    /// Upload `data` as `digest` unless the registry already has it —
    /// `head_blob` first, then the POST-then-PUT two-shot flow.
    pub async fn upload_blob(&self, repo: &str, digest: &Digest, data: Vec<u8>) -> Result<()> {
        if self.head_blob(repo, digest).await? {
            return Ok(());
        }
        let location = self.start_blob_upload(repo).await?;
        self.put_blob_data(repo, &location, digest, data).await
    }

    /// Fetch a manifest or index by tag or digest. The declared `Accept`
    /// list covers both kinds; the body is decoded as a manifest first and,
    /// on failure, as an index (§4.10 — the server is not required to echo
    /// the requested media type).
    pub async fn get_manifest_or_index(&self, repo: &str, reference: &str) -> Result<ManifestOrIndex> {
        let url = self.repo_url(repo, &format!("manifests/{reference}"))?;
        let mut accept = crate::oci::manifest_accept_types();
        accept.extend(crate::oci::index_accept_types());
        let spec = RequestSpec::new(Method::GET, url.to_string()).header("Accept", accept.join(", "));
        let response = self.call(spec, repo, "pull", "get_manifest", 200).await?;
        decode_manifest_or_index(&response.body)
    }

    pub async fn get_image_configuration(&self, repo: &str, digest: &Digest) -> Result<ImageConfiguration> {
        let bytes = self.get_blob(repo, digest).await?;
        crate::json::decode(&bytes)
    }

    /// PUT `manifest`, at `reference` if given, else at the manifest's own
    /// digest. Returns the digest it was uploaded under.
    pub async fn put_manifest(&self, repo: &str, reference: Option<&str>, manifest: &ImageManifest) -> Result<Digest> {
        let bytes = crate::json::encode(manifest)?;
        let digest = Digest::sha256(&bytes);
        let path_ref = reference.unwrap_or_else(|| digest.hex());
        let ref_for_path = if reference.is_some() {
            path_ref.to_string()
        } else {
            digest.to_string()
        };
        let url = self.repo_url(repo, &format!("manifests/{ref_for_path}"))?;
        let media_type = manifest
            .media_type
            .clone()
            .unwrap_or_else(|| crate::oci::MEDIA_TYPE_OCI_MANIFEST.to_string());
        let spec = RequestSpec::new(Method::PUT, url.to_string())
            .header("Content-Type", media_type)
            .body(bytes);
        self.call(spec, repo, "push,pull", "put_manifest", 201).await?;
        Ok(digest)
    }

    pub async fn put_index(&self, repo: &str, reference: Option<&str>, index: &ImageIndex) -> Result<Digest> {
        let bytes = crate::json::encode(index)?;
        let digest = Digest::sha256(&bytes);
        let ref_for_path = match reference {
            Some(tag) => tag.to_string(),
            None => digest.to_string(),
        };
        let url = self.repo_url(repo, &format!("manifests/{ref_for_path}"))?;
        let media_type = index
            .media_type
            .clone()
            .unwrap_or_else(|| crate::oci::MEDIA_TYPE_OCI_INDEX.to_string());
        let spec = RequestSpec::new(Method::PUT, url.to_string())
            .header("Content-Type", media_type)
            .body(bytes);
        self.call(spec, repo, "push,pull", "put_index", 201).await?;
        Ok(digest)
    }

    pub async fn list_tags(&self, repo: &str) -> Result<Tags> {
        let url = self.repo_url(repo, "tags/list")?;
        let spec = RequestSpec::new(Method::GET, url.to_string());
        let response = self.call(spec, repo, "pull", "list_tags", 200).await?;
        crate::json::decode(&response.body)
    }
}

fn decode_manifest_or_index(body: &[u8]) -> Result<ManifestOrIndex> {
    if let Ok(manifest) = crate::json::decode::<ImageManifest>(body) {
        return Ok(ManifestOrIndex::Manifest(manifest));
    }
    let index = crate::json::decode::<ImageIndex>(body).map_err(|_| {
        ContainerToolError::ManifestIndexMismatch(
            "response body decoded as neither a manifest nor an index".to_string(),
        )
    })?;
    Ok(ManifestOrIndex::Index(index))
}

fn resolve_against(base: &Url, location: &str) -> Result<Url> {
    if let Ok(absolute) = Url::parse(location) {
        if absolute.scheme() == "http" || absolute.scheme() == "https" {
            return Ok(absolute);
        }
    }
    Ok(base.join(location)?)
}

fn is_local_host(host: &str) -> bool {
    let host = host.split(':').next().unwrap_or(host);
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Best-effort decode of a Distribution error payload for a non-success
/// response body. Operations call this when they want to surface the
/// registry's own error list instead of a bare status code.
pub fn decode_distribution_errors(repository: &str, operation: &str, body: &str) -> Option<ContainerToolError> {
    serde_json::from_str::<DistributionErrors>(body)
        .ok()
        .map(|parsed| ContainerToolError::Distribution {
            repository: repository.to_string(),
            operation: operation.to_string(),
            errors: parsed.errors,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_hosts_use_plain_http() {
        assert!(is_local_host("localhost"));
        assert!(is_local_host("127.0.0.1"));
        assert!(is_local_host("localhost:5000"));
        assert!(!is_local_host("registry.example.com"));
    }

    #[test]
    fn resolves_relative_location_against_base() {
        let base = Url::parse("https://registry.example.com").unwrap();
        let resolved = resolve_against(&base, "/v2/lib/foo/blobs/uploads/abc?state=xyz").unwrap();
        assert_eq!(resolved.as_str(), "https://registry.example.com/v2/lib/foo/blobs/uploads/abc?state=xyz");
    }

    #[test]
    fn resolves_absolute_location_verbatim() {
        let base = Url::parse("https://registry.example.com").unwrap();
        let resolved = resolve_against(&base, "https://blobstore.example.net/upload/abc").unwrap();
        assert_eq!(resolved.as_str(), "https://blobstore.example.net/upload/abc");
    }

    #[test]
    fn appending_digest_preserves_existing_query_params() {
        let mut url = Url::parse("https://registry.example.com/v2/foo/blobs/uploads/abc?state=xyz").unwrap();
        url.query_pairs_mut().append_pair("digest", "sha256:abc");
        assert_eq!(
            url.as_str(),
            "https://registry.example.com/v2/foo/blobs/uploads/abc?state=xyz&digest=sha256%3Aabc"
        );
    }
}
