//! WWW-Authenticate challenge handling and bearer token exchange (C9).

use crate::error::{ContainerToolError, Result};
use crate::http::transport::{HttpResponse, RequestSpec, Transport};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Method;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

/// Looks up credentials for a registry host. `.netrc` (§A4) and CLI-supplied
/// `--username`/`--password` both implement this.
pub trait CredentialProvider {
    fn credentials_for(&self, registry_host: &str) -> Option<Credential>;
}

pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn credentials_for(&self, _registry_host: &str) -> Option<Credential> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthChallenge {
    Basic { params: BTreeMap<String, String> },
    Bearer { params: BTreeMap<String, String> },
}

impl AuthChallenge {
    pub fn realm(&self) -> Option<&str> {
        self.param("realm")
    }

    pub fn service(&self) -> Option<&str> {
        self.param("service")
    }

    pub fn scope(&self) -> Option<&str> {
        self.param("scope")
    }

    fn param(&self, key: &str) -> Option<&str> {
        match self {
            AuthChallenge::Basic { params } | AuthChallenge::Bearer { params } => {
                params.get(key).map(|s| s.as_str())
            }
        }
    }
}

/// Parse a `WWW-Authenticate` header value into a challenge. Only the
/// leading scheme (`Basic`/`Bearer`) is matched specially; every
/// `key="value"` (or bare `key=value`) pair after it is kept, known or not,
/// so callers that need a parameter the parser doesn't name explicitly
/// still have access to it.
pub fn parse_challenge(header: &str) -> Result<AuthChallenge> {
    let header = header.trim();
    let (scheme, rest) = header
        .split_once(char::is_whitespace)
        .ok_or_else(|| ContainerToolError::AuthChallenge(format!("no scheme in '{header}'")))?;

    let params = parse_params(rest);

    match scheme.to_ascii_lowercase().as_str() {
        "basic" => Ok(AuthChallenge::Basic { params }),
        "bearer" => {
            if !params.contains_key("realm") {
                return Err(ContainerToolError::AuthChallenge(format!(
                    "Bearer challenge missing realm: '{header}'"
                )));
            }
            Ok(AuthChallenge::Bearer { params })
        }
        other => Err(ContainerToolError::AuthChallenge(format!(
            "unsupported auth scheme '{other}'"
        ))),
    }
}

fn parse_params(rest: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    for part in rest.split(',') {
        let part = part.trim();
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim().trim_matches('"');
        if !key.is_empty() {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Carries out the challenge/response dance and hands back an
/// `Authorization` header value to attach to the retried request.
pub struct AuthHandler<'a> {
    transport: &'a Transport,
}

impl<'a> AuthHandler<'a> {
    pub fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// Resolve `challenge` (as surfaced by a 401 response) into an
    /// `Authorization` header value, using `credential` if the provider
    /// found one for this host. `scope` lets a caller narrow a Bearer
    /// request to a repository-specific scope (e.g. `repository:foo:pull`)
    /// instead of whatever the challenge itself advertised.
    pub async fn resolve(
        &self,
        challenge: &AuthChallenge,
        credential: Option<&Credential>,
        scope: Option<&str>,
    ) -> Result<String> {
        match challenge {
            AuthChallenge::Basic { .. } => {
                let credential = credential.ok_or_else(|| {
                    ContainerToolError::NoCredentials("Basic auth requires credentials".to_string())
                })?;
                let raw = format!("{}:{}", credential.username, credential.password);
                Ok(format!("Basic {}", BASE64.encode(raw)))
            }
            AuthChallenge::Bearer { params } => {
                let realm = params
                    .get("realm")
                    .ok_or_else(|| ContainerToolError::AuthChallenge("missing realm".to_string()))?;
                let mut url = url::Url::parse(realm)?;
                {
                    let mut query = url.query_pairs_mut();
                    if let Some(service) = params.get("service") {
                        query.append_pair("service", service);
                    }
                    let effective_scope = scope.or_else(|| params.get("scope").map(|s| s.as_str()));
                    if let Some(scope) = effective_scope {
                        query.append_pair("scope", scope);
                    }
                }

                let mut spec = RequestSpec::new(Method::GET, url.to_string());
                if let Some(credential) = credential {
                    let raw = format!("{}:{}", credential.username, credential.password);
                    spec = spec.header("Authorization", format!("Basic {}", BASE64.encode(raw)));
                }

                let response = self.transport.execute(spec, 200).await?;
                let token = extract_token(&response)?;
                Ok(format!("Bearer {token}"))
            }
        }
    }
}

fn extract_token(response: &HttpResponse) -> Result<String> {
    let parsed: TokenResponse = serde_json::from_slice(&response.body)
        .map_err(|e| ContainerToolError::TokenExchange(format!("invalid token response: {e}")))?;
    parsed
        .token
        .or(parsed.access_token)
        .ok_or_else(|| ContainerToolError::TokenExchange("response had no token or access_token field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_challenge() {
        let challenge = parse_challenge(
            r#"Bearer realm="https://auth.example.com/token",service="registry.example.com",scope="repository:foo/bar:pull""#,
        )
        .unwrap();
        assert_eq!(challenge.realm(), Some("https://auth.example.com/token"));
        assert_eq!(challenge.service(), Some("registry.example.com"));
        assert_eq!(challenge.scope(), Some("repository:foo/bar:pull"));
    }

    #[test]
    fn parses_basic_challenge() {
        let challenge = parse_challenge(r#"Basic realm="registry""#).unwrap();
        assert!(matches!(challenge, AuthChallenge::Basic { .. }));
    }

    #[test]
    fn bearer_without_realm_is_rejected() {
        assert!(parse_challenge(r#"Bearer service="registry.example.com""#).is_err());
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(parse_challenge(r#"Digest realm="x""#).is_err());
    }

    #[test]
    fn unknown_params_are_preserved() {
        let challenge = parse_challenge(r#"Bearer realm="r",service="s",error="insufficient_scope""#).unwrap();
        match challenge {
            AuthChallenge::Bearer { params } => {
                assert_eq!(params.get("error").map(|s| s.as_str()), Some("insufficient_scope"));
            }
            _ => panic!("expected bearer"),
        }
    }
}
