//! Image reference parsing and validation (C1).

use crate::digest::Digest;
use crate::error::{ContainerToolError, Result};
use std::fmt;

/// A tagged union of human-readable tag vs. content digest (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Tag(String),
    Digest(Digest),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Tag(t) => write!(f, "{t}"),
            Reference::Digest(d) => write!(f, "{d}"),
        }
    }
}

/// `{ registry, repository, reference }` (§3). `scratch` is represented as
/// an empty registry with repository `"scratch"`; it disables source
/// fetching in the image-source layer (§4.11).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub reference: Reference,
}

const DEFAULT_TAG: &str = "latest";
const DOCKER_HUB_REGISTRY: &str = "docker.io";
const DOCKER_HUB_CANONICAL: &str = "index.docker.io";

impl ImageReference {
    pub fn is_scratch(&self) -> bool {
        self.registry.is_empty() && self.repository == "scratch"
    }

    pub fn scratch() -> ImageReference {
        ImageReference {
            registry: String::new(),
            repository: "scratch".to_string(),
            reference: Reference::Tag(DEFAULT_TAG.to_string()),
        }
    }

    /// Parse a reference string such as `repo`, `repo:tag`, `repo@digest`,
    /// or `host[:port]/repo[:tag|@digest]` per §3/§6. `default_registry`
    /// seeds the registry when the string has no host-like prefix.
    pub fn parse(raw: &str, default_registry: &str) -> Result<ImageReference> {
        if raw.is_empty() {
            return Err(ContainerToolError::InvalidReference {
                raw: raw.to_string(),
                reason: "empty string".to_string(),
            });
        }

        if raw == "scratch" {
            return Ok(ImageReference::scratch());
        }

        let (host_part, rest) = split_host(raw, default_registry);

        // Split reference suffix: '@digest' takes priority over the last ':'.
        let (path_and_tag, reference) = if let Some(at) = rest.find('@') {
            let digest = parse_digest(&rest[at + 1..])?;
            (&rest[..at], Reference::Digest(digest))
        } else if let Some(colon) = last_unescaped_colon(rest) {
            let tag = parse_tag(&rest[colon + 1..])?;
            (&rest[..colon], Reference::Tag(tag))
        } else {
            (rest, Reference::Tag(DEFAULT_TAG.to_string()))
        };

        let mut repository = parse_repository(path_and_tag)?;
        let mut registry = host_part.to_string();

        if registry == DOCKER_HUB_REGISTRY {
            registry = DOCKER_HUB_CANONICAL.to_string();
            if !repository.contains('/') {
                repository = format!("library/{repository}");
            }
        }

        Ok(ImageReference {
            registry,
            repository,
            reference,
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scratch() {
            return write!(f, "scratch:latest");
        }
        match &self.reference {
            Reference::Tag(t) => write!(f, "{}/{}:{}", self.registry, self.repository, t),
            Reference::Digest(d) => write!(f, "{}/{}@{}", self.registry, self.repository, d),
        }
    }
}

/// Split the leading registry host from the remainder, using the heuristic
/// in §3: a prefix looks like a host if it contains '.' or ':', or is
/// exactly `localhost`.
fn split_host<'a>(raw: &'a str, default_registry: &str) -> (String, &'a str) {
    match raw.find('/') {
        None => (default_registry.to_string(), raw),
        Some(slash) => {
            let prefix = &raw[..slash];
            if prefix.contains('.') || prefix.contains(':') || prefix == "localhost" {
                (prefix.to_string(), &raw[slash + 1..])
            } else {
                (default_registry.to_string(), raw)
            }
        }
    }
}

fn last_unescaped_colon(s: &str) -> Option<usize> {
    // A ':' that is part of a host:port in the repository path can't occur
    // here because the host was already split off; any remaining ':' before
    // a '/' would be ambiguous with a port, so only consider the ':' that
    // follows the last '/'.
    let after_last_slash = s.rfind('/').map(|i| i + 1).unwrap_or(0);
    s[after_last_slash..].rfind(':').map(|i| after_last_slash + i)
}

fn is_repo_component_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_' || c == '-'
}

/// Validate `[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*(\/[a-z0-9]+((\.|_|__|-+)[a-z0-9]+)*)*`.
pub fn parse_repository(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(ContainerToolError::InvalidReference {
            raw: raw.to_string(),
            reason: "empty repository".to_string(),
        });
    }
    if raw.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ContainerToolError::InvalidReference {
            raw: raw.to_string(),
            reason: "repository must be lowercase".to_string(),
        });
    }
    for component in raw.split('/') {
        if !is_valid_repo_component(component) {
            return Err(ContainerToolError::InvalidReference {
                raw: raw.to_string(),
                reason: format!("invalid repository component '{component}'"),
            });
        }
    }
    Ok(raw.to_string())
}

fn is_valid_repo_component(component: &str) -> bool {
    if component.is_empty() {
        return false;
    }
    let bytes: Vec<char> = component.chars().collect();
    if !bytes.iter().all(|&c| is_repo_component_char(c)) {
        return false;
    }
    // Must start and end with an alphanumeric.
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return false;
    }
    // No run of separators may itself be invalid: a '.', '_' or run of '-'
    // must be flanked by alphanumerics (no consecutive separators except
    // exactly two underscores).
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_alphanumeric() {
            i += 1;
            continue;
        }
        let start = i;
        if bytes[i] == '.' {
            i += 1;
        } else if bytes[i] == '_' {
            i += 1;
            if i < bytes.len() && bytes[i] == '_' {
                i += 1;
            }
        } else if bytes[i] == '-' {
            while i < bytes.len() && bytes[i] == '-' {
                i += 1;
            }
        } else {
            return false;
        }
        if start == i {
            return false;
        }
        if i >= bytes.len() || !bytes[i].is_ascii_alphanumeric() {
            return false;
        }
    }
    true
}

/// OCI tag regex: `[a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}`.
pub fn parse_tag(raw: &str) -> Result<String> {
    let valid = !raw.is_empty()
        && raw.len() <= 128
        && raw
            .chars()
            .next()
            .map(|c| c.is_ascii_alphanumeric() || c == '_')
            .unwrap_or(false)
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
    if !valid {
        return Err(ContainerToolError::InvalidReference {
            raw: raw.to_string(),
            reason: "invalid tag format".to_string(),
        });
    }
    Ok(raw.to_string())
}

pub fn parse_digest(raw: &str) -> Result<Digest> {
    Digest::parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_io_default_prepends_library() {
        let r = ImageReference::parse("docker.io/swift:slim", "docker.io").unwrap();
        assert_eq!(r.registry, "index.docker.io");
        assert_eq!(r.repository, "library/swift");
        assert_eq!(r.reference, Reference::Tag("slim".to_string()));
    }

    #[test]
    fn bare_name_uses_default_registry_and_library_prefix() {
        let r = ImageReference::parse("swift:slim", "docker.io").unwrap();
        assert_eq!(r.registry, "index.docker.io");
        assert_eq!(r.repository, "library/swift");
    }

    #[test]
    fn localhost_with_port_and_invalid_tag_char_is_rejected() {
        let err = ImageReference::parse("localhost:5000/hello^world", "docker.io").unwrap_err();
        match err {
            ContainerToolError::InvalidReference { raw, .. } => assert_eq!(raw, "hello^world"),
            other => panic!("expected InvalidReference, got {other:?}"),
        }
    }

    #[test]
    fn explicit_digest_reference() {
        let hex = "a".repeat(64);
        let r = ImageReference::parse(
            &format!("registry.example.com/foo/bar@sha256:{hex}"),
            "docker.io",
        )
        .unwrap();
        assert_eq!(r.registry, "registry.example.com");
        assert_eq!(r.repository, "foo/bar");
        assert!(matches!(r.reference, Reference::Digest(_)));
    }

    #[test]
    fn scratch_has_no_registry_and_disables_fetch() {
        let r = ImageReference::parse("scratch", "docker.io").unwrap();
        assert!(r.is_scratch());
        assert_eq!(r.to_string(), "scratch:latest");
    }

    #[test]
    fn uppercase_repository_is_rejected() {
        let err = ImageReference::parse("Foo/bar", "docker.io").unwrap_err();
        assert!(matches!(err, ContainerToolError::InvalidReference { .. }));
    }

    #[test]
    fn custom_registry_with_port_is_preserved() {
        let r = ImageReference::parse("registry.example.com:5000/ns/app:v1", "docker.io").unwrap();
        assert_eq!(r.registry, "registry.example.com:5000");
        assert_eq!(r.repository, "ns/app");
    }
}
