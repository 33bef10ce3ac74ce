//! `.netrc` credential provider (A4, §6).
//!
//! A `CredentialProvider` implementation: given a URL (really just its
//! host), return an optional `(user, password)` pair. Parsing follows
//! standard `.netrc` semantics — explicit `machine <host>` entries, an
//! optional trailing `default` entry that must be the last token group in
//! the file, and last-duplicate-wins when a host appears more than once.

use crate::error::{ContainerToolError, Result};
use crate::http::auth::{Credential, CredentialProvider};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Netrc {
    machines: HashMap<String, Credential>,
    default: Option<Credential>,
}

impl Netrc {
    pub fn parse(contents: &str) -> Result<Netrc> {
        let tokens: Vec<&str> = contents.split_whitespace().collect();
        let mut netrc = Netrc::default();
        let mut i = 0;
        let mut seen_default = false;

        while i < tokens.len() {
            match tokens[i] {
                "machine" => {
                    if seen_default {
                        return Err(ContainerToolError::Config(
                            "netrc: 'default' entry must be the last entry in the file".to_string(),
                        ));
                    }
                    let host = *tokens.get(i + 1).ok_or_else(|| {
                        ContainerToolError::Config("netrc: 'machine' with no host".to_string())
                    })?;
                    let (login, password, consumed) = parse_entry_fields(&tokens[i + 2..]);
                    if let (Some(login), Some(password)) = (login, password) {
                        netrc.machines.insert(
                            host.to_string(),
                            Credential {
                                username: login,
                                password,
                            },
                        );
                    }
                    i += 2 + consumed;
                }
                "default" => {
                    seen_default = true;
                    let (login, password, consumed) = parse_entry_fields(&tokens[i + 1..]);
                    if let (Some(login), Some(password)) = (login, password) {
                        netrc.default = Some(Credential {
                            username: login,
                            password,
                        });
                    }
                    i += 1 + consumed;
                }
                _ => i += 1,
            }
        }
        Ok(netrc)
    }

    pub fn load(path: &Path) -> Result<Netrc> {
        let contents = std::fs::read_to_string(path)?;
        Netrc::parse(&contents)
    }

    pub fn default_path() -> Option<std::path::PathBuf> {
        dirs_home().map(|home| home.join(".netrc"))
    }

    fn lookup(&self, host: &str) -> Option<Credential> {
        self.machines.get(host).cloned().or_else(|| self.default.clone())
    }
}

impl CredentialProvider for Netrc {
    fn credentials_for(&self, registry_host: &str) -> Option<Credential> {
        let host = registry_host.split(':').next().unwrap_or(registry_host);
        self.lookup(host)
    }
}

/// Read `login`/`password`/`account` tokens following a `machine`/`default`
/// keyword, stopping at the next recognized keyword or end of input.
/// Returns `(login, password, tokens_consumed)`.
fn parse_entry_fields(tokens: &[&str]) -> (Option<String>, Option<String>, usize) {
    let mut login = None;
    let mut password = None;
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "machine" | "default" => break,
            "login" => {
                login = tokens.get(i + 1).map(|s| s.to_string());
                i += 2;
            }
            "password" => {
                password = tokens.get(i + 1).map(|s| s.to_string());
                i += 2;
            }
            "account" | "macdef" => {
                i += 2;
            }
            _ => {
                i += 1;
            }
        }
    }
    (login, password, i)
}

fn dirs_home() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(std::path::PathBuf::from)
}
