//! CLI surface (§6) and environment-variable seeding: a single publish
//! operation rather than a multi-subcommand tool, with `clap`'s `env`
//! attribute seeding defaults from `CONTAINERTOOL_*` variables.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "containertool",
    version,
    about = "Builds an OCI container image from a local executable and publishes it to a registry"
)]
pub struct Cli {
    /// Destination repository, e.g. `registry.example.com/ns/app:tag`.
    #[arg(long, env = "CONTAINERTOOL_REPOSITORY")]
    pub repository: String,

    /// Path to the executable to layer on top of the base image.
    pub executable: PathBuf,

    /// Base image reference; `scratch` builds on an empty base.
    #[arg(long, default_value = "swift:slim", env = "CONTAINERTOOL_BASE_IMAGE")]
    pub from: String,

    /// Override the ELF-derived container architecture.
    #[arg(long, env = "CONTAINERTOOL_ARCHITECTURE")]
    pub architecture: Option<String>,

    /// Target OS recorded in the image configuration.
    #[arg(long, default_value = "linux", env = "CONTAINERTOOL_OS")]
    pub os: String,

    /// User-visible tag for the published image; omit to tag by digest only.
    #[arg(long)]
    pub tag: Option<String>,

    /// Explicit entrypoint (comma-separated); defaults to `/<executable-basename>`.
    #[arg(long, value_delimiter = ',')]
    pub entrypoint: Option<Vec<String>>,

    /// Command arguments appended after the entrypoint (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub cmd: Vec<String>,

    /// Extra resource(s) to layer in, repeatable: `path` or `src:dst`.
    #[arg(long = "resources")]
    pub resources: Vec<String>,

    /// Default username for registries that require Basic auth.
    #[arg(long)]
    pub username: Option<String>,

    /// Default password for registries that require Basic auth.
    #[arg(long)]
    pub password: Option<String>,

    /// Consult `.netrc` for per-host credentials (on by default).
    #[arg(long, default_value_t = true, overrides_with = "disable_netrc")]
    pub enable_netrc: bool,

    /// Disable `.netrc` credential lookup.
    #[arg(long, overrides_with = "enable_netrc")]
    pub disable_netrc: bool,

    /// Override the `.netrc` file location (defaults to `~/.netrc`).
    #[arg(long)]
    pub netrc_file: Option<PathBuf>,

    /// Permit plaintext HTTP to the source registry, destination registry,
    /// or both.
    #[arg(long, value_enum)]
    pub allow_insecure_http: Option<InsecureScope>,

    /// Registry host used when a reference has no explicit host prefix.
    #[arg(long, default_value = "docker.io", env = "CONTAINERTOOL_DEFAULT_REGISTRY")]
    pub default_registry: String,

    /// Emit per-blob diagnostics to standard error.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InsecureScope {
    Source,
    Destination,
    Both,
}

impl Cli {
    pub fn netrc_enabled(&self) -> bool {
        self.enable_netrc && !self.disable_netrc
    }

    pub fn source_insecure(&self) -> bool {
        matches!(self.allow_insecure_http, Some(InsecureScope::Source) | Some(InsecureScope::Both))
    }

    pub fn destination_insecure(&self) -> bool {
        matches!(self.allow_insecure_http, Some(InsecureScope::Destination) | Some(InsecureScope::Both))
    }
}
