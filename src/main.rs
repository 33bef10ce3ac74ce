use clap::Parser;
use containertool::config::Cli;
use containertool::error::{ContainerToolError, Result};
use containertool::http::auth::{Credential, CredentialProvider};
use containertool::logging::Logger;
use containertool::netrc::Netrc;
use containertool::publish::{publish, PublishRequest, Resource};
use containertool::reference::ImageReference;
use containertool::registry::RegistryClient;
use containertool::source::{ImageDestination, ImageSource, RemoteRegistry, ScratchSource};
use std::sync::Arc;

/// Consults a `.netrc`-backed provider first, falling back to a single
/// default username/password pair — the precedence order in §4.9.
struct CombinedCredentials {
    netrc: Option<Netrc>,
    default: Option<Credential>,
}

impl CredentialProvider for CombinedCredentials {
    fn credentials_for(&self, registry_host: &str) -> Option<Credential> {
        if let Some(netrc) = &self.netrc {
            if let Some(cred) = netrc.credentials_for(registry_host) {
                return Some(cred);
            }
        }
        self.default.clone()
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let logger = Logger::new(cli.verbose);

    match run(cli, &logger).await {
        Ok(reference) => println!("{reference}"),
        Err(err) => {
            logger.error(&err.to_string());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, logger: &Logger) -> Result<ImageReference> {
    let base = ImageReference::parse(&cli.from, &cli.default_registry)?;
    let destination = ImageReference::parse(&cli.repository, &cli.default_registry)?;

    let credentials = Arc::new(load_credentials(&cli)?);

    let source: Box<dyn ImageSource> = if base.is_scratch() {
        Box::new(ScratchSource::new("unknown", cli.os.clone()))
    } else {
        let client = RegistryClient::connect(&base.registry, cli.source_insecure(), credentials.clone()).await?;
        Box::new(RemoteRegistry::new(Arc::new(client)))
    };

    let destination_client =
        RegistryClient::connect(&destination.registry, cli.destination_insecure(), credentials.clone()).await?;
    let destination_sink: Box<dyn ImageDestination> = Box::new(RemoteRegistry::new(Arc::new(destination_client)));

    let request = PublishRequest {
        base,
        destination,
        executable: cli.executable.clone(),
        architecture: cli.architecture.clone(),
        os: cli.os.clone(),
        entrypoint: cli.entrypoint.clone(),
        cmd: cli.cmd.clone(),
        resources: cli.resources.iter().map(|r| Resource::parse(r)).collect(),
        tag: cli.tag.clone(),
    };

    publish(&request, source.as_ref(), destination_sink.as_ref(), logger).await
}

fn load_credentials(cli: &Cli) -> Result<CombinedCredentials> {
    let netrc = if cli.netrc_enabled() {
        let path = cli.netrc_file.clone().or_else(Netrc::default_path);
        match path {
            Some(path) if path.exists() => Some(Netrc::load(&path)?),
            _ => None,
        }
    } else {
        None
    };
    let default = match (&cli.username, &cli.password) {
        (Some(username), Some(password)) => Some(Credential {
            username: username.clone(),
            password: password.clone(),
        }),
        (None, None) => None,
        _ => {
            return Err(ContainerToolError::Config(
                "--username and --password must be given together".to_string(),
            ))
        }
    };
    Ok(CombinedCredentials { netrc, default })
}
