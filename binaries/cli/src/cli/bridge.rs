use a4c_client::{ClientConfig, ProtocolClients};
use a4c_interface::ServiceBundle;
use anyhow::{Context, Result};
use tracing::debug;

/// Connection overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub url: Option<String>,
    pub insecure: bool,
}

/// Environment configuration with command line overrides applied on top.
pub fn client_config(overrides: &ConnectionOverrides) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("invalid client environment")?;
    if let Some(url) = &overrides.url {
        config = config.with_base_url(url.clone());
    }
    if overrides.insecure {
        config = config.with_skip_cert_verification(true);
    }
    Ok(config)
}

pub fn default_service_bundle(overrides: &ConnectionOverrides) -> Result<ServiceBundle> {
    let config = client_config(overrides)?;
    debug!(base_url = %config.base_url, "connecting to platform");
    let clients = ProtocolClients::new(&config)
        .with_context(|| format!("failed to initialize clients for {}", config.base_url))?;
    Ok(clients.service_bundle())
}
