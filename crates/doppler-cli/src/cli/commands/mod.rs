use anyhow::Context;
use doppler_secrets::{ClientConfig, Provider, SecretsService, StoreConfig};

use super::args::{Cli, Command, GlobalArgs};
use crate::exit_codes::SUCCESS;

pub mod push;
pub mod secrets;

// One-shot process: the store never has caching enabled, so the id only
// labels log output.
const STORE_ID: &str = "cli";

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let service = build_service(&cli.global)?;

    match cli.cmd {
        Command::Auth => {
            service
                .validate()
                .await
                .context("authentication check failed")?;
            println!("token accepted by {}", service.client().base_url());
            Ok(SUCCESS)
        }
        Command::Get(args) => secrets::get(&service, args).await,
        Command::Download(args) => secrets::download(&service, args).await,
        Command::Push(args) => push::push(&service, args).await,
        Command::Delete(args) => push::delete(&service, args).await,
    }
}

fn client_config(global: &GlobalArgs) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &global.base_url {
        config = config.with_base_url(url.clone());
    }
    if global.insecure {
        config = config.with_verify_tls(false);
    }
    if let Some(secs) = global.timeout {
        config = config.with_timeout_secs(secs);
    }
    config
}

fn build_service(global: &GlobalArgs) -> anyhow::Result<SecretsService> {
    let store = StoreConfig::new(global.project.clone(), global.config.clone());
    let token = global.token.as_deref().unwrap_or_default();

    let service =
        Provider::new().new_client_with_config(STORE_ID, &store, token, client_config(global))?;
    Ok(service)
}
