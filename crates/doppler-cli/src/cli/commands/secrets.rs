use std::io::Write;

use anyhow::Context;
use doppler_secrets::{SecretsRequest, SecretsResponse, SecretsService};

use crate::cli::args::{DownloadArgs, GetArgs};
use crate::exit_codes::SUCCESS;

pub async fn get(service: &SecretsService, args: GetArgs) -> anyhow::Result<i32> {
    let secret = service.get_secret(&args.name).await?;
    println!("{}", secret.value);
    Ok(SUCCESS)
}

pub async fn download(service: &SecretsService, args: DownloadArgs) -> anyhow::Result<i32> {
    let request = download_request(service, args);
    let response = service.get_secrets(&request).await?;

    if let Some(etag) = &response.etag {
        tracing::info!(etag = %etag, not_modified = response.not_modified, "downloaded secrets");
    }
    write_response(&mut std::io::stdout().lock(), &response)?;
    Ok(SUCCESS)
}

fn download_request(service: &SecretsService, args: DownloadArgs) -> SecretsRequest {
    let store = service.store();
    let mut request =
        SecretsRequest::new(&store.project, &store.config).with_secret_names(args.secrets);
    request.name_transformer = args.name_transformer;
    request.format = args.format;
    request.etag = args.etag;
    request
}

fn write_response(out: &mut impl Write, response: &SecretsResponse) -> anyhow::Result<()> {
    if response.not_modified {
        return Ok(());
    }
    match &response.secrets {
        Some(secrets) => {
            serde_json::to_writer_pretty(&mut *out, secrets).context("writing secrets")?;
            writeln!(out).context("writing secrets")?;
        }
        None => out.write_all(&response.body).context("writing secrets")?,
    }
    Ok(())
}
