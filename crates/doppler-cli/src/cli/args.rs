use clap::{Args, Parser, Subcommand};
use doppler_secrets::{NameTransformer, SecretsFormat};

#[derive(Parser, Debug)]
#[command(
    name = "doppler-secrets",
    version,
    about = "Read and push Doppler secrets with conditional requests and diff-based writes"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Service token (sent as the Basic auth username)
    #[arg(long, env = "DOPPLER_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    #[arg(long, env = "DOPPLER_PROJECT", default_value = "", global = true)]
    pub project: String,

    #[arg(long, env = "DOPPLER_CONFIG", default_value = "", global = true)]
    pub config: String,

    /// API base URL (overrides DOPPLER_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the token is accepted
    Auth,
    /// Print one secret value
    Get(GetArgs),
    /// Download secrets of the project/config
    Download(DownloadArgs),
    /// Set secrets, sending only values that differ
    Push(PushArgs),
    /// Delete secrets that exist
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct GetArgs {
    pub name: String,
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Restrict the download to these names (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub secrets: Vec<String>,

    /// json, dotnet-json, env, yaml or docker
    #[arg(long)]
    pub format: Option<SecretsFormat>,

    /// upper-camel, camel, lower-snake, tf-var, dotnet-env or lower-kebab
    #[arg(long)]
    pub name_transformer: Option<NameTransformer>,

    /// ETag from a previous download
    #[arg(long)]
    pub etag: Option<String>,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    /// NAME=VALUE pairs
    #[arg(required = true, value_parser = parse_assignment)]
    pub assignments: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    #[arg(required = true)]
    pub names: Vec<String>,
}

pub(crate) fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, _)) if name.is_empty() => Err(format!("missing name in '{}'", raw)),
        Some((name, value)) => Ok((name.to_string(), value.to_string())),
        None => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("A=1").unwrap(),
            ("A".to_string(), "1".to_string())
        );
        assert_eq!(
            parse_assignment("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("NOVALUE").is_err());
    }

    #[test]
    fn test_download_flags_parse() {
        let cli = Cli::try_parse_from([
            "doppler-secrets",
            "--project",
            "backend",
            "download",
            "--secrets",
            "A,B",
            "--format",
            "env",
            "--name-transformer",
            "lower-snake",
        ])
        .unwrap();

        assert_eq!(cli.global.project, "backend");
        match cli.cmd {
            Command::Download(args) => {
                assert_eq!(args.secrets, vec!["A", "B"]);
                assert_eq!(args.format, Some(SecretsFormat::Env));
                assert_eq!(args.name_transformer, Some(NameTransformer::LowerSnake));
            }
            other => panic!("expected download, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = Cli::try_parse_from(["doppler-secrets", "download", "--format", "toml"]);
        assert!(result.is_err());
    }
}
