use doppler_secrets::{PushOutcome, SecretsService, UpdateSecretsRequest};

use crate::cli::args::{DeleteArgs, PushArgs};
use crate::exit_codes::SUCCESS;

pub async fn push(service: &SecretsService, args: PushArgs) -> anyhow::Result<i32> {
    let request = args
        .assignments
        .into_iter()
        .fold(UpdateSecretsRequest::default(), |req, (name, value)| {
            req.with_secret(name, value)
        });

    let outcome = service.update_secrets(request).await?;
    println!("{}", summary(&outcome, "updated"));
    Ok(SUCCESS)
}

pub async fn delete(service: &SecretsService, args: DeleteArgs) -> anyhow::Result<i32> {
    let outcome = service.delete_secrets(args.names).await?;
    println!("{}", summary(&outcome, "deleted"));
    Ok(SUCCESS)
}

fn summary(outcome: &PushOutcome, verb: &str) -> String {
    match outcome {
        PushOutcome::Unchanged => "no changes".to_string(),
        PushOutcome::Pushed { keys } => format!("{} {}: {}", verb, keys.len(), keys.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        assert_eq!(summary(&PushOutcome::Unchanged, "updated"), "no changes");
        let pushed = PushOutcome::Pushed {
            keys: vec!["A".into(), "B".into()],
        };
        assert_eq!(summary(&pushed, "deleted"), "deleted 2: A, B");
    }
}
