//! Process exit codes.
//!
//! Library failures map through [`SecretsError::exit_code`]; anything else
//! (I/O on stdout, argument post-processing) is a generic failure.

use doppler_secrets::SecretsError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;

pub fn for_error(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SecretsError>())
        .map(SecretsError::exit_code)
        .unwrap_or(FAILURE)
}
