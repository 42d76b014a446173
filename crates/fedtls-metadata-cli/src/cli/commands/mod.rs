pub mod dispatch;
pub mod fetch;
pub mod lookup;

pub use dispatch::dispatch;

use fedtls_metadata::MetadataError;

use crate::exit_codes;

/// Print `err` the way every subcommand does and map it to an exit code.
pub(crate) fn report(err: &anyhow::Error) -> i32 {
    eprintln!("error: {err:#}");
    match err.downcast_ref::<MetadataError>() {
        Some(metadata_err) => metadata_err.exit_code(),
        None => exit_codes::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::{Cli, Command, LookupArgs};
    use std::path::PathBuf;

    #[test]
    fn test_report_uses_library_exit_code() {
        let copy = anyhow::Error::new(MetadataError::CacheCopyFailed {
            from: PathBuf::from("/tmp/cached.json"),
            to: PathBuf::from("/tmp/out/metadata.json"),
            message: "No such file or directory".to_string(),
        });
        assert_eq!(report(&copy), exit_codes::CACHE_OR_CONFIG_ERROR);

        let wrapped = anyhow::Error::new(MetadataError::EntityNotFound {
            entity_id: "https://other.example.se".to_string(),
        })
        .context("lookup failed");
        assert_eq!(report(&wrapped), exit_codes::FAILURE);
    }

    #[test]
    fn test_report_other_errors_fail() {
        assert_eq!(report(&anyhow::anyhow!("disk full")), exit_codes::FAILURE);
    }

    #[tokio::test]
    async fn test_dispatch_returns_command_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            verbose: 0,
            cmd: Command::Lookup(LookupArgs {
                metadata: dir.path().join("missing.json"),
                entity: "https://school.example.se".to_string(),
                server_tags: String::new(),
                ca_out: None,
                json: false,
            }),
        };
        assert_eq!(dispatch(cli).await, exit_codes::FAILURE);
    }
}
