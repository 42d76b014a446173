//! `fedtls-metadata fetch` - Obtain verified metadata.

use anyhow::Result;
use tracing::info;

use fedtls_metadata::{FetchConfig, FetchRequest, MetadataFetcher};

use super::report;
use crate::cli::args::FetchArgs;
use crate::exit_codes;

pub async fn cmd_fetch(args: FetchArgs) -> i32 {
    match run_fetch(args).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => report(&e),
    }
}

fn fetch_config(args: &FetchArgs) -> FetchConfig {
    let mut config = FetchConfig::from_env().with_url(args.url.clone());
    if let Some(secs) = args.timeout {
        config = config.with_timeout_secs(secs);
    }
    if let Some(retries) = args.max_retries {
        config = config.with_max_retries(retries);
    }
    config
}

async fn run_fetch(args: FetchArgs) -> Result<()> {
    let fetcher = MetadataFetcher::new(fetch_config(&args))?;

    let mut request = FetchRequest::new(args.keys, args.output);
    if let Some(cached) = args.cached {
        request = request.with_cached(cached);
    }

    let obtained = fetcher.obtain(&request).await?;
    info!(
        source = %obtained.source,
        output = %request.output.display(),
        digest = %obtained.digest,
        "metadata ready"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> FetchArgs {
        FetchArgs {
            keys: PathBuf::from("jwks.json"),
            output: PathBuf::from("md.json"),
            url: "https://md.example.org/feed.jws".to_string(),
            cached: None,
            timeout: None,
            max_retries: None,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut args = args();
        args.timeout = Some(7);
        args.max_retries = Some(0);

        let config = fetch_config(&args);
        assert_eq!(config.url, "https://md.example.org/feed.jws");
        assert_eq!(config.timeout_secs, 7);
        assert_eq!(config.max_retries, 0);
    }
}
