use crate::catalog::VersionSelector;
use crate::cli::args::Command;
use crate::cli::params::DownloadParams;
use crate::config::{
    Config, DEFAULT_CONCURRENCY, DEFAULT_DOWNLOAD_DIR, DEFAULT_INDEX_URL, DEFAULT_PACKAGE,
    load_config,
};
use crate::download::{DownloadAndCheckOptions, MAX_CONCURRENCY};
use crate::error::WheelFetchError;
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::path::PathBuf;
use url::Url;

/// Merges command line arguments over the optional config file and validates
/// the result.
pub fn resolve_command(command: Command) -> Result<DownloadParams, WheelFetchError> {
    let app_config = match &command.config_path {
        Some(config_path) => {
            tracing::info!("Loading configuration from {}", config_path);
            load_config(config_path)?
        }
        None => Config::default(),
    };

    let concurrency = command
        .concurrency
        .or(app_config.concurrency)
        .unwrap_or(DEFAULT_CONCURRENCY);
    if concurrency == 0 || concurrency > MAX_CONCURRENCY {
        return Err(WheelFetchError::CliArgumentValidation {
            details: format!("concurrency must be between 1 and {MAX_CONCURRENCY}, got {concurrency}."),
        });
    }

    let package = command
        .package
        .or(app_config.package)
        .unwrap_or_else(|| DEFAULT_PACKAGE.to_string());
    if package.trim().is_empty() {
        return Err(WheelFetchError::CliArgumentValidation {
            details: "package name must not be empty.".to_string(),
        });
    }

    let raw_index_url = command
        .index_url
        .or(app_config.index_url)
        .unwrap_or_else(|| DEFAULT_INDEX_URL.to_string());
    let index_url = Url::parse(&raw_index_url).map_err(|e| WheelFetchError::CliArgumentValidation {
        details: format!("invalid index URL {raw_index_url}: {e}"),
    })?;
    if !matches!(index_url.scheme(), "http" | "https") {
        return Err(WheelFetchError::CliArgumentValidation {
            details: format!("index URL must use http or https, got {raw_index_url}"),
        });
    }

    let download_dir = command
        .download_dir
        .map(PathBuf::from)
        .or(app_config.download_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR));

    let version = command.version.parse::<VersionSelector>().unwrap_or(VersionSelector::Latest);

    Ok(DownloadParams {
        package: package.trim().to_string(),
        index_url,
        version,
        download_dir,
        options: DownloadAndCheckOptions {
            concurrency,
            verify_downloads: command.verify_downloads
                || app_config.verify_downloads.unwrap_or(false),
        },
        fail_on_error: command.fail_on_error || app_config.fail_on_error.unwrap_or(false),
        progress_output: command.show_progress.then(|| {
            command
                .progress_output
                .unwrap_or_else(|| MultiProgress::with_draw_target(ProgressDrawTarget::stderr()))
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> Command {
        Command {
            version: "latest".to_string(),
            show_progress: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let params = resolve_command(command()).unwrap();
        assert_eq!(params.package, DEFAULT_PACKAGE);
        assert_eq!(params.index_url.as_str(), "https://pypi.org/");
        assert_eq!(params.version, VersionSelector::Latest);
        assert_eq!(params.download_dir, PathBuf::from(DEFAULT_DOWNLOAD_DIR));
        assert_eq!(params.options, DownloadAndCheckOptions::default());
        assert!(!params.fail_on_error);
        assert!(params.progress_output.is_some());
    }

    #[test]
    fn test_exact_version() {
        let params = resolve_command(Command {
            version: "0.10.14".into(),
            ..command()
        })
        .unwrap();
        assert_eq!(params.version, VersionSelector::Exact("0.10.14".into()));
    }

    #[test]
    fn test_progress_disabled() {
        let params = resolve_command(Command {
            show_progress: false,
            progress_output: Some(MultiProgress::with_draw_target(ProgressDrawTarget::hidden())),
            ..command()
        })
        .unwrap();
        assert!(params.progress_output.is_none());
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let err = resolve_command(Command {
            concurrency: Some(0),
            ..command()
        })
        .unwrap_err();
        assert!(matches!(err, WheelFetchError::CliArgumentValidation { .. }));
    }

    #[test]
    fn test_excessive_concurrency_is_rejected() {
        assert!(resolve_command(Command {
            concurrency: Some(MAX_CONCURRENCY + 1),
            ..command()
        })
        .is_err());
    }

    #[test]
    fn test_invalid_index_url_is_rejected() {
        for url in ["not a url", "ftp://mirror.example/"] {
            let err = resolve_command(Command {
                index_url: Some(url.into()),
                ..command()
            })
            .unwrap_err();
            assert!(matches!(err, WheelFetchError::CliArgumentValidation { .. }), "{url}");
        }
    }

    #[test]
    fn test_arguments_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("wheelfetch.yaml");
        std::fs::write(
            &config_path,
            "package: numpy\ndownload_dir: /from/config\nconcurrency: 2\nfail_on_error: true\n",
        )
        .unwrap();

        let params = resolve_command(Command {
            config_path: Some(config_path.to_str().unwrap().to_string()),
            download_dir: Some("/from/cli".into()),
            ..command()
        })
        .unwrap();

        assert_eq!(params.package, "numpy");
        assert_eq!(params.download_dir, PathBuf::from("/from/cli"));
        assert_eq!(params.options.concurrency, 2);
        assert!(params.fail_on_error);
    }
}
