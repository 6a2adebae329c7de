use crate::progress::ProgressLogWriter;
use clap::{ArgAction, Parser};
use indicatif::{MultiProgress, ProgressDrawTarget};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default)]
pub struct Command {
    pub version: String,
    pub download_dir: Option<String>,
    pub config_path: Option<String>,
    pub package: Option<String>,
    pub index_url: Option<String>,
    pub concurrency: Option<usize>,
    pub verify_downloads: bool,
    pub fail_on_error: bool,
    pub show_progress: bool,
    /// Bars drawn here share stderr with the log output.
    pub progress_output: Option<MultiProgress>,
}

pub struct Args {
    pub command: Command,
    pub log_level: Level,
}

#[derive(Debug, Parser)]
#[command(
    name = "wheelfetch",
    version,
    about = "Download every wheel of a package release and verify it against the index's SHA-256 digests"
)]
struct Cli {
    #[arg(
        short = 'v',
        long = "verbose",
        help = "Sets the level of verbosity",
        action = ArgAction::Count
    )]
    verbose: u8,

    #[arg(
        value_name = "VERSION",
        help = "Release to download, or 'latest'",
        default_value = "latest"
    )]
    release: String,

    #[arg(
        value_name = "DIR",
        help = "Directory the wheels are written to [default: ./downloaded_wheels]"
    )]
    download_dir: Option<String>,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Optional config file (YAML, TOML or JSON)"
    )]
    config: Option<String>,

    #[arg(
        short = 'p',
        long = "package",
        value_name = "NAME",
        help = "Project to download wheels for [default: mediapipe]"
    )]
    package: Option<String>,

    #[arg(
        long = "index-url",
        value_name = "URL",
        help = "Base URL of a PyPI-compatible JSON API [default: https://pypi.org]"
    )]
    index_url: Option<String>,

    #[arg(
        short = 'j',
        long = "concurrency",
        value_name = "N",
        help = "Maximum number of simultaneous downloads [default: 8]"
    )]
    concurrency: Option<usize>,

    #[arg(
        long = "verify-downloads",
        help = "Check the digest of freshly downloaded files in the same run"
    )]
    verify_downloads: bool,

    #[arg(
        long = "fail-on-error",
        help = "Exit with a failure status when any download fails"
    )]
    fail_on_error: bool,

    #[arg(long = "no-progress", help = "Disable progress bars")]
    no_progress: bool,
}

pub fn parse_args() -> Args {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let mut env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();
    for directive in ["hyper_util=warn", "reqwest=warn"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    let progress_output = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());
    let log_output = progress_output.clone();

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_env_filter(env_filter)
        .with_writer(move || ProgressLogWriter::new(log_output.clone()))
        .init();

    Args {
        command: Command {
            progress_output: Some(progress_output),
            ..cli.into_command()
        },
        log_level,
    }
}

impl Cli {
    fn into_command(self) -> Command {
        Command {
            version: self.release,
            download_dir: self.download_dir,
            config_path: self.config,
            package: self.package,
            index_url: self.index_url,
            concurrency: self.concurrency,
            verify_downloads: self.verify_downloads,
            fail_on_error: self.fail_on_error,
            show_progress: !self.no_progress,
            progress_output: None,
        }
    }
}
