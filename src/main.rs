use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ytdown_client::client::controller::{SubmitMode, UiVariant, DEFAULT_MAX_ATTEMPTS};
use ytdown_client::client::format_selector::FormatSelector;
use ytdown_client::client::models::{MediaKind, QualityToken};
use ytdown_client::client::platform::Platform;
use ytdown_client::client::{ClientError, JobOutcome, Session};
use ytdown_client::config::{ClientConfig, DEFAULT_SERVER};
use ytdown_client::terminal::TerminalPresenter;

#[derive(Parser)]
#[command(name = "ytdown")]
#[command(version)]
#[command(about = "Analyze and download videos through a ytdown server")]
struct Cli {
    /// Base URL of the download service
    #[arg(long, env = "YTDOWN_SERVER", default_value = DEFAULT_SERVER, global = true)]
    server: String,

    /// Proxy for all requests (e.g., socks5h://127.0.0.1:1080)
    #[arg(long, env = "YTDOWN_PROXY", global = true)]
    proxy: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u32,

    /// Delay between progress requests
    #[arg(long, default_value_t = 500, global = true)]
    interval_ms: u64,

    /// Progress requests before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, global = true)]
    max_attempts: u32,

    /// Where downloaded files are saved (default: the user's download dir)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show title, formats and selectable options for a URL
    Info { url: String },

    /// Analyze, select and download
    Download {
        url: String,

        /// Audio only
        #[arg(long, default_value_t = false)]
        audio: bool,

        /// Format id or quality expression (e.g., "bestaudio[abr<=192]")
        #[arg(short, long)]
        quality: Option<String>,

        /// Output container (mp4, mkv, mp3, ...)
        #[arg(short, long = "format")]
        format: Option<String>,

        /// Tab to use (default: detected from the URL)
        #[arg(short, long)]
        platform: Option<Platform>,

        /// Fill unset choices with the quick-download defaults
        #[arg(long, default_value_t = false)]
        quick: bool,
    },

    /// List the platform tabs
    Platforms,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::default()
            .with_base_url(&self.server)
            .with_proxy(self.proxy.clone())
            .with_timeout(self.timeout)
            .with_poll_interval(Duration::from_millis(self.interval_ms))
            .with_max_attempts(self.max_attempts);
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        config
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "ytdown=debug" } else { "ytdown=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Client errors carry their user-facing text in `user_message`
fn user_error(err: ClientError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn open_session(config: ClientConfig) -> Result<Session> {
    let presenter = Arc::new(TerminalPresenter::new(config.output_dir.clone()));
    Session::connect(config, presenter).context("Failed to set up the HTTP client")
}

async fn run_info(config: ClientConfig, url: &str) -> Result<()> {
    let mut session = open_session(config)?;
    session.switch_platform(Platform::detect(url));
    session.analyze(url).await.map_err(user_error)?;

    let view = session.view();
    let card = view.video.context("Server returned no video")?;
    println!("{}", card.title);
    println!("  Uploader: {}", card.uploader);
    println!("  Duration: {}", card.duration);
    println!("  Views:    {}", card.views);

    if let Some(groups) = view.formats {
        for (heading, rows) in [("Video formats", groups.video), ("Audio formats", groups.audio)] {
            if rows.is_empty() {
                continue;
            }
            println!("{}:", heading);
            for row in rows {
                println!("  {:<8} {}", row.format_id, row.label);
            }
        }
    }

    let snapshot = session.snapshot();
    let formats = snapshot
        .metadata()
        .map(|m| m.formats.as_slice())
        .unwrap_or_default();
    for kind in [MediaKind::Video, MediaKind::Audio] {
        println!("{} qualities:", kind.as_str());
        for option in FormatSelector::quality_options(kind, formats) {
            let token = option.token.as_deref().unwrap_or("best");
            println!("  {:<26} {} ({})", token, option.label, option.description);
        }
        let containers: Vec<String> = FormatSelector::container_options(kind, formats)
            .into_iter()
            .map(|c| c.format)
            .collect();
        println!("  containers: {}", containers.join(", "));
    }
    Ok(())
}

struct DownloadArgs {
    url: String,
    audio: bool,
    quality: Option<String>,
    format: Option<String>,
    platform: Option<Platform>,
    quick: bool,
}

async fn run_download(config: ClientConfig, args: DownloadArgs) -> Result<()> {
    let variant = if args.quick {
        UiVariant::QuickAdvanced
    } else {
        UiVariant::Simple
    };
    let mut session = open_session(config.with_variant(variant))?;

    let platform = args.platform.unwrap_or_else(|| Platform::detect(&args.url));
    session.switch_platform(platform);
    session.analyze(&args.url).await.map_err(user_error)?;

    let kind = if args.audio {
        MediaKind::Audio
    } else {
        MediaKind::Video
    };
    let qualities = session.select_media_kind(kind);

    let quality = match args.quality {
        Some(token) => Some(QualityToken::expr(token)),
        None if args.quick => None,
        None => Some(
            qualities
                .first()
                .map(|q| q.quality_token())
                .context("No quality options available")?,
        ),
    };
    let containers = match quality {
        Some(token) => session.select_quality(token).map_err(user_error)?,
        None => Vec::new(),
    };

    let container = match args.format {
        Some(format) => Some(format),
        None if args.quick => None,
        None => containers.first().map(|c| c.format.clone()),
    };
    if let Some(container) = container {
        session.select_container(&container).map_err(user_error)?;
    }

    let mode = if args.quick {
        SubmitMode::Quick
    } else {
        SubmitMode::Standard
    };
    let job_id = session.submit_download(mode).await.map_err(user_error)?;
    info!(%job_id, %platform, "download started");

    match session.wait_for_job().await {
        Some(JobOutcome::Finished(path)) => {
            println!("Saved to {}", path.display());
            Ok(())
        }
        Some(JobOutcome::Failed(message)) => bail!(message),
        Some(JobOutcome::TimedOut) => bail!(ClientError::TimedOut.user_message()),
        Some(JobOutcome::Cancelled) | None => bail!("Download cancelled"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config();
    match cli.command {
        Commands::Info { url } => run_info(config, &url).await,
        Commands::Download {
            url,
            audio,
            quality,
            format,
            platform,
            quick,
        } => {
            run_download(
                config,
                DownloadArgs {
                    url,
                    audio,
                    quality,
                    format,
                    platform,
                    quick,
                },
            )
            .await
        }
        Commands::Platforms => {
            for platform in Platform::ALL {
                println!("{:<10} {}", platform.as_str(), platform.placeholder());
            }
            Ok(())
        }
    }
}
