mod sim;

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use retain_core::model::{QuizMode, QuizModeError, VideoUrl, VideoUrlError};
use services::{
    BridgeConfig, ConfigError, HostBridge, LiveQuestionSource, PreloadedQuestionSource,
    QuestionSource, QuestionSourceConfig, QuizLoopService, QuizView,
};
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sim::{Playback, SimulatedPage, run_playback, run_viewer};

const DEFAULT_VIDEO_URL: &str = "https://www.youtube.com/watch?v=retain-demo";
const DEFAULT_VIDEO_DURATION: f64 = 120.0;

/// How long the end-of-video quiz gets before the demo exits.
const END_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum AppConfigError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDuration { raw: String },
    InvalidRate { raw: String },
    Invalid(retain_core::Error),
    Config(ConfigError),
}

impl fmt::Display for AppConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppConfigError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            AppConfigError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            AppConfigError::InvalidDuration { raw } => write!(f, "invalid video duration: {raw}"),
            AppConfigError::InvalidRate { raw } => write!(f, "invalid playback rate: {raw}"),
            AppConfigError::Invalid(err) => write!(f, "{err}"),
            AppConfigError::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppConfigError {}

impl From<QuizModeError> for AppConfigError {
    fn from(err: QuizModeError) -> Self {
        AppConfigError::Invalid(err.into())
    }
}

impl From<VideoUrlError> for AppConfigError {
    fn from(err: VideoUrlError) -> Self {
        AppConfigError::Invalid(err.into())
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, AppConfigError> {
    args.next().ok_or(AppConfigError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [--url <video_url>] [--duration <secs>] [--mode <Throughout|End|Both>]");
    eprintln!("                      [--rate <playback_rate>] [--questions <file.json>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --url {DEFAULT_VIDEO_URL}");
    eprintln!("  --duration {DEFAULT_VIDEO_DURATION}");
    eprintln!("  --mode Both");
    eprintln!("  --rate 1");
    eprintln!();
    eprintln!("Without --questions the live question endpoint is called.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RETAIN_VIDEO_URL, RETAIN_VIDEO_DURATION, RETAIN_QUIZ_MODE, RETAIN_PLAYBACK_RATE,");
    eprintln!("  RETAIN_QUESTIONS_FILE, RETAIN_QUESTION_ENDPOINT, RETAIN_REQUEST_TIMEOUT_SECS,");
    eprintln!("  RETAIN_EMBED_ORIGIN, RUST_LOG");
}

struct AppConfig {
    video_url: VideoUrl,
    duration: f64,
    playback_rate: f64,
    mode: QuizMode,
    questions_file: Option<PathBuf>,
    source: QuestionSourceConfig,
    bridge: BridgeConfig,
}

impl AppConfig {
    /// Environment first, then command-line flags on top.
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, AppConfigError> {
        let mut video_url = env::var("RETAIN_VIDEO_URL").unwrap_or_else(|_| DEFAULT_VIDEO_URL.into());
        let mut duration = env::var("RETAIN_VIDEO_DURATION").ok();
        let mut mode = env::var("RETAIN_QUIZ_MODE").ok();
        let mut rate = env::var("RETAIN_PLAYBACK_RATE").ok();
        let mut questions_file = env::var_os("RETAIN_QUESTIONS_FILE").map(PathBuf::from);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--url" => video_url = require_value(args, "--url")?,
                "--duration" => duration = Some(require_value(args, "--duration")?),
                "--mode" => mode = Some(require_value(args, "--mode")?),
                "--rate" => rate = Some(require_value(args, "--rate")?),
                "--questions" => {
                    questions_file = Some(PathBuf::from(require_value(args, "--questions")?));
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(AppConfigError::UnknownArg(arg)),
            }
        }

        let video_url = VideoUrl::parse(&video_url)?;
        let duration = match duration {
            Some(raw) => {
                positive_secs(&raw).ok_or(AppConfigError::InvalidDuration { raw })?
            }
            None => DEFAULT_VIDEO_DURATION,
        };
        let playback_rate = match rate {
            Some(raw) => positive_secs(&raw).ok_or(AppConfigError::InvalidRate { raw })?,
            None => 1.0,
        };
        let mode = match mode {
            Some(raw) => raw.parse::<QuizMode>()?,
            None => QuizMode::Both,
        };

        Ok(Self {
            video_url,
            duration,
            playback_rate,
            mode,
            questions_file,
            source: QuestionSourceConfig::from_env().map_err(AppConfigError::Config)?,
            bridge: BridgeConfig::from_env(),
        })
    }
}

fn positive_secs(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .try_init()?;
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;

    let mut args = env::args().skip(1);
    let config = AppConfig::parse(&mut args).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let source: Arc<dyn QuestionSource> = match &config.questions_file {
        Some(path) => {
            let preloaded = PreloadedQuestionSource::from_json_file(path)?;
            info!(path = %path.display(), count = preloaded.questions().len(), "using preloaded questions");
            Arc::new(preloaded)
        }
        None => {
            let live = LiveQuestionSource::new(config.source.clone())?;
            info!(endpoint = live.endpoint(), "using live question source");
            Arc::new(live)
        }
    };

    info!(
        url = %config.video_url,
        duration = config.duration,
        mode = %config.mode,
        rate = config.playback_rate,
        "starting simulated playback"
    );

    let playback = Arc::new(Mutex::new(Playback::new(
        config.video_url.as_str(),
        config.duration,
    )));
    let (commands, command_rx) = mpsc::unbounded_channel();
    let (view_tx, views) = watch::channel(QuizView::ChoosingMode);
    let page = SimulatedPage::new(
        Arc::clone(&playback),
        QuizLoopService::new(source),
        command_rx,
        view_tx,
    );
    let mut bridge = HostBridge::new(page, config.bridge.clone(), Instant::now());

    let viewer = tokio::spawn(run_viewer(commands, views, config.mode));
    let player = tokio::spawn(run_playback(playback, config.playback_rate));

    bridge.run(shutdown(player)).await;
    viewer.abort();
    info!(injected = bridge.is_injected(), "host bridge stopped");
    Ok(())
}

async fn shutdown(player: JoinHandle<()>) {
    tokio::select! {
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("interrupted"),
            Err(err) => warn!(%err, "cannot listen for ctrl-c"),
        },
        _ = player => sleep(END_GRACE).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
