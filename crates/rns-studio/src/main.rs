//! Headless subject-swap binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rns_genai::{GeminiAnalyzer, GenAiConfig, VeoClient};
use rns_media::PlaybackRegistry;
use rns_models::Stage;
use rns_studio::{EnvCredentialProvider, Studio, StudioConfig};

#[derive(Parser)]
#[command(name = "rns-studio")]
#[command(about = "Swap the car in a video for one from a reference photo", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a base video and print the scene breakdown as JSON
    Analyze {
        /// Base video path
        #[arg(short, long)]
        video: PathBuf,

        /// MIME type override (guessed from the extension otherwise)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Analyze a base video, then regenerate it around a reference image
    Swap {
        /// Base video path
        #[arg(short, long)]
        video: PathBuf,

        /// Reference image of the new car
        #[arg(short, long)]
        image: PathBuf,

        /// Where to write the generated video
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds between status polls
        #[arg(long, env = "RNS_POLL_INTERVAL_SECS")]
        poll_interval: Option<u64>,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("rns=info".parse()?)
        .add_directive("hyper=warn".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn build_studio(config: StudioConfig) -> anyhow::Result<Studio> {
    let genai = GenAiConfig::from_env();
    let credentials = Arc::new(EnvCredentialProvider::new(genai.api_key.clone()));
    let analyzer = Arc::new(GeminiAnalyzer::new(genai.clone())?);
    let generator = Arc::new(VeoClient::new(genai)?);

    Ok(Studio::new(
        analyzer,
        generator,
        credentials,
        Arc::new(PlaybackRegistry::new()),
        config,
    ))
}

async fn analyze(video: PathBuf, mime: Option<String>) -> anyhow::Result<()> {
    let mut studio = build_studio(StudioConfig::from_env())?;
    if !studio.state().has_credential {
        studio.select_credential().await;
    }

    studio.select_video(&video, mime.as_deref()).await;
    let state = studio.settle().await;
    let analysis = match (&state.analysis, state.stage()) {
        (Some(analysis), Stage::Configuring) => analysis,
        _ => bail!("{}", state.status.message),
    };

    println!("{}", serde_json::to_string_pretty(analysis)?);
    if let Some(prompt) = state.display_prompt() {
        println!("\n{}", prompt);
    }

    studio.reset().await;
    Ok(())
}

async fn swap(
    video: PathBuf,
    image: PathBuf,
    output: Option<PathBuf>,
    poll_interval: Option<u64>,
) -> anyhow::Result<()> {
    let mut config = StudioConfig::from_env();
    if let Some(secs) = poll_interval {
        config = config.with_poll_interval(Duration::from_secs(secs));
    }
    let output = output.unwrap_or_else(|| {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "result".to_string());
        config.output_dir.join(format!("{}-swapped.mp4", stem))
    });

    let mut studio = build_studio(config)?;
    info!(workflow_id = %studio.workflow_id(), video = %video.display(), "Starting swap");

    let mut updates = studio.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(status) = updates.recv().await {
            eprintln!("[{}] {}", status.stage, status.message);
        }
    });

    studio.select_video(&video, None).await;
    let state = studio.settle().await;
    if state.stage() != Stage::Configuring {
        bail!("Analysis did not complete: {}", state.status.message);
    }
    if let Some(prompt) = state.display_prompt() {
        eprintln!("Scene prompt: {}", prompt);
    }

    studio.select_image(&image, None).await;
    if studio.state().target_image.is_none() {
        bail!("{}", studio.state().status.message);
    }

    studio.generate().await;
    let mut state = studio.settle().await;
    if state.stage() == Stage::Configuring && state.has_credential {
        // Credential was just selected; go again
        studio.generate().await;
        state = studio.settle().await;
    }

    let handle = match (state.stage(), &state.result) {
        (Stage::Completed, Some(handle)) => handle.clone(),
        (Stage::Configuring, _) => bail!("No API key available; set GEMINI_API_KEY or API_KEY"),
        _ => bail!("{}", state.status.message),
    };

    if let Some(dir) = output.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let written = studio
        .registry()
        .export(&handle, &output)
        .await
        .map_err(|e| anyhow!("writing {}: {}", output.display(), e))?;

    info!(path = %output.display(), bytes = written, "Wrote generated video");
    println!("{}", output.display());

    studio.reset().await;
    drop(studio);
    printer.await.ok();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze { video, mime } => analyze(video, mime).await,
        Commands::Swap {
            video,
            image,
            output,
            poll_interval,
        } => swap(video, image, output, poll_interval).await,
    }
}
