//! Murmur CLI Application

use anyhow::Context;
use clap::{Parser, Subcommand};
use murmur_core::domain::{
    channel, AudioDecoder, ConfigManager, DirectoryWatcher, MixerHandle, MurmurConfig, SampleRate,
    TrackLibrary, TracingEvents,
};
use murmur_infra::audio::{write_mono, WavDecoder};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Pause after a change event so bursts of writes trigger one reload
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Loop background sounds under a live voice stream", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the SFX source directory
    #[arg(long, global = true)]
    sfx_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mix the SFX tracks under a primary WAV file
    Render {
        /// Primary audio to mix onto
        input: PathBuf,

        /// Where to write the mixed result
        output: PathBuf,

        /// Override the block size
        #[arg(long)]
        block_size: Option<usize>,
    },

    /// List the eligible SFX files
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy a WAV file into the SFX directory
    Import {
        file: PathBuf,

        /// Name to store it under (defaults to the file's own name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Run the mixer on a silent stream and reload when the directory changes
    Monitor {
        /// Watch the SFX directory even if the config doesn't enable it
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = load_config(cli.config.as_deref()).await?;
    if let Some(dir) = cli.sfx_dir {
        config.sfx.source_dir = dir;
    }

    match cli.command {
        Command::Render {
            input,
            output,
            block_size,
        } => {
            if let Some(size) = block_size {
                config.app.block_size = size;
            }
            config.validate()?;
            render(&config, &input, &output)
        }
        Command::List { json } => list(&config, json),
        Command::Import { file, name } => import(&config, &file, name),
        Command::Monitor { watch } => monitor(&config, watch || config.sfx.watch).await,
    }
}

async fn load_config(path: Option<&Path>) -> anyhow::Result<MurmurConfig> {
    match path {
        Some(path) => MurmurConfig::load_from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display())),
        None => {
            let manager = ConfigManager::new(ConfigManager::default_config_dir()?);
            Ok(manager.load().await)
        }
    }
}

fn library(config: &MurmurConfig) -> anyhow::Result<TrackLibrary> {
    let library = TrackLibrary::new(
        &config.sfx.source_dir,
        config.sfx.sample_rate(),
        Arc::new(WavDecoder::new()),
    )?
    .with_track_settings(config.sfx.track_settings());
    Ok(library)
}

fn render(config: &MurmurConfig, input: &Path, output: &Path) -> anyhow::Result<()> {
    let settings = config.mixer_settings();
    let sample_rate = settings.sample_rate;
    let block_size = settings.block_size;

    let tracks = library(config)?.load(&TracingEvents)?;
    let (_handle, mut mixer) = channel(settings, tracks)?;

    let primary = WavDecoder::new().decode(input, sample_rate)?;
    info!(
        input = %input.display(),
        samples = primary.len(),
        tracks = mixer.track_count(),
        "Rendering"
    );

    let mut mixed = Vec::with_capacity(primary.len());
    for block in primary.chunks(block_size) {
        mixed.extend_from_slice(mixer.mix(block));
    }

    write_mono(output, &mixed, sample_rate)?;
    info!(output = %output.display(), "Render complete");
    Ok(())
}

fn list(config: &MurmurConfig, json: bool) -> anyhow::Result<()> {
    let files = TrackLibrary::list(&config.sfx.source_dir)?;

    if json {
        println!("{}", serde_json::json!({ "files": files }));
    } else {
        for file in &files {
            println!("{file}");
        }
    }
    Ok(())
}

fn import(config: &MurmurConfig, file: &Path, name: Option<String>) -> anyhow::Result<()> {
    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .context("source path has no file name")?,
    };

    let target = TrackLibrary::import(&config.sfx.source_dir, file, &name)?;
    println!("{}", target.display());
    Ok(())
}

async fn monitor(config: &MurmurConfig, watch: bool) -> anyhow::Result<()> {
    config.validate()?;
    let settings = config.mixer_settings();
    let sample_rate = settings.sample_rate;
    let block_size = settings.block_size;

    let track_library = library(config)?;
    let tracks = track_library.load(&TracingEvents)?;
    let (handle, mut mixer) = channel(settings, tracks)?;

    let running = Arc::new(AtomicBool::new(true));
    let audio_running = running.clone();
    let period = block_period(block_size, sample_rate);

    // Stand-in for the audio callback: mixes silence at block cadence
    let audio = std::thread::spawn(move || {
        let silence = vec![0.0f32; block_size];
        let mut generation = mixer.generation();

        while audio_running.load(Ordering::Relaxed) {
            let peak = mixer
                .mix(&silence)
                .iter()
                .fold(0.0f32, |peak, s| peak.max(s.abs()));

            if mixer.generation() != generation {
                generation = mixer.generation();
                info!(
                    generation,
                    tracks = mixer.track_count(),
                    peak,
                    "Audio thread switched track set"
                );
            }
            std::thread::sleep(period);
        }
    });

    let watcher = if watch {
        Some(DirectoryWatcher::new(config.sfx.source_dir.clone())?)
    } else {
        info!("Directory watching disabled; playing the loaded set until interrupted");
        None
    };

    match watcher.as_ref().map(DirectoryWatcher::subscribe) {
        Some(changes) => {
            watch_and_reload(
                changes,
                tokio::signal::ctrl_c(),
                RELOAD_DEBOUNCE,
                &handle,
                &track_library,
            )
            .await
        }
        None => tokio::signal::ctrl_c().await?,
    }

    info!("Shutting down");
    running.store(false, Ordering::Relaxed);
    if audio.join().is_err() {
        warn!("Audio thread panicked");
    }
    Ok(())
}

/// Reload on every change burst until `shutdown` resolves or the watcher
/// goes away
async fn watch_and_reload<F>(
    mut changes: broadcast::Receiver<PathBuf>,
    shutdown: F,
    debounce: Duration,
    handle: &MixerHandle,
    library: &TrackLibrary,
) where
    F: Future,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = changes.recv() => {
                let wait = match changed {
                    Ok(path) => {
                        info!(path = %path.display(), "SFX directory changed");
                        debounce
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed change events, reloading");
                        Duration::ZERO
                    }
                    Err(RecvError::Closed) => break,
                };

                // Shutdown stays responsive while waiting out the burst
                // and while the new set is decoded
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = debounced_reload(&mut changes, wait, handle, library) => {}
                }
            }
        }
    }
}

async fn debounced_reload(
    changes: &mut broadcast::Receiver<PathBuf>,
    debounce: Duration,
    handle: &MixerHandle,
    library: &TrackLibrary,
) {
    tokio::time::sleep(debounce).await;
    while changes.try_recv().is_ok() {}
    reload(handle, library).await;
}

async fn reload(handle: &MixerHandle, library: &TrackLibrary) {
    let handle = handle.clone();
    let library = library.clone();

    let result =
        tokio::task::spawn_blocking(move || handle.reload(&library, &TracingEvents)).await;

    match result {
        Ok(Ok(generation)) => info!(generation, "Reload queued"),
        Ok(Err(e)) => warn!(error = %e, "Reload failed"),
        Err(e) => warn!(error = %e, "Reload task failed"),
    }
}

fn block_period(block_size: usize, sample_rate: SampleRate) -> Duration {
    Duration::from_secs_f64(block_size as f64 / f64::from(sample_rate.hz().max(1)))
}
