use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use voice_morpher::remote::{MORPHED_FILENAME, ORIGINAL_FILENAME};
use voice_morpher::{
    parse_wav, BackendStatus, Config, ConversionPipeline, FileCapture, MorphClient, Recorder,
    SincRenderer, SymphoniaDecoder, WavBlob,
};

#[derive(Parser)]
#[command(name = "voice-morpher", version, about = "Record, convert and morph voice clips")]
struct Cli {
    /// Config file (extension optional)
    #[arg(long, default_value = "config/voice-morpher")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture an audio file and convert it to 22050 Hz mono WAV
    Convert {
        input: PathBuf,
        /// Output path (default: <output.dir>/original_recording.wav)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Record from the default microphone and convert it to 22050 Hz mono WAV
    #[cfg(feature = "microphone")]
    Record {
        /// Recording length in seconds
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f64,
        /// Output path (default: <output.dir>/original_recording.wav)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the effects offered by the remote service
    Effects,
    /// Convert a recording, send it to the remote service and save the result
    Morph {
        input: PathBuf,
        #[arg(short, long)]
        effect: String,
    },
    /// Print the format of a mono 16-bit WAV file
    Inspect { wav: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config).context("Failed to load config")?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Convert { input, output } => {
            let wav = record_file(&cfg, &input).await?;
            let output = output.unwrap_or_else(|| cfg.output.dir.join(ORIGINAL_FILENAME));
            wav.save(&output).await.context("Failed to save recording")?;
            println!("{}", output.display());
        }

        #[cfg(feature = "microphone")]
        Command::Record { seconds, output } => {
            let capture = voice_morpher::CpalCapture::with_chunk_bytes(cfg.capture.chunk_bytes);
            let mut recorder =
                Recorder::new(cfg.recorder.clone(), Box::new(capture), build_pipeline(&cfg));

            recorder
                .start()
                .await
                .context("Microphone access failed")?;
            info!("Recording for {:.1}s", seconds);
            tokio::time::sleep(std::time::Duration::from_secs_f64(seconds.max(0.0))).await;

            let wav = recorder
                .stop()
                .await
                .context("Failed to convert recording")?
                .ok_or_else(|| anyhow!("Recording produced no output"))?;

            let output = output.unwrap_or_else(|| cfg.output.dir.join(ORIGINAL_FILENAME));
            wav.save(&output).await.context("Failed to save recording")?;
            println!("{}", output.display());
        }

        Command::Effects => {
            let client = MorphClient::new(&cfg.remote.base_url);
            match client.status().await {
                BackendStatus::Online(effects) => {
                    for effect in effects {
                        println!("{}\t{}", effect.id, effect.name);
                    }
                }
                BackendStatus::Offline => {
                    warn!("Backend offline. Effects are unavailable.");
                }
            }
        }

        Command::Morph { input, effect } => {
            let wav = record_file(&cfg, &input).await?;
            wav.save(cfg.output.dir.join(ORIGINAL_FILENAME))
                .await
                .context("Failed to save original recording")?;

            let client = MorphClient::new(&cfg.remote.base_url);
            let morphed = match client.transform(&wav, &effect).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    if e.is_remote() {
                        error!("Transformation failed. The backend is offline or crashed.");
                    }
                    return Err(e).context("Remote transformation failed");
                }
            };

            let output = cfg.output.dir.join(MORPHED_FILENAME);
            tokio::fs::write(&output, &morphed)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("{}", output.display());
        }

        Command::Inspect { wav } => {
            let bytes = tokio::fs::read(&wav)
                .await
                .with_context(|| format!("Failed to read {}", wav.display()))?;
            let pcm = parse_wav(&bytes)?;
            println!(
                "{}Hz mono, {} samples, {:.2}s",
                pcm.sample_rate(),
                pcm.len(),
                pcm.duration_seconds()
            );
        }
    }

    Ok(())
}

/// Run one full recording session over an audio file
async fn record_file(cfg: &Config, input: &Path) -> Result<WavBlob> {
    let capture = FileCapture::with_chunk_bytes(input, cfg.capture.chunk_bytes);
    let mut recorder = Recorder::new(cfg.recorder.clone(), Box::new(capture), build_pipeline(cfg));

    recorder
        .start()
        .await
        .context("Microphone access failed")?;

    recorder
        .stop()
        .await
        .context("Failed to convert recording")?
        .ok_or_else(|| anyhow!("Recording produced no output"))
}

fn build_pipeline(cfg: &Config) -> ConversionPipeline {
    ConversionPipeline::new(
        Arc::new(SymphoniaDecoder::new()),
        Arc::new(SincRenderer::new(cfg.render.max_frames())),
    )
}
