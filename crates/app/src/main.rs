use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use lipsync_avatar_core::{
    generate_lip_sync, submit_message, AppConfig, AssetStore, AvatarError, ChannelFeed,
    FixedStepClock, FrameClock, JsonLineSink, LipSyncMessage, LoggingAudio, Recorder, RenderGraph,
    RenderLoop, ScriptedFeed, SystemClock,
};
use tracing_subscriber::EnvFilter;

fn main() -> lipsync_avatar_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            asset,
            messages,
            seconds,
            output,
        } => run_play(config, asset, messages.as_deref(), seconds, output.as_deref()),
        Commands::Live { asset, seconds } => run_live(config, asset, seconds),
        Commands::Lipsync {
            input,
            sample_rate,
            output,
        } => run_lipsync(&config, &input, sample_rate, output.as_deref()),
        Commands::Send { text } => run_send(&text),
    }
}

fn load_config(path: Option<&Path>) -> lipsync_avatar_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

fn start_loop(
    config: &AppConfig,
    asset: Option<PathBuf>,
) -> lipsync_avatar_core::Result<RenderLoop<RenderGraph>> {
    let asset = asset.unwrap_or_else(|| PathBuf::from(&config.model.asset_path));
    let model = AssetStore::new().load_model(&asset)?;
    let mut render = RenderLoop::new(config.clone(), RenderGraph::new());
    render.load(model)?;
    Ok(render)
}

fn run_play(
    config: AppConfig,
    asset: Option<PathBuf>,
    messages: Option<&Path>,
    seconds: f32,
    output: Option<&Path>,
) -> lipsync_avatar_core::Result<()> {
    let mut feed = match messages {
        Some(path) => ScriptedFeed::from_json(&std::fs::read_to_string(path)?)?,
        None => ScriptedFeed::default(),
    };
    let mut clock = FixedStepClock::from_fps(config.render.fps);
    let frames = (seconds.max(0.0) / clock.step().max(f32::EPSILON)).ceil() as u64;
    tracing::info!(frames, fps = config.render.fps, "starting headless playback");

    let mut render = start_loop(&config, asset)?;
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut recorder = Recorder::new(writer);

    render.run(frames, &mut clock, &mut feed, &mut LoggingAudio, |record| {
        recorder.record(record)
    })?;

    tracing::info!(frames = recorder.frames(), "playback finished");
    recorder.finish()?;
    Ok(())
}

fn run_live(
    config: AppConfig,
    asset: Option<PathBuf>,
    seconds: Option<f32>,
) -> lipsync_avatar_core::Result<()> {
    let mut render = start_loop(&config, asset)?;
    let (sender, mut feed) = ChannelFeed::new();

    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LipSyncMessage>(&line) {
                Ok(message) => {
                    if sender.send(message).is_err() {
                        break;
                    }
                }
                Err(err) => tracing::warn!(%err, "ignoring unreadable message"),
            }
        }
    });

    let frame_budget = Duration::from_secs_f32(1.0 / config.render.fps.max(1) as f32);
    let mut clock = SystemClock::new();
    let mut audio = LoggingAudio;
    tracing::info!(fps = config.render.fps, "live mode, reading messages from stdin");

    loop {
        let record = render.tick_with(clock.delta(), &mut feed, &mut audio)?;
        if record.frame % u64::from(config.render.fps.max(1)) == 0 {
            tracing::debug!(time = record.time, rotation = ?record.scene.rotation, "frame");
        }
        if seconds.is_some_and(|limit| record.time >= f64::from(limit)) {
            break;
        }
        thread::sleep(frame_budget);
    }
    Ok(())
}

fn run_lipsync(
    config: &AppConfig,
    input: &Path,
    sample_rate: u32,
    output: Option<&Path>,
) -> lipsync_avatar_core::Result<()> {
    let bytes = std::fs::read(input)?;
    if bytes.len() % 4 != 0 {
        return Err(AvatarError::InvalidInput(
            "raw PCM input must contain whole f32 samples",
        ));
    }
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    tracing::info!(?input, samples = samples.len(), sample_rate, "analysing audio");

    let track = generate_lip_sync(&samples, sample_rate, &config.analysis)?;
    let json = track.to_json()?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn run_send(text: &str) -> lipsync_avatar_core::Result<()> {
    let mut sink = JsonLineSink::new(io::stdout().lock());
    if !submit_message(&mut sink, text)? {
        tracing::info!("nothing to send");
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Lip-synced avatar animation engine", long_about = None)]
struct Cli {
    /// JSON configuration file. Defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a fixed-rate headless run and write the pose trace.
    Play {
        /// Avatar descriptor. Falls back to the configured asset path.
        #[arg(short, long)]
        asset: Option<PathBuf>,
        /// Scripted messages: a JSON array of `{ at, audioUrl, lipSync }`.
        #[arg(short, long)]
        messages: Option<PathBuf>,
        /// Length of the run in seconds.
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f32,
        /// Pose trace destination. Writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run against the wall clock, reading messages as JSON lines on stdin.
    Live {
        #[arg(short, long)]
        asset: Option<PathBuf>,
        /// Stop after this many seconds. Runs until killed when omitted.
        #[arg(short, long)]
        seconds: Option<f32>,
    },
    /// Generate a lip-sync track from raw mono f32 little-endian PCM.
    Lipsync {
        input: PathBuf,
        #[arg(short = 'r', long, default_value_t = 22_050)]
        sample_rate: u32,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Submit a chat message. Blank input is not sent.
    Send { text: String },
}
