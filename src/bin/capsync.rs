use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "capsync", version)]
struct Cli {
    /// Log debug output (overridden by `RUST_LOG`).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Burn captions into a video (requires `ffmpeg` and `ffprobe` on PATH).
    Render(RenderArgs),
    /// Render a single caption frame as a PNG.
    Frame(FrameArgs),
    /// Print frame schedule statistics as JSON.
    Schedule(ScheduleArgs),
}

#[derive(Args, Debug)]
struct OptionsArgs {
    /// Word-timed transcript JSON (`[{"word", "time", "duration"}]`).
    #[arg(long)]
    transcript: PathBuf,

    /// Render options JSON; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the output frame rate.
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Args, Debug)]
struct FontArgs {
    /// Directory holding `<family>-Medium.ttf` (or `-Regular.ttf`) and `<family>-Bold.ttf`.
    #[arg(long, default_value = "assets/fonts")]
    font_dir: PathBuf,

    /// Explicit regular face; requires `--bold-font`.
    #[arg(long, requires = "bold_font")]
    regular_font: Option<PathBuf>,

    /// Explicit bold face; requires `--regular-font`.
    #[arg(long, requires = "regular_font")]
    bold_font: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    options: OptionsArgs,

    #[command(flatten)]
    fonts: FontArgs,

    /// Background video.
    #[arg(long)]
    video: PathBuf,

    /// Output Matroska path.
    #[arg(long)]
    out: PathBuf,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Render chunk size.
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Replace frames that fail to draw with blank frames instead of aborting.
    #[arg(long, default_value_t = false)]
    blank_on_error: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    options: OptionsArgs,

    #[command(flatten)]
    fonts: FontArgs,

    /// Frame index (0-based, in schedule order).
    #[arg(long)]
    index: u64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct ScheduleArgs {
    #[command(flatten)]
    options: OptionsArgs,

    /// Also print every frame task.
    #[arg(long, default_value_t = false)]
    tasks: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Schedule(args) => cmd_schedule(args),
    }
}

fn load_options(args: &OptionsArgs) -> anyhow::Result<capsync::RenderOptions> {
    let mut opts = match &args.config {
        Some(path) => capsync::RenderOptions::from_path(path)?,
        None => capsync::RenderOptions::default(),
    };
    if let Some(fps) = args.fps {
        opts.fps = fps;
    }
    Ok(opts)
}

fn load_transcript(
    args: &OptionsArgs,
    opts: &capsync::RenderOptions,
) -> anyhow::Result<capsync::Transcript> {
    Ok(capsync::Transcript::from_path(
        &args.transcript,
        opts.frame_rate()?,
    )?)
}

fn load_fonts(args: &FontArgs, family: &str) -> anyhow::Result<Arc<capsync::FontCache>> {
    let fonts = match (&args.regular_font, &args.bold_font) {
        (Some(regular), Some(bold)) => capsync::FontCache::from_paths(regular, bold)?,
        _ => capsync::FontCache::from_family_dir(&args.font_dir, family)?,
    };
    Ok(Arc::new(fonts))
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))?;
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut opts = load_options(&args.options)?;

    let background = std::fs::read(&args.video)
        .with_context(|| format!("read background video '{}'", args.video.display()))?;
    let (width, height) = capsync::probe_video_size(&background)?;
    opts.width = width;
    opts.height = height;

    let transcript = load_transcript(&args.options, &opts)?;
    let fonts = load_fonts(&args.fonts, &opts.font_family)?;
    let session = capsync::CaptionSession::new(transcript, opts, fonts)?;

    let threading = capsync::RenderThreading {
        parallel: args.parallel,
        chunk_size: args.chunk_size,
        threads: args.threads,
        error_policy: if args.blank_on_error {
            capsync::FrameErrorPolicy::BlankFrame
        } else {
            capsync::FrameErrorPolicy::Abort
        },
        ..capsync::RenderThreading::default()
    };
    let video = session.render_video(background, &threading, &capsync::CancelToken::new())?;
    write_output(&args.out, &video)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let opts = load_options(&args.options)?;
    let transcript = load_transcript(&args.options, &opts)?;
    let fonts = load_fonts(&args.fonts, &opts.font_family)?;
    let session = capsync::CaptionSession::new(transcript, opts, fonts)?;

    let frame = session.render_frame(capsync::FrameIndex(args.index))?;
    write_output(&args.out, &frame.image)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_schedule(args: ScheduleArgs) -> anyhow::Result<()> {
    let opts = load_options(&args.options)?;
    opts.validate()?;
    let transcript = load_transcript(&args.options, &opts)?;
    let schedule = capsync::schedule_frames(transcript.words(), &opts)?;

    let report = if args.tasks {
        serde_json::json!({ "stats": schedule.stats(), "tasks": schedule.tasks() })
    } else {
        serde_json::json!({ "stats": schedule.stats() })
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
