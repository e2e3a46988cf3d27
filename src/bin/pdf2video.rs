//! CLI binary for edgequake-pdf2video.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `VideoConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdf2video::{
    extract, load_script, plan_script, render_script, save_script, Document, Pdf2VideoError,
    PipelineProgressCallback, ProgressCallback, RunReport, Script, Stage, Transition, VideoConfig,
    VideoConfigBuilder,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner while extracting and planning, then
/// a per-scene bar once the script is final, and a spinner again while
/// ffmpeg assembles. Scenes may finish out of order when `--concurrency > 1`.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-scene wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(spinner_style());
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} scenes  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, ordinal: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&ordinal))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        match stage {
            Stage::Extraction => {
                self.bar.set_prefix("Extracting");
                self.bar.set_message("Reading PDF text…");
            }
            Stage::Planning => {
                self.bar.set_prefix("Planning");
                self.bar.set_message("Choosing sections…");
            }
            Stage::Assembly => {
                self.bar.set_style(spinner_style());
                self.bar.set_prefix("Assembling");
                self.bar.set_message("Encoding segments with ffmpeg…");
            }
            _ => {}
        }
    }

    fn on_script_ready(&self, scene_count: usize, planned_secs: f64) {
        self.activate_bar(scene_count);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Rendering {scene_count} scenes (~{planned_secs:.0}s planned)…"
            ))
        ));
    }

    fn on_scene_start(&self, ordinal: usize, _total: usize, title: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(ordinal, Instant::now());
        }
        self.bar.set_message(title.to_string());
    }

    fn on_scene_complete(&self, ordinal: usize, total: usize, narration_secs: f64) {
        let elapsed = self.elapsed_secs(ordinal);
        self.bar.println(format!(
            "  {} Scene {:>2}/{:<2}  {:<10}  {}",
            green("✓"),
            ordinal + 1,
            total,
            dim(&format!("{narration_secs:>5.1}s audio")),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_failure(&self, stage: Stage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.finish_and_clear();
        eprintln!("{} {} stage: {}", red("✘"), stage, red(&msg));
    }

    fn on_run_complete(&self, _output: &Path, _total_secs: f64) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Quick preview: first 3 scenes, temp files removed afterwards
  pdf2video auto paper.pdf -o preview.mp4

  # Whole document
  pdf2video auto --full paper.pdf -o paper.mp4

  # Review the plan before rendering, optionally keep intermediate files
  pdf2video run paper.pdf -o paper.mp4

  # Two-step: plan, edit the JSON by hand, then render
  pdf2video plan paper.pdf -o script.json
  pdf2video assemble script.json -o paper.mp4

  # Inspect what the extractor sees
  pdf2video extract --json https://example.org/paper.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  PDF2VIDEO_FFMPEG        ffmpeg binary (default: looked up on PATH)
  PDF2VIDEO_FFPROBE       ffprobe binary (default: looked up on PATH)
  PDF2VIDEO_FONT          TrueType font for titles and labels
  RUST_LOG                Override the log filter (e.g. edgequake_pdf2video=debug)

SETUP:
  1. Install ffmpeg (ffprobe ships with it).
  2. Make libpdfium available (system install or PDFIUM_LIB_PATH).
  3. Narration uses an online speech service; network access is required.
"#;

/// Turn a PDF document into a narrated explainer video.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2video",
    version,
    about = "Turn a PDF document into a narrated explainer video",
    long_about = "Extract the sections of a PDF (local file or URL), plan one scene per \
section with a diagram, a spoken summary and a presenter character, and assemble the \
scenes into an MP4 with ffmpeg.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2VIDEO_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the output path.
    #[arg(short, long, global = true, env = "PDF2VIDEO_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDF2VIDEO_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Automated run without prompts; previews the first scenes by default.
    Auto {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Render only the first N scenes.
        #[arg(long, env = "PDF2VIDEO_PREVIEW", default_value_t = 3, conflicts_with = "full")]
        preview: usize,

        /// Render every planned scene.
        #[arg(long)]
        full: bool,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Interactive run: shows the plan and asks before rendering.
    Run {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Skip both prompts: render and discard intermediate files.
        #[arg(short, long)]
        yes: bool,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Print the extracted sections.
    Extract {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output the extracted document as JSON.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Plan the script and write it as JSON.
    Plan {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Script file to write.
        #[arg(short, long, default_value = "script.json")]
        output: PathBuf,

        /// Maximum number of scenes.
        #[arg(long, env = "PDF2VIDEO_MAX_SCENES", default_value_t = 10)]
        max_scenes: usize,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Render a saved script into a video.
    Assemble {
        /// Script JSON written by `plan`.
        script: PathBuf,

        #[command(flatten)]
        render: RenderArgs,
    },
}

/// Options that affect reading the input PDF.
#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2VIDEO_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

/// Options that affect rendering and assembly.
#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// Video file to write.
    #[arg(short, long, env = "PDF2VIDEO_OUTPUT", default_value = "output.mp4")]
    output: PathBuf,

    /// Maximum number of scenes the planner emits.
    #[arg(long, env = "PDF2VIDEO_MAX_SCENES", default_value_t = 10)]
    max_scenes: usize,

    /// Output frame width in pixels.
    #[arg(long, env = "PDF2VIDEO_WIDTH", default_value_t = 1920)]
    width: u32,

    /// Output frame height in pixels.
    #[arg(long, env = "PDF2VIDEO_HEIGHT", default_value_t = 1080)]
    height: u32,

    /// Output frame rate.
    #[arg(long, env = "PDF2VIDEO_FPS", default_value_t = 30,
          value_parser = clap::value_parser!(u32).range(1..=120))]
    fps: u32,

    /// Fade in/out length per scene in milliseconds (0 = hard cuts).
    #[arg(long, env = "PDF2VIDEO_FADE_MS", default_value_t = 0)]
    fade_ms: u64,

    /// Narration language code.
    #[arg(long, env = "PDF2VIDEO_LANGUAGE", default_value = "en")]
    language: String,

    /// Speech-service request timeout in seconds.
    #[arg(long, env = "PDF2VIDEO_TTS_TIMEOUT", default_value_t = 30)]
    tts_timeout: u64,

    /// Number of scenes prepared at once.
    #[arg(short, long, env = "PDF2VIDEO_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Keep frames, clips and segments in this directory.
    #[arg(long, env = "PDF2VIDEO_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// ffmpeg binary.
    #[arg(long, env = "PDF2VIDEO_FFMPEG")]
    ffmpeg: Option<PathBuf>,

    /// ffprobe binary.
    #[arg(long, env = "PDF2VIDEO_FFPROBE")]
    ffprobe: Option<PathBuf>,

    /// TrueType font for titles and labels (default: bundled DejaVu Sans).
    #[arg(long, env = "PDF2VIDEO_FONT")]
    font: Option<PathBuf>,

    #[command(flatten)]
    source: SourceArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries the user-facing feedback; library INFO logs
    // would tear through it.
    let renders = matches!(
        cli.command,
        Command::Auto { .. } | Command::Run { .. } | Command::Assemble { .. }
    );
    let show_progress = !cli.quiet && !cli.no_progress && renders;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    match cli.command {
        Command::Auto {
            ref input,
            preview,
            full,
            ref render,
        } => {
            let mut builder = render_builder(render);
            if !full {
                builder = builder.preview_scenes(preview);
            }
            let config = with_progress(builder, progress_cb)?;

            let document = extract(input, &config).await.map_err(stage_failed)?;
            let script = plan_script(&document, &config).map_err(stage_failed)?;
            let report = render_script(&script, &render.output, &config)
                .await
                .map_err(stage_failed)?;
            print_report(&report, cli.quiet);
        }

        Command::Run {
            ref input,
            yes,
            ref render,
        } => {
            // Prompts and a live bar don't mix; the bar only starts once the
            // answers are in.
            let plan_config = render_builder(render)
                .build()
                .context("Invalid configuration")?;
            let document = extract(input, &plan_config).await.map_err(stage_failed)?;
            let script = plan_script(&document, &plan_config).map_err(stage_failed)?;
            print_plan(&script);

            if !yes && !confirm("Render this video?", true)? {
                eprintln!("{}", dim("Cancelled."));
                return Ok(());
            }

            let mut builder = render_builder(render);
            if !yes && render.work_dir.is_none() && confirm("Keep intermediate files?", false)? {
                builder = builder.work_dir(assets_dir_for(&render.output));
            }
            let config = with_progress(builder, progress_cb)?;
            let report = render_script(&script, &render.output, &config)
                .await
                .map_err(stage_failed)?;
            print_report(&report, cli.quiet);
        }

        Command::Extract {
            ref input,
            json,
            ref source,
        } => {
            let config = source_builder(source)
                .build()
                .context("Invalid configuration")?;
            let document = extract(input, &config).await.map_err(stage_failed)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&document)
                        .context("Failed to serialise document")?
                );
            } else {
                print_document(&document);
            }
        }

        Command::Plan {
            ref input,
            ref output,
            max_scenes,
            ref source,
        } => {
            let config = source_builder(source)
                .max_scenes(max_scenes)
                .build()
                .context("Invalid configuration")?;
            let document = extract(input, &config).await.map_err(stage_failed)?;
            let script = plan_script(&document, &config).map_err(stage_failed)?;
            save_script(&script, output).await.map_err(stage_failed)?;
            if !cli.quiet {
                eprintln!(
                    "{} {} scenes, ~{:.0}s planned",
                    green("✔"),
                    bold(&script.len().to_string()),
                    script.total_duration_secs()
                );
            }
            println!("{}", output.display());
        }

        Command::Assemble {
            ref script,
            ref render,
        } => {
            let config = with_progress(render_builder(render), progress_cb)?;
            let script = load_script(script).await.map_err(stage_failed)?;
            let report = render_script(&script, &render.output, &config)
                .await
                .map_err(stage_failed)?;
            print_report(&report, cli.quiet);
        }
    }

    Ok(())
}

/// Wrap a library error so the top line names the failing stage.
fn stage_failed(err: Pdf2VideoError) -> anyhow::Error {
    let stage = err.stage();
    anyhow::Error::new(err).context(format!("{stage} stage failed"))
}

fn source_builder(source: &SourceArgs) -> VideoConfigBuilder {
    let mut builder = VideoConfig::builder().download_timeout_secs(source.download_timeout);
    if let Some(ref pwd) = source.password {
        builder = builder.password(pwd.clone());
    }
    builder
}

/// Map render flags onto a config builder.
fn render_builder(render: &RenderArgs) -> VideoConfigBuilder {
    let mut builder = source_builder(&render.source)
        .max_scenes(render.max_scenes)
        .resolution(render.width, render.height)
        .fps(render.fps)
        .language(render.language.clone())
        .tts_timeout_secs(render.tts_timeout)
        .concurrency(render.concurrency);

    if render.fade_ms > 0 {
        builder = builder.transition(Transition::Fade {
            millis: render.fade_ms,
        });
    }
    if let Some(ref p) = render.work_dir {
        builder = builder.work_dir(p);
    }
    if let Some(ref p) = render.ffmpeg {
        builder = builder.ffmpeg_path(p);
    }
    if let Some(ref p) = render.ffprobe {
        builder = builder.ffprobe_path(p);
    }
    if let Some(ref p) = render.font {
        builder = builder.font_file(p);
    }
    builder
}

fn with_progress(
    mut builder: VideoConfigBuilder,
    progress: Option<ProgressCallback>,
) -> Result<VideoConfig> {
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    builder.build().context("Invalid configuration")
}

/// `out.mp4` → `out_assets/` next to it.
fn assets_dir_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "pdf2video".to_string());
    output.with_file_name(format!("{stem}_assets"))
}

/// Ask a yes/no question on stderr; empty input takes `default`.
fn confirm(question: &str, default: bool) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    eprint!("{} {} {} ", cyan("?"), bold(question), dim(hint));
    io::stderr().flush().ok();

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer from stdin")?;
    Ok(match answer.trim().to_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    })
}

fn print_document(document: &Document) {
    println!("Source:    {}", document.source.display());
    if let Some(ref t) = document.title {
        println!("Title:     {}", t);
    }
    println!("Pages:     {}", document.page_count);
    println!("Chars:     {}", document.char_count());
    println!("Sections:  {}", document.sections.len());
    println!();
    for section in &document.sections {
        println!(
            "{:>3}. {}  {}  {}",
            section.index + 1,
            bold(&section.heading),
            dim(&format!("[{:?}]", section.label)),
            dim(&format!("{} chars", section.text.chars().count())),
        );
    }
}

fn print_plan(script: &Script) {
    eprintln!(
        "{} {}  {}",
        cyan("◆"),
        bold(&script.title),
        dim(&format!(
            "{} scenes, ~{:.0}s",
            script.len(),
            script.total_duration_secs()
        ))
    );
    for scene in &script.scenes {
        eprintln!(
            "  {:>2}. {:<40} {:<18} {}",
            scene.ordinal + 1,
            scene.title,
            dim(scene.visual.kind_name()),
            dim(&format!("{:.1}s", scene.duration_secs)),
        );
    }
}

fn print_report(report: &RunReport, quiet: bool) {
    if !quiet {
        let extended = report
            .timeline
            .segments
            .iter()
            .filter(|s| s.extended)
            .count();
        eprintln!(
            "{}  {} scenes  {:.1}s video  {}ms  →  {}",
            green("✔"),
            report.script.len(),
            report.timeline.total_secs,
            report.elapsed_ms,
            bold(&report.output.display().to_string()),
        );
        if extended > 0 {
            eprintln!(
                "   {}",
                dim(&format!("{extended} scenes stretched to fit their narration"))
            );
        }
        if let Some(ref dir) = report.kept_assets {
            eprintln!("   {} {}", dim("assets kept in"), dir.display());
        }
    }
    println!("{}", report.output.display());
}
