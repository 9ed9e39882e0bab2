//! CLI binary for vinapod.
//!
//! A thin shim over the library crate that maps CLI flags to `StudioConfig`
//! and prints the script.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vinapod::{
    inspect, load_series_plan, preview_episode_prompt, read_text_file, render_script_lines,
    resolve_input, DocumentSource, EpisodeOutput, EpisodeStage, ErrorKind, PersonaConfig,
    ProgressCallback, ScriptStudio, StageCallback, StudioConfig, StudioError, Temperament,
};

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

// ── CLI stage callback using indicatif ───────────────────────────────────────

/// Terminal spinner that follows the pipeline stages.
struct CliSpinner {
    bar: ProgressBar,
    done: &'static str,
}

impl CliSpinner {
    /// `done` is printed once the run completes.
    fn new(done: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, done })
    }
}

impl StageCallback for CliSpinner {
    fn on_stage(&self, stage: EpisodeStage) {
        match stage {
            EpisodeStage::Idle => self.bar.set_message("waiting for document…"),
            EpisodeStage::DocumentProvided => {
                self.bar.set_prefix("Reading");
                self.bar.set_message("extracting text…");
            }
            EpisodeStage::Extracted => self.bar.set_message("building prompt…"),
            EpisodeStage::RequestBuilt => self.bar.set_message("prompt ready"),
            EpisodeStage::AwaitingResponse => {
                self.bar.set_prefix("Writing");
                self.bar.set_message("the model is drafting the script…");
            }
            EpisodeStage::Completed => {
                self.bar.finish_and_clear();
                eprintln!("{} {}", green("✔"), bold(self.done));
            }
            EpisodeStage::Failed => self.bar.finish_and_clear(),
        }
    }

    fn on_extracted(&self, page_count: usize, chars: usize) {
        let pages = if page_count == 0 {
            "text file".to_string()
        } else {
            format!("{page_count} pages")
        };
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            pages,
            dim(&format!("{chars} chars")),
        ));
    }

    fn on_failure(&self, stage: EpisodeStage, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar
            .println(format!("  {} {}  {}", red("✗"), stage, red(first_line)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Episode 1 from a PDF (stdout)
  vinapod brief.pdf

  # Episode 3 with a contrarian guest, continuing from episode 2
  vinapod brief.pdf --episode 3 --temperament contrarian \
      --log-file ep2-ending.txt -o ep3.txt

  # Custom personas
  vinapod brief.pdf --host "Hùng" --guest "Lan" --temperament evasive

  # Show the prompt without calling the model (no API key needed)
  vinapod brief.pdf --episode 2 --print-prompt

  # Page count and character count only (no API key needed)
  vinapod --inspect-only brief.pdf

  # Let the model propose a whole series, then script its second episode
  vinapod brief.pdf --plan-series --json -o plan.json
  vinapod brief.pdf --from-plan plan.json --episode 2

  # Use another provider via edgequake-llm
  vinapod brief.pdf --provider openai --model gpt-4.1-mini

TEMPERAMENTS:
  gentle       Nhẹ nhàng   soft, encouraging questions (default)
  inquisitive  Thắc mắc    keeps asking why and for examples
  contrarian   Bắt bẻ      challenges every claim
  evasive      Lươn lẹo    twists words and sets verbal traps

CONTINUITY:
  Nothing is stored between runs. To keep a series continuous, paste the
  last lines of the previous script into --log (or save them to a file and
  pass --log-file), and bump --episode.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI key, when --provider openai
  ANTHROPIC_API_KEY       Anthropic key, when --provider anthropic
  PDFIUM_LIB_PATH         Path to libpdfium; otherwise the system library is used

EXIT CODES:
  2 configuration   3 input   4 extraction   5 generation
"#;

/// Write Vietnamese podcast scripts from PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "vinapod",
    version,
    about = "Write Vietnamese two-person podcast scripts from PDF documents",
    long_about = "Extract the text of a PDF (or .txt, or URL), cast a host and a guest, and ask \
an LLM for one episode of a Vietnamese podcast script. Episodes chain together through the \
episode number and a pasted log of the previous episode's ending.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF/.txt path or HTTP/HTTPS URL.
    input: String,

    /// Host name.
    #[arg(long, env = "VINAPOD_HOST", default_value = "Minh")]
    host: String,

    /// Guest name.
    #[arg(long, env = "VINAPOD_GUEST", default_value = "An")]
    guest: String,

    /// Guest temperament.
    #[arg(long, env = "VINAPOD_TEMPERAMENT", value_enum, default_value = "gentle")]
    temperament: TemperamentArg,

    /// Episode number (≥ 1).
    #[arg(long, env = "VINAPOD_EPISODE", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    episode: u32,

    /// Ending of the previous episode, pasted verbatim.
    #[arg(long, conflicts_with = "log_file")]
    log: Option<String>,

    /// Read the previous episode's ending from a file.
    #[arg(long, env = "VINAPOD_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Write the script to this file instead of stdout.
    #[arg(short, long, env = "VINAPOD_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM provider: gemini (built in), openai, anthropic, ollama, …
    #[arg(long, env = "VINAPOD_PROVIDER", default_value = "gemini")]
    provider: String,

    /// Model ID. Default: gemini-1.5-flash (gemini), gpt-4.1-nano (openai).
    #[arg(long, env = "VINAPOD_MODEL")]
    model: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Characters of source text embedded in the prompt.
    #[arg(long, env = "VINAPOD_TRUNCATE", default_value_t = 10_000)]
    truncate: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "VINAPOD_TEMPERATURE", default_value_t = 0.8)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "VINAPOD_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Generation call timeout in seconds.
    #[arg(long, env = "VINAPOD_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "VINAPOD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "VINAPOD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Output structured JSON instead of the bare script.
    #[arg(long, env = "VINAPOD_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "VINAPOD_NO_PROGRESS")]
    no_progress: bool,

    /// Report page and character counts only, no generation.
    #[arg(long, conflicts_with_all = ["print_prompt", "plan_series"])]
    inspect_only: bool,

    /// Print the prompt that would be sent, no generation.
    #[arg(long, conflicts_with = "plan_series")]
    print_prompt: bool,

    /// Ask the model for a series outline instead of one episode.
    #[arg(long)]
    plan_series: bool,

    /// Script episode --episode of a saved series plan as timed lines.
    #[arg(long, value_name = "PLAN_JSON",
          conflicts_with_all = ["plan_series", "inspect_only", "print_prompt", "log", "log_file"])]
    from_plan: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VINAPOD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VINAPOD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TemperamentArg {
    Gentle,
    Inquisitive,
    Contrarian,
    Evasive,
}

impl From<TemperamentArg> for Temperament {
    fn from(v: TemperamentArg) -> Self {
        match v {
            TemperamentArg::Gentle => Temperament::Gentle,
            TemperamentArg::Inquisitive => Temperament::Inquisitive,
            TemperamentArg::Contrarian => Temperament::Contrarian,
            TemperamentArg::Evasive => Temperament::Evasive,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs would fight with the spinner, so they are lowered
    // while it is shown.
    let show_progress = !cli.quiet
        && !cli.no_progress
        && !cli.json
        && !cli.print_prompt
        && !cli.inspect_only;
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

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", red("error:"), e);
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliSpinner::new(done_message(cli)) as Arc<dyn StageCallback>)
    } else {
        None
    };
    let config = build_config(cli, progress)?;

    if cli.inspect_only || cli.print_prompt {
        return run_offline(cli, &config).await;
    }

    // Credentials are checked before any file or network access.
    let studio = ScriptStudio::new(config).context("Cannot start the script writer")?;
    let persona = build_persona(cli)?;

    // ── Planned episode ──────────────────────────────────────────────────
    if let Some(ref plan_path) = cli.from_plan {
        let plan = load_series_plan(plan_path)
            .await
            .map_err(StudioError::from)
            .context("Cannot load series plan")?;
        let source = open_input(cli).await?;
        let lines = studio
            .write_planned_episode(source, &plan, cli.episode, &persona)
            .await
            .with_context(|| format!("Planned episode {} failed", cli.episode))?;
        let text = if cli.json {
            serde_json::to_string_pretty(&lines).context("Failed to serialize script")?
        } else {
            render_script_lines(&lines)
        };
        return write_text(&text, cli.output.as_deref()).await;
    }

    // ── Series planning ──────────────────────────────────────────────────
    if cli.plan_series {
        let source = open_input(cli).await?;
        let plan = studio
            .plan_series(source, &persona)
            .await
            .context("Series planning failed")?;
        let text = if cli.json {
            serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?
        } else {
            let mut s = format!("{}\n{}\n\n", bold(&plan.title), plan.description);
            for ep in &plan.episodes {
                s.push_str(&format!(
                    "  Tập {:>2}  {}  {}\n          {}\n",
                    ep.id,
                    ep.title,
                    dim(&ep.duration_estimate),
                    ep.summary
                ));
            }
            s
        };
        return write_text(&text, cli.output.as_deref()).await;
    }

    // ── Episode ──────────────────────────────────────────────────────────
    let continuity_log = read_continuity_log(cli).await?;
    let source = open_input(cli).await?;
    let output = studio
        .generate_episode(source, persona, cli.episode, &continuity_log)
        .await
        .with_context(|| format!("Episode {} failed", cli.episode))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        write_text(&json, cli.output.as_deref()).await?;
    } else {
        write_text(output.script(), cli.output.as_deref()).await?;
    }

    if !cli.quiet && !cli.json {
        print_summary(&output, cli.output.as_deref());
    }
    Ok(())
}

/// `--inspect-only` and `--print-prompt`: no generator, no credential.
async fn run_offline(cli: &Cli, config: &StudioConfig) -> Result<()> {
    if cli.inspect_only {
        let source = open_input(cli).await?;
        let report = inspect(source, config)
            .await
            .context("Failed to inspect document")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        } else {
            println!("File:         {}", cli.input);
            println!("Pages:        {}", report.page_count);
            println!("Characters:   {}", report.extracted_chars);
            println!(
                "Truncation:   {}",
                if report.would_truncate {
                    format!("first {} chars will be used", report.truncation_limit)
                } else {
                    "none".to_string()
                }
            );
        }
        return Ok(());
    }

    let persona = build_persona(cli)?;
    let continuity_log = read_continuity_log(cli).await?;
    let source = open_input(cli).await?;
    let prompt = preview_episode_prompt(source, persona, cli.episode, &continuity_log, config)
        .await
        .context("Failed to build prompt")?;
    write_text(&prompt, cli.output.as_deref()).await
}

fn done_message(cli: &Cli) -> &'static str {
    if cli.plan_series {
        "Series plan ready"
    } else if cli.from_plan.is_some() {
        "Episode lines ready"
    } else {
        "Script ready"
    }
}

fn build_persona(cli: &Cli) -> Result<PersonaConfig> {
    PersonaConfig::new(&cli.host, &cli.guest, cli.temperament.into())
        .map_err(StudioError::from)
        .context("Invalid persona")
}

async fn open_input(cli: &Cli) -> Result<DocumentSource> {
    resolve_input(&cli.input, cli.download_timeout)
        .await
        .map_err(StudioError::from)
        .with_context(|| format!("Cannot open '{}'", cli.input))
}

/// Map CLI args to `StudioConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StudioConfig> {
    let mut builder = StudioConfig::builder()
        .provider_name(&cli.provider)
        .truncation_limit(cli.truncate)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder
        .build()
        .map_err(StudioError::from)
        .context("Invalid configuration")
}

async fn read_continuity_log(cli: &Cli) -> Result<String> {
    if let Some(ref text) = cli.log {
        return Ok(text.clone());
    }
    match cli.log_file {
        Some(ref path) => read_text_file(path)
            .await
            .map_err(StudioError::from)
            .context("Cannot read continuity log"),
        None => Ok(String::new()),
    }
}

/// Write to stdout, or atomically to `path` (temp file + rename).
async fn write_text(text: &str, path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(text.as_bytes())
            .context("Failed to write to stdout")?;
        if !text.ends_with('\n') {
            handle
                .write_all(b"\n")
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);
    tokio::fs::write(&tmp_path, text)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp_path))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to move output into {:?}", path))?;
    Ok(())
}

fn print_summary(output: &EpisodeOutput, path: Option<&Path>) {
    let stats = &output.stats;
    let dest = path
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    eprintln!(
        "{}  Tập {}  {} chars  {}ms{}",
        green("✔"),
        output.episode_number,
        output.script().chars().count(),
        stats.total_ms,
        dest,
    );
    if stats.truncated {
        eprintln!(
            "   {}",
            dim(&format!(
                "source cut to {} of {} chars",
                stats.embedded_chars, stats.extracted_chars
            ))
        );
    }
    if let Some(usage) = stats.usage {
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&usage.input_tokens.to_string()),
            dim(&usage.output_tokens.to_string()),
        );
    }
    eprintln!(
        "{} For episode {}, pass the script's last lines with {} and {}.",
        cyan("◆"),
        output.episode_number + 1,
        bold("--log"),
        bold(&format!("--episode {}", output.episode_number + 1)),
    );
}

/// Exit code by error category: 2 config, 3 input, 4 extraction, 5 generation.
fn exit_code(err: &anyhow::Error) -> u8 {
    let kind = err
        .chain()
        .find_map(|e| e.downcast_ref::<StudioError>())
        .map(StudioError::kind);
    match kind {
        Some(ErrorKind::Config) => 2,
        Some(ErrorKind::Input) => 3,
        Some(ErrorKind::Extraction) => 4,
        Some(ErrorKind::Generation) => 5,
        None => 1,
    }
}
