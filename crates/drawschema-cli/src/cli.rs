//! Command-line interface for the drawschema utility
//!
//! Reads a draw.io diagram, infers tables, columns and references, and
//! prints or applies the resulting change plan.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::report::{colorize_report, plain_report};
use drawschema::core::logging::init_logging;
use drawschema::{
    Diagnostics, InferenceConfig, JsonFileBackend, Orchestrator, ResolvedRelation,
    SchemaChangePlan, SchemaSnapshot,
};

/// Drawschema - Infer table schemas from draw.io ER diagrams
#[derive(Parser)]
#[command(name = "drawschema")]
#[command(about = "Infer tables, columns and references from draw.io ER diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Set log level (trace|debug|info|warn|error)
    #[arg(long, value_enum, default_value_t = LogLevel::Error, global = true)]
    pub log_level: LogLevel,

    /// Set log format (compact|pretty|json)
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    /// When to color the diagnostic report
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    pub color: ColorChoice,
}

/// Log level options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format options
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        }
    }
}

/// When to colorize the report
#[derive(Copy, Clone, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Use colors if stderr is a terminal and NO_COLOR is not set
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Options shared by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Diagram file (use - for stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// JSON file overriding the diagram convention markers
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Append the diagnostic report to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the classes, attributes and relation candidates as JSON
    Inspect {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print the change plan against a schema snapshot as JSON
    Plan {
        #[command(flatten)]
        common: CommonArgs,

        /// Schema snapshot JSON file (empty schema when omitted)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Output file for the plan (use - for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Plan against a snapshot file and optionally write the changes back
    Sync {
        #[command(flatten)]
        common: CommonArgs,

        /// Schema snapshot JSON file acting as the backend
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Write the planned tables, columns and references
        #[arg(long)]
        apply: bool,
    },
}

/// JSON document printed by `plan`
#[derive(Debug, Serialize)]
struct PlanOutput<'a> {
    plan: &'a SchemaChangePlan,
    relations: &'a [ResolvedRelation],
    diagnostics: &'a Diagnostics,
}

/// Main CLI application
pub struct DrawschemaApp {
    color: ColorChoice,
}

impl DrawschemaApp {
    pub fn new() -> Self {
        Self {
            color: ColorChoice::Auto,
        }
    }

    /// Run the application with the given CLI arguments
    pub fn run(mut self, cli: Cli) -> Result<()> {
        // Environment variables take precedence over the flags
        let log_level_str = std::env::var("DRAWSCHEMA_LOG_LEVEL")
            .ok()
            .or_else(|| std::env::var("RUST_LOG").ok())
            .or_else(|| Some(cli.log_level.as_str().to_string()));

        let log_format_str = std::env::var("DRAWSCHEMA_LOG_FORMAT")
            .ok()
            .or_else(|| Some(cli.log_format.as_str().to_string()));

        if let Err(e) = init_logging(log_level_str.as_deref(), log_format_str.as_deref()) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        if cli.verbose {
            eprintln!("Drawschema v{}", env!("CARGO_PKG_VERSION"));
        }
        self.color = cli.color;

        match cli.command {
            Commands::Inspect { common } => self.inspect_command(common, cli.verbose),
            Commands::Plan {
                common,
                snapshot,
                output,
            } => self.plan_command(common, snapshot, output, cli.verbose),
            Commands::Sync {
                common,
                snapshot,
                apply,
            } => self.sync_command(common, snapshot, apply, cli.verbose),
        }
    }

    /// Handle the inspect command
    fn inspect_command(&self, common: CommonArgs, verbose: bool) -> Result<()> {
        let orchestrator = self.orchestrator(common.config.as_deref())?;
        let content = self.read_input(common.input)?;
        if verbose {
            eprintln!("Read {} bytes of input", content.len());
        }

        let model = orchestrator.build_model(&content)?;
        self.emit_report(&model.diagnostics, common.log_file.as_deref())?;
        self.write_output(None, &serde_json::to_string_pretty(&model)?)
    }

    /// Handle the plan command
    fn plan_command(
        &self,
        common: CommonArgs,
        snapshot: Option<PathBuf>,
        output: Option<PathBuf>,
        verbose: bool,
    ) -> Result<()> {
        let orchestrator = self.orchestrator(common.config.as_deref())?;
        let snapshot = match snapshot {
            Some(path) => self.read_snapshot(&path)?,
            None => SchemaSnapshot::new(),
        };
        let content = self.read_input(common.input)?;
        if verbose {
            eprintln!(
                "Read {} bytes of input, snapshot has {} tables",
                content.len(),
                snapshot.tables.len()
            );
        }

        let report = orchestrator.infer(&content, &snapshot)?;
        self.emit_report(&report.diagnostics, common.log_file.as_deref())?;

        let document = PlanOutput {
            plan: &report.plan,
            relations: &report.relations,
            diagnostics: &report.diagnostics,
        };
        self.write_output(output, &serde_json::to_string_pretty(&document)?)
    }

    /// Handle the sync command
    fn sync_command(
        &self,
        common: CommonArgs,
        snapshot: PathBuf,
        apply: bool,
        verbose: bool,
    ) -> Result<()> {
        let orchestrator = self.orchestrator(common.config.as_deref())?;
        let content = self.read_input(common.input)?;
        let mut backend = JsonFileBackend::new(snapshot);

        let report = orchestrator.sync(&content, &mut backend, apply)?;
        self.emit_report(&report.diagnostics, common.log_file.as_deref())?;

        if verbose {
            eprintln!(
                "{} {} new tables and {} relations in {}",
                if report.applied { "Applied" } else { "Would apply" },
                report.plan.new_tables.len(),
                report.relations.len(),
                backend.path().display()
            );
        }
        info!(applied = report.applied, "Sync finished");
        self.write_output(None, &serde_json::to_string_pretty(&report)?)
    }

    fn orchestrator(&self, config: Option<&Path>) -> Result<Orchestrator> {
        match config {
            Some(path) => {
                let config = InferenceConfig::from_file(path)
                    .with_context(|| format!("Failed to load config '{}'", path.display()))?;
                debug!(path = %path.display(), "Loaded inference config");
                Ok(Orchestrator::with_config(config))
            }
            None => Ok(Orchestrator::new()),
        }
    }

    fn read_snapshot(&self, path: &Path) -> Result<SchemaSnapshot> {
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read snapshot file '{}': {}", path.display(), e))?;
        SchemaSnapshot::from_json(&text)
            .with_context(|| format!("Invalid snapshot file '{}'", path.display()))
    }

    /// Print the report to stderr and append it to the log file
    fn emit_report(&self, diagnostics: &Diagnostics, log_file: Option<&Path>) -> Result<()> {
        if let Some(path) = log_file {
            self.append_log(path, diagnostics)?;
        }
        if diagnostics.is_empty() {
            return Ok(());
        }
        let text = if self.should_colorize() {
            colorize_report(diagnostics)
        } else {
            plain_report(diagnostics)
        };
        eprint!("{}", text);
        Ok(())
    }

    /// Append the report lines to `path`, creating it if needed
    pub fn append_log(&self, path: &Path, diagnostics: &Diagnostics) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow!("Failed to open log file '{}': {}", path.display(), e))?;
        file.write_all(plain_report(diagnostics).as_bytes())?;
        Ok(())
    }

    fn should_colorize(&self) -> bool {
        match self.color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                if std::env::var("NO_COLOR").is_ok() {
                    return false;
                }
                crossterm::tty::IsTty::is_tty(&io::stderr())
            }
        }
    }

    /// Read input from file or stdin
    pub fn read_input(&self, input: Option<PathBuf>) -> Result<String> {
        match input {
            Some(path) if path.to_string_lossy() != "-" => fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read input file '{}': {}", path.display(), e)),
            _ => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                Ok(content)
            }
        }
    }

    /// Write output to file or stdout
    pub fn write_output(&self, output: Option<PathBuf>, content: &str) -> Result<()> {
        let content = if content.is_empty() || content.ends_with('\n') {
            content.to_string()
        } else {
            format!("{}\n", content)
        };

        match output {
            Some(path) if path.to_string_lossy() != "-" => {
                fs::write(&path, content).map_err(|e| {
                    anyhow!("Failed to write output file '{}': {}", path.display(), e)
                })?;
            }
            _ => {
                print!("{}", content);
                io::stdout().flush()?;
            }
        }
        Ok(())
    }
}

impl Default for DrawschemaApp {
    fn default() -> Self {
        Self::new()
    }
}
