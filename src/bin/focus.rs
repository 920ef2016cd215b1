//! focus - command-line interface for the AdaptiFocus engine
//!
//! Commands:
//! - classify: Score page states (batch mode)
//! - analyze: Mine patterns from a browsing history
//! - coordinate: Run full decisions for one or more requests
//! - label: Label raw visits into browsing events
//! - summary: Summarize focus over a labeled history
//! - doctor: Diagnose configuration and environment
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use adaptifocus::catalog::DomainCategory;
use adaptifocus::classify::CompiledKeywords;
use adaptifocus::config::EngineConfig;
use adaptifocus::labeling::{EventLabeler, RawVisit};
use adaptifocus::pipeline::Coordinator;
use adaptifocus::summary::{FocusSummary, InterventionOutcome};
use adaptifocus::types::{BrowsingEvent, CoordinatorRequest, CurrentPageState};
use adaptifocus::{ContextScorer, EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// focus - study-focus decision engine
#[derive(Parser)]
#[command(name = "focus")]
#[command(author = "AdaptiFocus Contributors")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Classify browsing context and decide on focus interventions", long_about = None)]
struct Cli {
    /// Engine configuration (TOML, or JSON by extension)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify page states into study / distraction / neutral
    Classify {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Mine distraction patterns from a browsing history
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Print the report pretty-printed
        #[arg(long)]
        pretty: bool,
    },

    /// Run coordinated decisions (patterns → context → intervention)
    Coordinate {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Label raw visits as browsing events
    Label {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Summarize focus over a labeled history
    Summary {
        /// Labeled events file (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// JSON array of intervention outcomes
        #[arg(long)]
        interventions: Option<PathBuf>,

        /// Print the summary pretty-printed
        #[arg(long)]
        pretty: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one result per line)
    Ndjson,
    /// JSON array of results
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaType {
    /// Coordinator request
    Request,
    /// Coordinator output
    Output,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), FocusCliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Classify {
            input,
            input_format,
            output_format,
        } => {
            let coordinator = load_coordinator(config_path)?;
            let pages: Vec<CurrentPageState> = read_records(&input, input_format)?;
            let results: Vec<_> = pages.iter().map(|p| coordinator.classify(p)).collect();
            print!("{}", format_output(&results, output_format)?);
            Ok(())
        }

        Commands::Analyze {
            input,
            input_format,
            pretty,
        } => {
            let coordinator = load_coordinator(config_path)?;
            let events: Vec<BrowsingEvent> = read_records(&input, input_format)?;
            print_single(&coordinator.analyze_history(&events), pretty)
        }

        Commands::Coordinate {
            input,
            input_format,
            output_format,
        } => {
            let coordinator = load_coordinator(config_path)?;
            let requests: Vec<CoordinatorRequest> = read_records(&input, input_format)?;
            if requests.is_empty() {
                return Err(FocusCliError::NoRecords);
            }
            let outputs: Vec<_> = requests.iter().map(|r| coordinator.coordinate(r)).collect();
            print!("{}", format_output(&outputs, output_format)?);
            Ok(())
        }

        Commands::Label {
            input,
            input_format,
            output_format,
        } => {
            let config = load_config(config_path)?;
            let labeler = EventLabeler::new(ContextScorer::from_config(&config, None)?);
            let visits: Vec<RawVisit> = read_records(&input, input_format)?;
            let labeled = labeler.label_all(&visits);
            print!("{}", format_output(&labeled, output_format)?);
            Ok(())
        }

        Commands::Summary {
            input,
            input_format,
            interventions,
            pretty,
        } => {
            let events: Vec<BrowsingEvent> = read_records(&input, input_format)?;
            let outcomes: Vec<InterventionOutcome> = match interventions {
                Some(path) => read_records(&path, InputFormat::Json)?,
                None => Vec::new(),
            };
            print_single(&FocusSummary::from_events(&events, &outcomes), pretty)
        }

        Commands::Doctor { json } => cmd_doctor(config_path, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, FocusCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_path(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn load_coordinator(path: Option<&Path>) -> Result<Coordinator, FocusCliError> {
    let config = load_config(path)?;
    Ok(Coordinator::from_config(&config)?)
}

fn read_input(input: &Path) -> Result<String, FocusCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_records<T: DeserializeOwned>(
    input: &Path,
    format: InputFormat,
) -> Result<Vec<T>, FocusCliError> {
    let data = read_input(input)?;
    match format {
        InputFormat::Json => Ok(serde_json::from_str(&data)?),
        InputFormat::Ndjson => data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line.trim()).map_err(|e| {
                    FocusCliError::ParseError(format!("Failed to parse line {}: {}", i + 1, e))
                })
            })
            .collect(),
    }
}

fn format_output<T: Serialize>(records: &[T], format: OutputFormat) -> Result<String, FocusCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for record in records {
                out.push_str(&serde_json::to_string(record)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)? + "\n"),
    }
}

fn print_single<T: Serialize>(value: &T, pretty: bool) -> Result<(), FocusCliError> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), FocusCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Engine version {}", ENGINE_VERSION),
    });

    let config = match config_path {
        Some(path) if !path.exists() => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Config file {} does not exist", path.display()),
            });
            None
        }
        Some(path) => match EngineConfig::from_path(path) {
            Ok(config) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Config file {} is valid", path.display()),
                });
                Some(config)
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                });
                None
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "Using built-in configuration".to_string(),
            });
            Some(EngineConfig::default())
        }
    };

    if let Some(config) = config {
        let catalog = config.resolved_domains();
        let counts: Vec<String> = DomainCategory::PRIORITY
            .iter()
            .map(|c| format!("{} {}", catalog.set(*c).len(), c.as_str()))
            .collect();
        checks.push(DoctorCheck {
            name: "domain_catalog".to_string(),
            status: if catalog.is_empty() {
                CheckStatus::Warning
            } else {
                CheckStatus::Ok
            },
            message: format!("Domains: {}", counts.join(", ")),
        });

        let keywords = config.resolved_keywords();
        checks.push(match CompiledKeywords::compile(&keywords) {
            Ok(_) => DoctorCheck {
                name: "keyword_patterns".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "{} severe, {} study, {} distraction patterns compile",
                    keywords.severe.len(),
                    keywords.study.len(),
                    keywords.distraction.len()
                ),
            },
            Err(e) => DoctorCheck {
                name: "keyword_patterns".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });

        checks.push(DoctorCheck {
            name: "thresholds".to_string(),
            status: CheckStatus::Ok,
            message: format!(
                "nudge {}s, warn {}s, soft_block {}s, hard_block {}s",
                config.thresholds.nudge,
                config.thresholds.warn,
                config.thresholds.soft_block,
                config.thresholds.hard_block
            ),
        });
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input to read a file)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for records)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("focus doctor report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error))
    {
        Err(FocusCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), FocusCliError> {
    match (schema_type, json_schema) {
        (SchemaType::Request, true) => println!("{}", request_json_schema()),
        (SchemaType::Output, true) => println!("{}", output_json_schema()),
        (SchemaType::Request, false) => {
            println!("Coordinator request");
            println!();
            println!("- current_url, current_title, current_domain: the page in view");
            println!("- time_on_current_seconds: dwell time on that page");
            println!("- study_topic, session_active: the active study session, if any");
            println!("- recent_domains: recently visited domains, most recent last");
            println!("- historical_events: [{{ url, domain, title, duration, timestamp, is_distraction, category }}]");
            println!("- interventions_today: interventions already issued today");
        }
        (SchemaType::Output, false) => {
            println!("Coordinator output");
            println!();
            println!("- analysis_id, computed_at: provenance of this run");
            println!("- decision: {{ should_intervene, level, message, urgency, cooldown_seconds }}");
            println!("  level is one of none, nudge, warn, soft_block, hard_block");
            println!("- context: {{ classification, confidence, topic_relevance, context_score, reasons, is_severe }}");
            println!("- patterns: {{ patterns, hourly_vulnerability, domain_risk_scores, distraction_chains }}");
        }
    }
    Ok(())
}

fn request_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "adaptifocus.coordinator_request",
        "type": "object",
        "properties": {
            "current_url": { "type": ["string", "null"] },
            "current_title": { "type": ["string", "null"] },
            "current_domain": { "type": ["string", "null"] },
            "time_on_current_seconds": { "type": "integer", "minimum": 0 },
            "study_topic": { "type": ["string", "null"] },
            "session_active": { "type": "boolean" },
            "recent_domains": { "type": "array", "items": { "type": "string" } },
            "historical_events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "url": { "type": ["string", "null"] },
                        "domain": { "type": ["string", "null"] },
                        "title": { "type": ["string", "null"] },
                        "duration": { "type": "integer" },
                        "timestamp": { "type": ["string", "null"] },
                        "is_distraction": { "type": "boolean" },
                        "category": { "type": ["string", "null"] }
                    }
                }
            },
            "interventions_today": { "type": "integer", "minimum": 0 }
        }
    })
    .to_string()
}

fn output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "adaptifocus.coordinator_output",
        "type": "object",
        "required": ["analysis_id", "computed_at", "decision", "context", "patterns"],
        "properties": {
            "analysis_id": { "type": "string", "format": "uuid" },
            "computed_at": { "type": "string", "format": "date-time" },
            "decision": {
                "type": "object",
                "properties": {
                    "should_intervene": { "type": "boolean" },
                    "level": { "enum": ["none", "nudge", "warn", "soft_block", "hard_block"] },
                    "message": { "type": "string" },
                    "urgency": { "type": "number" },
                    "cooldown_seconds": { "type": "integer" }
                }
            },
            "context": {
                "type": "object",
                "properties": {
                    "classification": { "enum": ["study", "distraction", "neutral"] },
                    "confidence": { "type": "number" },
                    "topic_relevance": { "type": "number" },
                    "context_score": { "type": "number" },
                    "reasons": { "type": "array", "items": { "type": "string" } },
                    "is_severe": { "type": "boolean" }
                }
            },
            "patterns": {
                "type": "object",
                "properties": {
                    "patterns": { "type": "array", "items": { "type": "object" } },
                    "hourly_vulnerability": { "type": "object" },
                    "domain_risk_scores": { "type": "object" },
                    "distraction_chains": {
                        "type": "array",
                        "items": { "type": "array", "items": { "type": "string" } }
                    }
                }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum FocusCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoRecords,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for FocusCliError {
    fn from(e: io::Error) -> Self {
        FocusCliError::Io(e)
    }
}

impl From<EngineError> for FocusCliError {
    fn from(e: EngineError) -> Self {
        FocusCliError::Engine(e)
    }
}

impl From<serde_json::Error> for FocusCliError {
    fn from(e: serde_json::Error) -> Self {
        FocusCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<FocusCliError> for CliError {
    fn from(e: FocusCliError) -> Self {
        match e {
            FocusCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            FocusCliError::Engine(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'focus doctor --config <file>' for details".to_string()),
            },
            FocusCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax, or pass --input-format ndjson".to_string()),
            },
            FocusCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            FocusCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            FocusCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
