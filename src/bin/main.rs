//! promsense CLI - check and complete PromQL queries, or serve them over LSP
//!
//! Usage:
//!   promsense check [QUERY] [--file <path>]
//!   promsense complete <QUERY> [--cursor <offset>] [--json]
//!   promsense templates [--json]
//!   promsense lsp [--websocket [<addr>]]
//!
//! Examples:
//!   promsense check 'rate(http_requests_total[5m])'
//!   promsense complete 'sum(rate(http_requests_total[5m])) ' --json
//!   promsense lsp --websocket 127.0.0.1:9257

use std::fs;
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use promsense::config::Settings;
use promsense::diagnostics::{severity_of, Severity};
use promsense::lsp::{run_stdio, run_websocket, BackendConfig};
use promsense::prelude::*;

/// Environment variable holding a tracing filter, e.g. `promsense=debug`.
const LOG_ENV: &str = "PROMSENSE_LOG";

#[derive(Parser)]
#[command(name = "promsense")]
#[command(about = "promsense - completion and validation for PromQL queries")]
#[command(version)]
struct Cli {
    /// Path to a promsense.toml (overrides discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a query and report findings
    Check {
        /// The query text (read from stdin when neither this nor --file is given)
        query: Option<String>,

        /// Read the query from a file
        #[arg(short, long, conflicts_with = "query")]
        file: Option<PathBuf>,
    },

    /// List completion proposals at a cursor offset
    Complete {
        /// The query text
        query: String,

        /// Byte offset of the cursor (defaults to the end of the query)
        #[arg(long)]
        cursor: Option<usize>,

        /// Print proposals as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the query templates
    Templates {
        /// Print templates as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the language server
    Lsp {
        /// Serve over WebSocket instead of stdio, optionally on a given address
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        websocket: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&settings);
    debug!("promsense v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Check { query, file } => cmd_check(&settings, query, file),
        Commands::Complete {
            query,
            cursor,
            json,
        } => cmd_complete(&settings, &query, cursor, json),
        Commands::Templates { json } => cmd_templates(&settings, json),
        Commands::Lsp { websocket } => cmd_lsp(&settings, websocket),
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));

    // stdout carries LSP traffic and command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_query(query: Option<String>, file: Option<PathBuf>) -> io::Result<(String, String)> {
    match (query, file) {
        (Some(query), _) => Ok(("<query>".to_string(), query)),
        (None, Some(path)) => {
            let text = fs::read_to_string(&path)?;
            Ok((path.display().to_string(), text))
        }
        (None, None) => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(("<stdin>".to_string(), text))
        }
    }
}

fn cmd_check(settings: &Settings, query: Option<String>, file: Option<PathBuf>) -> ExitCode {
    let (name, text) = match read_query(query, file) {
        Ok(read) => read,
        Err(e) => {
            eprintln!("Error reading query: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let validator = Validator::new(Arc::new(settings.grammar()));
    let findings = validator.validate(&text);

    if findings.is_empty() {
        println!("OK: {} is valid", name);
        return ExitCode::SUCCESS;
    }

    let config = Config::default().with_index_type(IndexType::Byte);
    for finding in &findings {
        let (kind, color) = match severity_of(finding.rule) {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
        };
        let span = finding.start..finding.end.max(finding.start);

        let report = Report::build(kind, (name.as_str(), span.clone()))
            .with_config(config)
            .with_code(finding.rule)
            .with_message(&finding.message)
            .with_label(
                Label::new((name.as_str(), span))
                    .with_message(&finding.message)
                    .with_color(color),
            )
            .finish();

        if let Err(e) = report.eprint((name.as_str(), Source::from(text.as_str()))) {
            eprintln!("{}: {}", finding, e);
        }
    }

    ExitCode::FAILURE
}

fn cmd_complete(settings: &Settings, query: &str, cursor: Option<usize>, json: bool) -> ExitCode {
    let engine = CompletionEngine::new(Arc::new(settings.grammar()))
        .with_max_proposals(settings.editor.max_proposals);
    let cursor = cursor.unwrap_or(query.len());
    let proposals = engine.complete(query, cursor);

    if json {
        return match serde_json::to_string_pretty(&proposals) {
            Ok(out) => {
                println!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error encoding proposals: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    if proposals.is_empty() {
        println!("No proposals.");
        return ExitCode::SUCCESS;
    }

    let width = proposals.iter().map(|p| p.label.len()).max().unwrap_or(0);
    for proposal in &proposals {
        println!(
            "{:<width$}  {:<15}  {}",
            proposal.label,
            proposal.category.as_str(),
            proposal.detail.as_deref().unwrap_or(""),
            width = width
        );
    }
    ExitCode::SUCCESS
}

fn cmd_templates(settings: &Settings, json: bool) -> ExitCode {
    let grammar = settings.grammar();

    if json {
        let templates: Vec<_> = grammar
            .templates()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "skeleton": t.skeleton,
                    "example": t.render_defaults(),
                    "parameters": t.parameters.iter().map(|p| serde_json::json!({
                        "name": p.name,
                        "kind": p.kind.as_str(),
                        "default": p.default,
                        "optional": p.optional,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        return match serde_json::to_string_pretty(&templates) {
            Ok(out) => {
                println!("{}", out);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error encoding templates: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    for template in grammar.templates() {
        println!("{} - {}", template.name, template.description);
        println!("    {}", template.render_defaults());
    }
    ExitCode::SUCCESS
}

fn cmd_lsp(settings: &Settings, websocket: Option<String>) -> ExitCode {
    let config = BackendConfig::new(
        Arc::new(settings.grammar()),
        SessionOptions::from(&settings.editor),
    );

    let addr = match websocket.as_deref() {
        None => None,
        Some("") => match settings.server.resolved_websocket_addr() {
            Ok(addr) => Some(addr),
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        Some(raw) => match raw.parse::<SocketAddr>() {
            Ok(addr) => Some(addr),
            Err(e) => {
                eprintln!("Invalid address '{}': {}", raw, e);
                return ExitCode::FAILURE;
            }
        },
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error starting runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match addr {
        None => {
            runtime.block_on(run_stdio(config));
            ExitCode::SUCCESS
        }
        Some(addr) => match runtime.block_on(run_websocket(addr, config)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("WebSocket server error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
