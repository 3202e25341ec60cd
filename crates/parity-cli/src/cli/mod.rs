use std::process;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use hiro_system_kit::{self, Logger};
use parity_core::Language;
use tracing_subscriber::EnvFilter;

mod check;
mod formatter;

use formatter::{get_formatter, Format};

pub const EXIT_EQUIVALENT: i32 = 0;
pub const EXIT_MISMATCH: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

#[derive(Clone)]
pub struct Context {
    pub logger: Option<Logger>,
}

impl Context {
    pub fn empty() -> Context {
        Context { logger: None }
    }

    pub fn try_log<F>(&self, closure: F)
    where
        F: FnOnce(&Logger),
    {
        if let Some(ref logger) = self.logger {
            closure(logger)
        }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Opts {
    #[clap(subcommand)]
    command: Command,
    /// Emit evaluation and search events on stderr (-vv for every search step)
    #[arg(long = "verbose", short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Check that an HCL program and a TypeScript program declare the same resources
    #[clap(name = "check", bin_name = "check")]
    Check(CheckPrograms),
    /// Print the resource graph of a single program
    #[clap(name = "graph", bin_name = "graph")]
    Graph(PrintGraph),
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct BindingArgs {
    /// Bindings file (.json, .yml or .yaml) holding a top-level map of variables
    #[arg(long = "bindings", short = 'b')]
    pub bindings: Option<String>,
    /// Set a variable, overriding the environment and the bindings file
    #[arg(long = "var", value_name = "NAME=VALUE", action = ArgAction::Append)]
    pub vars: Vec<String>,
    /// Provider schema file replacing the built-in mock schema
    #[arg(long = "schema")]
    pub schema: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct CheckPrograms {
    /// Path to the HCL program
    pub hcl_file: String,
    /// Path to the TypeScript program
    pub target_file: String,
    #[clap(flatten)]
    pub inputs: BindingArgs,
    /// Treat schema warnings as errors
    #[arg(long = "strict-schema")]
    pub strict_schema: bool,
    /// Largest graph the pairing search accepts
    #[arg(long = "max-resources")]
    pub max_resources: Option<usize>,
    /// Candidate pairs the pairing search may try
    #[arg(long = "step-budget")]
    pub step_budget: Option<u64>,
    /// Wall clock limit for the pairing search, in milliseconds
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,
    #[arg(long = "format", short = 'f', value_enum, default_value = "stylish")]
    pub format: Format,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Json,
    Dot,
}

#[derive(Parser, PartialEq, Clone, Debug)]
pub struct PrintGraph {
    /// Path to the program
    pub file: String,
    /// Source language, detected from the file extension when omitted
    #[arg(long = "lang", value_parser = parse_language)]
    pub language: Option<Language>,
    #[clap(flatten)]
    pub inputs: BindingArgs,
    #[arg(long = "format", short = 'f', value_enum, default_value = "json")]
    pub format: GraphFormat,
}

fn parse_language(raw: &str) -> Result<Language, String> {
    raw.parse::<Language>().map_err(|_| format!("unknown language '{}' (expected hcl or ts)", raw))
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("parity_core=debug,parity=debug"),
        _ => EnvFilter::new("parity_core=trace,parity=trace"),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn main() {
    let logger = hiro_system_kit::log::setup_logger();
    let _guard = hiro_system_kit::log::setup_global_logger(logger.clone());
    let ctx = Context { logger: Some(logger) };

    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => e.exit(),
    };
    setup_tracing(opts.verbose);

    let code = handle_command(opts, &ctx);
    process::exit(code);
}

fn handle_command(opts: Opts, ctx: &Context) -> i32 {
    match opts.command {
        Command::Check(cmd) => {
            let formatter = get_formatter(cmd.format);
            match check::handle_check_command(&cmd, ctx) {
                Ok(report) => {
                    println!("{}", formatter.format_report(&report));
                    if report.result.equivalent {
                        EXIT_EQUIVALENT
                    } else {
                        EXIT_MISMATCH
                    }
                }
                Err(diagnostics) => {
                    eprintln!("{}", formatter.format_diagnostics(&diagnostics));
                    EXIT_ERROR
                }
            }
        }
        Command::Graph(cmd) => match check::handle_graph_command(&cmd, ctx) {
            Ok(rendered) => {
                println!("{}", rendered);
                EXIT_EQUIVALENT
            }
            Err(diagnostics) => {
                eprintln!("{}", get_formatter(Format::Stylish).format_diagnostics(&diagnostics));
                EXIT_ERROR
            }
        },
    }
}
