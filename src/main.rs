//! lpg compiler CLI
//!
//! Main entry point for the `lpgc` command.

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lpg::ast::Sequence;
use lpg::diagnostics::{CompileError, Reporter, SourceFile};
use lpg::interp::{Counters, FunctionPointerValue, Interpreter, Value};
use lpg::types::FunctionId;
use lpg::{CheckConfig, CheckedProgram, ModuleLoader};

#[derive(Parser)]
#[command(name = "lpgc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Type checker and interpreter for the lpg language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Checker limits and module directory (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Type-check a source file and report diagnostics
    Check {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Check a source file, then interpret its top level
    Run {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the checked IR
    Ir {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Remove dead code and unused functions first
        #[arg(long)]
        optimize: bool,
    },

    /// Print the token stream
    Tokens {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the syntax tree as JSON
    Ast {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    let config = match &cli.config {
        Some(path) => CheckConfig::from_file(path).into_diagnostic()?,
        None => CheckConfig::default(),
    };

    match cli.command {
        Commands::Check { input } => {
            let program = check_file(&input, &config)?;
            println!(
                "All checks passed: {} ({} functions)",
                input.display(),
                program.functions.len()
            );
            Ok(())
        }
        Commands::Run { input } => run(&input, &config),
        Commands::Ir { input, optimize } => {
            let mut program = check_file(&input, &config)?;
            if optimize {
                lpg::optimize::optimize(&mut program);
            }
            print!("{}", lpg::ir::print_program(&program));
            Ok(())
        }
        Commands::Tokens { input } => {
            let source = read_source(&input)?;
            let tokens = lpg::lexer::lex(&source.content)
                .map_err(|error| miette::Report::new(CompileError::from_parse(&error, &source)))?;
            for token in tokens {
                println!("{}: {:?} {:?}", token.location, token.kind, token.text);
            }
            Ok(())
        }
        Commands::Ast { input } => {
            let source = read_source(&input)?;
            let root = parse(&source)?;
            let json = serde_json::to_string_pretty(&root)
                .map_err(|e| miette::miette!("Failed to serialize AST: {}", e))?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn read_source(input: &Path) -> Result<SourceFile> {
    let content = std::fs::read_to_string(input)
        .map_err(|e| miette::miette!("Failed to read input file: {}", e))?;
    Ok(SourceFile::new(input.display().to_string(), content))
}

fn parse(source: &SourceFile) -> Result<Sequence> {
    lpg::parser::parse_source(&source.content)
        .map_err(|error| miette::Report::new(CompileError::from_parse(&error, source)))
}

/// Parses and checks a file; semantic errors are printed and turn into one error
fn check_file(input: &Path, config: &CheckConfig) -> Result<CheckedProgram> {
    tracing::info!("Checking {:?}", input);
    let source = read_source(input)?;
    let root = parse(&source)?;
    let loader = ModuleLoader::new(config.module_directory.clone());
    let import_directory = input.parent();
    let mut reporter = Reporter::new();
    let program = lpg::check(
        &root,
        source,
        import_directory,
        &loader,
        config,
        &mut |error| reporter.error(CompileError::from_semantic(&error)),
    );
    if reporter.has_errors() {
        reporter.emit_all();
        return Err(miette::miette!("{} semantic errors found", reporter.error_count()));
    }
    Ok(program)
}

fn run(input: &Path, config: &CheckConfig) -> Result<()> {
    let program = check_file(input, config)?;
    let globals = lpg::stdlib::global_values();
    let mut counters = Counters::default();
    let entry = FunctionPointerValue::Internal {
        function: FunctionId(0),
        captures: Vec::new(),
    };
    let result = Interpreter::new(&program, &globals, config.interpreter_limits(), &mut counters)
        .at_run_time()
        .call_function(&entry, None, Vec::new())
        .map_err(|error| miette::miette!("Execution failed: {}", error))?;
    tracing::info!(executed = counters.executed_instructions, "finished");
    match result {
        Value::Unit => {}
        other => println!("{}", other),
    }
    Ok(())
}
