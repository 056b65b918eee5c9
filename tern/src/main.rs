//! tern CLI

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tern::config::{RunConfig, CONFIG_FILE};
use tern::error::report_error;
use tern::Interpreter;

/// Exit status for malformed input (lex, parse)
const EXIT_DATAERR: i32 = 65;
/// Exit status for a runtime error
const EXIT_SOFTWARE: i32 = 70;

#[derive(Parser)]
#[command(name = "tern", version, about = "tern - a small class-based scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a tern script
    Run {
        /// Script to run
        file: PathBuf,
        /// Config file (defaults to tern.toml next to the script)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Module name shown in stack traces
        #[arg(long)]
        module: Option<String>,
        /// Maximum call depth
        #[arg(long)]
        max_frames: Option<usize>,
        /// Log every call entry and exit to stderr
        #[arg(long)]
        trace_calls: bool,
    },
    /// Parse and dump AST as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Start an interactive session
    Repl,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            file,
            config,
            module,
            max_frames,
            trace_calls,
        } => {
            let overrides = Overrides {
                module,
                max_frames,
                trace_calls,
            };
            run_file(&file, config.as_deref(), overrides)
        }
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Repl => start_repl(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Settings given on the command line; they win over the config file
struct Overrides {
    module: Option<String>,
    max_frames: Option<usize>,
    trace_calls: bool,
}

fn resolve_config(
    path: &Path,
    config_path: Option<&Path>,
    overrides: Overrides,
) -> tern::Result<RunConfig> {
    let mut config = RunConfig::new();
    if let Some(stem) = RunConfig::module_for(path) {
        config = config.module(stem);
    }

    let default_path = path
        .parent()
        .map(|dir| dir.join(CONFIG_FILE))
        .filter(|p| p.is_file());
    if let Some(file) = config_path.map(Path::to_path_buf).or(default_path) {
        config = config.merge_file(&file)?;
    }

    if let Some(module) = overrides.module {
        config = config.module(module);
    }
    if let Some(max_frames) = overrides.max_frames {
        config = config.max_frames(max_frames);
    }
    if overrides.trace_calls {
        config = config.trace_calls(true);
    }
    config.validate()
}

fn run_file(
    path: &Path,
    config_path: Option<&Path>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();
    let config = resolve_config(path, config_path, overrides)?;

    let program = match tern::parse_source(&filename, &source) {
        Ok(program) => program,
        Err(e) => {
            report_error(&filename, &source, &e)?;
            std::process::exit(EXIT_DATAERR);
        }
    };

    let mut interp = Interpreter::with_config(config);
    if let Err(e) = interp.run(&program) {
        eprintln!("{e}");
        std::process::exit(EXIT_SOFTWARE);
    }
    Ok(())
}

fn parse_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let ast = match tern::parse_source(&filename, &source) {
        Ok(ast) => ast,
        Err(e) => {
            report_error(&filename, &source, &e)?;
            std::process::exit(EXIT_DATAERR);
        }
    };

    println!("{}", serde_json::to_string_pretty(&ast)?);
    Ok(())
}

fn tokenize_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    let tokens = tern::lexer::tokenize(&source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {} (line {})", tok, span, span.line);
    }

    Ok(())
}

fn start_repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut repl = tern::repl::Repl::new()?;
    repl.run()?;
    Ok(())
}
