//! Blockweave CLI
//!
//! Usage:
//!   blockweave compile [FILE] [--config FILE] [--json]
//!   blockweave parse [FILE] [--json]
//!   blockweave sync --templates DIR --store DIR --template ID --content ID [--config FILE]

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use blockweave::sync::{DirectorySource, FileStore};
use blockweave::{wire, Compiler, ProjectConfig, Synchronizer, Warning};

#[derive(Parser)]
#[command(name = "blockweave")]
#[command(about = "Compile HTML-like templates into editor blocks")]
struct Cli {
    /// Log compile and reconcile decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a template to block markup
    Compile {
        /// Template file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Project configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the block tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse block markup and print it back
    Parse {
        /// Block markup file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Print the block tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile a template into stored content
    Sync {
        /// Directory of `<id>.html` templates
        #[arg(long)]
        templates: PathBuf,

        /// Directory of stored `<id>.html` content
        #[arg(long)]
        store: PathBuf,

        /// Template id
        #[arg(long)]
        template: String,

        /// Content id
        #[arg(long)]
        content: String,

        /// Project configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Compile {
            input,
            config,
            json,
        } => run_compile(input.as_deref(), config.as_deref(), json),
        Command::Parse { input, json } => run_parse(input.as_deref(), json),
        Command::Sync {
            templates,
            store,
            template,
            content,
            config,
        } => run_sync(&templates, &store, &template, &content, config.as_deref()),
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn read_input(input: Option<&Path>) -> String {
    match input {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => fail(format!("reading file '{}': {}", path.display(), e)),
        },
        None => {
            let mut buffer = String::new();
            match io::stdin().read_to_string(&mut buffer) {
                Ok(_) => buffer,
                Err(e) => fail(format!("reading from stdin: {}", e)),
            }
        }
    }
}

fn load_config(path: Option<&Path>) -> ProjectConfig {
    match path {
        Some(path) => match ProjectConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => fail(format!("loading config '{}': {}", path.display(), e)),
        },
        None => ProjectConfig::default(),
    }
}

fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => fail(e),
    }
}

fn run_compile(input: Option<&Path>, config: Option<&Path>, json: bool) {
    let config = load_config(config);
    let compiler = match Compiler::from_config(&config) {
        Ok(compiler) => compiler,
        Err(e) => fail(e),
    };
    let source = read_input(input);
    let filename = input
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<stdin>".to_string());

    match compiler.compile(&source) {
        Ok(compiled) => {
            print_warnings(&compiled.warnings);
            if json {
                print_json(&compiled.document);
            } else {
                println!("{}", compiled.document.to_wire());
            }
        }
        Err(e) => {
            eprint!("{}", e.format(&source, &filename));
            std::process::exit(1);
        }
    }
}

fn run_parse(input: Option<&Path>, json: bool) {
    let source = read_input(input);
    match wire::parse(&source) {
        Ok(blocks) => {
            if json {
                print_json(&blocks);
            } else {
                println!("{}", wire::serialize(&blocks));
            }
        }
        Err(e) => fail(e),
    }
}

fn run_sync(templates: &Path, store: &Path, template: &str, content: &str, config: Option<&Path>) {
    let config = load_config(config);
    let store = match FileStore::open(store) {
        Ok(store) => store,
        Err(e) => fail(e),
    };
    let synchronizer = match Synchronizer::from_config(&config, DirectorySource::new(templates), store) {
        Ok(synchronizer) => synchronizer,
        Err(e) => fail(e),
    };
    match synchronizer.sync(template, content) {
        Ok(outcome) => {
            print_warnings(&outcome.warnings);
            println!(
                "{}: revision {} ({} preserved, {} inserted, {} dropped, {} replaced)",
                content,
                outcome.revision,
                outcome.report.preserved.len(),
                outcome.report.inserted.len(),
                outcome.report.dropped.len(),
                outcome.report.replaced.len()
            );
        }
        Err(e) => fail(e),
    }
}
