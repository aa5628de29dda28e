use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use adlc_compiler::{
    compile_modules, emit, error::AdlError, types::Module, write_units, Compilation, CompilerConfig,
    Loader,
};

#[derive(Parser)]
#[command(name = "adlc")]
#[command(version, about = "Check ADL schemas and generate code from them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Inputs {
    /// Module names (`a.b`) or `.adl` files; imported modules are found on the search path
    #[arg(required = true)]
    modules: Vec<String>,

    /// Directory to search for modules (repeatable, searched in order)
    #[arg(short = 'I', long = "search-path")]
    search_path: Vec<PathBuf>,

    /// Configuration file (defaults to `adlc.json` in the working directory, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check schemas and generate code for the configured targets
    Generate {
        #[command(flatten)]
        inputs: Inputs,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target language (repeatable); replaces the configured targets
        #[arg(short, long = "target")]
        targets: Vec<String>,

        /// Do not embed serialized declarations in generated code
        #[arg(long)]
        no_ast: bool,
    },

    /// Check schemas without generating anything
    Check {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// Print the serialized declarations of a module as JSON
    Ast {
        #[command(flatten)]
        inputs: Inputs,

        /// Module to print (defaults to the first input)
        #[arg(short, long)]
        module: Option<String>,
    },

    /// List the available target languages
    Targets,
}

fn load_config(inputs: &Inputs) -> Result<CompilerConfig, AdlError> {
    let mut config = match &inputs.config {
        Some(path) => CompilerConfig::load_file(path)?,
        None => CompilerConfig::discover(Path::new("."))?,
    };
    if !inputs.search_path.is_empty() {
        config.search_path = inputs.search_path.clone();
    }
    Ok(config)
}

/// Loads the inputs and everything they depend on. Returns the modules and
/// the names of the input modules.
fn load(inputs: &Inputs, config: &CompilerConfig) -> Result<(Vec<Module>, Vec<String>), AdlError> {
    let loader = Loader::new(config.search_path.clone());
    let mut roots = Vec::new();
    for input in &inputs.modules {
        let path = Path::new(input);
        let module = if input.ends_with(".adl") && path.is_file() {
            loader.load_file(path)?
        } else {
            loader.load_module(input)?
        };
        roots.push(module);
    }
    let names = roots.iter().map(|m| m.name.clone()).collect();
    Ok((loader.load_dependencies(roots)?, names))
}

fn compile(inputs: &Inputs, config: &CompilerConfig) -> Result<(Compilation, Vec<String>), AdlError> {
    let (modules, names) = load(inputs, config)?;
    Ok((compile_modules(modules)?, names))
}

fn run(cli: Cli) -> Result<(), AdlError> {
    match cli.command {
        Commands::Generate { inputs, output, targets, no_ast } => {
            let mut config = load_config(&inputs)?;
            if let Some(output) = output {
                config.output_dir = output;
            }
            if !targets.is_empty() {
                config.targets.retain(|name, _| targets.contains(name));
                for target in &targets {
                    config.enable_target(target);
                }
            }
            if no_ast {
                for options in config.targets.values_mut() {
                    options.include_ast = false;
                }
            }
            config.validate()?;
            tracing::debug!(output = %config.output_dir.display(), targets = config.targets.len(), "configured");

            let (compiled, _) = compile(&inputs, &config)?;
            let units = compiled.emit_targets(&config.targets)?;
            write_units(&config.output_dir, &units)?;
            println!("Generated {} file(s) in {}", units.len(), config.output_dir.display());
            Ok(())
        }

        Commands::Check { inputs } => {
            let config = load_config(&inputs)?;
            let (compiled, _) = compile(&inputs, &config)?;
            println!(
                "OK: {} module(s), {} declaration(s)",
                compiled.set().modules().len(),
                compiled.set().decls().len()
            );
            Ok(())
        }

        Commands::Ast { inputs, module } => {
            let config = load_config(&inputs)?;
            let (compiled, names) = compile(&inputs, &config)?;
            let module = module.or_else(|| names.into_iter().next()).unwrap_or_default();
            let decls = compiled.module_asts(&module)?;
            println!("{}", serde_json::to_string_pretty(&decls)?);
            Ok(())
        }

        Commands::Targets => {
            for name in emit::emitter_names() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
