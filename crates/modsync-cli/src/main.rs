use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use modsync_host::{default_host_prefix, HostLayout, HostRegistry};

mod completion;
mod config;
mod flows;
mod render;

use completion::{write_completions_script, CliCompletionShell};
use config::{init_tracing, CliConfig};
use flows::{run_apply, run_inspect, run_list, run_pack, run_start, run_stop, ApplyOptions};
use render::resolve_output_style;

#[derive(Parser, Debug)]
#[command(name = "modsync")]
#[command(about = "Apply component bundles to a host in dependency order", long_about = None)]
struct Cli {
    /// Host prefix holding installed components and state.
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,
    /// Configuration file; defaults to <prefix>/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install, upgrade or start every package of a bundle.
    Apply {
        bundle: PathBuf,
        /// Run the plan against an in-memory copy of the host.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print the descriptor of a component package.
    Inspect { package: PathBuf },
    /// Build a component package from a descriptor and payload directory.
    Pack {
        descriptor: PathBuf,
        #[arg(long)]
        payload: Option<PathBuf>,
        #[arg(long, short)]
        output: PathBuf,
    },
    List,
    Start { id: String },
    /// Stop a component and every running component that depends on it.
    Stop { id: String },
    Completions { shell: CliCompletionShell },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let prefix = match cli.prefix.clone() {
        Some(prefix) => prefix,
        None => default_host_prefix()?,
    };
    let layout = HostLayout::new(prefix);
    let config = match cli.config.as_deref() {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::load_optional(&layout.config_path())?,
    };
    init_tracing(&config);

    run_cli(cli.command, layout, &config)
}

fn run_cli(command: Commands, layout: HostLayout, config: &CliConfig) -> Result<()> {
    let style = resolve_output_style(config);

    match command {
        Commands::Apply {
            bundle,
            dry_run,
            json,
        } => {
            let mut registry = HostRegistry::open(layout)?;
            run_apply(
                &mut registry,
                &bundle,
                ApplyOptions {
                    dry_run,
                    json,
                    style,
                },
            )?;
        }
        Commands::Inspect { package } => run_inspect(&package)?,
        Commands::Pack {
            descriptor,
            payload,
            output,
        } => run_pack(&descriptor, payload.as_deref(), &output)?,
        Commands::List => {
            let registry = HostRegistry::open(layout)?;
            run_list(&registry, style)?;
        }
        Commands::Start { id } => {
            let mut registry = HostRegistry::open(layout)?;
            run_start(&mut registry, &id, style)?;
        }
        Commands::Stop { id } => {
            let mut registry = HostRegistry::open(layout)?;
            run_stop(&mut registry, &id, style)?;
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout();
            write_completions_script(shell, &mut stdout)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
