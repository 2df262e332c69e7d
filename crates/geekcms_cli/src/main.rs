//! GeekCMS CLI
//!
//! Resolves theme plugin execution orders and checks themes out.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod theme;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::Result;
use geekcms_core::{PermissiveCatalog, PluginCatalog, PluginRegistry};
use geekcms_sequence::{resolve_concurrently, SequenceConfig, SequenceOutput};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "geekcms")]
#[command(about = "GeekCMS - plugin execution order resolver", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the plugin order of every component in a theme
    Resolve(ResolveArgs),
    /// Check a theme out of the theme repository
    Download {
        /// Theme name
        theme: String,
        /// Directory the theme is checked out into
        #[arg(long, default_value = ".")]
        into: PathBuf,
        /// Theme repository base URL
        #[arg(long, default_value = theme::THEME_REPOSITORY)]
        repo: String,
    },
}

#[derive(Args)]
struct ResolveArgs {
    /// Theme directory
    theme_dir: PathBuf,
    /// Relation file inside the theme directory
    #[arg(short, long, default_value = theme::SEQUENCE_FILE)]
    file: String,
    /// Default theme for unqualified plugins
    #[arg(short, long)]
    theme: Option<String>,
    /// Plugin registry manifest (JSON)
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Sequencing configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    /// Skip operand and component checks against the registry
    #[arg(long)]
    no_check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Resolve(args) => {
            let output = resolve(&args).await?;
            print_output(&output, args.json)?;
            if !output.is_ok() {
                bail!("{} component(s) failed to resolve", output.errors().len());
            }
            Ok(())
        }
        Commands::Download { theme, into, repo } => {
            let plan = theme::checkout_plan(&theme, &repo, &into)?;
            tokio::task::spawn_blocking(move || theme::checkout(&plan)).await??;
            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "geekcms={level},geekcms_core={level},geekcms_sequence={level}"
        ))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration for a resolve run
fn load_config(args: &ResolveArgs) -> Result<SequenceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
            SequenceConfig::from_json(&text)?
        }
        None => SequenceConfig::default(),
    };

    let theme = match &args.theme {
        Some(theme) => theme.clone(),
        None => theme::theme_name(&args.theme_dir)
            .ok_or_else(|| eyre!("cannot infer theme from {}", args.theme_dir.display()))?,
    };
    config = config.with_default_theme(theme);

    if args.no_check || args.registry.is_none() {
        config = config.with_check_operands(false).with_check_components(false);
    }
    Ok(config)
}

fn load_registry(path: &Path) -> Result<PluginRegistry> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read registry {}", path.display()))?;
    Ok(PluginRegistry::from_json(&text)?)
}

async fn resolve(args: &ResolveArgs) -> Result<SequenceOutput> {
    let source = theme::load_source(&args.theme_dir, &args.file)?;
    let config = load_config(args)?;
    tracing::info!(
        theme = %config.default_theme,
        workers = config.max_workers,
        "resolving plugin order"
    );

    match &args.registry {
        Some(path) => run(&source, config, Arc::new(load_registry(path)?)).await,
        None => run(&source, config, Arc::new(PermissiveCatalog)).await,
    }
}

async fn run<C>(source: &str, config: SequenceConfig, catalog: Arc<C>) -> Result<SequenceOutput>
where
    C: PluginCatalog + Send + Sync + 'static,
{
    Ok(resolve_concurrently(source, config, catalog).await?)
}

fn print_output(output: &SequenceOutput, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&output.report())?);
        return Ok(());
    }
    for line in render_text(output) {
        println!("{}", line);
    }
    Ok(())
}

fn render_text(output: &SequenceOutput) -> Vec<String> {
    output
        .iter()
        .map(|(component, result)| match result {
            Ok(order) => {
                let names: Vec<String> = order.iter().map(ToString::to_string).collect();
                format!("{}: {}", component, names.join(" -> "))
            }
            Err(err) => format!("{}: error: {}", component, err),
        })
        .collect()
}
