mod ui;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use fnreview::config::{self, Config};
use fnreview::logging::{self, LogTarget};
use fnreview::query::QueryCriteria;
use fnreview::remote::HttpBackend;
use fnreview::view::{QueryOutcome, ViewState};

#[derive(Parser, Debug)]
#[command(name = "fnreview", version, about = "Review and edit file-node records")]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one query and print the rows (tab separated)
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Root path the file nodes must live under
    #[arg(long, value_name = "ROOT")]
    path: Option<String>,

    /// Property filter, e.g. "company:acme, phone:780"
    #[arg(long, value_name = "FILTER", default_value = "")]
    filter: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Query(args)) => {
            logging::init(&config.log, LogTarget::Stderr)?;
            report_config(&config);
            handle_query(args, &config)
        }
        None => {
            let log_path = logging::init(&config.log, LogTarget::File)?;
            report_config(&config);
            tracing::info!(
                config = %config.config_path.display(),
                log = ?log_path,
                "starting review session"
            );
            let mut app = ui::app::App::new(&config)?;
            app.run()
        }
    }
}

/// Log what `config::load` found; it runs before any subscriber exists.
fn report_config(config: &Config) {
    if !config.config_path.exists() {
        tracing::info!(
            path = %config.config_path.display(),
            "no configuration file, using defaults"
        );
    }
    for warning in &config.warnings {
        tracing::warn!("{}", warning);
    }
}

fn handle_query(args: QueryArgs, config: &Config) -> Result<()> {
    let backend = HttpBackend::new(&config.backend)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let root = args.path.unwrap_or_else(|| config.view.root_path.clone());
    let criteria = QueryCriteria::new(root, args.filter);
    let mut view = ViewState::new(config.view.clone());

    match runtime.block_on(view.submit_query(&backend, &criteria)) {
        QueryOutcome::Loaded { count, duplicates } => {
            for row in view.rows() {
                let cells: Vec<&str> = row.cells.iter().map(|cell| cell.title.as_str()).collect();
                println!("{}", cells.join("\t"));
            }
            if duplicates > 0 {
                println!("{} record(s), {} duplicate(s) skipped", count, duplicates);
            } else {
                println!("{} record(s)", count);
            }
            Ok(())
        }
        QueryOutcome::Empty => {
            println!("0 record(s)");
            Ok(())
        }
        QueryOutcome::Failed(message) => bail!("query failed: {}", message),
    }
}
