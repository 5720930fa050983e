//! Funz CLI - command-line front end for the Funz simulation tool
//!
//! Main entry point for the funz command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use funz_core::adapters::cli::{
    render_models, render_outputs, render_result_dirs, render_results, render_stats,
};
use funz_core::variables::parse_assignment;
use funz_core::{
    FunzConfig, FunzService, OutputFormat, PanelController, PanelEvent, PanelRequest, ResultTable,
    RunRequest, SortOrder, Variable, VariableKind, VariableSet,
};

#[derive(Parser)]
#[command(name = "funz")]
#[command(about = "Funz - parametric simulation front end", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Workspace root holding .fz/models and results
    #[arg(short, long, global = true, env = "FUNZ_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Python interpreter used to launch the tool
    #[arg(long, global = true, env = "FUNZ_PYTHON_PATH")]
    python: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Model definition commands
    #[command(subcommand)]
    Models(ModelCommands),

    /// Detect the variables of a template
    Detect {
        /// Template file
        file: PathBuf,
        /// Model name
        #[arg(short, long)]
        model: String,
        /// Print the variables as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compile a template with concrete values
    Compile {
        /// Template file
        template: PathBuf,
        #[arg(short, long)]
        model: String,
        #[command(flatten)]
        values: ValueArgs,
        /// Output directory (default: <workspace>/results_compiled)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run simulations, streaming the tool's progress output
    Run {
        /// Template file
        template: PathBuf,
        #[arg(short, long)]
        model: String,
        #[command(flatten)]
        values: ValueArgs,
        /// Calculator, e.g. sh://bash or ssh://host
        #[arg(short, long)]
        calculator: Option<String>,
        /// Results directory (default: <workspace>/results)
        #[arg(short, long)]
        results: Option<PathBuf>,
    },

    /// Parse and display a results directory
    Results {
        /// Results directory
        dir: PathBuf,
        #[arg(short, long)]
        model: String,
        /// Output format requested from the tool: json, csv, table
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,
        /// Only show runs with a value containing this text
        #[arg(long)]
        filter: Option<String>,
        /// Sort by column
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long, requires = "sort")]
        desc: bool,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List result directories in the workspace
    ResultsList,

    /// Export a results directory as CSV
    Export {
        /// Results directory
        dir: PathBuf,
        #[arg(short, long)]
        model: String,
        /// Destination file
        #[arg(long)]
        to: PathBuf,
    },

    /// Check that the tool can be launched
    Check,

    /// Serve panel requests: JSON lines on stdin, events on stdout
    Serve,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// List models with their settings
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show a model's settings and outputs
    Show {
        /// Model name
        name: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct ValueArgs {
    /// Single value, NAME=VALUE
    #[arg(long = "var", value_name = "NAME=VALUE")]
    single: Vec<String>,
    /// Array of values, NAME=[1,2,3] or NAME=a,b,c
    #[arg(long = "array", value_name = "NAME=VALUES")]
    array: Vec<String>,
    /// Range expression expanded by the tool, NAME=EXPR (numeric text is sent as a number)
    #[arg(long = "range", value_name = "NAME=EXPR")]
    range: Vec<String>,
}

impl ValueArgs {
    fn variable_set(&self) -> Result<VariableSet> {
        let groups = [
            (VariableKind::Single, &self.single),
            (VariableKind::Array, &self.array),
            (VariableKind::Range, &self.range),
        ];

        let mut variables = Vec::new();
        for (kind, assignments) in groups {
            for assignment in assignments {
                let (name, text) = parse_assignment(assignment)?;
                variables.push(Variable::from_input(name, kind, &text));
            }
        }
        Ok(VariableSet::from_variables(&variables))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Make a user-supplied path independent of the tool's working directory.
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("invalid path '{}'", path.display()))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = FunzConfig::from_env();
    if let Some(workspace) = &cli.workspace {
        config = config.with_workspace_root(absolute(workspace)?);
    }
    if let Some(python) = cli.python {
        config = config.with_python_path(python);
    }
    let service = FunzService::new(config);

    match cli.command {
        Commands::Models(ModelCommands::List { json }) => list_models(&service, json),
        Commands::Models(ModelCommands::Show { name, json }) => show_model(&service, &name, json),
        Commands::Detect { file, model, json } => {
            let names = service.detect_variables(&absolute(&file)?, &model).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else if names.is_empty() {
                println!("{}", "No variables found".yellow());
            } else {
                for name in names {
                    println!("{name}");
                }
            }
            Ok(())
        }
        Commands::Compile {
            template,
            model,
            values,
            output,
        } => {
            let output = output.as_deref().map(absolute).transpose()?;
            let dir = service
                .compile_template(
                    &absolute(&template)?,
                    &model,
                    &values.variable_set()?,
                    output.as_deref(),
                )
                .await?;
            println!(
                "{} {}",
                "✓ Compiled into".green().bold(),
                dir.display()
            );
            Ok(())
        }
        Commands::Run {
            template,
            model,
            values,
            calculator,
            results,
        } => {
            let mut request = RunRequest::new(absolute(&template)?, model, values.variable_set()?);
            request.calculator = calculator;
            request.results_dir = results.as_deref().map(absolute).transpose()?;

            let mut on_progress = |chunk: &str| {
                let mut stdout = std::io::stdout();
                let _ = stdout.write_all(chunk.as_bytes());
                let _ = stdout.flush();
            };
            let dir = service.run_simulation(&request, &mut on_progress).await?;
            println!(
                "{} {}",
                "✓ Simulation completed, results in".green().bold(),
                dir.display()
            );
            Ok(())
        }
        Commands::Results {
            dir,
            model,
            format,
            filter,
            sort,
            desc,
            json,
        } => {
            let dir = absolute(&dir)?;
            if format == OutputFormat::Table {
                print!("{}", service.raw_output(&dir, &model, format).await?);
                return Ok(());
            }

            let records = service.parse_output(&dir, &model, format).await?;
            let mut table = ResultTable::new(records);
            if let Some(filter) = &filter {
                table.filter(filter);
            }
            if let Some(column) = &sort {
                let order = if desc {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                };
                table.sort_by(column, order);
            }

            if json {
                let rows: Vec<_> = table.rows().collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if table.is_empty() {
                println!("{}", "No results".yellow());
            } else {
                println!("{}", render_results(&table));
                println!("{}", render_stats(&table.stats()).as_str().dimmed());
            }
            Ok(())
        }
        Commands::ResultsList => {
            let entries = service.list_result_dirs()?;
            if entries.is_empty() {
                println!("{}", "No result directories found".yellow());
            } else {
                println!("{}", render_result_dirs(&entries));
            }
            Ok(())
        }
        Commands::Export { dir, model, to } => {
            let path = service
                .export_csv(&absolute(&dir)?, &model, &absolute(&to)?)
                .await?;
            println!("{} {}", "✓ Exported to".green().bold(), path.display());
            Ok(())
        }
        Commands::Check => {
            if service.check_installation().await {
                println!("{}", "✓ Funz is installed".green().bold());
                Ok(())
            } else {
                bail!(
                    "could not run '{} -m {} --version'",
                    service.config().python_path,
                    service.config().tool_namespace
                )
            }
        }
        Commands::Serve => serve(service).await,
    }
}

fn list_models(service: &FunzService, json: bool) -> Result<()> {
    let names = service.available_models()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
        return Ok(());
    }
    if names.is_empty() {
        println!(
            "{} {}",
            "No models found in".yellow(),
            service.catalog().dir().display()
        );
        return Ok(());
    }

    let rows: Vec<_> = names
        .into_iter()
        .map(|name| {
            let summary = service.model_summary(&name).unwrap_or_else(|e| {
                tracing::warn!(model = %name, error = %e, "failed to read model");
                None
            });
            (name, summary)
        })
        .collect();
    println!("{}", render_models(&rows));
    Ok(())
}

fn show_model(service: &FunzService, name: &str, json: bool) -> Result<()> {
    let Some(config) = service.model_config(name)? else {
        bail!(
            "model '{name}' not found in {}",
            service.catalog().dir().display()
        );
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let summary = service.model_summary(name)?;
    println!("{}", "Model Details".bold().underline());
    println!("{}", render_models(&[(name.to_string(), summary)]));

    let outputs = service.model_outputs(name)?;
    if outputs.is_empty() {
        println!("{}", "No declared outputs".yellow());
    } else {
        println!("{}", render_outputs(&outputs));
    }
    Ok(())
}

async fn serve(service: FunzService) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<PanelEvent>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = rx.recv().await {
            let mut line = event.to_json()?;
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<_, anyhow::Error>(())
    });

    let mut controller = PanelController::new(Arc::new(service), tx.clone());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match PanelRequest::from_json(&line) {
            Ok(request) => controller.handle(request).await?,
            Err(e) => {
                tracing::debug!(error = %e, "rejected panel request");
                tx.send(PanelEvent::error(format!("Invalid request: {e}")))?;
            }
        }
    }

    drop(controller);
    drop(tx);
    writer.await??;
    Ok(())
}
