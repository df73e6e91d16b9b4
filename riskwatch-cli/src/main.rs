//! riskwatch CLI - project risk register with analytics and early warnings

// Global invariants enforced:
// - stdout carries only command output; logs go to stderr
// - Validation, transition and not-found failures exit with status 1

use anyhow::Context;
use clap::{Parser, Subcommand};
use riskwatch_core::config::{self, ResolvedConfig};
use riskwatch_core::report::{self, Dashboard};
use riskwatch_core::store::DEFAULT_DATA_DIR;
use riskwatch_core::{Category, JsonStore, NewRisk, RiskService, RiskUpdate, Severity, Status};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "riskwatch")]
#[command(about = "Project risk register: scoring, matrix, analytics, early warnings, approvals")]
#[command(version = env!("RISKWATCH_VERSION"))]
struct Cli {
    /// Store directory
    #[arg(long, global = true, default_value = DEFAULT_DATA_DIR)]
    data: PathBuf,

    /// Path to config file (default: auto-discover)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, edit, inspect and delete risks
    Risk {
        #[command(subcommand)]
        action: RiskAction,
    },
    /// Approve a pending risk
    Approve {
        id: i64,
        /// Who approves
        #[arg(long)]
        by: String,
    },
    /// Reject a pending risk
    Reject {
        id: i64,
        /// Who rejects
        #[arg(long)]
        by: String,
    },
    /// Import generated risks from a JSON file
    Import {
        file: PathBuf,
        #[arg(long)]
        project: i64,
    },
    /// Recompute and show a risk's score trend
    Trend {
        id: i64,
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Aggregate figures for a risk set
    Analytics(ViewArgs),
    /// Early warnings for a risk set
    Warnings(ViewArgs),
    /// Probability x impact matrix
    Matrix(ViewArgs),
    /// Analytics, warnings and matrix together
    Dashboard(ViewArgs),
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum RiskAction {
    /// Create a risk (status open, approval pending)
    Add {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// schedule, budget, resource, technical or external
        #[arg(long)]
        category: String,
        /// 1..=10
        #[arg(long, allow_negative_numbers = true)]
        probability: i64,
        /// 1..=10
        #[arg(long, allow_negative_numbers = true)]
        impact: i64,
        /// Override the derived severity
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        mitigation: Option<String>,
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Change fields of an existing risk
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        probability: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        impact: Option<i64>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        mitigation: Option<String>,
        /// open, analyzing, mitigating or resolved
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Delete a risk and its history
    Delete { id: i64 },
    /// List risks, newest first
    List {
        #[arg(long)]
        project: Option<i64>,
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show one risk with its metric history
    Show {
        id: i64,
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Restrict to one project
    #[arg(long)]
    project: Option<i64>,

    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Staleness threshold for open high-severity risks (overrides config file)
    #[arg(long)]
    stale_after_days: Option<i64>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy)]
enum View {
    Analytics,
    Warnings,
    Matrix,
    Dashboard,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => handle_config(action, cli.config.as_deref()),
        Commands::Risk { action } => {
            let mut service = open_service(&cli.data, cli.config.as_deref(), None)?;
            handle_risk(&mut service, action)
        }
        Commands::Approve { id, by } => {
            let mut service = open_service(&cli.data, cli.config.as_deref(), None)?;
            let risk = service.approve(id, &by)?;
            println!("Risk #{} approved by {}", risk.id, by.trim());
            Ok(())
        }
        Commands::Reject { id, by } => {
            let mut service = open_service(&cli.data, cli.config.as_deref(), None)?;
            let risk = service.reject(id, &by)?;
            println!("Risk #{} rejected by {}", risk.id, by.trim());
            Ok(())
        }
        Commands::Import { file, project } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", file.display()))?;

            let mut service = open_service(&cli.data, cli.config.as_deref(), None)?;
            let created = service.import_generated(project, &payload)?;
            println!("Imported {} risk(s) into project {}", created.len(), project);
            for risk in &created {
                println!(
                    "  #{:<5} {:<10} {}",
                    risk.id,
                    risk.severity.as_str(),
                    risk.title
                );
            }
            Ok(())
        }
        Commands::Trend { id, format } => {
            let mut service = open_service(&cli.data, cli.config.as_deref(), None)?;
            let trend = service.refresh_trend(id)?;
            let history = service.metrics(id)?;
            match format {
                OutputFormat::Text => {
                    println!("Risk #{} trend: {}", id, trend.as_str());
                    println!(
                        "Window: {} days, threshold: {}%",
                        service.config().trend.window_days,
                        service.config().trend.change_percent
                    );
                    println!("Metric points: {}", history.len());
                }
                OutputFormat::Json => {
                    let out = serde_json::json!({
                        "risk_id": id,
                        "trend": trend,
                        "metrics": history,
                    });
                    println!("{}", report::to_json(&out)?);
                }
            }
            Ok(())
        }
        Commands::Analytics(args) => {
            run_view(&cli.data, cli.config.as_deref(), View::Analytics, args)
        }
        Commands::Warnings(args) => {
            run_view(&cli.data, cli.config.as_deref(), View::Warnings, args)
        }
        Commands::Matrix(args) => run_view(&cli.data, cli.config.as_deref(), View::Matrix, args),
        Commands::Dashboard(args) => {
            run_view(&cli.data, cli.config.as_deref(), View::Dashboard, args)
        }
    }
}

fn init_logging() {
    let default_level = "warn";
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("RISKWATCH_LOG")
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let root = std::env::current_dir()?;
    let resolved =
        config::load_and_resolve(&root, config_path).context("failed to load configuration")?;
    if let Some(ref p) = resolved.config_path {
        tracing::info!(path = %p.display(), "using config");
    }
    Ok(resolved)
}

fn open_service(
    data: &Path,
    config_path: Option<&Path>,
    stale_after_days: Option<i64>,
) -> anyhow::Result<RiskService<JsonStore>> {
    let resolved = load_config(config_path)?.with_stale_after_days(stale_after_days)?;
    let store = JsonStore::open(data)
        .with_context(|| format!("failed to open store at {}", data.display()))?;
    Ok(RiskService::new(store, resolved))
}

fn parse_opt<T>(value: Option<String>) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr<Err = riskwatch_core::ValidationError>,
{
    Ok(value.map(|v| v.parse::<T>()).transpose()?)
}

fn handle_risk(service: &mut RiskService<JsonStore>, action: RiskAction) -> anyhow::Result<()> {
    match action {
        RiskAction::Add {
            project,
            title,
            description,
            category,
            probability,
            impact,
            severity,
            mitigation,
            format,
        } => {
            let draft = NewRisk {
                project_id: project,
                title,
                description,
                category: category.parse::<Category>()?,
                probability,
                impact,
                severity: parse_opt::<Severity>(severity)?,
                mitigation_plan: mitigation,
            };
            let risk = service.create(draft)?;
            match format {
                OutputFormat::Text => println!(
                    "Created risk #{} (score {}, severity {})",
                    risk.id,
                    risk.score(),
                    risk.severity
                ),
                OutputFormat::Json => println!("{}", report::to_json(&risk)?),
            }
        }
        RiskAction::Update {
            id,
            title,
            description,
            category,
            probability,
            impact,
            severity,
            mitigation,
            status,
            format,
        } => {
            let update = RiskUpdate {
                title,
                description,
                category: parse_opt::<Category>(category)?,
                probability,
                impact,
                severity: parse_opt::<Severity>(severity)?,
                mitigation_plan: mitigation,
                status: parse_opt::<Status>(status)?,
            };
            let risk = service.update(id, update)?;
            match format {
                OutputFormat::Text => println!(
                    "Updated risk #{} (score {}, severity {}, trend {})",
                    risk.id,
                    risk.score(),
                    risk.severity,
                    risk.trend.as_str()
                ),
                OutputFormat::Json => println!("{}", report::to_json(&risk)?),
            }
        }
        RiskAction::Delete { id } => {
            let risk = service.delete(id)?;
            println!("Deleted risk #{}: {}", risk.id, risk.title);
        }
        RiskAction::List { project, format } => {
            let risks = service.list(project)?;
            match format {
                OutputFormat::Text => {
                    if risks.is_empty() {
                        println!("No risks recorded.");
                    } else {
                        print!("{}", report::render_risk_list(&risks));
                    }
                }
                OutputFormat::Json => println!("{}", report::to_json(&risks)?),
            }
        }
        RiskAction::Show { id, format } => {
            let risk = service.get(id)?;
            let history = service.metrics(id)?;
            match format {
                OutputFormat::Text => print!("{}", report::render_risk_detail(&risk, &history)),
                OutputFormat::Json => {
                    let out = serde_json::json!({ "risk": risk, "history": history });
                    println!("{}", report::to_json(&out)?);
                }
            }
        }
    }
    Ok(())
}

fn run_view(
    data: &Path,
    config_path: Option<&Path>,
    view: View,
    args: ViewArgs,
) -> anyhow::Result<()> {
    let service = open_service(data, config_path, args.stale_after_days)?;
    let dashboard: Dashboard = service.dashboard(args.project)?;

    match (view, args.format) {
        (View::Analytics, OutputFormat::Text) => {
            print!("{}", report::render_analytics_text(&dashboard.analytics))
        }
        (View::Analytics, OutputFormat::Json) => {
            println!("{}", report::to_json(&dashboard.analytics)?)
        }
        (View::Warnings, OutputFormat::Text) => {
            print!("{}", report::render_warnings_text(&dashboard.warnings))
        }
        (View::Warnings, OutputFormat::Json) => {
            println!("{}", report::to_json(&dashboard.warnings)?)
        }
        (View::Matrix, OutputFormat::Text) => {
            print!("{}", report::render_matrix_text(&dashboard.matrix))
        }
        (View::Matrix, OutputFormat::Json) => println!("{}", report::to_json(&dashboard.matrix)?),
        (View::Dashboard, OutputFormat::Text) => print!("{}", report::render_text(&dashboard)),
        (View::Dashboard, OutputFormat::Json) => println!("{}", report::render_json(&dashboard)?),
    }
    Ok(())
}

fn handle_config(action: ConfigAction, global_path: Option<&Path>) -> anyhow::Result<()> {
    match action {
        ConfigAction::Validate { path } => {
            let path = path.as_deref().or(global_path);
            match load_config(path) {
                Ok(config) => {
                    if let Some(ref p) = config.config_path {
                        println!("Config valid: {}", p.display());
                    } else {
                        println!("No config file found. Using defaults.");
                    }
                }
                Err(e) => {
                    eprintln!("Config validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Show { path } => {
            let resolved = load_config(path.as_deref().or(global_path))?;

            println!("Configuration:");
            if let Some(ref p) = resolved.config_path {
                println!("  Source: {}", p.display());
            } else {
                println!("  Source: defaults (no config file found)");
            }
            println!();
            println!("Thresholds:");
            println!("  medium: {}", resolved.thresholds.medium);
            println!("  high: {}", resolved.thresholds.high);
            println!("  critical: {}", resolved.thresholds.critical);
            println!();
            println!("Warnings:");
            println!("  stale_after_days: {}", resolved.stale_after_days);
            println!("  trend_warnings: {}", resolved.trend_warnings);
            println!();
            println!("Trend:");
            println!("  window_days: {}", resolved.trend.window_days);
            println!("  change_percent: {}", resolved.trend.change_percent);
            println!();
            println!("Escalation: {}", resolved.escalation.as_str());
        }
    }
    Ok(())
}
