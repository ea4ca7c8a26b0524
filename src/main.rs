use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sales_report::{db, report, ChartRenderer, RawTable, ReportService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sales-report")]
#[command(about = "Sales export summaries with stored report snapshots", long_about = None)]
struct Cli {
    /// Directory where chart images are written
    #[arg(long, global = true)]
    chart_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Clean and summarize a sales CSV, storing the result as a new report
    Submit {
        #[arg(long)]
        csv: PathBuf,
        /// Original file name recorded with the report (defaults to the CSV file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a stored report
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the most recent reports, newest first
    History {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .try_init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set, e.g. sqlite://sales.db")?;
    let chart_dir = cli
        .chart_dir
        .or_else(|| std::env::var_os("CHART_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("static"));

    let pool = db::connect(&database_url)
        .await
        .context("failed to open the report database")?;
    let service = ReportService::new(pool.clone(), ChartRenderer::new(chart_dir));

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Submit { csv, name } => {
            let name = match name {
                Some(name) => name,
                None => csv
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            let table = RawTable::from_path(&csv)
                .with_context(|| format!("failed to read {}", csv.display()))?;
            let id = service
                .submit_table(&name, &table)
                .await
                .with_context(|| format!("rejected {}", csv.display()))?;
            println!("Report {id} created from {}.", csv.display());
        }
        Commands::Show { id, json, out } => {
            let stored = service.report(id).await?;
            let rendered = if json {
                format!("{}\n", serde_json::to_string_pretty(&stored)?)
            } else {
                report::render_markdown(&stored)
            };

            match out {
                Some(out) => {
                    std::fs::write(&out, rendered)?;
                    println!("Report written to {}.", out.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::History { limit } => {
            let listings = service.recent(limit).await?;
            print!("{}", report::render_history(&listings));
        }
    }

    Ok(())
}
