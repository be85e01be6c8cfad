use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use school_climate_survey::client::{HttpSurveyApi, SurveyApi};
use school_climate_survey::config::{DbArgs, ServeArgs};
use school_climate_survey::db::{self, PgStore, SurveyStore};
use school_climate_survey::http::{self, AppState};
use school_climate_survey::models::Role;
use school_climate_survey::questions::config_for;
use school_climate_survey::report;
use school_climate_survey::service::{LookupService, SubmissionService};

#[derive(Parser)]
#[command(name = "school-climate-survey")]
#[command(about = "School climate questionnaires for teachers, students and guardians", long_about = None)]
struct Cli {
    /// Log at debug level unless SURVEY_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lookup and submission API
    Serve {
        #[command(flatten)]
        db: DbArgs,
        #[command(flatten)]
        serve: ServeArgs,
    },
    /// Verify the database is reachable and list its tables
    CheckDb {
        #[command(flatten)]
        db: DbArgs,
    },
    /// Generate a markdown report for one questionnaire
    Report {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        form_type: Role,
        #[arg(long)]
        school: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export stored answers for one questionnaire as CSV
    Export {
        #[command(flatten)]
        db: DbArgs,
        #[arg(long)]
        form_type: Role,
        #[arg(long)]
        school: Option<String>,
        #[arg(long, default_value = "submissions.csv")]
        out: PathBuf,
    },
    /// Query a running server for institution names
    Lookup {
        #[arg(long, default_value = "http://localhost:3001/api")]
        api: String,
        fragment: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Serve { db, serve } => {
            let config = serve.service_config()?;
            let pool = db::connect(&db.resolve()?).await?;
            db::ping(&pool, config.store_timeout)
                .await
                .context("database did not answer")?;
            if let Err(err) = db::verify_schema(&pool).await {
                warn!(error = %err, "schema check failed, requests may error");
            }

            let store: Arc<dyn SurveyStore> = Arc::new(PgStore::new(pool));
            let state = AppState::new(
                LookupService::new(store.clone(), config),
                SubmissionService::new(store, config),
            );
            http::serve(serve.addr(), state).await?;
        }
        Commands::CheckDb { db } => {
            let pool = db::connect(&db.resolve()?).await?;
            let tables = db::verify_schema(&pool).await?;
            println!("Connected. Tables in public schema:");
            for table in tables {
                println!("- {table}");
            }
        }
        Commands::Report {
            db,
            form_type,
            school,
            out,
        } => {
            let store = PgStore::new(db::connect(&db.resolve()?).await?);
            let rows = store.fetch_ratings(form_type, school.as_deref()).await?;
            let report = report::build_report(
                config_for(form_type),
                school.as_deref(),
                chrono::Utc::now(),
                &rows,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            db,
            form_type,
            school,
            out,
        } => {
            let store = PgStore::new(db::connect(&db.resolve()?).await?);
            let rows = store.fetch_ratings(form_type, school.as_deref()).await?;
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let written = report::write_csv(file, config_for(form_type), &rows)?;
            info!(form_type = %form_type, rows = written, "exported submissions");
            println!("Exported {written} submissions to {}.", out.display());
        }
        Commands::Lookup { api, fragment } => {
            let client = HttpSurveyApi::new(api)?;
            let names = client.search_schools(&fragment).await?;
            if names.is_empty() {
                println!("No institutions match {fragment:?}.");
            }
            for name in names {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };

    let filter = tracing_subscriber::EnvFilter::try_from_env("SURVEY_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
