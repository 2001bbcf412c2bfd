use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cohort_grades::cohort::{ClassScope, CohortOptions, DEFAULT_THRESHOLD};
use cohort_grades::config::Settings;
use cohort_grades::source::{MemorySource, ScoreSource};
use cohort_grades::weighting::{MissingCategoryPolicy, DEFAULT_MISSING_POLICY};
use cohort_grades::{db, report, service};

#[derive(Parser)]
#[command(name = "cohort-grades")]
#[command(about = "Weighted grade averages and cohort pass rates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read grade records from a JSON export instead of Postgres
    #[arg(long)]
    input: Option<PathBuf>,
}

#[derive(Args)]
struct CohortArgs {
    #[arg(long = "class")]
    class_id: Option<i64>,
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,
    #[arg(long, value_enum, default_value_t = ClassScope::CandidatePool)]
    class_scope: ClassScope,
    #[arg(long, value_enum, default_value_t = DEFAULT_MISSING_POLICY)]
    missing_category: MissingCategoryPolicy,
}

impl CohortArgs {
    fn options(&self) -> CohortOptions {
        CohortOptions {
            threshold: self.threshold,
            class_id: self.class_id,
            class_scope: self.class_scope,
            missing_policy: self.missing_category,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the grades schema and its indexes
    InitDb,
    /// Load sample grade records
    Seed,
    /// Import scores from a CSV file (learner_id,class_id,type,score)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Weighted average of one learner's grades, per class
    ClassAverages {
        #[arg(long)]
        learner: i64,
        #[arg(long, value_enum, default_value_t = DEFAULT_MISSING_POLICY)]
        missing_category: MissingCategoryPolicy,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Count learners whose weighted average reaches the threshold
    Stats {
        #[command(flatten)]
        cohort: CohortArgs,
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        cohort: CohortArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[command(flatten)]
        source: SourceArgs,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn connect(settings: &Settings) -> anyhow::Result<PgPool> {
    let database_url = settings.database_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

async fn open_source(
    settings: &Settings,
    input: Option<&Path>,
) -> anyhow::Result<Box<dyn ScoreSource>> {
    match input {
        Some(path) => Ok(Box::new(MemorySource::from_json_path(path)?)),
        None => Ok(Box::new(db::PgScoreSource::new(connect(settings).await?))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&settings).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&settings).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&settings).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} scores from {}.", csv.display());
        }
        Commands::ClassAverages {
            learner,
            missing_category,
            json,
            source,
        } => {
            let source = open_source(&settings, source.input.as_deref()).await?;
            let averages =
                service::weighted_average_per_class(source.as_ref(), learner, missing_category)
                    .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&averages)?);
            } else if averages.is_empty() {
                println!("No grades found for learner {learner}.");
            } else {
                println!("Weighted averages for learner {learner}:");
                for average in &averages {
                    println!(
                        "- class {}: {}",
                        average.class_id,
                        report::format_average(average.avg)
                    );
                }
            }
        }
        Commands::Stats {
            cohort,
            json,
            source,
        } => {
            let source = open_source(&settings, source.input.as_deref()).await?;
            let stats = service::cohort_report(source.as_ref(), &cohort.options()).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "{} of {} learners at or above {:.0} ({:.2}%).",
                    stats.learners_above_percentage,
                    stats.total_learners,
                    stats.threshold,
                    stats.percentage_above_percentage
                );
            }
        }
        Commands::Report {
            cohort,
            out,
            source,
        } => {
            let options = cohort.options();
            let source = open_source(&settings, source.input.as_deref()).await?;
            let stats = service::cohort_report(source.as_ref(), &options).await?;
            let averages = service::cohort_averages(source.as_ref(), &options).await?;
            let report = report::build_report(&stats, &averages);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
