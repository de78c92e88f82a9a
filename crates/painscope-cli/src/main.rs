use std::str::FromStr;

use clap::{Parser, Subcommand};
use sqlx::PgPool;

use painscope_core::{AppConfig, JobType, SortMode, TimeWindow};
use painscope_extract::{ExtractorClient, ExtractorConfig};
use painscope_pipeline::{
    run_extraction_pass, run_ingest, run_sentiment_pass, CancelFlag, ExtractionParams,
    IngestParams, SentimentParams,
};
use painscope_sentiment::{ClassifierClient, ClassifierConfig};

#[derive(Debug, Parser)]
#[command(name = "painscope-cli")]
#[command(about = "painscope command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Scrape one community and persist matching posts
    Ingest {
        /// Community to scrape (e.g. "saas")
        community: String,

        /// Listing sort: hot, new, top, controversial, rising
        #[arg(long, default_value = "hot")]
        sort: String,

        /// Keyword filter; repeat for multiple keywords
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Maximum items to fetch
        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// Time window for top/controversial: hour, day, week, month, year, all
        #[arg(long)]
        time_window: Option<String>,

        /// Also walk comment trees of the first matched posts
        #[arg(long)]
        include_comments: bool,
    },
    /// Classify not-yet-checked raw items
    Sentiment {
        /// Batch size cap
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Extract pain points from gate-admitted items
    Extract {
        /// Batch size cap
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Show aggregate pain-point counts
    Stats,
    /// Show recent jobs
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = painscope_core::load_app_config()?;
    let pool = painscope_db::connect_pool(
        &config.database_url,
        painscope_db::PoolConfig::from_app_config(&config),
    )
    .await?;
    painscope_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Ingest {
            community,
            sort,
            keywords,
            limit,
            time_window,
            include_comments,
        } => {
            let sort_mode = SortMode::from_str(&sort).map_err(anyhow::Error::msg)?;
            let time_window = time_window
                .as_deref()
                .map(TimeWindow::from_str)
                .transpose()
                .map_err(anyhow::Error::msg)?;

            let mut params = IngestParams::for_community(&community, sort_mode, keywords, limit);
            params.time_window = time_window;
            params.include_comments = include_comments;

            run_ingest_command(&pool, &config, params).await?;
        }
        Commands::Sentiment { limit } => run_sentiment_command(&pool, &config, limit).await?,
        Commands::Extract { limit } => run_extract_command(&pool, &config, limit).await?,
        Commands::Stats => print_stats(&pool).await?,
        Commands::Jobs { limit } => print_jobs(&pool, limit).await?,
    }

    Ok(())
}

async fn run_ingest_command(
    pool: &PgPool,
    config: &AppConfig,
    params: IngestParams,
) -> anyhow::Result<()> {
    let parameters = serde_json::to_value(&params)?;
    let job =
        painscope_db::create_job(pool, JobType::Ingest.as_str(), "cli", &parameters).await?;

    run_ingest(pool, config, job.id, &params, &CancelFlag::new()).await?;
    print_job_outcome(pool, job.public_id).await
}

async fn run_sentiment_command(
    pool: &PgPool,
    config: &AppConfig,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let params = SentimentParams { limit };
    let parameters = serde_json::to_value(params)?;
    let job =
        painscope_db::create_job(pool, JobType::Sentiment.as_str(), "cli", &parameters).await?;

    let classifier_config = ClassifierConfig::from_env().map_err(anyhow::Error::msg)?;
    let classifier = ClassifierClient::new(&classifier_config, config.request_timeout_secs)?;

    run_sentiment_pass(
        pool,
        &classifier,
        config.sentiment_threshold,
        limit.unwrap_or(config.sentiment_batch_limit),
        job.id,
        &CancelFlag::new(),
    )
    .await?;
    print_job_outcome(pool, job.public_id).await
}

async fn run_extract_command(
    pool: &PgPool,
    config: &AppConfig,
    limit: Option<i64>,
) -> anyhow::Result<()> {
    let params = ExtractionParams { limit };
    let parameters = serde_json::to_value(params)?;
    let job =
        painscope_db::create_job(pool, JobType::Extraction.as_str(), "cli", &parameters).await?;

    let extractor_config = ExtractorConfig::from_env().map_err(anyhow::Error::msg)?;
    let extractor = ExtractorClient::new(&extractor_config, config.request_timeout_secs)?;

    run_extraction_pass(
        pool,
        &extractor,
        config.sentiment_threshold,
        limit.unwrap_or(config.extraction_batch_limit),
        config.extract_max_concurrency,
        job.id,
        &CancelFlag::new(),
    )
    .await?;
    print_job_outcome(pool, job.public_id).await
}

async fn print_job_outcome(pool: &PgPool, public_id: uuid::Uuid) -> anyhow::Result<()> {
    let job = painscope_db::get_job_by_public_id(pool, public_id).await?;
    println!("job {} [{}] {}", job.public_id, job.job_type, job.status);
    println!(
        "  seen: {}  duplicates: {}  failed: {}",
        job.items_seen, job.items_skipped_duplicate, job.items_failed
    );
    if let Some(detail) = &job.error_detail {
        println!("  error: {detail}");
    }
    Ok(())
}

async fn print_stats(pool: &PgPool) -> anyhow::Result<()> {
    let stats = painscope_db::pain_point_stats(pool).await?;
    let raw_total = painscope_db::count_raw_items(pool).await?;

    println!("raw items:   {raw_total}");
    println!("pain points: {}", stats.total);
    println!("by category:");
    for bucket in &stats.by_category {
        println!("  {:<14} {}", bucket.category, bucket.count);
    }
    println!("by severity:");
    for bucket in &stats.by_severity {
        println!("  {:<14} {}", bucket.severity, bucket.count);
    }
    Ok(())
}

async fn print_jobs(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let jobs = painscope_db::list_jobs(pool, limit).await?;
    for job in jobs {
        println!(
            "{}  {:<10} {:<9} seen={} dup={} failed={}  {}",
            job.created_at.format("%Y-%m-%d %H:%M:%S"),
            job.job_type,
            job.status,
            job.items_seen,
            job.items_skipped_duplicate,
            job.items_failed,
            job.error_detail.unwrap_or_default()
        );
    }
    Ok(())
}
