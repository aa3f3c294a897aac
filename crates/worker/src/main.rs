use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use previewd_cloud::S3BlobStore;
use previewd_dedup::RedisDedup;
use previewd_queue::PgTaskQueue;
use previewd_service::{PreviewConfig, ReqwestProbe};
use previewd_worker::runner::{run_loop, RunnerConfig};
use previewd_worker::{FfmpegExtractor, GenerateWorker, LivenessWorker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "previewd_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = PreviewConfig::from_env();
    tracing::info!(placeholder = %config.placeholder_url, "Loaded preview configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = previewd_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    previewd_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    previewd_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Dedup registry ---
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let dedup = Arc::new(RedisDedup::connect(&redis_url).context("Failed to open Redis client")?);

    // --- Blob store ---
    let bucket = std::env::var("S3_BUCKET").context("S3_BUCKET must be set")?;
    let blob = Arc::new(S3BlobStore::from_env(bucket, config.blob_public_host.clone()).await);

    // --- Workers ---
    let queue = PgTaskQueue::new(pool.clone());
    let extractor = Arc::new(FfmpegExtractor::new(config.extract_timeout));
    let probe = Arc::new(ReqwestProbe::new().context("Failed to build probe client")?);
    let generate = Arc::new(
        GenerateWorker::new(
            pool.clone(),
            dedup.clone(),
            blob,
            extractor,
            config.clone(),
        )
        .context("Failed to build generate worker")?,
    );
    let liveness = Arc::new(LivenessWorker::new(
        pool,
        dedup,
        Arc::new(queue.clone()),
        probe,
        config.clone(),
    ));

    let runner = RunnerConfig {
        concurrency: env_usize("WORKER_CONCURRENCY", 4)?,
        poll_interval: Duration::from_secs(env_u64("WORKER_POLL_INTERVAL_SECS", 2)?),
        max_retries: config.generate_retries,
        retry_delay: config.generate_retry_delay,
    };
    tracing::info!(
        concurrency = runner.concurrency,
        "Worker starting, polling for preview jobs"
    );

    run_loop(queue, generate, liveness, runner).await
}

fn env_usize(name: &str, default: usize) -> anyhow::Result<usize> {
    match std::env::var(name) {
        Ok(value) => value.parse().with_context(|| format!("{name} must be a valid integer")),
        Err(_) => Ok(default),
    }
}

fn env_u64(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(value) => value.parse().with_context(|| format!("{name} must be a valid integer")),
        Err(_) => Ok(default),
    }
}
