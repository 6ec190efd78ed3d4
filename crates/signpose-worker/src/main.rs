//! Skeleton video renderer binary.
//!
//! Usage: `signpose-render <request.json> <output> [target-seconds]`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use signpose_media::{retime_video, SkeletonSchema};
use signpose_models::{Container, RenderRequest};
use signpose_storage::{KeypointStore, LocalStore, S3Client};
use signpose_worker::{PipelineConfig, RenderPipeline};

struct Args {
    request: PathBuf,
    output: PathBuf,
    target_duration: Option<f64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = std::env::args().skip(1);
    let (Some(request), Some(output)) = (args.next(), args.next()) else {
        bail!("usage: signpose-render <request.json> <output> [target-seconds]");
    };
    let target_duration = args
        .next()
        .map(|s| s.parse::<f64>())
        .transpose()
        .context("target duration must be a number of seconds")?;

    Ok(Args {
        request: request.into(),
        output: output.into(),
        target_duration,
    })
}

fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("signpose=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn open_store() -> anyhow::Result<Arc<dyn KeypointStore>> {
    if let Ok(root) = std::env::var("SIGNPOSE_LOCAL_ROOT") {
        info!("Reading keypoints from local directory {}", root);
        return Ok(Arc::new(LocalStore::new(root)));
    }
    let client = S3Client::from_env().context("failed to configure S3 keypoint storage")?;
    info!("Reading keypoints from bucket {}", client.bucket());
    Ok(Arc::new(client))
}

fn load_schema() -> anyhow::Result<SkeletonSchema> {
    match std::env::var("SIGNPOSE_SCHEMA") {
        Ok(path) => SkeletonSchema::from_json_file(&path)
            .with_context(|| format!("failed to load skeleton schema {}", path)),
        Err(_) => Ok(SkeletonSchema::coco_wholebody_openpose()),
    }
}

async fn load_request(path: &Path) -> anyhow::Result<RenderRequest> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json)
        .with_context(|| format!("invalid render request {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let args = parse_args()?;
    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    let request = load_request(&args.request).await?;
    let schema = load_schema()?;

    let mut output = request.output.clone();
    if let Some(container) = Container::from_path(&args.output) {
        if container != output.container {
            warn!(
                "Output extension selects {} over requested {}",
                container, output.container
            );
            output.container = container;
        }
    }

    let pipeline = RenderPipeline::new(config.clone(), open_store()?);

    let outcome = match args.target_duration {
        None => {
            pipeline
                .render(&request.clips, &request.filter, &schema, &output, &args.output)
                .await?
        }
        Some(target) => {
            tokio::fs::create_dir_all(&config.work_dir).await?;
            let staging = tempfile::Builder::new()
                .prefix("signpose-retime-")
                .tempdir_in(&config.work_dir)?;
            let rendered = staging
                .path()
                .join(format!("rendered.{}", output.container.extension()));

            let mut outcome = pipeline
                .render(&request.clips, &request.filter, &schema, &output, &rendered)
                .await?;
            retime_video(&rendered, &args.output, Some(target)).await?;
            outcome.output_path = args.output.clone();
            outcome
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
