use std::path::Path;
use std::process::Command;

use signpose_media::{check_ffmpeg, check_ffprobe};
use signpose_storage::S3Client;
use signpose_worker::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = PipelineConfig::from_env();

    println!(
        "signpose-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_ffmpeg()?;
    check_ffprobe()?;

    match std::env::var("SIGNPOSE_LOCAL_ROOT") {
        Ok(root) => ensure_local_root(&root).await?,
        Err(_) => ensure_bucket().await?,
    }

    println!("signpose-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    tempfile::tempfile_in(path)?;
    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg()?;
    let output = Command::new(&ffmpeg)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffmpeg -version failed: {:?}",
            output.status
        ));
    }
    Ok(())
}

async fn ensure_local_root(root: &str) -> anyhow::Result<()> {
    if !tokio::fs::metadata(root).await?.is_dir() {
        return Err(anyhow::anyhow!("SIGNPOSE_LOCAL_ROOT {} is not a directory", root));
    }
    Ok(())
}

async fn ensure_bucket() -> anyhow::Result<()> {
    let client = S3Client::from_env()?;
    client.check_connectivity().await?;
    println!("signpose-selfcheck: bucket {} reachable", client.bucket());
    Ok(())
}
