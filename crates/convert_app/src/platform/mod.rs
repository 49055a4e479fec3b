mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod ui;

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use convert_engine::{ensure_output_dir, ArtifactFetcher, EngineHandle, ReqwestJobClient};
use engine_logging::{engine_info, engine_warn};

use self::cli::Cli;
use self::config::{AppConfig, FileConfig};
use self::effects::EffectRunner;

pub async fn run_app() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = match cli.config.as_deref() {
        Some(path) => config::load_file(path)?,
        None => FileConfig::default(),
    };
    let config = config::resolve(cli, file)?;

    logging::initialize(config.log, config.log_level);
    engine_info!(
        "convert starting: server={} source={} formats={:?}",
        config.client.base_url,
        config.source.source_ref,
        config.formats
    );

    let client = Arc::new(
        ReqwestJobClient::new(config.client.clone()).context("failed to create service client")?,
    );

    if config.list_formats {
        return list_formats(&client, &config.source.source_ref).await;
    }

    let (engine, events) = EngineHandle::new(client, config.poll);
    let engine = attach_artifacts(engine, &config)?;
    let app = app::App::new(EffectRunner::new(engine), config.save_dir.is_some());

    let summary = app::run(app, events, config.source, config.formats).await;
    if !summary.all_completed() {
        for (key, status) in &summary.unsuccessful {
            engine_warn!("{key}: {status}");
        }
        bail!(
            "{} of {} jobs did not complete",
            summary.unsuccessful.len(),
            summary.unsuccessful.len() + summary.completed
        );
    }
    Ok(())
}

fn attach_artifacts(engine: EngineHandle, config: &AppConfig) -> anyhow::Result<EngineHandle> {
    let Some(dir) = config.save_dir.as_deref() else {
        return Ok(engine);
    };
    ensure_output_dir(dir).with_context(|| format!("cannot save artifacts into {dir:?}"))?;
    let fetcher = ArtifactFetcher::new(&config.client).context("failed to create download client")?;
    Ok(engine.with_artifacts(fetcher, dir))
}

async fn list_formats(client: &ReqwestJobClient, source_ref: &str) -> anyhow::Result<()> {
    let info = client
        .lookup_formats(source_ref)
        .await
        .with_context(|| format!("failed to look up formats for {source_ref}"))?;

    println!("{}", info.title);
    if let Some(uploader) = &info.uploader {
        println!("by {uploader}");
    }
    for format in &info.formats {
        let size = format
            .filesize
            .map(|bytes| format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)))
            .unwrap_or_default();
        println!("{:>8}  {:<40} {size}", format.format_id, format.describe());
    }
    Ok(())
}
