#![warn(clippy::pedantic)]

mod files;
mod host;
mod settings;

use anyhow::{Context, Result as AnyResult};
use easel_core::clock::{Clock, SystemClock};
use easel_core::engine::Engine;
use easel_core::pipeline::{apply_template, PipelineOutcome};
use easel_core::snapshot::CaptureRequest;
use easel_core::surface::MemorySurface;
use std::sync::Arc;
use std::time::Duration;

/// Stand-in for the display's refresh interval.
const FRAME: Duration = Duration::from_millis(16);
/// Give up on a template whose preconditions never become true.
const MAX_RETRIES: usize = 10;
/// Upper bound on frames and timer wakeups while waiting for the engine to settle.
const MAX_WAKEUPS: usize = 10_000;

/// Run animation frames and timers until the engine has nothing left to do.
async fn settle(engine: &mut Engine, clock: &dyn Clock) {
    for _ in 0..MAX_WAKEUPS {
        if engine.wants_animation_frame() {
            tokio::time::sleep(FRAME).await;
            engine.on_animation_frame();
            engine.poll_timers();
        } else if let Some(deadline) = engine.next_deadline() {
            let wait = deadline.millis().saturating_sub(clock.now().millis());
            tokio::time::sleep(Duration::from_millis(wait)).await;
            engine.poll_timers();
        } else {
            return;
        }
    }
    log::warn!("engine still busy after {MAX_WAKEUPS} wakeups");
}

async fn run(settings: settings::Settings, template: Option<std::path::PathBuf>) -> AnyResult<()> {
    let mut params = settings.template.clone();
    let assets = match &template {
        Some(path) => {
            params.json = Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("reading template {}", path.display()))?,
            );
            path.parent().map(std::path::Path::to_path_buf).unwrap_or_default()
        }
        None => std::path::PathBuf::from("."),
    };
    if params.json.is_none() {
        anyhow::bail!("no template given, pass a template path or set template.json");
    }

    let clock = Arc::new(SystemClock::new());
    let canvas = &settings.canvas;
    let surface = MemorySurface::new(canvas.width, canvas.height)
        .with_device_pixel_ratio(canvas.device_pixel_ratio);
    let mut engine = Engine::new(
        settings.engine.clone(),
        Box::new(surface),
        Box::new(host::LogHost),
        clock.clone(),
    );
    let loader = files::FileImageLoader::new(assets);

    let mut retries = 0;
    loop {
        match apply_template(&mut engine, &params, &loader).await {
            PipelineOutcome::Finished => break,
            PipelineOutcome::Aborted(e) => return Err(e).context("applying template"),
            PipelineOutcome::Retry(delay) if retries < MAX_RETRIES => {
                retries += 1;
                log::debug!("retrying template in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            PipelineOutcome::Retry(_) => anyhow::bail!("template preconditions never met"),
        }
    }
    settle(&mut engine, &*clock).await;

    let snapshot = engine
        .request_snapshot(CaptureRequest::FINAL)
        .context("final export was rejected")?;
    std::fs::write(&canvas.export, &snapshot.jpeg)
        .with_context(|| format!("writing {}", canvas.export.display()))?;
    log::info!(
        "wrote {}x{} export to {}",
        snapshot.width,
        snapshot.height,
        canvas.export.display()
    );
    Ok(())
}

fn main() -> AnyResult<()> {
    let has_term = std::io::IsTerminal::is_terminal(&std::io::stdin());
    // Log to a terminal, if available. Else, log to "log.out" in the working directory.
    if has_term {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        let _ = simple_logging::log_to_file("log.out", log::LevelFilter::Debug);
    }

    let settings_path = std::path::Path::new(settings::Settings::FILENAME);
    let settings = settings::Settings::load_or_default(settings_path);
    if let Err(e) = settings::Settings::write_template(settings_path) {
        log::warn!("failed to write settings template:\n{e:?}");
    }
    // A single optional argument, the template to apply.
    let template = std::env::args_os().nth(1).map(std::path::PathBuf::from);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(run(settings, template))
}
