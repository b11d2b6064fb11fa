//! `canonada run {pipelines|systems} <names…>` — the dispatch entry point.
//! A pipeline is planned fresh against the current catalog immediately
//! before it runs; the isolated-process engine gets a real sidecar spawner
//! built from this executable's own path.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use canonada_core::entities::Engine;
use canonada_runtime::catalog::FileCatalog;
use canonada_runtime::dispatch::{CancelToken, Dispatcher, RunReport};
use canonada_runtime::progress::{BarProgress, NullProgress, Progress};
use canonada_runtime::system_runner::{run_system, PipelineRun};

use crate::config::ProjectConfig;
use crate::isolated_worker_spawner;
use crate::registries::ProjectRegistries;
use crate::signals::watch_for_shutdown;

pub async fn pipelines(names: &[String], config: &ProjectConfig, registries: &mut ProjectRegistries, exe: &Path) -> anyhow::Result<()> {
    let catalog = FileCatalog::new(config.root());
    let progress = build_progress(config);
    let cancel: CancelToken = Arc::new(AtomicBool::new(false));
    watch_for_shutdown(Arc::clone(&cancel));

    for name in names {
        let pipeline = registries
            .pipelines
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("no pipeline named '{name}' is registered"))?;
        pipeline.plan(&catalog)?;

        let isolated = pipeline.config().engine == Engine::IsolatedProcessParallel;
        let mut dispatcher = Dispatcher::new(pipeline, &catalog).with_cancel_token(Arc::clone(&cancel));
        if isolated {
            dispatcher = dispatcher.with_isolated_spawner(isolated_worker_spawner(exe, name, config.root()));
        }

        let report = tokio::task::block_in_place(|| dispatcher.run(progress.as_ref()))?;
        print_report(name, &report);
        if cancel.load(std::sync::atomic::Ordering::Acquire) {
            break;
        }
    }
    Ok(())
}

pub async fn systems(names: &[String], config: &ProjectConfig, registries: &mut ProjectRegistries, _exe: &Path) -> anyhow::Result<()> {
    let catalog: Arc<dyn canonada_core::catalog::Catalog> = Arc::new(FileCatalog::new(config.root()));
    let progress: Arc<dyn Progress> = build_progress(config);
    let cancel: CancelToken = Arc::new(AtomicBool::new(false));
    watch_for_shutdown(Arc::clone(&cancel));

    for name in names {
        let system = registries.systems.get_mut(name).ok_or_else(|| anyhow::anyhow!("no system named '{name}' is registered"))?;
        let runs = run_system(system, Arc::clone(&catalog), Arc::clone(&progress), Some(Arc::clone(&cancel))).await?;
        println!("system '{name}':");
        for PipelineRun { pipeline, report } in runs {
            print_report(&pipeline, &report);
        }
        if cancel.load(std::sync::atomic::Ordering::Acquire) {
            break;
        }
    }
    Ok(())
}

fn build_progress(config: &ProjectConfig) -> Arc<dyn Progress> {
    if config.show_progress() {
        Arc::new(BarProgress::new("canonada"))
    } else {
        Arc::new(NullProgress)
    }
}

fn print_report(name: &str, report: &RunReport) {
    match report {
        RunReport::Completed { items, skipped } => {
            println!("pipeline '{name}' completed: {items} item(s), {skipped} skipped");
        }
        RunReport::Stopped { at_item, message } => {
            let message = message.as_deref().unwrap_or("(no message)");
            println!("pipeline '{name}' stopped after {at_item} item(s): {message}");
        }
    }
}
