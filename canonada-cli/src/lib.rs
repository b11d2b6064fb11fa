// /////////////////////////////////////////////////////////////////////////////
// canonada
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Canonada CLI
//!
//! The command-line driver: project scaffolding, catalog inspection, and
//! pipeline/system execution sit outside `canonada-core` and
//! `canonada-runtime` the same way `bootstrap` sits outside the enterprise
//! layers it drives — a composition root, not a dependency either of those
//! crates knows about.
//!
//! A project links this crate as a library and calls [`run_cli`] with its
//! own [`registries::ProjectRegistries`], populated by whatever function the
//! project defines its pipelines in. `src/bin/canonada.rs` is the default,
//! project-less entry point: it still serves `new`, `version`, and
//! `catalog` (which only needs a project directory on disk), but `registry`
//! and `run` see an empty definition environment until a project supplies
//! one.
//!
//! - [`cli`] — clap argument parsing
//! - [`commands`] — one module per subcommand
//! - [`config`] — `project.yml`'s `logging.level` / `logging.show_progress`
//! - [`exit_code`] — BSD `sysexits.h`-style process exit codes
//! - [`registries`] — the definition environment a project supplies
//! - [`signals`] — ties SIGTERM/SIGINT/SIGHUP (Ctrl+C on Windows) to a
//!   running dispatch's cancellation token

pub mod cli;
pub mod commands;
pub mod config;
pub mod exit_code;
pub mod registries;
pub mod signals;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use canonada_runtime::catalog::FileCatalog;
use canonada_runtime::dispatch::isolated_process::{run_worker_loop, InProcessWorkerProgram};

use cli::{CatalogTarget, Cli, Commands, RegistryTarget, RunTarget, ViewTarget};
use config::ProjectConfig;
use exit_code::ExitCode;
use registries::ProjectRegistries;

/// Runs the CLI against `registries` and returns the process exit code;
/// the binary's `main` is responsible for calling `std::process::exit`
/// with it.
pub fn run_cli(registries: ProjectRegistries) -> ExitCode {
    let cli = cli::parse_cli();
    match execute(cli, registries) {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, "canonada exited with an error");
            ExitCode::from_anyhow(&e)
        }
    }
}

fn execute(cli: Cli, mut registries: ProjectRegistries) -> anyhow::Result<()> {
    let project_root = cli.project_dir.clone().unwrap_or_else(|| PathBuf::from("."));

    if let Some(pipeline_name) = &cli.isolated_worker {
        return run_isolated_worker(pipeline_name, &project_root, &mut registries);
    }

    let Some(command) = cli.command else {
        anyhow::bail!("no subcommand given; see --help");
    };

    // `new` has no project yet to read `project.yml` from.
    if let Commands::New { project } = &command {
        return commands::new::run(project);
    }

    let config = ProjectConfig::load(&project_root)?;
    init_logging(&config, cli.verbose);

    match command {
        Commands::New { .. } => unreachable!("handled above"),
        Commands::Catalog { what } => match what {
            CatalogTarget::List => commands::catalog::list(&config),
            CatalogTarget::Params => commands::catalog::params(&config),
        },
        Commands::Registry { what } => match what {
            RegistryTarget::Pipelines => commands::registry::pipelines(&registries),
            RegistryTarget::Systems => commands::registry::systems(&registries),
        },
        Commands::Run { what } => {
            let exe = std::env::current_exe()?;
            let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            match what {
                RunTarget::Pipelines { names } => {
                    runtime.block_on(commands::run::pipelines(&names, &config, &mut registries, &exe))
                }
                RunTarget::Systems { names } => {
                    runtime.block_on(commands::run::systems(&names, &config, &mut registries, &exe))
                }
            }
        }
        Commands::View { what } => match what {
            ViewTarget::Pipelines { names } => commands::view::pipelines(&names, &config, &mut registries),
            ViewTarget::Systems { names } => commands::view::systems(&names, &config, &mut registries),
        },
        Commands::Version => commands::version::run(),
    }
}

/// The child-process side of the isolated-process engine: `canonada-cli`
/// invokes its own executable with `--isolated-worker <pipeline>`, plans
/// that one pipeline against its own copy of the catalog, then speaks
/// [`canonada_runtime::dispatch::isolated_process`]'s wire protocol on
/// stdio until the parent closes stdin.
fn run_isolated_worker(name: &str, project_root: &Path, registries: &mut ProjectRegistries) -> anyhow::Result<()> {
    let catalog = FileCatalog::new(project_root);
    let pipeline = registries
        .pipelines
        .get_mut(name)
        .ok_or_else(|| anyhow::anyhow!("no pipeline named '{name}' is registered in this worker"))?;
    pipeline.plan(&catalog)?;
    let plan = pipeline
        .plan_result()
        .ok_or_else(|| anyhow::anyhow!("pipeline '{name}' failed to plan in the worker process"))?;
    let program = InProcessWorkerProgram { nodes: pipeline.nodes(), plan };
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_worker_loop(&program, stdin.lock(), stdout.lock())?;
    Ok(())
}

/// Builds the `Command` factory the isolated-process engine uses to spawn
/// real sidecar workers: this executable, re-invoked with the hidden
/// `--isolated-worker` flag naming the pipeline.
pub(crate) fn isolated_worker_spawner(
    exe: &Path,
    pipeline_name: &str,
    project_root: &Path,
) -> canonada_runtime::dispatch::isolated_process::WorkerSpawner {
    let exe = exe.to_path_buf();
    let pipeline_name = pipeline_name.to_string();
    let project_root = project_root.to_path_buf();
    Arc::new(move || {
        let mut cmd = Command::new(&exe);
        cmd.arg("--isolated-worker").arg(&pipeline_name).arg("--project-dir").arg(&project_root);
        cmd
    })
}

fn init_logging(config: &ProjectConfig, verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { config.log_level().to_tracing_level() };
    let _ = tracing_subscriber::fmt().with_max_level(level).with_target(false).try_init();
}
