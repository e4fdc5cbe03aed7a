use anyhow::Result;

use crate::config::Config;
use crate::environment::Environment;
use crate::gc::SymlinkCollector;
use crate::output::Output;
use crate::prune::PruneService;
use crate::runtime::DockerCli;

fn service_parts(env: &Environment) -> (DockerCli, SymlinkCollector) {
    (
        DockerCli::new(env.runtime_program()),
        SymlinkCollector::new(env.profile_bin_dir(), env.store_dir(), env.executor_path()),
    )
}

pub fn containers(env: &Environment, all: bool) -> Result<()> {
    let config = match Config::load(&env.config_path()) {
        Ok(config) => config,
        Err(err) if all => {
            tracing::debug!(error = %err, "no usable config, pruning everything");
            Config::default()
        }
        Err(err) => {
            Output::warning(format!("No usable config ({err}); refusing to prune without --all"));
            return Ok(());
        }
    };

    Output::info(if all {
        "Removing all yourpm containers..."
    } else {
        "Removing undeclared and stopped yourpm containers..."
    });

    let (runtime, collector) = service_parts(env);
    let report = PruneService::new(&runtime, collector).prune_containers(all, &config)?;

    for name in &report.kept {
        Output::step(format!("kept {name}"));
    }
    for name in &report.removed {
        Output::step(format!("removed {name}"));
    }
    for (name, err) in &report.failed {
        Output::warning(format!("Failed to remove {name}: {err}"));
    }
    for command in &report.gc.removed {
        Output::step(format!("removed stale link {command}"));
    }

    if report.removed.is_empty() {
        Output::success("No containers to remove");
    } else {
        Output::success(format!("Removed {} containers", report.removed.len()));
    }
    Ok(())
}

pub fn images(env: &Environment, all: bool) -> Result<()> {
    Output::info(if all {
        "Removing all unused images..."
    } else {
        "Removing dangling images..."
    });

    let (runtime, collector) = service_parts(env);
    match PruneService::new(&runtime, collector).prune_images(all) {
        Ok(()) => Output::success("Images pruned"),
        Err(err) => Output::warning(format!("Image prune failed: {err}")),
    }
    Ok(())
}
