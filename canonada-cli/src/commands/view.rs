//! `canonada view {pipelines|systems} <names…>` — plans without running,
//! so a user can see the resolved execution order and any advisory
//! warnings before committing to a real pass.

use canonada_runtime::catalog::FileCatalog;

use crate::config::ProjectConfig;
use crate::registries::ProjectRegistries;

pub fn pipelines(names: &[String], config: &ProjectConfig, registries: &mut ProjectRegistries) -> anyhow::Result<()> {
    let catalog = FileCatalog::new(config.root());
    for name in names {
        let pipeline = registries
            .pipelines
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("no pipeline named '{name}' is registered"))?;
        pipeline.plan(&catalog)?;
        print_pipeline(name, pipeline);
    }
    Ok(())
}

pub fn systems(names: &[String], config: &ProjectConfig, registries: &mut ProjectRegistries) -> anyhow::Result<()> {
    let catalog = FileCatalog::new(config.root());
    for name in names {
        let system = registries.systems.get_mut(name).ok_or_else(|| anyhow::anyhow!("no system named '{name}' is registered"))?;
        println!("system '{name}':");
        for pipeline in system.pipelines_mut() {
            pipeline.plan(&catalog)?;
            print_pipeline(pipeline.name(), pipeline);
        }
    }
    Ok(())
}

fn print_pipeline(name: &str, pipeline: &canonada_core::entities::Pipeline) {
    let Some(plan) = pipeline.plan_result() else {
        println!("  '{name}' has no plan");
        return;
    };
    println!("pipeline '{name}':");
    if let Some(description) = pipeline.description() {
        println!("  {description}");
    }
    println!("  execution order:");
    for &idx in &plan.exec_order {
        let node = &pipeline.nodes()[idx];
        println!("    {}({}) -> {}", node.name(), node.inputs().join(", "), node.outputs().join(", "));
    }
    if !plan.catalog_inputs.is_empty() {
        println!("  catalog inputs: {}", plan.catalog_inputs.join(", "));
    }
    if !plan.catalog_outputs.is_empty() {
        println!("  catalog outputs: {}", plan.catalog_outputs.join(", "));
    }
    for warning in &plan.warnings {
        println!("  warning: {warning}");
    }
}
