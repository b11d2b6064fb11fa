//! `canonada registry {pipelines|systems}` — lists the names held in a
//! project's definition environment, in registration order.

use crate::registries::ProjectRegistries;

pub fn pipelines(registries: &ProjectRegistries) -> anyhow::Result<()> {
    print_names("pipelines", registries.pipelines.names());
    Ok(())
}

pub fn systems(registries: &ProjectRegistries) -> anyhow::Result<()> {
    print_names("systems", registries.systems.names());
    Ok(())
}

fn print_names(kind: &str, names: &[String]) {
    if names.is_empty() {
        println!("(no {kind} registered)");
        return;
    }
    for name in names {
        println!("{name}");
    }
}
