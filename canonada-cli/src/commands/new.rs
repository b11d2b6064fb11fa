//! `canonada new <project>` — scaffolds a project directory with the three
//! configuration files the catalog facade reads plus a data directory ready
//! for a `canonada.json_multi`-backed dataset.

use std::path::Path;

const PROJECT_YML: &str = "logging:\n  level: info\n  show_progress: true\n";
const CATALOG_YML: &str = "# dataset_name:\n#   type: canonada.json_multi\n#   path: data/dataset_name\n#   keys: [id]\n";
const PARAMETERS_YML: &str = "{}\n";
const CREDENTIALS_YML: &str = "{}\n";

pub fn run(project: &str) -> anyhow::Result<()> {
    let root = Path::new(project);
    if root.exists() {
        anyhow::bail!("'{project}' already exists");
    }
    std::fs::create_dir_all(root.join("data"))?;
    std::fs::write(root.join("project.yml"), PROJECT_YML)?;
    std::fs::write(root.join("catalog.yml"), CATALOG_YML)?;
    std::fs::write(root.join("parameters.yml"), PARAMETERS_YML)?;
    std::fs::write(root.join("credentials.yml"), CREDENTIALS_YML)?;
    println!("created project '{project}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaffolds_the_four_configuration_files() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let project = dir.path().join("demo");
        run(project.to_str().unwrap_or_default()).unwrap_or_else(|e| panic!("{e}"));
        assert!(project.join("project.yml").exists());
        assert!(project.join("catalog.yml").exists());
        assert!(project.join("parameters.yml").exists());
        assert!(project.join("credentials.yml").exists());
        assert!(project.join("data").is_dir());
    }

    #[test]
    fn refuses_to_overwrite_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let project = dir.path().join("demo");
        std::fs::create_dir(&project).unwrap_or_else(|e| panic!("{e}"));
        let err = run(project.to_str().unwrap_or_default()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
