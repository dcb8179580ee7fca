use anyhow::{Context, Result};
use colored::Colorize;
use propgraph_config::PropgraphConfig;
use std::path::PathBuf;

const REDACTED: &str = "********";

/// Write an example config file
pub fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = match path {
        Some(path) => path,
        None => PropgraphConfig::default_config_path()
            .context("Could not determine config file path")?,
    };

    if config_path.exists() && !force {
        println!(
            "{} Config file already exists at: {}",
            "Error:".red().bold(),
            config_path.display()
        );
        println!("Use {} to overwrite", "--force".yellow());
        return Ok(());
    }

    PropgraphConfig::create_example(&config_path)?;

    println!(
        "{} Created config file at: {}",
        "Success:".green().bold(),
        config_path.display()
    );
    println!(
        "\n{}",
        "Set source.host and PINECONE_API_KEY before running an ingest.".dimmed()
    );
    Ok(())
}

/// Print the effective configuration with secrets masked
pub fn show(config: &PropgraphConfig) -> Result<()> {
    println!("{}", redacted(config).display_as_toml()?);
    Ok(())
}

fn redacted(config: &PropgraphConfig) -> PropgraphConfig {
    let mut shown = config.clone();
    if shown.source.api_key.is_some() {
        shown.source.api_key = Some(REDACTED.to_string());
    }
    if shown.graph.neo4j.password.is_some() {
        shown.graph.neo4j.password = Some(REDACTED.to_string());
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_are_masked() {
        let mut config = PropgraphConfig::default();
        config.source.api_key = Some("pc-secret".to_string());
        config.graph.neo4j.password = Some("hunter2".to_string());

        let text = redacted(&config).display_as_toml().unwrap();
        assert!(!text.contains("pc-secret"));
        assert!(!text.contains("hunter2"));
        assert!(text.contains(REDACTED));
    }

    #[test]
    fn test_init_keeps_existing_file_without_force() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# mine").unwrap();

        init(Some(path.clone()), false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");

        init(Some(path.clone()), true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[ingest]"));
    }
}
