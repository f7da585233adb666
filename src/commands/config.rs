use colored::Colorize;
use dialoguer::Confirm;

use crate::cli::{Cli, ConfigCommands};
use crate::config::{Config, SettingKey};
use crate::error::{BriefError, Result};

pub async fn run(cli: &Cli, command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(cli),
        ConfigCommands::Set { key, value } => set(cli, key, value),
        ConfigCommands::Get { key } => get(cli, key),
        ConfigCommands::Path => path(cli),
        ConfigCommands::Reset => reset(cli),
    }
}

/// Hide all but the edges of the stored key
fn redact(mut config: Config) -> Config {
    if let Some(ref key) = config.groq.api_key {
        let visible: String = key.chars().take(4).collect();
        config.groq.api_key = Some(format!("{}…", visible));
    }
    config
}

fn show(cli: &Cli) -> Result<()> {
    let config = redact(Config::load()?);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| BriefError::ConfigError(e.to_string()))?;
        println!("{}", toml_str);
    }

    Ok(())
}

fn set(cli: &Cli, key: &str, value: &str) -> Result<()> {
    let path = Config::config_path();
    // Env overrides must not be written back to disk
    let mut config = Config::load_file(&path)?;
    config.set_value(key, value)?;
    config.save_to(&path)?;

    let shown = match key.parse::<SettingKey>() {
        Ok(SettingKey::ApiKey) => "(hidden)".to_string(),
        _ => value.to_string(),
    };

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "success": true, "key": key, "value": shown })
        );
    } else {
        println!("{} Set {} = {}", "✓".green(), key, shown);
    }

    Ok(())
}

fn get(cli: &Cli, key: &str) -> Result<()> {
    let value = Config::load()?.get_value(key)?;

    if cli.json {
        println!("{}", serde_json::json!({ "key": key, "value": value }));
    } else {
        match value {
            Some(v) => println!("{}", v),
            None => println!("{}", "(not set)".dimmed()),
        }
    }

    Ok(())
}

fn reset(cli: &Cli) -> Result<()> {
    let path = Config::config_path();

    if !path.exists() {
        if cli.json {
            println!(
                "{}",
                serde_json::json!({ "status": "no_config", "path": path.display().to_string() })
            );
        } else {
            println!("{} No config file to remove.", "✓".green());
        }
        return Ok(());
    }

    if !cli.json {
        let confirm = Confirm::new()
            .with_prompt(format!("Delete {}?", path.display()))
            .default(false)
            .interact()
            .map_err(|e| BriefError::Other(format!("Prompt failed: {}", e)))?;

        if !confirm {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    std::fs::remove_file(&path)?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "status": "removed", "path": path.display().to_string() })
        );
    } else {
        println!(
            "{} Config removed: {}",
            "✓".green(),
            path.display().to_string().dimmed()
        );
    }

    Ok(())
}

fn path(cli: &Cli) -> Result<()> {
    let path = Config::config_path();

    if cli.json {
        println!("{}", serde_json::json!({ "path": path.display().to_string() }));
    } else {
        println!("{}", path.display());
    }

    Ok(())
}
