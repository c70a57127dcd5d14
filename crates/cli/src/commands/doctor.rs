//! `calmwire doctor` — Diagnose configuration and inference connectivity.

use calmwire_config::MediatorConfig;
use calmwire_core::Result;
use std::path::Path;

use super::{config_cmd, config_error};

pub async fn run(config_path: &Path) -> Result<()> {
    println!("🩺 calmwire doctor");
    println!("==================\n");

    let mut issues = 0;

    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults — run `calmwire config init`");
    }

    let config = match MediatorConfig::load_with_env(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config before running other checks.");
            return Err(config_error(e));
        }
    };

    for warning in config_cmd::warnings(&config) {
        println!("  ⚠️  {warning}");
        issues += 1;
    }

    match calmwire_providers::build_from_config(&config.inference) {
        Ok(client) => {
            println!("  ✅ Inference client built ({})", client.name());
            match client.health_check().await {
                Ok(true) => println!("  ✅ Inference endpoint reachable"),
                Ok(false) => {
                    println!("  ❌ Inference endpoint answered but reported unhealthy");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Inference endpoint unreachable: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Cannot build inference client: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
