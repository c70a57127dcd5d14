//! `calmwire config` — Configuration management commands.

use calmwire_config::MediatorConfig;
use calmwire_core::Result;
use calmwire_core::error::Error;
use std::path::Path;

use super::config_error;

pub async fn validate(config_path: &Path) -> Result<()> {
    println!("🔍 Validating {}...", config_path.display());

    match MediatorConfig::load_with_env(config_path) {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let warnings = warnings(&config);
            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Provider:   {}", config.inference.provider);
            println!("   Model:      {}", config.inference.model);
            println!(
                "   Cache:      {}",
                if config.cache.enabled {
                    format!("{} entries", config.cache.capacity)
                } else {
                    "disabled".into()
                }
            );
            println!("   Detector:   {}", on_off(config.features.detector));
            println!("   Enrichment: {}", on_off(config.features.enrichment));
            println!(
                "   Throttle:   {}/day, comment cooldown {}s",
                config.throttle.max_interventions_per_day, config.throttle.comment_cooldown_secs
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(config_error(e));
        }
    }

    Ok(())
}

/// Non-fatal problems worth telling the operator about.
pub fn warnings(config: &MediatorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let keyless = matches!(config.inference.provider.as_str(), "ollama" | "vllm" | "llamacpp")
        || config.inference.provider.starts_with("custom:");
    if !config.has_api_key() && !keyless {
        warnings.push(
            "No API key set (set CALMWIRE_API_KEY, OPENROUTER_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY)"
                .to_string(),
        );
    }

    if !config.cache.enabled {
        warnings.push("Cache disabled: every repeated message costs an inference call".to_string());
    }

    if config.features.enrichment
        && config.budgets.enrichment_wait_ms >= u64::from(config.inference.request_timeout_secs) * 1000
    {
        warnings.push("Enrichment wait is not shorter than the inference timeout".to_string());
    }

    warnings
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

pub async fn show(config_path: &Path) -> Result<()> {
    let mut config = MediatorConfig::load_with_env(config_path)
        .map_err(|e| config_error(format!("Failed to load config: {e}")))?;
    if config.inference.api_key.is_some() {
        config.inference.api_key = Some("[REDACTED]".into());
    }
    let toml_str = toml::to_string_pretty(&config).map_err(|e| Error::Internal(e.to_string()))?;
    println!("{toml_str}");
    Ok(())
}

pub async fn init(config_path: &Path, force: bool) -> Result<()> {
    write_default(config_path, force)?;
    println!("✅ Created config at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Set CALMWIRE_API_KEY (or add api_key under [inference])");
    println!("   2. Run: calmwire doctor");
    println!("   3. Try: calmwire analyze --text \"You never answer me\"\n");
    Ok(())
}

fn write_default(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        return Err(config_error(format!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        )));
    }
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(config_path, MediatorConfig::default_toml())?;
    Ok(())
}

pub async fn path(config_path: &Path) -> Result<()> {
    println!("{}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_is_valid() {
        let path = MediatorConfig::config_path();
        assert!(path.to_str().unwrap().contains("config.toml"));
    }

    #[test]
    fn init_writes_a_loadable_file_and_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        write_default(&path, false).unwrap();
        assert!(MediatorConfig::load_from(&path).is_ok());

        assert!(matches!(write_default(&path, false), Err(Error::Config { .. })));
        assert!(write_default(&path, true).is_ok());
    }

    #[tokio::test]
    async fn validate_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[inference]\ntemperature = 5.0\n").unwrap();

        assert!(matches!(validate(&path).await, Err(Error::Config { .. })));
    }

    #[test]
    fn keyless_providers_do_not_warn_about_keys() {
        let mut config = MediatorConfig::default();
        config.inference.provider = "ollama".into();
        assert!(warnings(&config).iter().all(|w| !w.contains("API key")));

        config.inference.provider = "openrouter".into();
        config.inference.api_key = None;
        assert!(warnings(&config).iter().any(|w| w.contains("API key")));
    }
}
