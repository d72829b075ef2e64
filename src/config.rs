use std::path::Path;

use tracing::{info, warn};

/// Settings the handlers need beyond the database pool. Verification URLs are
/// built from `public_url`; the payment collaborator authenticates its
/// webhook calls with `payment_webhook_key`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub public_url: String,
    pub payment_webhook_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            public_url: dotenvy::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            payment_webhook_key: dotenvy::var("PAYMENT_WEBHOOK_KEY").unwrap_or_default(),
        }
    }
}

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
