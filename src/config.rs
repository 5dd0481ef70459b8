use clap::Parser;
use std::path::PathBuf;

use crate::progress::format::Thresholds;

/// Runtime configuration. Every flag falls back to an environment variable so
/// the server can be configured entirely through `.env`.
#[derive(Parser, Debug, Clone)]
#[command(name = "brilliant-os-server")]
#[command(about = "Coaching and progress-tracking API")]
pub struct Config {
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    #[arg(long, env = "DATABASE_NAME", default_value = "brilliant")]
    pub database_name: String,

    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Firebase project whose ID tokens are accepted.
    #[arg(long, env = "FIREBASE_PROJECT_ID", default_value = "brilliant-os")]
    pub firebase_project_id: String,

    /// PEM file holding the public key used to verify ID tokens.
    #[arg(long, env = "FIREBASE_PUBLIC_KEY", default_value = "./keys/firebase_public.pem")]
    pub firebase_public_key: PathBuf,

    #[arg(long, env = "TRIBE_API_URL", default_value = "https://app.tribesocial.io/api")]
    pub tribe_api_url: String,

    #[arg(long, env = "TRIBE_API_TOKEN", default_value = "")]
    pub tribe_api_token: String,

    /// Number of activities that make up 100% overall progress.
    #[arg(long, env = "TOTAL_ACTIVITIES", default_value_t = 48)]
    pub total_activities: u32,

    #[arg(long, env = "GOOD_THRESHOLD", default_value_t = 80.0)]
    pub good_threshold: f64,

    #[arg(long, env = "WARNING_THRESHOLD", default_value_t = 50.0)]
    pub warning_threshold: f64,

    #[arg(long, env = "INVITE_TTL_DAYS", default_value_t = 7)]
    pub invite_ttl_days: i64,
}

/// Product constants the handlers need at request time.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    pub total_activities: u32,
    pub thresholds: Thresholds,
    pub invite_ttl_days: i64,
}

impl Config {
    pub fn settings(&self) -> Settings {
        Settings {
            total_activities: self.total_activities,
            thresholds: Thresholds {
                good: self.good_threshold,
                warning: self.warning_threshold,
            },
            invite_ttl_days: self.invite_ttl_days,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            total_activities: 48,
            thresholds: Thresholds::default(),
            invite_ttl_days: 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_constants() {
        let config = Config::parse_from(["brilliant-os-server"]);
        let settings = config.settings();
        assert_eq!(settings.total_activities, 48);
        assert_eq!(settings.thresholds.good, 80.0);
        assert_eq!(settings.thresholds.warning, 50.0);
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::parse_from([
            "brilliant-os-server",
            "--total-activities",
            "60",
            "--warning-threshold",
            "40",
        ]);
        assert_eq!(config.settings().total_activities, 60);
        assert_eq!(config.settings().thresholds.warning, 40.0);
    }
}
