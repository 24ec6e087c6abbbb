use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::ledger::Pricing;
use crate::llm_client::DEFAULT_API_URL;
use crate::pipeline::{PipelineSettings, RetryPolicy};
use crate::simulation::merge::MergePolicy;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const MAX_STAGE_RETRIES_CAP: u32 = 10;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or out of range.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub anthropic_api_url: String,
    pub model: String,
    pub generation_temperature: f32,
    pub analysis_temperature: f32,
    pub analysis_max_tokens: u32,
    pub max_stage_retries: u32,
    pub retry_base_delay_ms: u64,
    pub input_price_per_mtok: f64,
    pub output_price_per_mtok: f64,
    pub merge_policy: MergePolicy,
    pub publish_webhook_url: Option<String>,
    pub session_idle_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            anthropic_api_key: var("ANTHROPIC_API_KEY")
                .context("Required environment variable 'ANTHROPIC_API_KEY' is not set")?,
            anthropic_api_url: or_default("ANTHROPIC_API_URL", DEFAULT_API_URL),
            model: or_default("MODEL", DEFAULT_MODEL),
            generation_temperature: or_default("GENERATION_TEMPERATURE", "0.7")
                .parse::<f32>()
                .context("GENERATION_TEMPERATURE must be a number")?,
            analysis_temperature: or_default("ANALYSIS_TEMPERATURE", "0.2")
                .parse::<f32>()
                .context("ANALYSIS_TEMPERATURE must be a number")?,
            analysis_max_tokens: or_default("ANALYSIS_MAX_TOKENS", "4000")
                .parse::<u32>()
                .context("ANALYSIS_MAX_TOKENS must be a positive integer")?,
            max_stage_retries: or_default("MAX_STAGE_RETRIES", "3")
                .parse::<u32>()
                .context("MAX_STAGE_RETRIES must be a non-negative integer")?,
            retry_base_delay_ms: or_default("RETRY_BASE_DELAY_MS", "1000")
                .parse::<u64>()
                .context("RETRY_BASE_DELAY_MS must be a non-negative integer")?,
            input_price_per_mtok: or_default("INPUT_PRICE_PER_MTOK", "3.0")
                .parse::<f64>()
                .context("INPUT_PRICE_PER_MTOK must be a number")?,
            output_price_per_mtok: or_default("OUTPUT_PRICE_PER_MTOK", "15.0")
                .parse::<f64>()
                .context("OUTPUT_PRICE_PER_MTOK must be a number")?,
            merge_policy: or_default("MERGE_POLICY", "lenient")
                .parse::<MergePolicy>()
                .map_err(anyhow::Error::msg)
                .context("MERGE_POLICY is invalid")?,
            publish_webhook_url: var("PUBLISH_WEBHOOK_URL"),
            session_idle_ttl_secs: or_default("SESSION_IDLE_TTL_SECS", "3600")
                .parse::<u64>()
                .context("SESSION_IDLE_TTL_SECS must be a positive integer")?,
            port: or_default("PORT", "8080")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: or_default("RUST_LOG", "info"),
        };

        config.check_ranges()?;
        Ok(config)
    }

    fn check_ranges(&self) -> Result<()> {
        for (key, t) in [
            ("GENERATION_TEMPERATURE", self.generation_temperature),
            ("ANALYSIS_TEMPERATURE", self.analysis_temperature),
        ] {
            if !(0.0..=1.0).contains(&t) {
                bail!("{key} must lie in [0, 1], got {t}");
            }
        }
        for (key, price) in [
            ("INPUT_PRICE_PER_MTOK", self.input_price_per_mtok),
            ("OUTPUT_PRICE_PER_MTOK", self.output_price_per_mtok),
        ] {
            if !price.is_finite() || price < 0.0 {
                bail!("{key} must be non-negative, got {price}");
            }
        }
        if self.analysis_max_tokens == 0 {
            bail!("ANALYSIS_MAX_TOKENS must be positive");
        }
        if self.max_stage_retries > MAX_STAGE_RETRIES_CAP {
            bail!(
                "MAX_STAGE_RETRIES must be at most {MAX_STAGE_RETRIES_CAP}, got {}",
                self.max_stage_retries
            );
        }
        if self.session_idle_ttl_secs == 0 {
            bail!("SESSION_IDLE_TTL_SECS must be positive");
        }
        Ok(())
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_ttl_secs)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            model: self.model.clone(),
            generation_temperature: self.generation_temperature,
            analysis_temperature: self.analysis_temperature,
            analysis_max_tokens: self.analysis_max_tokens,
            retry: RetryPolicy {
                max_retries: self.max_stage_retries,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
            },
            pricing: Pricing {
                input_per_mtok: self.input_price_per_mtok,
                output_per_mtok: self.output_price_per_mtok,
            },
            merge_policy: self.merge_policy,
        }
    }
}
