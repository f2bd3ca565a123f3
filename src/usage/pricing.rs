use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

const LITELLM_PRICING_URL: &str =
    "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json";

const FETCH_TIMEOUT_SECS: u64 = 15;

const PROVIDER_PREFIXES: &[&str] = &["anthropic/", "openai/", "azure/", "openrouter/anthropic/"];

/// Per-model pricing from the LiteLLM dataset. All costs are per individual
/// token (e.g. 3e-6 = $3 per million tokens).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_cost_per_token: Option<f64>,
    pub output_cost_per_token: Option<f64>,
    pub cache_creation_input_token_cost: Option<f64>,
    pub cache_read_input_token_cost: Option<f64>,
}

/// Loaded pricing data for all known models.
pub struct PricingData {
    models: HashMap<String, ModelPricing>,
}

impl PricingData {
    /// Load pricing without touching the network: file cache if present,
    /// otherwise the embedded snapshot. This is the only path the request
    /// pipeline uses; [`PricingData::refresh_cache`] runs at server startup.
    pub fn load_offline() -> Self {
        match Self::load_cache() {
            Ok(data) => data,
            Err(_) => Self::embedded_fallback(),
        }
    }

    /// Fetch the LiteLLM dataset and rewrite the file cache. Best-effort:
    /// callers log and move on when this fails.
    pub async fn refresh_cache() -> anyhow::Result<()> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;

        let response = client.get(LITELLM_PRICING_URL).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }

        let raw: HashMap<String, serde_json::Value> = response.json().await?;
        let data = PricingData {
            models: Self::parse_raw_data(raw),
        };
        data.save_cache()
    }

    /// Keep only entries that carry at least one cost field.
    fn parse_raw_data(raw: HashMap<String, serde_json::Value>) -> HashMap<String, ModelPricing> {
        let mut models = HashMap::new();
        for (name, value) in raw {
            if let Ok(pricing) = serde_json::from_value::<ModelPricing>(value) {
                if pricing.input_cost_per_token.is_some() || pricing.output_cost_per_token.is_some()
                {
                    models.insert(name, pricing);
                }
            }
        }
        models
    }

    /// Cache file path: `~/.config/ccdeck/pricing_cache.json`
    fn cache_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ccdeck").join("pricing_cache.json"))
    }

    fn save_cache(&self) -> anyhow::Result<()> {
        let path = Self::cache_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_vec(&self.models)?)?;
        Ok(())
    }

    fn load_cache() -> anyhow::Result<Self> {
        let path = Self::cache_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
        let raw = std::fs::read(&path)?;
        let models: HashMap<String, ModelPricing> = serde_json::from_slice(&raw)?;
        if models.is_empty() {
            anyhow::bail!("pricing cache is empty");
        }
        Ok(PricingData { models })
    }

    /// Embedded snapshot of Anthropic model rates, used when the cache has
    /// never been written.
    fn embedded_fallback() -> Self {
        let mut models = HashMap::new();
        let mut add = |name: &str, input: f64, output: f64, cache_create: f64, cache_read: f64| {
            models.insert(
                name.to_string(),
                ModelPricing {
                    input_cost_per_token: Some(input),
                    output_cost_per_token: Some(output),
                    cache_creation_input_token_cost: Some(cache_create),
                    cache_read_input_token_cost: Some(cache_read),
                },
            );
        };

        add("claude-opus-4", 15e-6, 75e-6, 18.75e-6, 1.5e-6);
        add("claude-sonnet-4", 3e-6, 15e-6, 3.75e-6, 0.3e-6);
        add("claude-3-7-sonnet", 3e-6, 15e-6, 3.75e-6, 0.3e-6);
        add("claude-3-5-sonnet", 3e-6, 15e-6, 3.75e-6, 0.3e-6);
        add("claude-3-5-haiku", 0.8e-6, 4e-6, 1e-6, 0.08e-6);
        add("claude-3-opus", 15e-6, 75e-6, 18.75e-6, 1.5e-6);
        add("claude-3-haiku", 0.25e-6, 1.25e-6, 0.3e-6, 0.03e-6);

        PricingData { models }
    }

    /// Cost in USD of one message's worth of tokens for `model`. Unknown
    /// models cost zero rather than failing the scan.
    pub fn cost_for(
        &self,
        model: &str,
        input: u64,
        output: u64,
        cache_creation: u64,
        cache_read: u64,
    ) -> f64 {
        let Some(pricing) = self.lookup(model) else {
            return 0.0;
        };

        input as f64 * pricing.input_cost_per_token.unwrap_or(0.0)
            + output as f64 * pricing.output_cost_per_token.unwrap_or(0.0)
            + cache_creation as f64 * pricing.cache_creation_input_token_cost.unwrap_or(0.0)
            + cache_read as f64 * pricing.cache_read_input_token_cost.unwrap_or(0.0)
    }

    /// Exact name first, then with common provider prefixes stripped, then
    /// the longest table key the dated model name contains (so
    /// `claude-sonnet-4-20250514` hits `claude-sonnet-4`).
    fn lookup(&self, model: &str) -> Option<&ModelPricing> {
        if let Some(pricing) = self.models.get(model) {
            return Some(pricing);
        }

        let stripped = PROVIDER_PREFIXES
            .iter()
            .find_map(|prefix| model.strip_prefix(prefix))
            .unwrap_or(model);
        if let Some(pricing) = self.models.get(stripped) {
            return Some(pricing);
        }

        self.models
            .iter()
            .filter(|(name, _)| stripped.contains(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, pricing)| pricing)
    }

    #[cfg(test)]
    fn with_models(models: HashMap<String, ModelPricing>) -> Self {
        PricingData { models }
    }
}
