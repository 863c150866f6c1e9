use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Base for resolving relative detail-page links.
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    /// Substring an anchor's `href` must contain to count as an offer link.
    #[serde(default = "default_link_pattern")]
    pub link_pattern: String,
    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            listing_url: default_listing_url(),
            link_pattern: default_link_pattern(),
            headless: true,
        }
    }
}

fn default_origin() -> String {
    "https://justjoin.it".to_string()
}
fn default_listing_url() -> String {
    "https://justjoin.it/".to_string()
}
fn default_link_pattern() -> String {
    "/job-offer/".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,
    #[serde(default = "default_max_idle_scrolls")]
    pub max_idle_scrolls: usize,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Character cap applied to every extracted field.
    #[serde(default)]
    pub max_field_length: Option<usize>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            max_scrolls: default_max_scrolls(),
            max_idle_scrolls: default_max_idle_scrolls(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_field_length: None,
        }
    }
}

fn default_max_scrolls() -> usize {
    10
}
fn default_max_idle_scrolls() -> usize {
    3
}
fn default_navigation_timeout_secs() -> u64 {
    30
}
fn default_read_timeout_secs() -> u64 {
    2
}

impl ScrapeConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Fixed delays, in milliseconds.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PacingConfig {
    pub initial_settle_ms: u64,
    pub settle_ms: u64,
    pub scroll_pause_ms: u64,
    pub page_settle_ms: u64,
    pub offer_delay_ms: u64,
    pub batch_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            initial_settle_ms: 3000,
            settle_ms: 2000,
            scroll_pause_ms: 512,
            page_settle_ms: 1000,
            offer_delay_ms: 500,
            batch_delay_ms: 1000,
        }
    }
}

/// Structural locators for the detail page.
///
/// The positional paths mirror the source's fixed layout; override them
/// here when the layout shifts.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectorConfig {
    pub title: String,
    pub category: String,
    pub company: String,
    pub location: String,
    pub work_type: String,
    pub experience: String,
    pub employment_type: String,
    /// Text of the `span` heading the salary section.
    pub salary_heading: String,
    /// Class fragment of the sibling `div` holding the salary blocks.
    pub salary_container_class: String,
    /// Class fragment of each salary block.
    pub salary_block_class: String,
    pub tech_name: String,
    pub tech_level: String,
    pub tech_container: String,
    pub tech_container_limit: usize,
}

const DETAIL_ROOT: &str = "body > div:nth-of-type(2) > div > div:nth-of-type(1) > div:nth-of-type(4) > div";
const DETAIL_HEADER: &str = "div:nth-of-type(3) > div:nth-of-type(1) > div:nth-of-type(1)";

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            title: "h1".to_string(),
            category: format!(
                "{DETAIL_ROOT} > {DETAIL_HEADER} > div:nth-of-type(2) > div:nth-of-type(1) > div"
            ),
            company: format!(
                "{DETAIL_ROOT} > {DETAIL_HEADER} > div:nth-of-type(2) > div:nth-of-type(2) > a > p"
            ),
            location: format!(
                "{DETAIL_ROOT} > div:nth-of-type(2) > div > div > nav > ol > li:nth-of-type(3) > a"
            ),
            work_type: format!(
                "{DETAIL_ROOT} > {DETAIL_HEADER} > div:nth-of-type(3) > div:nth-of-type(1) > div:nth-of-type(2)"
            ),
            experience: format!(
                "{DETAIL_ROOT} > {DETAIL_HEADER} > div:nth-of-type(3) > div:nth-of-type(3) > div:nth-of-type(2)"
            ),
            employment_type: format!(
                "{DETAIL_ROOT} > {DETAIL_HEADER} > div:nth-of-type(3) > div:nth-of-type(2) > div:nth-of-type(2)"
            ),
            salary_heading: "Salary".to_string(),
            salary_container_class: "mui-14zr2vc".to_string(),
            salary_block_class: "mui-1bzxsz6".to_string(),
            tech_name: "h4".to_string(),
            tech_level: "span".to_string(),
            tech_container: "div".to_string(),
            tech_container_limit: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Falls back to `AWS_REGION`, then `eu-central-1`.
    #[serde(default)]
    pub region: Option<String>,
    /// Overrides the provider's default endpoint.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Fallback chain, highest priority first.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default = "default_anthropic_version")]
    pub anthropic_version: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            region: None,
            endpoint_url: None,
            models: default_models(),
            anthropic_version: default_anthropic_version(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_models() -> Vec<String> {
    [
        "eu.anthropic.claude-sonnet-4-5-20250929-v1:0",
        "global.anthropic.claude-sonnet-4-5-20250929-v1:0",
        "eu.anthropic.claude-3-7-sonnet-20250219-v1:0",
        "eu.anthropic.claude-3-5-sonnet-20240620-v1:0",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_anthropic_version() -> String {
    "bedrock-2023-05-31".to_string()
}
fn default_max_tokens() -> u32 {
    2000
}
fn default_temperature() -> f32 {
    0.3
}
fn default_batch_size() -> usize {
    50
}
fn default_timeout_secs() -> u64 {
    60
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    pub fn region(&self) -> String {
        resolve_region(self.region.as_deref())
    }
}

/// Downstream normalization function fired after a scrape.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TriggerConfig {
    /// Function name or ARN. Unset means the trigger is a no-op.
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl TriggerConfig {
    pub fn region(&self) -> String {
        resolve_region(self.region.as_deref())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

fn resolve_region(configured: Option<&str>) -> String {
    configured
        .map(str::to_string)
        .or_else(|| std::env::var("AWS_REGION").ok().filter(|r| !r.is_empty()))
        .unwrap_or_else(|| "eu-central-1".to_string())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.source.link_pattern.is_empty() {
        anyhow::bail!("source.link_pattern must not be empty");
    }
    url::Url::parse(&config.source.origin)
        .with_context(|| format!("source.origin is not a valid URL: {}", config.source.origin))?;

    if config.scrape.max_scrolls == 0 {
        anyhow::bail!("scrape.max_scrolls must be > 0");
    }
    if config.scrape.max_idle_scrolls == 0 {
        anyhow::bail!("scrape.max_idle_scrolls must be > 0");
    }
    if config.scrape.navigation_timeout_secs == 0 {
        anyhow::bail!("scrape.navigation_timeout_secs must be > 0");
    }

    if config.llm.batch_size == 0 {
        anyhow::bail!("llm.batch_size must be > 0");
    }
    if !(0.0..=1.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 1.0]");
    }

    match config.llm.provider.as_str() {
        "disabled" | "bedrock" | "anthropic" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, bedrock, or anthropic.",
            other
        ),
    }

    if config.llm.is_enabled() && config.llm.models.is_empty() {
        anyhow::bail!(
            "llm.models must list at least one model when provider is '{}'",
            config.llm.provider
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse("[db]\npath = \"./data/atlas.sqlite\"\n").unwrap();
        assert_eq!(config.scrape.max_scrolls, 10);
        assert_eq!(config.scrape.max_idle_scrolls, 3);
        assert_eq!(config.pacing.scroll_pause_ms, 512);
        assert_eq!(config.llm.batch_size, 50);
        assert_eq!(config.llm.models.len(), 4);
        assert_eq!(config.llm.anthropic_version, "bedrock-2023-05-31");
        assert!(!config.llm.is_enabled());
        assert!(config.trigger.function_name.is_none());
        assert!(config.selectors.company.ends_with("> a > p"));
    }

    #[test]
    fn partial_pacing_table_keeps_other_defaults() {
        let config = parse("[db]\npath = \"x.db\"\n[pacing]\noffer_delay_ms = 0\n").unwrap();
        assert_eq!(config.pacing.offer_delay_ms, 0);
        assert_eq!(config.pacing.settle_ms, 2000);
    }

    #[test]
    fn rejects_unknown_provider() {
        let err = parse("[db]\npath = \"x.db\"\n[llm]\nprovider = \"openai\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown llm provider"));
    }

    #[test]
    fn rejects_empty_model_chain_when_enabled() {
        let err = parse("[db]\npath = \"x.db\"\n[llm]\nprovider = \"bedrock\"\nmodels = []\n")
            .unwrap_err();
        assert!(err.to_string().contains("llm.models"));
    }

    #[test]
    fn rejects_zero_batch_size() {
        assert!(parse("[db]\npath = \"x.db\"\n[llm]\nbatch_size = 0\n").is_err());
    }

    #[test]
    fn configured_region_wins() {
        let llm = LlmConfig {
            region: Some("us-west-2".into()),
            ..Default::default()
        };
        assert_eq!(llm.region(), "us-west-2");
    }
}
