use config::{Config, ConfigError, File};
use ethers::types::Address;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

// Ethereum mainnet deployment addresses used as defaults; override via
// Config.toml or SWAP_SDK_* environment variables for other networks.
const UNISWAP_V3_FACTORY: &str = "0x1F98431c8aD98523631AE4a59f267346ea31F984";
const UNISWAP_V3_QUOTER_V2: &str = "0x61fFE014bA17989E743c5F6cB21bF9697530B21e";
const UNISWAP_V3_ROUTER: &str = "0xE592427A0AEce92De3Edee1F18E0157C05861564";
const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

fn parse_addr(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

#[derive(Debug, Deserialize, Clone)]
pub struct Rpc {
    #[serde(default)]
    pub http_urls: Vec<String>,
    #[serde(default)]
    pub ws_urls: Vec<String>,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout_seconds() -> u64 {
    10
}

impl Default for Rpc {
    fn default() -> Self {
        Self {
            http_urls: Vec::new(),
            ws_urls: Vec::new(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Contracts {
    #[serde(default = "default_factory")]
    pub factory: Address,
    #[serde(default = "default_quoter")]
    pub quoter: Address,
    #[serde(default = "default_router")]
    pub router: Address,
}

fn default_factory() -> Address {
    parse_addr(UNISWAP_V3_FACTORY)
}
fn default_quoter() -> Address {
    parse_addr(UNISWAP_V3_QUOTER_V2)
}
fn default_router() -> Address {
    parse_addr(UNISWAP_V3_ROUTER)
}

impl Default for Contracts {
    fn default() -> Self {
        Self {
            factory: default_factory(),
            quoter: default_quoter(),
            router: default_router(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Routing {
    /// Fee tiers probed during discovery, in pips.
    #[serde(default = "default_fee_tiers")]
    pub fee_tiers: Vec<u32>,
    /// Liquid intermediaries tried for multi-hop paths.
    #[serde(default = "default_base_tokens")]
    pub base_tokens: Vec<Address>,
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// Fee assumed per hop in the three-hop fallback.
    #[serde(default = "default_fallback_fee")]
    pub fallback_fee: u32,
    /// When false the three-hop fallback stops at the first connected chain
    /// per base pair; when true every connected chain is evaluated.
    #[serde(default)]
    pub exhaustive_three_hop: bool,
}

fn default_fee_tiers() -> Vec<u32> {
    vec![100, 500, 3000, 10000]
}

fn default_base_tokens() -> Vec<Address> {
    vec![parse_addr(WETH), parse_addr(USDC), parse_addr(DAI)]
}

fn default_max_hops() -> usize {
    3
}

fn default_fallback_fee() -> u32 {
    3000
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            fee_tiers: default_fee_tiers(),
            base_tokens: default_base_tokens(),
            max_hops: default_max_hops(),
            fallback_fee: default_fallback_fee(),
            exhaustive_three_hop: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Tokens {
    #[serde(default = "default_weth")]
    pub weth: Address,
}

fn default_weth() -> Address {
    parse_addr(WETH)
}

impl Default for Tokens {
    fn default() -> Self {
        Self {
            weth: default_weth(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenCache {
    /// Metadata entries expire after this many seconds; 0 disables expiry.
    /// Seeded tokens never expire.
    #[serde(default = "default_token_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_token_ttl_seconds() -> u64 {
    300
}

impl Default for TokenCache {
    fn default() -> Self {
        Self {
            ttl_seconds: default_token_ttl_seconds(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Session {
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
    #[serde(default = "default_deadline_minutes")]
    pub deadline_minutes: u64,
    #[serde(default = "default_block_poll_interval_ms")]
    pub block_poll_interval_ms: u64,
}

fn default_slippage_bps() -> u32 {
    50
}
fn default_deadline_minutes() -> u64 {
    20
}
fn default_block_poll_interval_ms() -> u64 {
    1000
}

impl Default for Session {
    fn default() -> Self {
        Self {
            slippage_bps: default_slippage_bps(),
            deadline_minutes: default_deadline_minutes(),
            block_poll_interval_ms: default_block_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[default]
    #[serde(rename = "pretty")]
    Pretty,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Metrics {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_metrics_port() -> u16 {
    9000
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chain {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    1
}

impl Default for Chain {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub rpc: Rpc,
    #[serde(default)]
    pub contracts: Contracts,
    #[serde(default)]
    pub routing: Routing,
    #[serde(default)]
    pub tokens: Tokens,
    #[serde(default)]
    pub token_cache: TokenCache,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub metrics: Metrics,
    #[serde(default)]
    pub chain: Chain,
}

impl Settings {
    /// Loads `Config.toml` (optional) and applies environment overrides.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("Config.toml").required(false))
            .build()?;

        let mut settings: Self = s.try_deserialize()?;

        if let Ok(raw_http) = env::var("SWAP_SDK_RPC_HTTP_URLS") {
            let list = parse_string_list(&raw_http);
            if !list.is_empty() {
                settings.rpc.http_urls = list;
            }
        }
        if let Ok(raw_ws) = env::var("SWAP_SDK_RPC_WS_URLS") {
            let list = parse_string_list(&raw_ws);
            if !list.is_empty() {
                settings.rpc.ws_urls = list;
            }
        }
        if let Ok(weth_env) = env::var("SWAP_SDK_TOKENS_WETH") {
            if let Ok(addr) = weth_env.trim().parse() {
                settings.tokens.weth = addr;
            }
        }

        Ok(settings)
    }
}

/// Parses a URL list from an environment variable: JSON array first, plain
/// comma-separated fallback.
fn parse_string_list(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return list;
        }
    }
    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|s| s.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_mainnet() {
        let settings = Settings::default();
        assert_eq!(settings.routing.fee_tiers, vec![100, 500, 3000, 10000]);
        assert_eq!(settings.routing.max_hops, 3);
        assert_eq!(settings.routing.base_tokens.len(), 3);
        assert_eq!(settings.session.slippage_bps, 50);
        assert_eq!(settings.token_cache.ttl_seconds, 300);
        assert_eq!(settings.chain.chain_id, 1);
        assert_eq!(settings.tokens.weth, parse_addr(WETH));
        assert!(!settings.routing.exhaustive_three_hop);
    }

    #[test]
    fn string_list_parsing_handles_json_and_plain() {
        assert_eq!(
            parse_string_list(r#"["http://a", "http://b"]"#),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
        assert_eq!(
            parse_string_list("http://a,http://b"),
            vec!["http://a".to_string(), "http://b".to_string()]
        );
        assert!(parse_string_list("").is_empty());
    }
}
