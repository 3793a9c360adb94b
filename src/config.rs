use crate::error::{Error, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::time::Duration;

pub const PAGE_LIMIT: u64 = 50;
pub const SECONDS_PER_PAGE: f64 = 2.0;
pub const DEFAULT_LIMIT: usize = 10_000;
pub const RETRY_ATTEMPTS: usize = 4;
pub const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(500);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(200);

/// Data-part alphabet of bech32 addresses.
const BECH32_CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Query dialect of the chain's LCD transaction search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcdVersion {
    /// `events=` + `pagination.offset` (Cosmos SDK up to 0.47)
    V1,
    /// `query=` + `page` (Cosmos SDK 0.50+)
    V2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenesisAirdrop {
    pub height: u64,
    pub timestamp: &'static str,
    pub txid: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub ticker: &'static str,
    pub name: &'static str,
    pub node: String,
    pub bech32_prefix: &'static str,
    pub denom: &'static str,
    pub exponent: u32,
    pub lcd_version: LcdVersion,
    pub explorer: &'static str,
    pub genesis_airdrop: Option<GenesisAirdrop>,
}

impl ChainConfig {
    /// Looks up a built-in chain by ticker. `<TICKER>_NODE` in the environment
    /// replaces the default LCD endpoint.
    pub fn for_ticker(ticker: &str) -> Result<Self> {
        let key = ticker.to_uppercase();
        let mut chain = CHAINS
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| Error::UnknownChain(ticker.to_string()))?;

        if let Ok(node) = std::env::var(format!("{}_NODE", key)) {
            if !node.is_empty() {
                chain.node = node;
            }
        }
        Ok(chain)
    }

    pub fn with_node(mut self, node: &str) -> Self {
        self.node = node.trim_end_matches('/').to_string();
        self
    }

    pub fn tx_url(&self, txid: &str) -> String {
        format!("{}/{}", self.explorer, txid)
    }

    /// Checks the bech32 shape of `wallet` for this chain and returns it in
    /// canonical lowercase form. Mixed-case addresses are rejected.
    pub fn validate_wallet(&self, wallet: &str) -> Result<String> {
        let invalid = || Error::InvalidWallet {
            address: wallet.to_string(),
            prefix: self.bech32_prefix.to_string(),
        };

        let has_upper = wallet.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = wallet.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower {
            return Err(invalid());
        }

        let lower = wallet.to_ascii_lowercase();
        let data = lower
            .strip_prefix(self.bech32_prefix)
            .and_then(|rest| rest.strip_prefix('1'))
            .ok_or_else(invalid)?;
        if data.is_empty() || !data.chars().all(|c| BECH32_CHARSET.contains(c)) {
            return Err(invalid());
        }
        Ok(lower)
    }
}

static CHAINS: Lazy<HashMap<&'static str, ChainConfig>> = Lazy::new(|| {
    let chains = vec![
        ChainConfig {
            ticker: "ROWAN",
            name: "sifchain",
            node: "https://sifchain-api.polkachu.com".to_string(),
            bech32_prefix: "sif",
            denom: "rowan",
            exponent: 18,
            lcd_version: LcdVersion::V1,
            explorer: "https://www.mintscan.io/sifchain/tx",
            genesis_airdrop: None,
        },
        ChainConfig {
            ticker: "TIA",
            name: "celestia",
            node: "https://celestia-api.polkachu.com".to_string(),
            bech32_prefix: "celestia",
            denom: "utia",
            exponent: 6,
            lcd_version: LcdVersion::V2,
            explorer: "https://www.mintscan.io/celestia/tx",
            genesis_airdrop: Some(GenesisAirdrop {
                height: 1,
                timestamp: "2023-10-31 10:00:00",
                txid: "celestia_genesis_airdrop",
            }),
        },
        ChainConfig {
            ticker: "ATOM",
            name: "cosmoshub",
            node: "https://cosmos-rest.publicnode.com".to_string(),
            bech32_prefix: "cosmos",
            denom: "uatom",
            exponent: 6,
            lcd_version: LcdVersion::V1,
            explorer: "https://www.mintscan.io/cosmos/tx",
            genesis_airdrop: None,
        },
        ChainConfig {
            ticker: "OSMO",
            name: "osmosis",
            node: "https://osmosis-rest.publicnode.com".to_string(),
            bech32_prefix: "osmo",
            denom: "uosmo",
            exponent: 6,
            lcd_version: LcdVersion::V2,
            explorer: "https://www.mintscan.io/osmosis/tx",
            genesis_airdrop: None,
        },
    ];
    chains.into_iter().map(|c| (c.ticker, c)).collect()
});

pub fn supported_tickers() -> Vec<&'static str> {
    let mut tickers: Vec<&'static str> = CHAINS.keys().copied().collect();
    tickers.sort_unstable();
    tickers
}

/// Per-run options.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub limit: usize,
    pub cache: bool,
    pub cache_path: String,
    pub debug: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub exclude_failed: bool,
    pub page_delay: Duration,
}

impl Default for LocalConfig {
    fn default() -> Self {
        LocalConfig {
            limit: DEFAULT_LIMIT,
            cache: false,
            cache_path: "_reports/.cache/ibc_addresses.json".to_string(),
            debug: false,
            start_date: None,
            end_date: None,
            exclude_failed: false,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}
