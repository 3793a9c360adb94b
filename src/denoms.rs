use crate::api::LcdApi;
use crate::cache::AddressCache;
use crate::config::ChainConfig;
use crate::error::{Error, Result};
use crate::models::Coin;
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

/// Base denoms seen often enough across IBC to hardcode.
static KNOWN_DENOMS: Lazy<HashMap<&'static str, (&'static str, u32)>> = Lazy::new(|| {
    HashMap::from([
        ("uatom", ("ATOM", 6)),
        ("uosmo", ("OSMO", 6)),
        ("utia", ("TIA", 6)),
        ("rowan", ("ROWAN", 18)),
        ("uusdc", ("USDC", 6)),
        ("uakt", ("AKT", 6)),
        ("ujuno", ("JUNO", 6)),
        ("uluna", ("LUNA", 6)),
        ("uscrt", ("SCRT", 6)),
        ("ustrd", ("STRD", 6)),
        ("untrn", ("NTRN", 6)),
        ("inj", ("INJ", 18)),
        ("aevmos", ("EVMOS", 18)),
        ("adydx", ("DYDX", 18)),
        ("stuatom", ("STATOM", 6)),
        ("stutia", ("STTIA", 6)),
    ])
});

/// Resolves raw chain denoms into ticker-style currencies and scales amounts.
pub struct Denoms {
    chain: ChainConfig,
    api: Arc<dyn LcdApi>,
    cache: Arc<AddressCache>,
}

impl Denoms {
    pub fn new(chain: ChainConfig, api: Arc<dyn LcdApi>, cache: Arc<AddressCache>) -> Self {
        Denoms { chain, api, cache }
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Returns `(currency, exponent)` for a raw denom.
    pub async fn currency(&self, denom: &str) -> Result<(String, u32)> {
        if denom == self.chain.denom {
            return Ok((self.chain.ticker.to_string(), self.chain.exponent));
        }

        if let Some(hash) = denom.strip_prefix("ibc/") {
            return match self.ibc_base_denom(hash).await? {
                Some(base) => Ok(self.base_currency(&base)),
                None => {
                    warn!("Unable to resolve denom trace for {}", denom);
                    Ok((denom.to_string(), 0))
                }
            };
        }

        Ok(self.base_currency(denom))
    }

    /// Converts a coin into `(amount, currency)`.
    pub async fn amount(&self, coin: &Coin) -> Result<(f64, String)> {
        let (currency, exponent) = self.currency(&coin.denom).await?;
        let amount = scale_amount(&coin.amount, exponent).ok_or_else(|| Error::MalformedTx {
            txid: String::new(),
            reason: format!("invalid coin amount {}{}", coin.amount, coin.denom),
        })?;
        Ok((amount, currency))
    }

    async fn ibc_base_denom(&self, hash: &str) -> Result<Option<String>> {
        if let Some(base) = self.cache.get(hash) {
            return Ok(Some(base));
        }

        let trace = self.api.denom_trace(hash).await?;
        Ok(trace.map(|t| {
            debug!("ibc/{} -> {} via {}", hash, t.base_denom, t.path);
            self.cache.insert(hash, &t.base_denom);
            t.base_denom
        }))
    }

    fn base_currency(&self, denom: &str) -> (String, u32) {
        if denom == self.chain.denom {
            return (self.chain.ticker.to_string(), self.chain.exponent);
        }
        if let Some((currency, exponent)) = KNOWN_DENOMS.get(denom) {
            return (currency.to_string(), *exponent);
        }
        guess_currency(denom)
    }
}

/// `u`-prefixed denoms are micro units, `a`-prefixed ones atto units.
pub fn guess_currency(denom: &str) -> (String, u32) {
    if denom.contains('/') {
        return (denom.to_string(), 0);
    }
    if let Some(rest) = denom.strip_prefix('u').filter(|r| r.len() >= 2) {
        return (rest.to_uppercase(), 6);
    }
    if let Some(rest) = denom.strip_prefix('a').filter(|r| r.len() >= 3) {
        return (rest.to_uppercase(), 18);
    }
    (denom.to_uppercase(), 0)
}

/// Shifts the decimal point of an integer amount string `exponent` places
/// left and parses the result, so the f64 is the closest one to the exact
/// decimal.
pub fn scale_amount(raw: &str, exponent: u32) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if exponent == 0 {
        return raw.parse().ok();
    }
    let exponent = exponent as usize;
    let padded = format!("{:0>width$}", raw, width = exponent + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - exponent);
    format!("{}.{}", int_part, frac_part).parse().ok()
}

/// Parses a coin list such as `1000utia,5ibc/27394FB0`.
pub fn parse_coins(s: &str) -> Vec<Coin> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let split = part.find(|c: char| !c.is_ascii_digit())?;
            if split == 0 {
                return None;
            }
            let (amount, denom) = part.split_at(split);
            Some(Coin {
                denom: denom.to_string(),
                amount: amount.to_string(),
            })
        })
        .collect()
}
