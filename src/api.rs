use crate::config::{ChainConfig, LcdVersion, HTTP_TIMEOUT, RETRY_ATTEMPTS, RETRY_INITIAL_DELAY};
use crate::error::{Error, Result};
use crate::models::{
    BalancesResponse, Coin, DenomTrace, DenomTraceResponse, GetTxResponse, TxPage,
    TxResponse, TxSearchResponse,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Read access to a chain's LCD (REST) endpoint.
#[async_trait]
pub trait LcdApi: Send + Sync {
    async fn get_tx(&self, txid: &str) -> Result<Option<TxResponse>>;

    /// `page` is zero-based.
    async fn search_txs(&self, query: &str, page: u64, limit: u64) -> Result<TxPage>;

    async fn account_exists(&self, address: &str) -> Result<bool>;

    async fn denom_trace(&self, hash: &str) -> Result<Option<DenomTrace>>;

    async fn balances_at_height(&self, address: &str, height: u64) -> Result<Vec<Coin>>;
}

pub struct LcdClient {
    node: String,
    version: LcdVersion,
    client: Client,
}

impl LcdClient {
    pub fn new(chain: &ChainConfig) -> Result<Self> {
        let client = Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(LcdClient {
            node: chain.node.trim_end_matches('/').to_string(),
            version: chain.lcd_version,
            client,
        })
    }

    /// GET `path` and decode the body. 404 maps to `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        height: Option<u64>,
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.node, path);

        retry_async(
            |attempt| {
                debug!("GET {} {:?} (attempt {})", url, query, attempt);
                self.fetch_once(&url, query, height)
            },
            RETRY_ATTEMPTS,
            RETRY_INITIAL_DELAY,
        )
        .await
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        height: Option<u64>,
    ) -> Result<Option<T>> {
        let mut request = self.client.get(url).query(query);
        if let Some(height) = height {
            request = request.header("x-cosmos-block-height", height.to_string());
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Some(response.json::<T>().await?))
    }

    fn search_params(&self, query: &str, page: u64, limit: u64) -> Vec<(&'static str, String)> {
        match self.version {
            LcdVersion::V1 => vec![
                ("events", query.to_string()),
                ("pagination.limit", limit.to_string()),
                ("pagination.offset", (page * limit).to_string()),
                ("pagination.count_total", "true".to_string()),
                ("order_by", "ORDER_BY_ASC".to_string()),
            ],
            LcdVersion::V2 => vec![
                ("query", query.to_string()),
                ("page", (page + 1).to_string()),
                ("limit", limit.to_string()),
                ("order_by", "ORDER_BY_ASC".to_string()),
            ],
        }
    }
}

#[async_trait]
impl LcdApi for LcdClient {
    async fn get_tx(&self, txid: &str) -> Result<Option<TxResponse>> {
        let path = format!("/cosmos/tx/v1beta1/txs/{}", txid);
        let data: Option<GetTxResponse> = self.get_json(&path, &[], None).await?;
        Ok(data.map(|d| d.tx_response))
    }

    async fn search_txs(&self, query: &str, page: u64, limit: u64) -> Result<TxPage> {
        let params = self.search_params(query, page, limit);
        let data: Option<TxSearchResponse> = self
            .get_json("/cosmos/tx/v1beta1/txs", &params, None)
            .await?;

        Ok(data
            .map(|d| TxPage {
                total: d.total(),
                txs: d.tx_responses,
            })
            .unwrap_or_default())
    }

    async fn account_exists(&self, address: &str) -> Result<bool> {
        let path = format!("/cosmos/auth/v1beta1/accounts/{}", address);
        let data: Option<serde_json::Value> = self.get_json(&path, &[], None).await?;
        Ok(data.is_some())
    }

    async fn denom_trace(&self, hash: &str) -> Result<Option<DenomTrace>> {
        let path = format!("/ibc/apps/transfer/v1/denom_traces/{}", hash);
        let data: Option<DenomTraceResponse> = self.get_json(&path, &[], None).await?;
        Ok(data.map(|d| d.denom_trace))
    }

    async fn balances_at_height(&self, address: &str, height: u64) -> Result<Vec<Coin>> {
        let path = format!("/cosmos/bank/v1beta1/balances/{}", address);
        let data: Option<BalancesResponse> = self.get_json(&path, &[], Some(height)).await?;
        Ok(data.map(|d| d.balances).unwrap_or_default())
    }
}

fn is_retryable(err: &Error) -> bool {
    match err {
        Error::Http(e) => !e.is_decode(),
        Error::Api { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

/// Retry an async request with exponential backoff while the error is
/// transient (transport failure, 429, 5xx).
pub async fn retry_async<F, Fut, T>(
    mut op: F,
    attempts: usize,
    initial_delay: Duration,
) -> Result<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = initial_delay;
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts && is_retryable(&e) => {
                warn!("Request failed (attempt {}/{}): {}", attempt, attempts, e);
                sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
