use crate::api::LcdApi;
use crate::config::PAGE_LIMIT;
use crate::error::{Error, Result};
use crate::models::{TxPage, TxResponse};
use crate::progress::Progress;
use dashmap::DashMap;
use futures::future::try_join_all;
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Fetches a wallet's transactions from the LCD search endpoint.
pub struct TxData {
    api: Arc<dyn LcdApi>,
    max_txs: usize,
    page_delay: Duration,
    /// First page of each query, kept from the page count for the full fetch.
    first_pages: DashMap<String, TxPage>,
}

impl TxData {
    pub fn new(api: Arc<dyn LcdApi>, max_txs: usize) -> Self {
        TxData {
            api,
            max_txs,
            page_delay: Duration::ZERO,
            first_pages: DashMap::new(),
        }
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Event queries that together cover every transaction touching `wallet`.
    pub fn wallet_queries(wallet: &str) -> Vec<String> {
        vec![
            format!("message.sender='{}'", wallet),
            format!("transfer.recipient='{}'", wallet),
        ]
    }

    pub async fn get_tx(&self, txid: &str) -> Result<TxResponse> {
        self.api
            .get_tx(txid)
            .await?
            .ok_or_else(|| Error::TxNotFound(txid.to_string()))
    }

    pub async fn get_txs_pages_count(&self, wallet: &str) -> Result<u64> {
        let queries = Self::wallet_queries(wallet);
        let counts = try_join_all(queries.iter().map(|query| async move {
            let first = self.api.search_txs(query, 0, PAGE_LIMIT).await?;
            let pages = match first.total {
                Some(total) => total.div_ceil(PAGE_LIMIT),
                None if first.txs.is_empty() => 0,
                None => 1,
            };
            debug!("{}: {} pages", query, pages);
            self.first_pages.insert(query.clone(), first);
            Ok::<u64, Error>(pages)
        }))
        .await?;

        Ok(counts.into_iter().sum())
    }

    /// Every transaction of `wallet`, deduplicated and ordered by height.
    pub async fn get_txs_all(&self, wallet: &str, progress: &Progress) -> Result<Vec<TxResponse>> {
        let queries = Self::wallet_queries(wallet);
        let results = try_join_all(
            queries
                .iter()
                .map(|query| self.fetch_query(query, progress)),
        )
        .await?;

        let mut seen = HashSet::new();
        let mut txs: Vec<TxResponse> = results
            .into_iter()
            .flatten()
            .filter(|tx| seen.insert(tx.txhash.clone()))
            .collect();
        txs.sort_by(|a, b| a.height.cmp(&b.height).then_with(|| a.txhash.cmp(&b.txhash)));
        txs.truncate(self.max_txs);

        info!("Fetched {} unique transactions for {}", txs.len(), wallet);
        Ok(txs)
    }

    async fn fetch_query(&self, query: &str, progress: &Progress) -> Result<Vec<TxResponse>> {
        let mut out = Vec::new();
        let mut page = 0;

        loop {
            let seeded = if page == 0 {
                self.first_pages.remove(query).map(|(_, first)| first)
            } else {
                None
            };
            let result = match seeded {
                Some(first) => first,
                None => self.api.search_txs(query, page, PAGE_LIMIT).await?,
            };
            let count = result.txs.len();
            out.extend(result.txs);

            let done = progress.add_page();
            progress.report_message(&format!(
                "Fetched page {} of {} ({} txs, {} pages total)",
                page + 1,
                query,
                count,
                done
            ));

            let past_total = result
                .total
                .map(|total| (page + 1) * PAGE_LIMIT >= total)
                .unwrap_or(false);
            if count < PAGE_LIMIT as usize || past_total || out.len() >= self.max_txs {
                break;
            }

            page += 1;
            if !self.page_delay.is_zero() {
                sleep(self.page_delay).await;
            }
        }

        Ok(out)
    }
}
