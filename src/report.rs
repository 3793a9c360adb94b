use crate::airdrop::genesis_airdrop;
use crate::api::{LcdApi, LcdClient};
use crate::cache::AddressCache;
use crate::config::{ChainConfig, LocalConfig, SECONDS_PER_PAGE};
use crate::csv::ExportFormat;
use crate::denoms::Denoms;
use crate::error::Result;
use crate::exporter::Exporter;
use crate::processor::{process_tx, process_txs};
use crate::progress::Progress;
use crate::txdata::TxData;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Report runner for one chain.
pub struct Report {
    chain: ChainConfig,
    config: LocalConfig,
    api: Arc<dyn LcdApi>,
    cache: Arc<AddressCache>,
}

impl Report {
    /// Connects to the chain's LCD node and opens the address cache when
    /// caching is enabled.
    pub fn new(chain: ChainConfig, config: LocalConfig) -> Result<Self> {
        let api: Arc<dyn LcdApi> = Arc::new(LcdClient::new(&chain)?);
        let cache = if config.cache {
            AddressCache::load(&config.cache_path)?
        } else {
            AddressCache::in_memory()
        };
        info!("{} ({}) via {}", chain.ticker, chain.name, chain.node);
        info!("localconfig: {:?}", config);
        Ok(Report {
            chain,
            config,
            api,
            cache: Arc::new(cache),
        })
    }

    pub fn with_api(chain: ChainConfig, config: LocalConfig, api: Arc<dyn LcdApi>) -> Self {
        Report {
            chain,
            config,
            api,
            cache: Arc::new(AddressCache::in_memory()),
        }
    }

    /// Replaces the address cache, e.g. with one loaded from disk.
    pub fn with_cache(mut self, cache: AddressCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    fn txdata(&self) -> TxData {
        TxData::new(self.api.clone(), self.config.limit).with_page_delay(self.config.page_delay)
    }

    fn denoms(&self) -> Denoms {
        Denoms::new(self.chain.clone(), self.api.clone(), self.cache.clone())
    }

    pub async fn wallet_exists(&self, wallet: &str) -> Result<bool> {
        let Ok(wallet) = self.chain.validate_wallet(wallet) else {
            return Ok(false);
        };
        if self.api.account_exists(&wallet).await? {
            return Ok(true);
        }
        Ok(self.txdata().get_txs_pages_count(&wallet).await? > 0)
    }

    /// Estimated seconds for a full history run.
    pub async fn estimate_duration(&self, wallet: &str) -> Result<f64> {
        let pages = self.txdata().get_txs_pages_count(wallet).await?;
        Ok(SECONDS_PER_PAGE * pages as f64)
    }

    /// Classifies a single transaction.
    pub async fn txone(&self, wallet: &str, txid: &str) -> Result<Exporter> {
        let elem = self.txdata().get_tx(txid).await?;
        let mut exporter = Exporter::new(wallet, self.chain.ticker, &self.config);
        let denoms = self.denoms();
        process_tx(wallet, &elem, &mut exporter, &denoms).await?;

        if self.config.cache {
            self.cache.save()?;
        }
        Ok(exporter)
    }

    /// Fetches and classifies the whole history of `wallet`.
    pub async fn txhistory(&self, wallet: &str) -> Result<Exporter> {
        let wallet = self.chain.validate_wallet(wallet)?;
        let wallet = wallet.as_str();

        let progress = Progress::new();
        let mut exporter = Exporter::new(wallet, self.chain.ticker, &self.config);
        let txdata = self.txdata();
        let denoms = self.denoms();

        let count_pages = txdata.get_txs_pages_count(wallet).await?;
        progress.set_estimate(count_pages);

        let elems = txdata.get_txs_all(wallet, &progress).await?;

        progress.report_message(&format!("Processing {} transactions... ", elems.len()));
        if let Err(e) = genesis_airdrop(wallet, self.api.as_ref(), &denoms, &mut exporter).await {
            if self.config.debug {
                return Err(e);
            }
            warn!("Skipping genesis airdrop for {}: {}", wallet, e);
        }
        process_txs(wallet, &elems, &mut exporter, &denoms, &self.config).await?;

        if self.config.cache {
            self.cache.save()?;
        }
        Ok(exporter)
    }
}

/// Writes one CSV per format into `dir` as `<TICKER>.<wallet>.<format>.csv`.
pub fn write_reports(
    exporter: &Exporter,
    formats: &[ExportFormat],
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(formats.len());
    for format in formats {
        let path = dir.join(format!(
            "{}.{}.{}.csv",
            exporter.ticker(),
            exporter.wallet(),
            format
        ));
        exporter.export_format(*format, &path)?;
        paths.push(path);
    }
    Ok(paths)
}
