/// # Modules Overview
///
/// This crate fetches the transaction history of a Cosmos SDK wallet from a
/// chain's LCD endpoint, classifies each transaction into tax events and
/// exports the rows as CSV files for several tax tools.

/// `airdrop`
///
/// Genesis airdrop rows for chains that launched with an allocation.
pub mod airdrop;

/// `api`
///
/// The `LcdApi` trait and its `reqwest` implementation `LcdClient`, with
/// retry and exponential backoff on transient failures.
///
/// Example usage:
/// ```rust,ignore
/// let api = api::LcdClient::new(&ChainConfig::for_ticker("TIA")?)?;
/// let tx = api.get_tx("F28DA971...").await?;
/// ```
pub mod api;

pub mod cache;

pub mod config;

/// `csv`
///
/// Contains the per-tool CSV layouts (`default`, `koinly`, `cointracking`,
/// `cointracker`, `accointing`) and `export_rows_csv`, which writes rows to a
/// file in one of them.
///
/// Example usage:
/// ```rust,ignore
/// csv::export_rows_csv(&rows, ExportFormat::Koinly, "TIA", wallet, "TIA.koinly.csv")?;
/// ```
pub mod csv;

pub mod denoms;

pub mod error;

pub mod exporter;

/// `models`
///
/// Defines the LCD wire types (`TxResponse`, `Event`, `Coin`, ...) and the
/// normalized output:
/// * `Row` – One economic event with received, sent and fee amounts.
/// * `TxType` – `TRANSFER`, `STAKING`, `AIRDROP`, `_UNKNOWN` or a fee-only `_<MsgName>`.
/// * `TxInfo` – Per-transaction context used by the classifier.
pub mod models;

/// `processor`
///
/// Classifies transactions. Each message is matched by type, the wallet's
/// received and sent amounts are read from its `transfer` events, and rows
/// are emitted with the fee attached to the first one.
///
/// Example usage:
/// ```rust,ignore
/// processor::process_txs(wallet, &elems, &mut exporter, &denoms, &config).await?;
/// ```
pub mod processor;

pub mod progress;

/// `report`
///
/// Entry points used by the CLI: `txone`, `txhistory`, `estimate_duration`,
/// `wallet_exists`, and `write_reports`.
pub mod report;

/// `txdata`
///
/// Paged retrieval of every transaction touching a wallet, deduplicated and
/// ordered by height.
pub mod txdata;

pub use error::{Error, Result};
