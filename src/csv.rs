use crate::error::{Error, Result};
use crate::models::{format_amount, Row, TxType};
use chrono::NaiveDateTime;
use csv::Writer;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Destination tax tool of a CSV report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Default,
    Koinly,
    CoinTracking,
    CoinTracker,
    Accointing,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Default,
        ExportFormat::Koinly,
        ExportFormat::CoinTracking,
        ExportFormat::CoinTracker,
        ExportFormat::Accointing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExportFormat::Default => "default",
            ExportFormat::Koinly => "koinly",
            ExportFormat::CoinTracking => "cointracking",
            ExportFormat::CoinTracker => "cointracker",
            ExportFormat::Accointing => "accointing",
        }
    }

    /// Parses a `--format` value; `all` expands to every format.
    pub fn parse_list(value: &str) -> Result<Vec<ExportFormat>> {
        if value.eq_ignore_ascii_case("all") {
            return Ok(ExportFormat::ALL.to_vec());
        }
        value.split(',').map(|v| v.trim().parse()).collect()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ExportFormat::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct DefaultCsv {
    timestamp: String,
    tx_type: String,
    received_amount: String,
    received_currency: String,
    sent_amount: String,
    sent_currency: String,
    fee: String,
    fee_currency: String,
    comment: String,
    txid: String,
    url: String,
    exchange: String,
    wallet_address: String,
}

#[derive(Debug, Serialize)]
struct KoinlyCsv {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Sent Amount")]
    sent_amount: String,
    #[serde(rename = "Sent Currency")]
    sent_currency: String,
    #[serde(rename = "Received Amount")]
    received_amount: String,
    #[serde(rename = "Received Currency")]
    received_currency: String,
    #[serde(rename = "Fee Amount")]
    fee_amount: String,
    #[serde(rename = "Fee Currency")]
    fee_currency: String,
    #[serde(rename = "Net Worth Amount")]
    net_worth_amount: String,
    #[serde(rename = "Net Worth Currency")]
    net_worth_currency: String,
    #[serde(rename = "Label")]
    label: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "TxHash")]
    tx_hash: String,
}

#[derive(Debug, Serialize)]
struct CoinTrackingCsv {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Buy Amount")]
    buy_amount: String,
    #[serde(rename = "Buy Currency")]
    buy_currency: String,
    #[serde(rename = "Sell Amount")]
    sell_amount: String,
    #[serde(rename = "Sell Currency")]
    sell_currency: String,
    #[serde(rename = "Fee")]
    fee: String,
    #[serde(rename = "Fee Currency")]
    fee_currency: String,
    #[serde(rename = "Exchange")]
    exchange: String,
    #[serde(rename = "Trade-Group")]
    trade_group: String,
    #[serde(rename = "Comment")]
    comment: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Tx-ID")]
    tx_id: String,
}

#[derive(Debug, Serialize)]
struct CoinTrackerCsv {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Received Quantity")]
    received_quantity: String,
    #[serde(rename = "Received Currency")]
    received_currency: String,
    #[serde(rename = "Sent Quantity")]
    sent_quantity: String,
    #[serde(rename = "Sent Currency")]
    sent_currency: String,
    #[serde(rename = "Fee Amount")]
    fee_amount: String,
    #[serde(rename = "Fee Currency")]
    fee_currency: String,
    #[serde(rename = "Tag")]
    tag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccointingCsv {
    transaction_type: String,
    date: String,
    in_buy_amount: String,
    in_buy_asset: String,
    out_sell_amount: String,
    out_sell_asset: String,
    #[serde(rename = "feeAmount (optional)")]
    fee_amount: String,
    #[serde(rename = "feeAsset (optional)")]
    fee_asset: String,
    #[serde(rename = "classification (optional)")]
    classification: String,
    #[serde(rename = "operationId (optional)")]
    operation_id: String,
    #[serde(rename = "comments (optional)")]
    comments: String,
}

fn row_datetime(row: &Row) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&row.timestamp, "%Y-%m-%d %H:%M:%S").map_err(|e| {
        Error::InvalidTimestamp {
            value: row.timestamp.clone(),
            reason: e.to_string(),
        }
    })
}

/// Fee-only rows become a plain outflow of the fee for tools without a
/// dedicated fee type.
fn is_fee_outflow(row: &Row) -> bool {
    row.fee.is_some()
        && (row.tx_type.is_fee_only()
            || (row.received_amount.is_none() && row.sent_amount.is_none()))
}

/// `(sent, sent_currency, fee, fee_currency)` with fee-only rows folded into sent.
fn sent_and_fee(row: &Row) -> (String, String, String, String) {
    if is_fee_outflow(row) {
        (
            format_amount(row.fee),
            row.fee_currency.clone(),
            String::new(),
            String::new(),
        )
    } else {
        (
            format_amount(row.sent_amount),
            row.sent_currency.clone(),
            format_amount(row.fee),
            row.fee_currency.clone(),
        )
    }
}

fn description(row: &Row) -> String {
    if row.comment.is_empty() {
        row.tx_type.to_string()
    } else {
        format!("{} {}", row.tx_type, row.comment)
    }
}

fn default_record(row: &Row, ticker: &str, wallet: &str) -> DefaultCsv {
    DefaultCsv {
        timestamp: row.timestamp.clone(),
        tx_type: row.tx_type.to_string(),
        received_amount: format_amount(row.received_amount),
        received_currency: row.received_currency.clone(),
        sent_amount: format_amount(row.sent_amount),
        sent_currency: row.sent_currency.clone(),
        fee: format_amount(row.fee),
        fee_currency: row.fee_currency.clone(),
        comment: row.comment.clone(),
        txid: row.txid.clone(),
        url: row.url.clone(),
        exchange: ticker.to_string(),
        wallet_address: wallet.to_string(),
    }
}

fn koinly_record(row: &Row) -> Result<KoinlyCsv> {
    let date = row_datetime(row)?.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let (sent, sent_currency, fee, fee_currency) = sent_and_fee(row);
    let label = match row.tx_type {
        TxType::Staking => "reward",
        TxType::Airdrop => "airdrop",
        _ if is_fee_outflow(row) => "cost",
        _ => "",
    };

    Ok(KoinlyCsv {
        date,
        sent_amount: sent,
        sent_currency,
        received_amount: format_amount(row.received_amount),
        received_currency: row.received_currency.clone(),
        fee_amount: fee,
        fee_currency,
        net_worth_amount: String::new(),
        net_worth_currency: String::new(),
        label: label.to_string(),
        description: description(row),
        tx_hash: row.txid.clone(),
    })
}

fn cointracking_record(row: &Row, ticker: &str) -> Result<CoinTrackingCsv> {
    let date = row_datetime(row)?.format("%d.%m.%Y %H:%M:%S").to_string();
    let (sent, sent_currency, fee, fee_currency) = sent_and_fee(row);
    let kind = match row.tx_type {
        TxType::Staking => "Staking",
        TxType::Airdrop => "Airdrop",
        _ if is_fee_outflow(row) => "Other Fee",
        _ if row.received_amount.is_some() && row.sent_amount.is_some() => "Trade",
        _ if row.received_amount.is_some() => "Deposit",
        _ => "Withdrawal",
    };

    Ok(CoinTrackingCsv {
        kind: kind.to_string(),
        buy_amount: format_amount(row.received_amount),
        buy_currency: row.received_currency.clone(),
        sell_amount: sent,
        sell_currency: sent_currency,
        fee,
        fee_currency,
        exchange: ticker.to_string(),
        trade_group: String::new(),
        comment: description(row),
        date,
        tx_id: row.txid.clone(),
    })
}

fn cointracker_record(row: &Row) -> Result<CoinTrackerCsv> {
    let date = row_datetime(row)?.format("%m/%d/%Y %H:%M:%S").to_string();
    let (sent, sent_currency, fee, fee_currency) = sent_and_fee(row);
    let tag = match row.tx_type {
        TxType::Staking => "staked",
        TxType::Airdrop => "airdrop",
        _ => "",
    };

    Ok(CoinTrackerCsv {
        date,
        received_quantity: format_amount(row.received_amount),
        received_currency: row.received_currency.clone(),
        sent_quantity: sent,
        sent_currency,
        fee_amount: fee,
        fee_currency,
        tag: tag.to_string(),
    })
}

fn accointing_record(row: &Row) -> Result<AccointingCsv> {
    let date = row_datetime(row)?.format("%m/%d/%Y %H:%M:%S").to_string();
    let (sent, sent_currency, fee, fee_currency) = sent_and_fee(row);
    let transaction_type = match (row.received_amount.is_some(), !sent.is_empty()) {
        (true, true) => "order",
        (true, false) => "deposit",
        _ => "withdraw",
    };
    let classification = match row.tx_type {
        TxType::Staking => "staked",
        TxType::Airdrop => "airdrop",
        _ if is_fee_outflow(row) => "fee",
        _ => "",
    };

    Ok(AccointingCsv {
        transaction_type: transaction_type.to_string(),
        date,
        in_buy_amount: format_amount(row.received_amount),
        in_buy_asset: row.received_currency.clone(),
        out_sell_amount: sent,
        out_sell_asset: sent_currency,
        fee_amount: fee,
        fee_asset: fee_currency,
        classification: classification.to_string(),
        operation_id: row.txid.clone(),
        comments: description(row),
    })
}

/// Writes `rows` to `path` in the layout of `format`.
pub fn export_rows_csv(
    rows: &[Row],
    format: ExportFormat,
    ticker: &str,
    wallet: &str,
    path: impl AsRef<Path>,
) -> Result<()> {
    let mut wtr = Writer::from_path(path)?;
    for row in rows {
        match format {
            ExportFormat::Default => wtr.serialize(default_record(row, ticker, wallet))?,
            ExportFormat::Koinly => wtr.serialize(koinly_record(row)?)?,
            ExportFormat::CoinTracking => wtr.serialize(cointracking_record(row, ticker)?)?,
            ExportFormat::CoinTracker => wtr.serialize(cointracker_record(row)?)?,
            ExportFormat::Accointing => wtr.serialize(accointing_record(row)?)?,
        }
    }
    wtr.flush()?;
    Ok(())
}
