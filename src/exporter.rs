use crate::config::LocalConfig;
use crate::csv::{export_rows_csv, ExportFormat};
use crate::error::Result;
use crate::models::{format_amount, Row, TxType};
use log::info;
use std::path::Path;

const TABLE_COLUMNS: [&str; 9] = [
    "timestamp",
    "tx_type",
    "received_amount",
    "received_currency",
    "sent_amount",
    "sent_currency",
    "fee",
    "fee_currency",
    "txid",
];

/// Collects the rows of one wallet and writes them out per tax tool.
#[derive(Debug)]
pub struct Exporter {
    wallet: String,
    ticker: String,
    config: LocalConfig,
    rows: Vec<Row>,
}

impl Exporter {
    pub fn new(wallet: &str, ticker: &str, config: &LocalConfig) -> Self {
        Exporter {
            wallet: wallet.to_string(),
            ticker: ticker.to_string(),
            config: config.clone(),
            rows: Vec::new(),
        }
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn ingest_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Rows after date filtering and failed-tx exclusion, ordered by time.
    /// Rows sharing a timestamp keep ingestion order.
    pub fn rows(&self) -> Vec<Row> {
        let mut rows: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| !(self.config.exclude_failed && row.tx_type == TxType::FailedTx))
            .filter(|row| match row.date() {
                Some(date) => {
                    self.config.start_date.map_or(true, |start| date >= start)
                        && self.config.end_date.map_or(true, |end| date <= end)
                }
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text table of the rows, used for console output and tests.
    pub fn export_for_test(&self) -> String {
        let rows = self.rows();
        let cells: Vec<[String; 9]> = rows
            .iter()
            .map(|row| {
                [
                    row.timestamp.clone(),
                    row.tx_type.to_string(),
                    format_amount(row.received_amount),
                    row.received_currency.clone(),
                    format_amount(row.sent_amount),
                    row.sent_currency.clone(),
                    format_amount(row.fee),
                    row.fee_currency.clone(),
                    row.txid.clone(),
                ]
            })
            .collect();

        let mut widths: Vec<usize> = TABLE_COLUMNS.iter().map(|c| c.len()).collect();
        for line in &cells {
            for (width, cell) in widths.iter_mut().zip(line.iter()) {
                *width = (*width).max(cell.len());
            }
        }

        let render = |values: Vec<&str>| -> String {
            values
                .iter()
                .zip(widths.iter())
                .map(|(v, w)| format!("{:<width$}", v, width = *w))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let ruler = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ");

        let mut lines = vec![ruler.clone(), render(TABLE_COLUMNS.to_vec())];
        for line in &cells {
            lines.push(render(line.iter().map(String::as_str).collect()));
        }
        lines.push(ruler);
        lines.join("\n")
    }

    pub fn export_format(&self, format: ExportFormat, path: impl AsRef<Path>) -> Result<()> {
        let rows = self.rows();
        export_rows_csv(&rows, format, &self.ticker, &self.wallet, path.as_ref())?;
        info!(
            "Wrote {} {} rows to {}",
            rows.len(),
            format,
            path.as_ref().display()
        );
        Ok(())
    }
}
