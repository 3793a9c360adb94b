use chrono::NaiveDate;
use clap::Parser;
use cosmos_tax_csv::config::{supported_tickers, ChainConfig, LocalConfig};
use cosmos_tax_csv::csv::ExportFormat;
use cosmos_tax_csv::report::{write_reports, Report};
use log::info;
use std::time::Duration;

/// Writes tax CSV reports for a Cosmos SDK wallet.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Wallet address
    wallet: String,

    /// Chain ticker (ROWAN, TIA, ATOM, OSMO)
    #[arg(long, default_value = "TIA")]
    chain: String,

    /// Output format(s): all, default, koinly, cointracking, cointracker, accointing
    #[arg(long, default_value = "all")]
    format: String,

    /// Process a single transaction instead of the whole history
    #[arg(long)]
    txid: Option<String>,

    /// Maximum number of transactions to fetch
    #[arg(long)]
    limit: Option<usize>,

    /// Persist resolved IBC denoms between runs
    #[arg(long)]
    cache: bool,

    /// Abort on the first transaction that fails to classify
    #[arg(long)]
    debug: bool,

    #[arg(long)]
    start_date: Option<NaiveDate>,

    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Drop fee rows of failed transactions
    #[arg(long)]
    exclude_failed: bool,

    /// LCD endpoint overriding the built-in one
    #[arg(long)]
    node: Option<String>,

    /// Delay between search pages, in milliseconds
    #[arg(long)]
    page_delay_ms: Option<u64>,

    /// Report directory
    #[arg(long, default_value = "_reports")]
    out: String,

    /// Only print the estimated run time
    #[arg(long)]
    estimate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut chain = ChainConfig::for_ticker(&args.chain).map_err(|e| {
        format!("{} (supported: {})", e, supported_tickers().join(", "))
    })?;
    if let Some(node) = &args.node {
        chain = chain.with_node(node);
    }
    let wallet = chain.validate_wallet(&args.wallet)?;

    let formats = ExportFormat::parse_list(&args.format)?;

    let mut config = LocalConfig {
        cache: args.cache,
        debug: args.debug,
        start_date: args.start_date,
        end_date: args.end_date,
        exclude_failed: args.exclude_failed,
        ..LocalConfig::default()
    };
    if let Some(limit) = args.limit {
        config.limit = limit;
    }
    if let Some(ms) = args.page_delay_ms {
        config.page_delay = Duration::from_millis(ms);
    }

    let report = Report::new(chain, config)?;

    if args.estimate {
        let seconds = report.estimate_duration(&wallet).await?;
        println!("Estimated duration: {:.0} seconds", seconds);
        return Ok(());
    }

    if !report.wallet_exists(&wallet).await? {
        return Err(format!("Wallet {} has no account or transactions", wallet).into());
    }

    let exporter = match &args.txid {
        Some(txid) => report.txone(&wallet, txid).await?,
        None => report.txhistory(&wallet).await?,
    };

    println!("{}", exporter.export_for_test());

    let paths = write_reports(&exporter, &formats, &args.out)?;
    for path in paths {
        info!("Wrote {}", path.display());
    }

    Ok(())
}
