use crate::api::LcdApi;
use crate::denoms::Denoms;
use crate::error::Result;
use crate::exporter::Exporter;
use crate::models::{Row, TxType};
use log::info;

/// Adds the wallet's genesis allocation as an `AIRDROP` row for chains that
/// launched with one. Returns whether a row was added.
pub async fn genesis_airdrop(
    wallet: &str,
    api: &dyn LcdApi,
    denoms: &Denoms,
    exporter: &mut Exporter,
) -> Result<bool> {
    let chain = denoms.chain();
    let Some(airdrop) = &chain.genesis_airdrop else {
        return Ok(false);
    };

    let balances = api.balances_at_height(wallet, airdrop.height).await?;
    let Some(coin) = balances.iter().find(|c| c.denom == chain.denom) else {
        return Ok(false);
    };

    let (amount, currency) = denoms.amount(coin).await?;
    if amount <= 0.0 {
        return Ok(false);
    }

    info!("Genesis airdrop of {} {} for {}", amount, currency, wallet);
    exporter.ingest_row(
        Row::new(airdrop.timestamp, TxType::Airdrop, airdrop.txid).received(amount, &currency),
    );
    Ok(true)
}
