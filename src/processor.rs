use crate::config::LocalConfig;
use crate::denoms::{parse_coins, Denoms};
use crate::error::{Error, Result};
use crate::exporter::Exporter;
use crate::models::{Coin, MsgInfo, Row, TxInfo, TxResponse, TxType};
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use serde_json::Value;
use std::collections::BTreeMap;

const TRANSFER_MSGS: &[&str] = &[
    "MsgSend",
    "MsgMultiSend",
    "MsgTransfer",
    "MsgRecvPacket",
    "MsgTimeout",
    "MsgTimeoutOnClose",
];

const STAKING_MSGS: &[&str] = &[
    "MsgDelegate",
    "MsgUndelegate",
    "MsgBeginRedelegate",
    "MsgWithdrawDelegatorReward",
    "MsgWithdrawValidatorCommission",
    "MsgCancelUnbondingDelegation",
];

const SIMPLE_MSGS: &[&str] = &[
    "MsgUpdateClient",
    "MsgAcknowledgement",
    "MsgCreateClient",
    "MsgConnectionOpenInit",
    "MsgConnectionOpenTry",
    "MsgConnectionOpenAck",
    "MsgConnectionOpenConfirm",
    "MsgChannelOpenInit",
    "MsgChannelOpenTry",
    "MsgChannelOpenAck",
    "MsgChannelOpenConfirm",
    "MsgVote",
    "MsgVoteWeighted",
    "MsgDeposit",
    "MsgSubmitProposal",
    "MsgGrant",
    "MsgRevoke",
    "MsgGrantAllowance",
    "MsgRevokeAllowance",
    "MsgSetWithdrawAddress",
    "MsgUnjail",
    "MsgCreateValidator",
    "MsgEditValidator",
    "MsgPayForBlobs",
];

/// Message fields naming the account that signed a message, in lookup order.
const SIGNER_FIELDS: &[&str] = &[
    "from_address",
    "delegator_address",
    "sender",
    "signer",
    "voter",
    "depositor",
    "proposer",
    "grantee",
    "granter",
    "validator_address",
    "creator",
    "owner",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgKind {
    Transfer,
    Staking,
    Simple,
    Unknown,
}

/// Short message name, e.g. `/cosmos.bank.v1beta1.MsgSend` -> `MsgSend`.
pub fn short_name(msg_type: &str) -> &str {
    msg_type.rsplit('.').next().unwrap_or(msg_type)
}

fn msg_type_of(message: &Value) -> String {
    message
        .get("@type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub fn msg_kind(message: &Value) -> MsgKind {
    let msg_type = msg_type_of(message);
    let name = short_name(&msg_type);

    if name == "MsgExec" {
        let inner: Vec<MsgKind> = message
            .get("msgs")
            .and_then(Value::as_array)
            .map(|msgs| msgs.iter().map(msg_kind).collect())
            .unwrap_or_default();
        return if inner.contains(&MsgKind::Staking) {
            MsgKind::Staking
        } else if inner.contains(&MsgKind::Transfer) {
            MsgKind::Transfer
        } else {
            MsgKind::Simple
        };
    }

    if TRANSFER_MSGS.contains(&name) {
        MsgKind::Transfer
    } else if STAKING_MSGS.contains(&name) {
        MsgKind::Staking
    } else if SIMPLE_MSGS.contains(&name) {
        MsgKind::Simple
    } else {
        MsgKind::Unknown
    }
}

/// Account that signed `message`, when the message names one.
pub fn msg_signer(message: &Value) -> Option<String> {
    if let Some(address) = message
        .get("inputs")
        .and_then(|inputs| inputs.get(0))
        .and_then(|input| input.get("address"))
        .and_then(Value::as_str)
    {
        return Some(address.to_string());
    }

    SIGNER_FIELDS
        .iter()
        .find_map(|field| message.get(*field).and_then(Value::as_str))
        .map(str::to_string)
}

/// Account charged the fee: fee granter, explicit payer, the `tx.fee_payer`
/// event attribute, or the signer of the first message.
pub fn fee_payer(elem: &TxResponse) -> Option<String> {
    let fee = &elem.tx.auth_info.fee;
    if !fee.granter.is_empty() {
        return Some(fee.granter.clone());
    }
    if !fee.payer.is_empty() {
        return Some(fee.payer.clone());
    }
    if let Some(payer) = elem
        .tx_events()
        .filter(|e| e.kind == "tx")
        .find_map(|e| e.attr("fee_payer"))
        .filter(|p| !p.is_empty())
    {
        return Some(payer.to_string());
    }
    elem.tx.body.messages.first().and_then(msg_signer)
}

/// LCD RFC3339 timestamp -> `YYYY-MM-DD HH:MM:SS` UTC.
pub fn parse_timestamp(value: &str) -> Result<String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M:%S").to_string())
        .map_err(|e| Error::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Per-denom raw amounts the wallet received and sent within one message.
#[derive(Debug, Default, PartialEq)]
pub struct WalletFlows {
    pub received: BTreeMap<String, u128>,
    pub sent: BTreeMap<String, u128>,
}

impl WalletFlows {
    pub fn from_msg(wallet: &str, msg: &MsgInfo) -> Self {
        let mut flows = WalletFlows::default();

        for transfer in msg
            .events
            .iter()
            .filter(|e| e.kind == "transfer")
            .flat_map(|e| e.transfers())
        {
            let target = if transfer.recipient == wallet && transfer.sender != wallet {
                &mut flows.received
            } else if transfer.sender == wallet && transfer.recipient != wallet {
                &mut flows.sent
            } else {
                continue;
            };

            for coin in parse_coins(&transfer.amount) {
                match coin.amount.parse::<u128>() {
                    Ok(amount) => *target.entry(coin.denom).or_default() += amount,
                    Err(e) => warn!("Skipping transfer amount {}: {}", coin.amount, e),
                }
            }
        }

        flows.received.retain(|_, amount| *amount > 0);
        flows.sent.retain(|_, amount| *amount > 0);
        flows
    }
}

async fn to_amounts(
    denoms: &Denoms,
    raw: &BTreeMap<String, u128>,
    txid: &str,
) -> Result<Vec<(f64, String)>> {
    let mut out = Vec::with_capacity(raw.len());
    for (denom, amount) in raw {
        let coin = Coin {
            denom: denom.clone(),
            amount: amount.to_string(),
        };
        let converted = denoms.amount(&coin).await.map_err(|e| Error::MalformedTx {
            txid: txid.to_string(),
            reason: e.to_string(),
        })?;
        out.push(converted);
    }
    Ok(out)
}

pub async fn build_txinfo(wallet: &str, elem: &TxResponse, denoms: &Denoms) -> Result<TxInfo> {
    let timestamp = parse_timestamp(&elem.timestamp)?;
    let payer = fee_payer(elem);

    let fee = if payer.as_deref() == Some(wallet) {
        match elem
            .tx
            .auth_info
            .fee
            .amount
            .iter()
            .find(|c| c.amount.parse::<u128>().map(|a| a > 0).unwrap_or(false))
        {
            Some(coin) => Some(denoms.amount(coin).await.map_err(|e| Error::MalformedTx {
                txid: elem.txhash.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        }
    } else {
        None
    };

    let msgs = elem
        .tx
        .body
        .messages
        .iter()
        .enumerate()
        .map(|(index, message)| MsgInfo {
            index,
            msg_type: msg_type_of(message),
            message: message.clone(),
            events: elem.msg_events(index),
        })
        .collect();

    Ok(TxInfo {
        txid: elem.txhash.clone(),
        timestamp,
        fee,
        fee_payer: payer,
        url: denoms.chain().tx_url(&elem.txhash),
        failed: elem.is_failed(),
        msgs,
    })
}

/// Turns one transaction into normalized rows for `wallet`.
pub async fn classify(wallet: &str, info: &TxInfo, denoms: &Denoms) -> Result<Vec<Row>> {
    if info.failed {
        return Ok(info
            .fee
            .as_ref()
            .map(|fee| {
                vec![Row::new(&info.timestamp, TxType::FailedTx, &format!("{}-0", info.txid))
                    .with_fee(Some(fee))
                    .with_url(&info.url)]
            })
            .unwrap_or_default());
    }

    let mut rows: Vec<Row> = Vec::new();
    let mut quiet_msg: Option<&MsgInfo> = None;

    for msg in &info.msgs {
        let txid = format!("{}-{}", info.txid, msg.index);
        let kind = msg_kind(&msg.message);
        let flows = WalletFlows::from_msg(wallet, msg);
        let received = to_amounts(denoms, &flows.received, &info.txid).await?;
        let sent = to_amounts(denoms, &flows.sent, &info.txid).await?;
        let before = rows.len();

        debug!(
            "{} {} kind={:?} received={:?} sent={:?}",
            txid, msg.msg_type, kind, received, sent
        );

        match kind {
            MsgKind::Transfer => {
                for (amount, currency) in &received {
                    rows.push(Row::new(&info.timestamp, TxType::Transfer, &txid).received(*amount, currency));
                }
                for (amount, currency) in &sent {
                    rows.push(Row::new(&info.timestamp, TxType::Transfer, &txid).sent(*amount, currency));
                }
            }
            MsgKind::Staking => {
                for (amount, currency) in &received {
                    rows.push(Row::new(&info.timestamp, TxType::Staking, &txid).received(*amount, currency));
                }
            }
            MsgKind::Unknown => {
                let pairs = received.len().max(sent.len());
                for i in 0..pairs {
                    let mut row = Row::new(&info.timestamp, TxType::Unknown, &txid)
                        .with_comment(&msg.msg_type);
                    if let Some((amount, currency)) = received.get(i) {
                        row = row.received(*amount, currency);
                    }
                    if let Some((amount, currency)) = sent.get(i) {
                        row = row.sent(*amount, currency);
                    }
                    rows.push(row);
                }
            }
            MsgKind::Simple => {}
        }

        if rows.len() == before && quiet_msg.is_none() {
            quiet_msg = Some(msg);
        }
    }

    if let Some(fee) = &info.fee {
        match rows.first_mut() {
            Some(first) => {
                first.fee = Some(fee.0);
                first.fee_currency = fee.1.clone();
            }
            None => {
                let (name, index) = quiet_msg
                    .map(|m| (short_name(&m.msg_type).to_string(), m.index))
                    .unwrap_or_else(|| ("NoMsg".to_string(), 0));
                let name = if name.is_empty() { "UnknownMsg".to_string() } else { name };
                rows.push(
                    Row::new(
                        &info.timestamp,
                        TxType::Simple(name),
                        &format!("{}-{}", info.txid, index),
                    )
                    .with_fee(Some(fee)),
                );
            }
        }
    }

    Ok(rows.into_iter().map(|row| row.with_url(&info.url)).collect())
}

pub async fn process_tx(
    wallet: &str,
    elem: &TxResponse,
    exporter: &mut Exporter,
    denoms: &Denoms,
) -> Result<TxInfo> {
    let info = build_txinfo(wallet, elem, denoms).await?;
    let rows = classify(wallet, &info, denoms).await?;
    for row in rows {
        exporter.ingest_row(row);
    }
    Ok(info)
}

/// Classifies every transaction. A transaction that fails to classify is
/// logged and skipped unless `config.debug` is set.
pub async fn process_txs(
    wallet: &str,
    elems: &[TxResponse],
    exporter: &mut Exporter,
    denoms: &Denoms,
    config: &LocalConfig,
) -> Result<()> {
    for elem in elems {
        if let Err(e) = process_tx(wallet, elem, exporter, denoms).await {
            if config.debug {
                return Err(e);
            }
            error!("Skipping tx {}: {}", elem.txhash, e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exec_takes_kind_of_inner_messages() {
        let exec = json!({
            "@type": "/cosmos.authz.v1beta1.MsgExec",
            "grantee": "celestia1grantee",
            "msgs": [
                {"@type": "/cosmos.distribution.v1beta1.MsgWithdrawDelegatorReward"},
                {"@type": "/cosmos.staking.v1beta1.MsgDelegate"}
            ]
        });
        assert_eq!(msg_kind(&exec), MsgKind::Staking);

        let vote = json!({"@type": "/cosmos.gov.v1beta1.MsgVote", "voter": "celestia1v"});
        assert_eq!(msg_kind(&vote), MsgKind::Simple);
        assert_eq!(msg_signer(&vote).as_deref(), Some("celestia1v"));

        let swap = json!({"@type": "/osmosis.gamm.v1beta1.MsgSwapExactAmountIn"});
        assert_eq!(msg_kind(&swap), MsgKind::Unknown);
    }

    #[test]
    fn multisend_signer_is_first_input() {
        let msg = json!({
            "@type": "/cosmos.bank.v1beta1.MsgMultiSend",
            "inputs": [{"address": "sif1sender", "coins": []}],
            "outputs": []
        });
        assert_eq!(msg_signer(&msg).as_deref(), Some("sif1sender"));
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        assert_eq!(
            parse_timestamp("2023-10-31T22:26:00Z").unwrap(),
            "2023-10-31 22:26:00"
        );
        assert_eq!(
            parse_timestamp("2024-01-10T04:41:16+02:00").unwrap(),
            "2024-01-10 02:41:16"
        );
        assert!(parse_timestamp("yesterday").is_err());
    }
}
