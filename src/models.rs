use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(u64),
    Str(String),
}

impl NumOrString {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            NumOrString::Num(n) => Ok(n),
            NumOrString::Str(s) => s.parse().map_err(E::custom),
        }
    }
}

fn de_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    NumOrString::deserialize(d)?.into_u64()
}

fn de_opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    match Option::<NumOrString>::deserialize(d)? {
        Some(NumOrString::Str(s)) if s.is_empty() => Ok(None),
        Some(n) => n.into_u64().map(Some),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Attribute {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// One `transfer` between two accounts, as reported by the bank module.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub sender: String,
    pub recipient: String,
    pub amount: String,
}

impl Event {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value.as_deref())
    }

    /// Older SDKs merge every transfer of a message into a single event with
    /// repeated `recipient`/`sender`/`amount` keys, so a repeated key starts
    /// a new transfer.
    pub fn transfers(&self) -> Vec<Transfer> {
        let mut out = Vec::new();
        let mut current: [Option<String>; 3] = [None, None, None];

        let mut flush = |current: &mut [Option<String>; 3]| {
            if let (sender, Some(recipient), Some(amount)) =
                (current[0].take(), current[1].take(), current[2].take())
            {
                out.push(Transfer {
                    sender: sender.unwrap_or_default(),
                    recipient,
                    amount,
                });
            }
            *current = [None, None, None];
        };

        for a in &self.attributes {
            let slot = match a.key.as_str() {
                "sender" => 0,
                "recipient" => 1,
                "amount" => 2,
                _ => continue,
            };
            if current[slot].is_some() {
                flush(&mut current);
            }
            current[slot] = Some(a.value.clone().unwrap_or_default());
        }
        flush(&mut current);
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxLog {
    #[serde(default)]
    pub msg_index: u32,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fee {
    #[serde(default)]
    pub amount: Vec<Coin>,
    #[serde(default)]
    pub payer: String,
    #[serde(default)]
    pub granter: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthInfo {
    #[serde(default)]
    pub fee: Fee,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxBody {
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default)]
    pub memo: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tx {
    #[serde(default)]
    pub body: TxBody,
    #[serde(default)]
    pub auth_info: AuthInfo,
}

/// `tx_response` object of the LCD `cosmos/tx/v1beta1` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TxResponse {
    pub txhash: String,
    #[serde(deserialize_with = "de_u64")]
    pub height: u64,
    #[serde(default)]
    pub code: u32,
    pub timestamp: String,
    #[serde(default)]
    pub raw_log: String,
    #[serde(default)]
    pub logs: Vec<TxLog>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub tx: Tx,
}

impl TxResponse {
    pub fn is_failed(&self) -> bool {
        self.code != 0
    }

    /// Events emitted by message `index`. Taken from `logs` when the node
    /// still fills them, otherwise from flat `events` tagged with `msg_index`.
    pub fn msg_events(&self, index: usize) -> Vec<Event> {
        if !self.logs.is_empty() {
            return self
                .logs
                .iter()
                .find(|log| log.msg_index as usize == index)
                .map(|log| log.events.clone())
                .unwrap_or_default();
        }

        let index = index.to_string();
        self.events
            .iter()
            .filter(|e| e.attr("msg_index") == Some(index.as_str()))
            .cloned()
            .collect()
    }

    /// Events not bound to any message (fee deduction, signatures, ...).
    pub fn tx_events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.attr("msg_index").is_none())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetTxResponse {
    pub tx_response: TxResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxSearchResponse {
    #[serde(default)]
    pub tx_responses: Vec<TxResponse>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    pub total: Option<u64>,
}

impl TxSearchResponse {
    pub fn total(&self) -> Option<u64> {
        self.pagination
            .as_ref()
            .and_then(|p| p.total)
            .filter(|t| *t > 0)
            .or(self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DenomTrace {
    #[serde(default)]
    pub path: String,
    pub base_denom: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenomTraceResponse {
    pub denom_trace: DenomTrace,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalancesResponse {
    #[serde(default)]
    pub balances: Vec<Coin>,
}

/// One page of search results together with the total the node reported.
#[derive(Debug, Clone, Default)]
pub struct TxPage {
    pub txs: Vec<TxResponse>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TxType {
    Transfer,
    Staking,
    Airdrop,
    Unknown,
    FailedTx,
    /// Fee-only row labelled with the message name, e.g. `_MsgDelegate`.
    Simple(String),
}

impl TxType {
    pub fn is_fee_only(&self) -> bool {
        matches!(self, TxType::Simple(_) | TxType::FailedTx)
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Transfer => write!(f, "TRANSFER"),
            TxType::Staking => write!(f, "STAKING"),
            TxType::Airdrop => write!(f, "AIRDROP"),
            TxType::Unknown => write!(f, "_UNKNOWN"),
            TxType::FailedTx => write!(f, "_FailedTx"),
            TxType::Simple(name) => write!(f, "_{}", name),
        }
    }
}

/// Normalized output row, one economic event.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub timestamp: String,
    pub tx_type: TxType,
    pub received_amount: Option<f64>,
    pub received_currency: String,
    pub sent_amount: Option<f64>,
    pub sent_currency: String,
    pub fee: Option<f64>,
    pub fee_currency: String,
    pub txid: String,
    pub url: String,
    pub comment: String,
}

impl Row {
    pub fn new(timestamp: &str, tx_type: TxType, txid: &str) -> Self {
        Row {
            timestamp: timestamp.to_string(),
            tx_type,
            received_amount: None,
            received_currency: String::new(),
            sent_amount: None,
            sent_currency: String::new(),
            fee: None,
            fee_currency: String::new(),
            txid: txid.to_string(),
            url: String::new(),
            comment: String::new(),
        }
    }

    pub fn received(mut self, amount: f64, currency: &str) -> Self {
        self.received_amount = Some(amount);
        self.received_currency = currency.to_string();
        self
    }

    pub fn sent(mut self, amount: f64, currency: &str) -> Self {
        self.sent_amount = Some(amount);
        self.sent_currency = currency.to_string();
        self
    }

    pub fn with_fee(mut self, fee: Option<&(f64, String)>) -> Self {
        if let Some((amount, currency)) = fee {
            self.fee = Some(*amount);
            self.fee_currency = currency.clone();
        }
        self
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn date(&self) -> Option<chrono::NaiveDate> {
        chrono::NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|dt| dt.date())
    }
}

/// A decoded message of a transaction with the events it emitted.
#[derive(Debug, Clone)]
pub struct MsgInfo {
    pub index: usize,
    pub msg_type: String,
    pub message: Value,
    pub events: Vec<Event>,
}

/// Per-transaction context built before classification.
#[derive(Debug, Clone)]
pub struct TxInfo {
    pub txid: String,
    pub timestamp: String,
    pub fee: Option<(f64, String)>,
    pub fee_payer: Option<String>,
    pub url: String,
    pub failed: bool,
    pub msgs: Vec<MsgInfo>,
}

/// Renders an amount the way the tax tools expect: shortest round-trip
/// decimal in plain notation, always with a fractional part (`3.0`,
/// `0.021757`, `0.00001`).
pub fn format_amount(amount: Option<f64>) -> String {
    amount
        .map(|a| {
            let text = a.to_string();
            if a.is_finite() && !text.contains('.') {
                format!("{}.0", text)
            } else {
                text
            }
        })
        .unwrap_or_default()
}
