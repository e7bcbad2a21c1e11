use bitcoin::{Amount, OutPoint, ScriptBuf, TxOut, Txid};
use serde::{Deserialize, Serialize};

/// A spendable output as reported by the indexer, already normalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Utxo {
    pub out_point: OutPoint,
    pub value: Amount,
    pub script_pubkey: ScriptBuf,
    pub confirmations: u32,
    pub spent: bool,
}

impl Utxo {
    pub fn txid(&self) -> Txid {
        self.out_point.txid
    }

    pub fn vout(&self) -> u32 {
        self.out_point.vout
    }

    /// The output being spent, as needed for sighash computation.
    pub fn prevout(&self) -> TxOut {
        TxOut {
            value: self.value,
            script_pubkey: self.script_pubkey.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScriptKind {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
}

impl ScriptKind {
    /// Canonical vbytes an input of this kind adds when spent by a single key.
    pub const fn input_vbytes(self) -> u64 {
        match self {
            ScriptKind::P2pkh => 148,
            ScriptKind::P2sh => 91,
            ScriptKind::P2wpkh => 68,
            ScriptKind::P2wsh => 104,
            ScriptKind::P2tr => 58,
        }
    }

    pub const fn output_vbytes(self) -> u64 {
        match self {
            ScriptKind::P2pkh => 34,
            ScriptKind::P2sh => 32,
            ScriptKind::P2wpkh => 31,
            ScriptKind::P2wsh => 43,
            ScriptKind::P2tr => 43,
        }
    }

    pub const fn is_segwit(self) -> bool {
        !matches!(self, ScriptKind::P2pkh)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AddressInfo {
    pub script_kind: ScriptKind,
    pub input_vbytes: u64,
    pub output_vbytes: u64,
}

impl From<ScriptKind> for AddressInfo {
    fn from(kind: ScriptKind) -> Self {
        Self {
            script_kind: kind,
            input_vbytes: kind.input_vbytes(),
            output_vbytes: kind.output_vbytes(),
        }
    }
}

/// Content to inscribe: a MIME type and the raw body bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InscriptionEnvelope {
    pub content_type: String,
    pub body: Vec<u8>,
}

impl InscriptionEnvelope {
    pub fn new(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

/// Fee quote for an inscription or a plain transfer. All amounts in satoshi.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub fee_rate: f64,
    pub price: u64,
    pub network_fee: u64,
    pub service_fee: u64,
    pub commit_fee: u64,
    pub reveal_fee: u64,
    pub total_amount: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionResult {
    pub selected_utxos: Vec<Utxo>,
    pub total_input: u64,
    pub change_amount: u64,
}

impl SelectionResult {
    /// The change value worth emitting, if any. Change at or below the
    /// dust threshold is left to the fee.
    pub fn change_output(&self, dust_threshold: u64) -> Option<u64> {
        (self.change_amount > dust_threshold).then_some(self.change_amount)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignedTx {
    pub hex: String,
    pub txid: Txid,
}

/// Commit and reveal of one inscription. The reveal spends output
/// `reveal_vout` of the commit, which only needs to be signed, not mined.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommitRevealTransaction {
    pub commit: SignedTx,
    pub reveal: SignedTx,
    pub reveal_address: String,
    pub reveal_vout: u32,
    pub fees: FeeBreakdown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxStatus {
    pub broadcasted: bool,
    pub in_mempool: bool,
    pub confirmations: u32,
}

impl TxStatus {
    pub const NOT_FOUND: TxStatus = TxStatus {
        broadcasted: false,
        in_mempool: false,
        confirmations: 0,
    };
}

/// Where the funds of a request come from. Resolved to a single address at
/// the boundary of a request.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    Address(String),
    ExtendedKey { xpub: String, index: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransferInfo {
    pub sender: String,
    pub recipient: String,
    pub amount: u64,
    pub fee_rate: f64,
    pub change_address: Option<String>,
}
