use super::*;
use bitcoin::absolute::LockTime;
use bitcoin::transaction::Version;
use bitcoin::{Sequence, TxIn, Witness};
use std::collections::BTreeMap;

pub mod commit_reveal;
pub mod escrow;
pub mod inscription_send;
pub mod transfer;

/// Outputs a request may pay from one address, plus the previous
/// transactions legacy inputs need.
#[derive(Clone, Debug)]
pub struct Funding {
    pub address: Address,
    pub kind: ScriptKind,
    pub utxos: Vec<Utxo>,
    pub prev_txs: BTreeMap<Txid, Transaction>,
    /// Key behind a P2TR or P2SH-P2WPKH address, needed to describe the
    /// input to another signer.
    pub public_key: Option<bitcoin::PublicKey>,
}

impl Funding {
    pub fn new(address: Address, utxos: Vec<Utxo>) -> Result<Self> {
        let kind = address::script_kind(&address.script_pubkey())
            .ok_or_else(|| Error::UnsupportedAddressFormat(address.to_string()))?;
        Ok(Self {
            address,
            kind,
            utxos,
            prev_txs: BTreeMap::new(),
            public_key: None,
        })
    }

    pub fn with_prev_txs(mut self, txs: impl IntoIterator<Item = Transaction>) -> Self {
        for tx in txs {
            self.prev_txs.insert(tx.compute_txid(), tx);
        }
        self
    }

    pub fn with_public_key(mut self, public_key: bitcoin::PublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }
}

/// A payment to a third party.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub address: Address,
    pub amount: u64,
}

impl Payment {
    pub fn parse(address: &str, amount: u64, network: Network) -> Result<Self> {
        Ok(Self {
            address: address::parse_address(address, network)?,
            amount,
        })
    }

    pub fn kind(&self) -> Result<ScriptKind> {
        address::script_kind(&self.address.script_pubkey())
            .ok_or_else(|| Error::UnsupportedAddressFormat(self.address.to_string()))
    }

    pub fn tx_out(&self) -> TxOut {
        TxOut {
            value: Amount::from_sat(self.amount),
            script_pubkey: self.address.script_pubkey(),
        }
    }
}

pub(crate) fn unsigned_tx(inputs: &[OutPoint], outputs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: inputs
            .iter()
            .map(|out_point| TxIn {
                previous_output: *out_point,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            })
            .collect(),
        output: outputs,
    }
}

pub(crate) fn new_psbt(tx: Transaction) -> Result<Psbt> {
    Psbt::from_unsigned_tx(tx).map_err(|e| Error::Psbt(e.to_string()))
}

/// Fills in what any signer needs to know about a funding input.
pub(crate) fn describe_funding_input(
    input: &mut bitcoin::psbt::Input,
    utxo: &Utxo,
    funding: &Funding,
) -> Result<()> {
    match funding.kind {
        ScriptKind::P2pkh => {
            let prev = funding.prev_txs.get(&utxo.txid()).ok_or_else(|| {
                Error::Psbt(format!(
                    "previous transaction {} required for legacy input",
                    utxo.txid()
                ))
            })?;
            input.non_witness_utxo = Some(prev.clone());
        }
        ScriptKind::P2tr => {
            input.witness_utxo = Some(utxo.prevout());
            if let Some(pk) = funding.public_key {
                let x_only = bitcoin::key::XOnlyPublicKey::from(pk.inner);
                input.tap_internal_key = Some(x_only);
            }
        }
        ScriptKind::P2sh => {
            input.witness_utxo = Some(utxo.prevout());
            if let Some(pk) = funding.public_key {
                let compressed = bitcoin::CompressedPublicKey::try_from(pk)
                    .map_err(|e| Error::InvalidInput(e.to_string()))?;
                input.redeem_script = Some(ScriptBuf::new_p2wpkh(&compressed.wpubkey_hash()));
            }
        }
        ScriptKind::P2wpkh | ScriptKind::P2wsh => {
            input.witness_utxo = Some(utxo.prevout());
        }
    }
    Ok(())
}

/// Signs, finalizes and extracts, requiring `key` to cover every input.
pub(crate) fn sign_all(mut psbt: Psbt, key: &keys::SigningKey) -> Result<(Transaction, SignedTx)> {
    let signed = signer::sign_psbt(&mut psbt, key)?;
    if signed.len() != psbt.inputs.len() {
        return Err(Error::Signing(format!(
            "key signed {} of {} inputs",
            signed.len(),
            psbt.inputs.len()
        )));
    }
    finalize::finalize_and_extract(psbt)
}

/// Key must control `funding.address`, otherwise nothing can be signed.
pub(crate) fn require_owned(key: &keys::SigningKey, funding: &Funding) -> Result<()> {
    match key.owns(&funding.address.script_pubkey()) {
        Some(_) => Ok(()),
        None => Err(Error::InvalidPrivateKey(format!(
            "key does not control {}",
            funding.address
        ))),
    }
}
