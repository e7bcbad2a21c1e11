//! Deterministic keys, utxos and in-memory collaborators for unit tests.

use super::*;
use crate::keys::SigningKey;
use crate::status::{RawTxInfo, RpcClient, RpcFailure};
use async_trait::async_trait;
use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{Sequence, TxIn, Witness};
use indexer::UtxoSource;
use std::collections::HashMap;
use std::sync::Mutex;

pub fn test_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 32], Network::Bitcoin).unwrap()
}

pub fn txid(seed: u8) -> Txid {
    Txid::from_byte_array([seed; 32])
}

pub fn utxo(seed: u8, vout: u32, value: u64, script_pubkey: ScriptBuf) -> Utxo {
    Utxo {
        out_point: OutPoint::new(txid(seed), vout),
        value: Amount::from_sat(value),
        script_pubkey,
        confirmations: 1,
        spent: false,
    }
}

pub fn unsigned_psbt(utxos: &[Utxo], outputs: Vec<TxOut>) -> Psbt {
    let tx = Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: utxos
            .iter()
            .map(|u| TxIn {
                previous_output: u.out_point,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            })
            .collect(),
        output: outputs,
    };
    let mut psbt = Psbt::from_unsigned_tx(tx).unwrap();
    for (input, u) in psbt.inputs.iter_mut().zip(utxos) {
        input.witness_utxo = Some(u.prevout());
    }
    psbt
}

/// Coinbase-like transaction paying `outputs`, usable as a legacy
/// input's previous transaction.
pub fn funding_tx(outputs: Vec<TxOut>) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn::default()],
        output: outputs,
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub utxos: HashMap<String, Vec<Utxo>>,
    pub txs: HashMap<Txid, Transaction>,
    pub fail: bool,
}

impl FakeSource {
    pub fn with(address: &Address, utxos: Vec<Utxo>) -> Self {
        let mut source = Self::default();
        source.utxos.insert(address.to_string(), utxos);
        source
    }
}

#[async_trait]
impl UtxoSource for FakeSource {
    async fn fetch_utxos(&self, address: &Address) -> Result<Vec<Utxo>> {
        if self.fail {
            return Err(Error::Network("indexer unreachable".to_string()));
        }
        Ok(self.utxos.get(&address.to_string()).cloned().unwrap_or_default())
    }

    async fn fetch_raw_transaction(&self, txid: &Txid) -> Result<Option<Transaction>> {
        Ok(self.txs.get(txid).cloned())
    }
}

pub struct FakeRpc {
    pub answer: std::result::Result<RawTxInfo, RpcFailure>,
    pub sent: Mutex<Vec<Txid>>,
}

impl FakeRpc {
    pub fn answering(answer: std::result::Result<RawTxInfo, RpcFailure>) -> Self {
        Self {
            answer,
            sent: Mutex::new(Vec::new()),
        }
    }
}

impl RpcClient for FakeRpc {
    fn get_raw_transaction_info(
        &self,
        _txid: &Txid,
    ) -> std::result::Result<RawTxInfo, RpcFailure> {
        self.answer.clone()
    }

    fn send_raw_transaction(&self, tx: &Transaction) -> std::result::Result<Txid, RpcFailure> {
        let txid = tx.compute_txid();
        self.sent.lock().unwrap().push(txid);
        Ok(txid)
    }
}
