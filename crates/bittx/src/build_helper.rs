//! Request-level entry points: fetch what a build needs from the indexer,
//! then hand it to the synchronous builders.

use super::*;
use crate::brc20::Brc20Op;
use crate::builder::commit_reveal::{build_inscription, InscriptionRequest};
use crate::builder::escrow::{build_buy_psbt, BuyPsbt, Listing};
use crate::builder::inscription_send::build_inscription_send;
use crate::builder::transfer::{build_transfer_tx, TransferResult};
use crate::builder::{Funding, Payment};
use crate::keys::SigningKey;
use indexer::UtxoSource;
use std::collections::BTreeSet;

/// Spendable utxos of `address`, plus the previous transactions its inputs
/// need when it is a legacy address.
///
/// Spent utxos and those with fewer than `cfg.min_confirmations` are
/// dropped. A failed fetch is an error, never an empty list.
pub async fn load_funding<S: UtxoSource + ?Sized>(
    source: &S,
    cfg: &ChainConfig,
    address: &Address,
) -> Result<Funding> {
    let utxos: Vec<Utxo> = source
        .fetch_utxos(address)
        .await?
        .into_iter()
        .filter(|u| !u.spent && u.confirmations >= cfg.min_confirmations)
        .collect();
    if utxos.is_empty() {
        return Err(Error::NoUtxos(address.to_string()));
    }
    debug!("{} spendable utxos for {}", utxos.len(), address);

    let mut funding = Funding::new(address.clone(), utxos)?;
    if funding.kind == ScriptKind::P2pkh {
        let txids: BTreeSet<Txid> = funding.utxos.iter().map(|u| u.txid()).collect();
        let mut prev_txs = Vec::with_capacity(txids.len());
        for txid in txids {
            let tx = source
                .fetch_raw_transaction(&txid)
                .await?
                .ok_or_else(|| Error::Network(format!("previous transaction {txid} not found")))?;
            prev_txs.push(tx);
        }
        funding = funding.with_prev_txs(prev_txs);
    }
    Ok(funding)
}

pub async fn transfer<S: UtxoSource + ?Sized>(
    source: &S,
    cfg: &ChainConfig,
    key: &SigningKey,
    info: &TransferInfo,
) -> Result<TransferResult> {
    let sender = address::parse_address(&info.sender, cfg.network)?;
    let funding = load_funding(source, cfg, &sender).await?;
    build_transfer_tx(
        cfg,
        key,
        &funding,
        &info.recipient,
        info.amount,
        info.fee_rate,
        info.change_address.as_deref(),
    )
}

pub async fn inscribe<S: UtxoSource + ?Sized>(
    source: &S,
    cfg: &ChainConfig,
    key: &SigningKey,
    funding: &FundingSource,
    request: &InscriptionRequest,
) -> Result<CommitRevealTransaction> {
    let address = address::resolve_funding(funding, cfg.network)?;
    let funding = load_funding(source, cfg, &address).await?;
    build_inscription(cfg, key, &funding, request)
}

/// Inscribes a BRC-20 operation to `recipient`.
#[allow(clippy::too_many_arguments)]
pub async fn inscribe_brc20<S: UtxoSource + ?Sized>(
    source: &S,
    cfg: &ChainConfig,
    key: &SigningKey,
    funding: &FundingSource,
    op: &Brc20Op,
    recipient: &str,
    fee_rate: f64,
    service_fee: Option<Payment>,
) -> Result<CommitRevealTransaction> {
    let request = InscriptionRequest {
        envelope: op.envelope()?,
        recipient: recipient.to_string(),
        fee_rate,
        price: None,
        service_fee,
    };
    inscribe(source, cfg, key, funding, &request).await
}

pub async fn send_inscription<S: UtxoSource + ?Sized>(
    source: &S,
    cfg: &ChainConfig,
    key: &SigningKey,
    sender: &str,
    inscription: &OutPoint,
    destination: &str,
    fee_rate: f64,
) -> Result<TransferResult> {
    let sender = address::parse_address(sender, cfg.network)?;
    let funding = load_funding(source, cfg, &sender).await?;
    let utxo = funding
        .utxos
        .iter()
        .find(|u| u.out_point == *inscription)
        .cloned()
        .ok_or_else(|| Error::InvalidInput(format!("{inscription} is not held by {sender}")))?;
    build_inscription_send(cfg, key, &funding, &utxo, destination, fee_rate)
}

/// Unsigned purchase PSBT for `buyer`, who later signs their own inputs.
pub async fn buy<S: UtxoSource + ?Sized>(
    source: &S,
    cfg: &ChainConfig,
    listing: &Listing,
    buyer: &str,
    service_fee: Option<&Payment>,
    fee_rate: f64,
) -> Result<BuyPsbt> {
    let buyer = address::parse_address(buyer, cfg.network)?;
    let funding = load_funding(source, cfg, &buyer).await?;
    build_buy_psbt(cfg, listing, &funding, None, service_fee, fee_rate)
}
