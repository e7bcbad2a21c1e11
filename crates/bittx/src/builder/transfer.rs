use super::*;
use crate::coin_select::{select_with_fee, FeeTarget};
use crate::keys::SigningKey;
use crate::vsize::{check_estimate, FeeEstimator};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransferResult {
    pub tx: SignedTx,
    pub fees: FeeBreakdown,
    pub change_amount: u64,
}

/// Pays `amount` to `recipient` from `funding`, returning leftover change
/// to `change_address` or the funding address.
pub fn build_transfer_tx(
    cfg: &ChainConfig,
    key: &SigningKey,
    funding: &Funding,
    recipient: &str,
    amount: u64,
    fee_rate: f64,
    change_address: Option<&str>,
) -> Result<TransferResult> {
    require_owned(key, funding)?;
    if funding.utxos.is_empty() {
        return Err(Error::NoUtxos(funding.address.to_string()));
    }
    let payment = Payment::parse(recipient, amount, cfg.network)?;
    if amount <= cfg.dust_threshold {
        return Err(Error::InvalidInput(format!(
            "amount {amount} is not above the dust threshold"
        )));
    }
    let change_to = match change_address {
        Some(addr) => address::parse_address(addr, cfg.network)?,
        None => funding.address.clone(),
    };
    let change_kind = address::script_kind(&change_to.script_pubkey())
        .ok_or_else(|| Error::UnsupportedAddressFormat(change_to.to_string()))?;

    let estimator = FeeEstimator::new(cfg);
    let target = FeeTarget {
        fee_rate,
        input_kind: funding.kind,
        fixed_inputs: vec![],
        outputs: vec![payment.kind()?],
        change_kind,
        inscription: None,
        dust_threshold: cfg.dust_threshold,
    };
    let funded = select_with_fee(&funding.utxos, amount, &estimator, &target)?;

    let inputs: Vec<OutPoint> = funded
        .selection
        .selected_utxos
        .iter()
        .map(|u| u.out_point)
        .collect();
    let mut outputs = vec![payment.tx_out()];
    if let Some(change) = funded.selection.change_output(cfg.dust_threshold) {
        outputs.push(TxOut {
            value: Amount::from_sat(change),
            script_pubkey: change_to.script_pubkey(),
        });
    }

    let mut psbt = new_psbt(unsigned_tx(&inputs, outputs))?;
    for (input, utxo) in psbt.inputs.iter_mut().zip(&funded.selection.selected_utxos) {
        describe_funding_input(input, utxo, funding)?;
    }
    let (tx, signed) = sign_all(psbt, key)?;
    check_estimate("transfer", funded.vbytes, &tx);
    info!(
        "transfer {} pays {} sat to {} with fee {}",
        signed.txid, amount, payment.address, funded.fee
    );

    Ok(TransferResult {
        tx: signed,
        fees: FeeBreakdown {
            fee_rate,
            price: 0,
            network_fee: funded.fee,
            service_fee: 0,
            commit_fee: 0,
            reveal_fee: 0,
            total_amount: amount + funded.fee,
        },
        change_amount: funded.selection.change_amount,
    })
}
