use super::transfer::TransferResult;
use super::*;
use crate::coin_select::{select_with_fee, FeeTarget};
use crate::keys::SigningKey;
use crate::vsize::{check_estimate, FeeEstimator};

/// Moves the inscription held by `inscription` to `destination`, e.g. a
/// marketplace vault when listing. The inscription is input 0 and output 0
/// and keeps its value; fees come from the other funding utxos.
pub fn build_inscription_send(
    cfg: &ChainConfig,
    key: &SigningKey,
    funding: &Funding,
    inscription: &Utxo,
    destination: &str,
    fee_rate: f64,
) -> Result<TransferResult> {
    require_owned(key, funding)?;
    if inscription.spent {
        return Err(Error::InvalidInput(format!(
            "inscription output {} is spent",
            inscription.out_point
        )));
    }
    if inscription.script_pubkey != funding.address.script_pubkey() {
        return Err(Error::InvalidInput(format!(
            "{} is not held by {}",
            inscription.out_point, funding.address
        )));
    }
    let (destination, info) = address::classify_for(destination, cfg.network)?;

    let fee_utxos: Vec<Utxo> = funding
        .utxos
        .iter()
        .filter(|u| u.out_point != inscription.out_point && !u.spent)
        .cloned()
        .collect();
    if fee_utxos.is_empty() {
        return Err(Error::NoUtxos(funding.address.to_string()));
    }

    let target = FeeTarget {
        fee_rate,
        input_kind: funding.kind,
        fixed_inputs: vec![funding.kind],
        outputs: vec![info.script_kind],
        change_kind: funding.kind,
        inscription: None,
        dust_threshold: cfg.dust_threshold,
    };
    let funded = select_with_fee(&fee_utxos, 0, &FeeEstimator::new(cfg), &target)?;

    let mut inputs = vec![inscription.out_point];
    inputs.extend(funded.selection.selected_utxos.iter().map(|u| u.out_point));
    let mut outputs = vec![TxOut {
        value: inscription.value,
        script_pubkey: destination.script_pubkey(),
    }];
    if let Some(change) = funded.selection.change_output(cfg.dust_threshold) {
        outputs.push(TxOut {
            value: Amount::from_sat(change),
            script_pubkey: funding.address.script_pubkey(),
        });
    }

    let mut psbt = new_psbt(unsigned_tx(&inputs, outputs))?;
    let spent = std::iter::once(inscription).chain(funded.selection.selected_utxos.iter());
    for (input, utxo) in psbt.inputs.iter_mut().zip(spent) {
        describe_funding_input(input, utxo, funding)?;
    }
    let (tx, signed) = sign_all(psbt, key)?;
    check_estimate("inscription send", funded.vbytes, &tx);
    info!(
        "inscription {} sent to {} in {}",
        inscription.out_point, destination, signed.txid
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
            total_amount: funded.fee,
        },
        change_amount: funded.selection.change_amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_key, utxo};
    use bitcoin::consensus::encode::deserialize;

    #[test]
    fn inscription_stays_first() {
        let key = test_key(5);
        let from = key.p2tr_address(Network::Bitcoin);
        let vault = test_key(20).p2tr_address(Network::Bitcoin);
        let inscription = utxo(5, 0, 546, from.script_pubkey());
        let funding = Funding::new(
            from.clone(),
            vec![inscription.clone(), utxo(6, 1, 10_000, from.script_pubkey())],
        )
        .unwrap();

        let res = build_inscription_send(
            &ChainConfig::default(),
            &key,
            &funding,
            &inscription,
            &vault.to_string(),
            2.0,
        )
        .unwrap();
        let tx: Transaction = deserialize(&hex::decode(&res.tx.hex).unwrap()).unwrap();

        assert_eq!(tx.input[0].previous_output, inscription.out_point);
        assert_eq!(tx.output[0].value.to_sat(), 546);
        assert_eq!(tx.output[0].script_pubkey, vault.script_pubkey());
        // 10 + 2 * 58 + 43 + 43
        assert_eq!(res.fees.network_fee, 424);
        assert_eq!(tx.output[1].value.to_sat(), 10_000 - 424);
    }

    #[test]
    fn inscription_never_pays_fees() {
        let key = test_key(5);
        let from = key.p2tr_address(Network::Bitcoin);
        let inscription = utxo(5, 0, 100_000, from.script_pubkey());
        let funding = Funding::new(from.clone(), vec![inscription.clone()]).unwrap();
        let err = build_inscription_send(
            &ChainConfig::default(),
            &key,
            &funding,
            &inscription,
            &from.to_string(),
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoUtxos(_)));
    }

    #[test]
    fn foreign_inscription_is_rejected() {
        let key = test_key(5);
        let from = key.p2tr_address(Network::Bitcoin);
        let elsewhere = test_key(6).p2tr_address(Network::Bitcoin);
        let inscription = utxo(5, 0, 546, elsewhere.script_pubkey());
        let funding =
            Funding::new(from.clone(), vec![utxo(6, 1, 10_000, from.script_pubkey())]).unwrap();
        assert!(matches!(
            build_inscription_send(
                &ChainConfig::default(),
                &key,
                &funding,
                &inscription,
                &from.to_string(),
                1.0
            ),
            Err(Error::InvalidInput(_))
        ));
    }
}
