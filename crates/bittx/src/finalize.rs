use super::*;
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::psbt::Input;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::Witness;

fn push_buf(data: Vec<u8>) -> Result<PushBytesBuf> {
    PushBytesBuf::try_from(data).map_err(|e| Error::Psbt(e.to_string()))
}

fn finalize_input(idx: usize, input: &mut Input, spent: &TxOut) -> Result<()> {
    if input.final_script_witness.is_some() || input.final_script_sig.is_some() {
        return Ok(());
    }

    if let Some(sig) = input.tap_key_sig {
        input.final_script_witness = Some(Witness::p2tr_key_spend(&sig));
    } else if let Some((control_block, (script, version))) = input
        .tap_scripts
        .iter()
        .find(|(_, (script, version))| {
            let leaf = bitcoin::TapLeafHash::from_script(script, *version);
            input.tap_script_sigs.keys().any(|(_, l)| *l == leaf)
        })
    {
        let leaf = bitcoin::TapLeafHash::from_script(script, *version);
        let sig = input
            .tap_script_sigs
            .iter()
            .find(|((_, l), _)| *l == leaf)
            .map(|(_, sig)| *sig)
            .ok_or_else(|| Error::Psbt(format!("input {idx} lost its script signature")))?;
        let mut witness = Witness::new();
        witness.push(sig.to_vec());
        witness.push(script.as_bytes());
        witness.push(control_block.serialize());
        input.final_script_witness = Some(witness);
    } else if let Some((pk, sig)) = input.partial_sigs.iter().next().map(|(k, s)| (*k, *s)) {
        if let Some(redeem) = &input.redeem_script {
            input.final_script_sig = Some(
                Builder::new()
                    .push_slice(push_buf(redeem.to_bytes())?)
                    .into_script(),
            );
            input.final_script_witness = Some(Witness::p2wpkh(&sig, &pk.inner));
        } else if spent.script_pubkey.is_p2wpkh() {
            input.final_script_witness = Some(Witness::p2wpkh(&sig, &pk.inner));
        } else if spent.script_pubkey.is_p2pkh() {
            input.final_script_sig = Some(
                Builder::new()
                    .push_slice(push_buf(sig.to_vec())?)
                    .push_key(&pk)
                    .into_script(),
            );
        } else {
            return Err(Error::Psbt(format!(
                "input {idx}: cannot finalize ecdsa signature for {}",
                spent.script_pubkey
            )));
        }
    } else {
        return Err(Error::Psbt(format!("input {idx} is not signed")));
    }

    input.tap_key_sig = None;
    input.tap_script_sigs.clear();
    input.tap_scripts.clear();
    input.tap_internal_key = None;
    input.tap_merkle_root = None;
    input.tap_key_origins.clear();
    input.partial_sigs.clear();
    input.redeem_script = None;
    input.bip32_derivation.clear();
    Ok(())
}

/// Turns every signature in `psbt` into final scriptSigs and witnesses.
/// Fails on the first input that carries no usable signature.
pub fn finalize_psbt(psbt: &mut Psbt) -> Result<()> {
    let spent = signer::spent_outputs(psbt)?;
    for (idx, (input, out)) in psbt.inputs.iter_mut().zip(spent.iter()).enumerate() {
        finalize_input(idx, input, out)?;
    }
    Ok(())
}

/// Extracts the network-ready transaction of a finalized PSBT.
pub fn extract(psbt: Psbt) -> Result<(Transaction, SignedTx)> {
    let tx = psbt
        .extract_tx()
        .map_err(|e| Error::Psbt(e.to_string()))?;
    let unsigned = witness::unsigned_inputs(&tx);
    if !unsigned.is_empty() {
        return Err(Error::Psbt(format!("inputs {unsigned:?} are not finalized")));
    }
    let signed = SignedTx {
        hex: serialize_hex(&tx),
        txid: tx.compute_txid(),
    };
    Ok((tx, signed))
}

/// [`finalize_psbt`] then [`extract`].
pub fn finalize_and_extract(mut psbt: Psbt) -> Result<(Transaction, SignedTx)> {
    finalize_psbt(&mut psbt)?;
    extract(psbt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::sign_psbt;
    use crate::test_utils::{test_key, unsigned_psbt, utxo};

    #[test]
    fn every_single_key_kind_finalizes() {
        let key = test_key(6);
        let kinds = [
            ScriptKind::P2tr,
            ScriptKind::P2wpkh,
            ScriptKind::P2sh,
            ScriptKind::P2pkh,
        ];
        let utxos: Vec<Utxo> = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let spk = key.address(*kind, Network::Bitcoin).unwrap().script_pubkey();
                utxo(i as u8 + 1, 0, 20_000, spk)
            })
            .collect();
        let out = TxOut {
            value: Amount::from_sat(70_000),
            script_pubkey: key.p2tr_address(Network::Bitcoin).script_pubkey(),
        };
        let mut psbt = unsigned_psbt(&utxos, vec![out]);
        assert_eq!(sign_psbt(&mut psbt, &key).unwrap(), vec![0, 1, 2, 3]);

        let (tx, signed) = finalize_and_extract(psbt).unwrap();
        assert_eq!(tx.input[0].witness.len(), 1);
        assert_eq!(tx.input[0].witness.nth(0).unwrap().len(), 64);
        assert_eq!(tx.input[1].witness.len(), 2);
        assert!(tx.input[1].script_sig.is_empty());
        assert_eq!(tx.input[2].witness.len(), 2);
        assert_eq!(tx.input[2].script_sig.len(), 23);
        assert!(tx.input[3].witness.is_empty());
        assert!(!tx.input[3].script_sig.is_empty());
        assert_eq!(signed.txid, tx.compute_txid());
        assert!(signed.hex.starts_with("02000000"));
    }

    #[test]
    fn unsigned_input_fails() {
        let key = test_key(6);
        let other = test_key(7);
        let a = utxo(1, 0, 5_000, key.p2tr_address(Network::Bitcoin).script_pubkey());
        let b = utxo(2, 0, 5_000, other.p2tr_address(Network::Bitcoin).script_pubkey());
        let mut psbt = unsigned_psbt(&[a, b], vec![]);
        sign_psbt(&mut psbt, &key).unwrap();
        let err = finalize_psbt(&mut psbt).unwrap_err();
        assert!(err.to_string().contains("input 1"));
    }
}
