use super::*;
use crate::keys::SigningKey;
use bitcoin::hashes::Hash;
use bitcoin::psbt::Input;
use secp256k1::Message;
use bitcoin::sighash::{EcdsaSighashType, Prevouts, SighashCache};
use bitcoin::taproot::{LeafVersion, Signature};
use bitcoin::{ecdsa, TapLeafHash, TapSighashType};

/// Output spent by `input`, from its witness utxo or its full previous
/// transaction.
pub fn spent_output(input: &Input, outpoint: &OutPoint) -> Option<TxOut> {
    if let Some(out) = &input.witness_utxo {
        return Some(out.clone());
    }
    input
        .non_witness_utxo
        .as_ref()
        .and_then(|tx| tx.output.get(outpoint.vout as usize).cloned())
}

/// Every spent output, in input order. Taproot sighashes commit to all of
/// them, so one missing output makes the whole transaction unsignable.
pub fn spent_outputs(psbt: &Psbt) -> Result<Vec<TxOut>> {
    psbt.unsigned_tx
        .input
        .iter()
        .zip(psbt.inputs.iter())
        .enumerate()
        .map(|(idx, (txin, input))| {
            spent_output(input, &txin.previous_output)
                .ok_or_else(|| Error::Psbt(format!("input {idx} has no previous output")))
        })
        .collect()
}

/// Signs every input of `psbt` that `key` controls and returns their
/// indices. Inputs owned by anyone else are left untouched.
pub fn sign_psbt(psbt: &mut Psbt, key: &SigningKey) -> Result<Vec<usize>> {
    let all: Vec<usize> = (0..psbt.inputs.len()).collect();
    sign_psbt_inputs(psbt, key, &all)
}

/// Like [`sign_psbt`] but restricted to `indices`.
pub fn sign_psbt_inputs(psbt: &mut Psbt, key: &SigningKey, indices: &[usize]) -> Result<Vec<usize>> {
    if psbt.inputs.len() != psbt.unsigned_tx.input.len() {
        return Err(Error::Psbt("input count mismatch".to_string()));
    }
    let prevouts = spent_outputs(psbt)?;
    let tx = psbt.unsigned_tx.clone();
    let mut cache = SighashCache::new(&tx);
    let mut signed = Vec::new();

    for &idx in indices {
        let prevout = prevouts
            .get(idx)
            .ok_or_else(|| Error::Psbt(format!("no input {idx}")))?;
        let input = &mut psbt.inputs[idx];

        if !input.tap_scripts.is_empty() {
            if sign_taproot_script_spend(key, &mut cache, &prevouts, input, idx)? {
                signed.push(idx);
            }
            continue;
        }

        let did_sign = match key.owns(&prevout.script_pubkey) {
            Some(ScriptKind::P2tr) => {
                sign_taproot_key_spend(key, &mut cache, &prevouts, input, idx)?;
                true
            }
            Some(ScriptKind::P2wpkh) => {
                sign_segwit_v0(key, &mut cache, input, idx, prevout, None)?;
                true
            }
            Some(ScriptKind::P2sh) => {
                let compressed = key
                    .compressed_public_key()
                    .ok_or_else(|| Error::Signing("p2sh-p2wpkh needs a compressed key".into()))?;
                let redeem = ScriptBuf::new_p2wpkh(&compressed.wpubkey_hash());
                sign_segwit_v0(key, &mut cache, input, idx, prevout, Some(redeem))?;
                true
            }
            Some(ScriptKind::P2pkh) => {
                sign_legacy(key, &mut cache, input, idx, prevout)?;
                true
            }
            Some(ScriptKind::P2wsh) | None => false,
        };
        if did_sign {
            signed.push(idx);
        }
    }

    debug!("signed inputs {:?} of {}", signed, tx.compute_txid());
    Ok(signed)
}

fn message<H: Hash<Bytes = [u8; 32]>>(sighash: H) -> Message {
    Message::from_digest(sighash.to_byte_array())
}

fn sign_taproot_key_spend(
    key: &SigningKey,
    cache: &mut SighashCache<&Transaction>,
    prevouts: &[TxOut],
    input: &mut Input,
    idx: usize,
) -> Result<()> {
    let sighash = cache
        .taproot_key_spend_signature_hash(idx, &Prevouts::All(prevouts), TapSighashType::Default)
        .map_err(|e| Error::Signing(e.to_string()))?;
    let tweaked = key.tweaked_keypair();
    let signature = key
        .secp()
        .sign_schnorr_no_aux_rand(&message(sighash), &tweaked);

    input.tap_internal_key = Some(key.x_only());
    input.tap_key_sig = Some(Signature {
        signature,
        sighash_type: TapSighashType::Default,
    });
    Ok(())
}

/// Signs each tapscript leaf of `input` that commits to this key's x-only
/// public key. Script paths use the untweaked key.
fn sign_taproot_script_spend(
    key: &SigningKey,
    cache: &mut SighashCache<&Transaction>,
    prevouts: &[TxOut],
    input: &mut Input,
    idx: usize,
) -> Result<bool> {
    let x_only = key.x_only();
    let needle = x_only.serialize();
    let leaves: Vec<(ScriptBuf, LeafVersion)> = input
        .tap_scripts
        .values()
        .filter(|(script, _)| script.as_bytes().windows(32).any(|w| w == needle))
        .cloned()
        .collect();

    for (script, version) in &leaves {
        let leaf_hash = TapLeafHash::from_script(script, *version);
        let sighash = cache
            .taproot_script_spend_signature_hash(
                idx,
                &Prevouts::All(prevouts),
                leaf_hash,
                TapSighashType::Default,
            )
            .map_err(|e| Error::Signing(e.to_string()))?;
        let signature = key
            .secp()
            .sign_schnorr_no_aux_rand(&message(sighash), key.keypair());
        input.tap_script_sigs.insert(
            (x_only, leaf_hash),
            Signature {
                signature,
                sighash_type: TapSighashType::Default,
            },
        );
    }
    Ok(!leaves.is_empty())
}

fn sign_segwit_v0(
    key: &SigningKey,
    cache: &mut SighashCache<&Transaction>,
    input: &mut Input,
    idx: usize,
    prevout: &TxOut,
    redeem_script: Option<ScriptBuf>,
) -> Result<()> {
    let program = redeem_script
        .clone()
        .unwrap_or_else(|| prevout.script_pubkey.clone());
    let sighash = cache
        .p2wpkh_signature_hash(idx, &program, prevout.value, EcdsaSighashType::All)
        .map_err(|e| Error::Signing(e.to_string()))?;
    let signature = key
        .secp()
        .sign_ecdsa(&message(sighash), &key.private_key().inner);

    input.partial_sigs.insert(
        key.public_key(),
        ecdsa::Signature {
            signature,
            sighash_type: EcdsaSighashType::All,
        },
    );
    if redeem_script.is_some() {
        input.redeem_script = redeem_script;
    }
    Ok(())
}

fn sign_legacy(
    key: &SigningKey,
    cache: &mut SighashCache<&Transaction>,
    input: &mut Input,
    idx: usize,
    prevout: &TxOut,
) -> Result<()> {
    let sighash = cache
        .legacy_signature_hash(idx, &prevout.script_pubkey, EcdsaSighashType::All.to_u32())
        .map_err(|e| Error::Signing(e.to_string()))?;
    let signature = key
        .secp()
        .sign_ecdsa(&message(sighash), &key.private_key().inner);
    input.partial_sigs.insert(
        key.public_key(),
        ecdsa::Signature {
            signature,
            sighash_type: EcdsaSighashType::All,
        },
    );
    Ok(())
}
