use super::*;
use crate::inscription::decode_leaf_script;
use bitcoin::taproot::TAPROOT_ANNEX_PREFIX;
use bitcoin::{Script, Witness};
use datatypes::chain::TAPSCRIPT_LEAF_VERSION;

/// Leaf script of a taproot script-path spend, if `witness` is one.
///
/// The stack ends with `<script> <control block>`, optionally followed by
/// an annex. A control block is `33 + 32n` bytes long and its first byte
/// carries the leaf version.
pub fn tapscript(witness: &Witness) -> Option<&Script> {
    let mut items: Vec<&[u8]> = witness.iter().collect();
    if items.len() >= 2 && items.last().map_or(false, |a| a.first() == Some(&TAPROOT_ANNEX_PREFIX)) {
        items.pop();
    }
    if items.len() < 2 {
        return None;
    }
    let control_block = items[items.len() - 1];
    let script = items[items.len() - 2];
    let well_formed = control_block.len() >= 33 && (control_block.len() - 33) % 32 == 0;
    if !well_formed || control_block[0] & 0xfe != TAPSCRIPT_LEAF_VERSION {
        return None;
    }
    Some(Script::from_bytes(script))
}

/// Every inscription revealed by `tx`, in input order.
pub fn reveal_envelopes(tx: &Transaction) -> Result<Vec<InscriptionEnvelope>> {
    let mut envelopes = Vec::new();
    for (idx, input) in tx.input.iter().enumerate() {
        if let Some(script) = tapscript(&input.witness) {
            let found = decode_leaf_script(script)?;
            debug!("input {} reveals {} inscription(s)", idx, found.len());
            envelopes.extend(found);
        }
    }
    Ok(envelopes)
}

/// Inputs carrying neither a scriptSig nor a witness.
pub fn unsigned_inputs(tx: &Transaction) -> Vec<usize> {
    tx.input
        .iter()
        .enumerate()
        .filter(|(_, input)| input.witness.is_empty() && input.script_sig.is_empty())
        .map(|(idx, _)| idx)
        .collect()
}
