use super::*;
use datatypes::chain::MAX_SCRIPT_ELEMENT_SIZE;

/// Leaf-script bytes of an inscription other than the mime type and body:
/// internal key push (33), OP_CHECKSIG, OP_FALSE, OP_IF, "ord" push (4),
/// version push (2), mime length push, body length push (2), OP_ENDIF and
/// 10 bytes of tapscript spend overhead.
const INSCRIPTION_FIXED_BYTES: u64 = 33 + 1 + 1 + 1 + 4 + 2 + 1 + 2 + 1 + 10;

/// Leaf-script bytes around the mime type and body pushes: internal key
/// push, OP_CHECKSIG, OP_FALSE OP_IF, "ord" push, version push, the body
/// separator and OP_ENDIF.
const LEAF_SCRIPT_FIXED_BYTES: u64 = 33 + 1 + 1 + 1 + 4 + 2 + 1 + 1;
/// Witness item count, 64-byte schnorr signature push and the push of a
/// depth-0 control block.
const SCRIPT_PATH_WITNESS_BYTES: u64 = 1 + (1 + 64) + (1 + 33);
/// Outpoint, empty script_sig and sequence.
const TXIN_BASE_BYTES: u64 = 36 + 1 + 4;
/// Segwit marker and flag, in weight units.
const SEGWIT_MARKER_WEIGHT: u64 = 2;

/// Length of the opcode that pushes `len` bytes.
fn push_prefix_len(len: usize) -> u64 {
    match len {
        0..=75 => 1,
        76..=0xff => 2,
        0x100..=0xffff => 3,
        _ => 5,
    }
}

fn compact_size_len(n: u64) -> u64 {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Sizes that drive the witness cost of a reveal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InscriptionSize {
    pub content_type_len: usize,
    pub body_len: usize,
}

impl InscriptionSize {
    pub fn of(envelope: &InscriptionEnvelope) -> Self {
        Self {
            content_type_len: envelope.content_type.len(),
            body_len: envelope.body.len(),
        }
    }

    pub fn chunk_count(&self) -> u64 {
        self.body_len.div_ceil(MAX_SCRIPT_ELEMENT_SIZE) as u64
    }

    /// Raw witness bytes, before the segwit discount.
    pub fn witness_bytes(&self) -> u64 {
        INSCRIPTION_FIXED_BYTES
            + self.content_type_len as u64
            + self.chunk_count()
            + self.body_len as u64
    }

    /// Exact length of the leaf script `inscription::build_leaf_script`
    /// produces for these sizes.
    pub fn leaf_script_len(&self) -> u64 {
        let full = (self.body_len / MAX_SCRIPT_ELEMENT_SIZE) as u64;
        let rest = self.body_len % MAX_SCRIPT_ELEMENT_SIZE;
        let mut len = LEAF_SCRIPT_FIXED_BYTES
            + push_prefix_len(self.content_type_len)
            + self.content_type_len as u64
            + full * (push_prefix_len(MAX_SCRIPT_ELEMENT_SIZE) + MAX_SCRIPT_ELEMENT_SIZE as u64);
        if rest > 0 {
            len += push_prefix_len(rest) + rest as u64;
        }
        len
    }

    /// Witness of the script-path input revealing the inscription:
    /// signature, leaf script and control block.
    pub fn reveal_witness_bytes(&self) -> u64 {
        let script = self.leaf_script_len();
        SCRIPT_PATH_WITNESS_BYTES + compact_size_len(script) + script
    }
}

/// Pre-signing size and fee estimates from canonical per-kind costs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeEstimator {
    base_tx_vbytes: u64,
    witness_scale_factor: u64,
}

impl FeeEstimator {
    pub fn new(cfg: &ChainConfig) -> Self {
        Self {
            base_tx_vbytes: cfg.base_tx_vbytes,
            witness_scale_factor: cfg.witness_scale_factor.max(1),
        }
    }

    pub fn inscription_vbytes(&self, size: InscriptionSize) -> u64 {
        size.witness_bytes().div_ceil(self.witness_scale_factor)
    }

    pub fn estimate_size(
        &self,
        inputs: &[ScriptKind],
        outputs: &[ScriptKind],
        inscription: Option<InscriptionSize>,
    ) -> u64 {
        self.base_tx_vbytes
            + inputs.iter().map(|k| k.input_vbytes()).sum::<u64>()
            + outputs.iter().map(|k| k.output_vbytes()).sum::<u64>()
            + inscription.map_or(0, |s| self.inscription_vbytes(s))
    }

    /// `estimate_size` for `input_count` inputs of the same kind.
    pub fn estimate_uniform(
        &self,
        input_count: usize,
        input_kind: ScriptKind,
        outputs: &[ScriptKind],
        inscription: Option<InscriptionSize>,
    ) -> u64 {
        self.base_tx_vbytes
            + input_count as u64 * input_kind.input_vbytes()
            + outputs.iter().map(|k| k.output_vbytes()).sum::<u64>()
            + inscription.map_or(0, |s| self.inscription_vbytes(s))
    }

    /// Size of a reveal: one script-path input carrying the inscription and
    /// `outputs`. Never below `estimate_size` for the same shape, since the
    /// key-path input cost leaves out the control block and script pushes.
    pub fn reveal_size(&self, size: InscriptionSize, outputs: &[ScriptKind]) -> u64 {
        let witness = SEGWIT_MARKER_WEIGHT + size.reveal_witness_bytes();
        let measured = self.base_tx_vbytes
            + TXIN_BASE_BYTES
            + outputs.iter().map(|k| k.output_vbytes()).sum::<u64>()
            + witness.div_ceil(self.witness_scale_factor);
        measured.max(self.estimate_size(&[ScriptKind::P2tr], outputs, Some(size)))
    }

    pub fn estimate_fee(&self, vbytes: u64, fee_rate: f64) -> Result<u64> {
        fee_for(vbytes, fee_rate)
    }
}

pub fn validate_fee_rate(fee_rate: f64) -> Result<f64> {
    if fee_rate.is_finite() && fee_rate >= 0.0 {
        Ok(fee_rate)
    } else {
        Err(Error::InvalidFeeRate(fee_rate))
    }
}

/// `ceil(vbytes * fee_rate)`. Fractional satoshis always round up.
pub fn fee_for(vbytes: u64, fee_rate: f64) -> Result<u64> {
    let fee_rate = validate_fee_rate(fee_rate)?;
    let fee = (vbytes as f64 * fee_rate).ceil();
    if fee > u64::MAX as f64 {
        return Err(Error::InvalidFeeRate(fee_rate));
    }
    Ok(fee as u64)
}

/// Measured vsize of a fully signed transaction.
pub fn get_tx_vsize(tx: &Transaction) -> u64 {
    tx.vsize() as u64
}

/// Compares a signed transaction against the size its fee was computed
/// for. Under-estimates are only logged; the fee is never recomputed.
pub fn check_estimate(label: &str, estimated_vbytes: u64, tx: &Transaction) -> bool {
    let actual = get_tx_vsize(tx);
    if actual > estimated_vbytes {
        warn!(
            "{} {} is {} vB, estimated {} vB",
            label,
            tx.compute_txid(),
            actual,
            estimated_vbytes
        );
        false
    } else {
        debug!("{} vsize {} vB (estimated {} vB)", label, actual, estimated_vbytes);
        true
    }
}
