//! Greedy largest-first coin selection.
//!
//! Deterministic and auditable rather than input-count optimal: utxos are
//! taken in descending value order until the target is covered.

use super::*;
use crate::vsize::{FeeEstimator, InscriptionSize};
use indexer::utxo::sort_by_value_desc;

fn spendable(utxos: &[Utxo]) -> Vec<Utxo> {
    let mut candidates: Vec<Utxo> = utxos.iter().filter(|u| !u.spent).cloned().collect();
    sort_by_value_desc(&mut candidates);
    candidates
}

fn total_value(utxos: &[Utxo]) -> u64 {
    utxos.iter().map(|u| u.value.to_sat()).sum()
}

/// Picks utxos until their sum covers `required`. Spent utxos are skipped.
pub fn select(utxos: &[Utxo], required: u64) -> Result<SelectionResult> {
    let candidates = spendable(utxos);
    let available = total_value(&candidates);
    if available < required {
        return Err(Error::InsufficientBalance {
            required,
            available,
        });
    }

    let mut selected = Vec::new();
    let mut total_input = 0u64;
    for utxo in candidates {
        if total_input >= required {
            break;
        }
        total_input += utxo.value.to_sat();
        selected.push(utxo);
    }

    Ok(SelectionResult {
        selected_utxos: selected,
        total_input,
        change_amount: total_input - required,
    })
}

/// Everything besides the funding inputs that a transaction pays fee for.
#[derive(Clone, Debug)]
pub struct FeeTarget {
    pub fee_rate: f64,
    /// Kind of every funding input.
    pub input_kind: ScriptKind,
    /// Inputs that are always present, e.g. an inscription being moved.
    pub fixed_inputs: Vec<ScriptKind>,
    /// Outputs other than change.
    pub outputs: Vec<ScriptKind>,
    pub change_kind: ScriptKind,
    pub inscription: Option<InscriptionSize>,
    pub dust_threshold: u64,
}

impl FeeTarget {
    fn vbytes(&self, estimator: &FeeEstimator, funding_inputs: usize, with_change: bool) -> u64 {
        let mut inputs = self.fixed_inputs.clone();
        inputs.extend(std::iter::repeat(self.input_kind).take(funding_inputs));
        let mut outputs = self.outputs.clone();
        if with_change {
            outputs.push(self.change_kind);
        }
        estimator.estimate_size(&inputs, &outputs, self.inscription)
    }
}

/// Result of a fee-aware selection.
///
/// `selection.change_amount` is the change actually emitted, zero when the
/// leftover was too small to pay for its own output and stay above dust.
/// `fee` is what the transaction really pays, absorbed leftover included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundedSelection {
    pub selection: SelectionResult,
    pub fee: u64,
    pub vbytes: u64,
}

impl FundedSelection {
    pub fn has_change(&self) -> bool {
        self.selection.change_amount > 0
    }
}

/// Greedy selection where the requirement grows with every input taken:
/// stops as soon as `total >= target + fee(inputs so far)`, then decides
/// whether a change output can pay for itself and still exceed dust.
pub fn select_with_fee(
    utxos: &[Utxo],
    target: u64,
    estimator: &FeeEstimator,
    shape: &FeeTarget,
) -> Result<FundedSelection> {
    let candidates = spendable(utxos);
    let mut selected = Vec::new();
    let mut total_input = 0u64;
    let mut required = target;

    for utxo in candidates {
        total_input += utxo.value.to_sat();
        selected.push(utxo);

        let vbytes = shape.vbytes(estimator, selected.len(), false);
        let fee = estimator.estimate_fee(vbytes, shape.fee_rate)?;
        required = target + fee;
        if total_input < required {
            continue;
        }

        let vbytes_with_change = shape.vbytes(estimator, selected.len(), true);
        let fee_with_change = estimator.estimate_fee(vbytes_with_change, shape.fee_rate)?;
        let change = total_input.saturating_sub(target + fee_with_change);
        if change > shape.dust_threshold {
            return Ok(FundedSelection {
                selection: SelectionResult {
                    selected_utxos: selected,
                    total_input,
                    change_amount: change,
                },
                fee: fee_with_change,
                vbytes: vbytes_with_change,
            });
        }

        debug!(
            "dropping change of {} sat, absorbed into fee",
            total_input - required
        );
        return Ok(FundedSelection {
            selection: SelectionResult {
                selected_utxos: selected,
                total_input,
                change_amount: 0,
            },
            fee: total_input - target,
            vbytes,
        });
    }

    Err(Error::InsufficientBalance {
        required,
        available: total_input,
    })
}
