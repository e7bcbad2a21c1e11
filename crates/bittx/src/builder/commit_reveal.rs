//! Two-phase inscription: a commit paying into the script-path address of
//! an inscription leaf, and a reveal spending it through that leaf.
//!
//! The reveal only needs the commit's txid, which is fixed once the commit
//! is signed, so both are built together. Broadcasting them in order is
//! the caller's job.

use super::*;
use crate::coin_select::{select_with_fee, FeeTarget, FundedSelection};
use crate::inscription::{self, InscriptionScript};
use crate::keys::SigningKey;
use crate::vsize::{check_estimate, FeeEstimator, InscriptionSize};
use bitcoin::taproot::LeafVersion;

#[derive(Clone, Debug)]
pub struct InscriptionRequest {
    pub envelope: InscriptionEnvelope,
    /// Receives the inscription.
    pub recipient: String,
    pub fee_rate: f64,
    /// Paid to a third party by the commit, e.g. a creator's mint price.
    pub price: Option<Payment>,
    pub service_fee: Option<Payment>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Unfunded,
    CommitBuilt,
    CommitSigned,
    CommitFinalized,
    RevealBuilt,
    RevealSigned,
    RevealFinalized,
}

/// Everything about the reveal that is known before any utxo is chosen.
#[derive(Clone, Debug)]
struct RevealCosts {
    recipient: Address,
    size: InscriptionSize,
    reveal_vbytes: u64,
    reveal_fee: u64,
    /// `reveal_fee + dust`: what the commit must lock in the reveal output.
    reveal_amount: u64,
    price: Option<Payment>,
    service_fee: Option<Payment>,
}

impl RevealCosts {
    fn new(cfg: &ChainConfig, request: &InscriptionRequest) -> Result<Self> {
        let (recipient, info) = address::classify_for(&request.recipient, cfg.network)?;
        let size = InscriptionSize::of(&request.envelope);
        let estimator = FeeEstimator::new(cfg);
        let reveal_vbytes = estimator.reveal_size(size, &[info.script_kind]);
        let reveal_fee = estimator.estimate_fee(reveal_vbytes, request.fee_rate)?;

        Ok(Self {
            recipient,
            size,
            reveal_vbytes,
            reveal_fee,
            reveal_amount: reveal_fee + cfg.dust_threshold,
            price: third_party(cfg, "price", &request.price)?,
            service_fee: third_party(cfg, "service fee", &request.service_fee)?,
        })
    }

    fn price(&self) -> u64 {
        self.price.as_ref().map_or(0, |p| p.amount)
    }

    fn service_fee(&self) -> u64 {
        self.service_fee.as_ref().map_or(0, |p| p.amount)
    }

    /// Commit outputs other than change, reveal output first.
    fn commit_outputs(&self) -> Result<Vec<ScriptKind>> {
        let mut kinds = vec![ScriptKind::P2tr];
        for payment in self.price.iter().chain(self.service_fee.iter()) {
            kinds.push(payment.kind()?);
        }
        Ok(kinds)
    }

    /// Sum the commit must pay out, before its own fee.
    fn commit_target(&self) -> u64 {
        self.reveal_amount + self.price() + self.service_fee()
    }

    fn fee_target(&self, cfg: &ChainConfig, fee_rate: f64, funding_kind: ScriptKind) -> Result<FeeTarget> {
        Ok(FeeTarget {
            fee_rate,
            input_kind: funding_kind,
            fixed_inputs: vec![],
            outputs: self.commit_outputs()?,
            change_kind: funding_kind,
            inscription: None,
            dust_threshold: cfg.dust_threshold,
        })
    }

    fn breakdown(&self, cfg: &ChainConfig, fee_rate: f64, commit_fee: u64) -> FeeBreakdown {
        FeeBreakdown {
            fee_rate,
            price: self.price(),
            network_fee: commit_fee + self.reveal_fee,
            service_fee: self.service_fee(),
            commit_fee,
            reveal_fee: self.reveal_fee,
            total_amount: commit_fee
                + self.reveal_fee
                + self.price()
                + self.service_fee()
                + cfg.dust_threshold,
        }
    }
}

/// Zero-value payments are dropped; anything else must clear dust.
fn third_party(cfg: &ChainConfig, what: &str, payment: &Option<Payment>) -> Result<Option<Payment>> {
    match payment {
        Some(p) if p.amount == 0 => Ok(None),
        Some(p) if p.amount < cfg.dust_threshold => Err(Error::InvalidInput(format!(
            "{what} of {} sat is below the dust threshold",
            p.amount
        ))),
        Some(p) => Ok(Some(p.clone())),
        None => Ok(None),
    }
}

/// Fee quote for an inscription funded by `funding_inputs` inputs of
/// `funding_kind`, assuming the commit carries change.
pub fn quote_inscription(
    cfg: &ChainConfig,
    request: &InscriptionRequest,
    funding_kind: ScriptKind,
    funding_inputs: usize,
) -> Result<FeeBreakdown> {
    let costs = RevealCosts::new(cfg, request)?;
    let estimator = FeeEstimator::new(cfg);
    let mut outputs = costs.commit_outputs()?;
    outputs.push(funding_kind);
    let commit_vbytes = estimator.estimate_uniform(funding_inputs.max(1), funding_kind, &outputs, None);
    let commit_fee = estimator.estimate_fee(commit_vbytes, request.fee_rate)?;
    Ok(costs.breakdown(cfg, request.fee_rate, commit_fee))
}

/// Walks one inscription through every stage, in order.
pub struct CommitRevealBuilder<'a> {
    cfg: &'a ChainConfig,
    key: &'a SigningKey,
    fee_rate: f64,
    costs: RevealCosts,
    script: InscriptionScript,
    stage: Stage,
    funded: Option<FundedSelection>,
    psbt: Option<Psbt>,
    commit: Option<SignedTx>,
    reveal_vout: Option<u32>,
}

impl<'a> CommitRevealBuilder<'a> {
    /// Computes the reveal script and costs. Nothing is funded yet.
    pub fn new(cfg: &'a ChainConfig, key: &'a SigningKey, request: &InscriptionRequest) -> Result<Self> {
        let costs = RevealCosts::new(cfg, request)?;
        let script = inscription::encode(key.secp(), &request.envelope, key.x_only())?;
        debug!(
            "reveal address {} needs {} sat ({} vB)",
            script.address(cfg.network),
            costs.reveal_amount,
            costs.reveal_vbytes
        );
        Ok(Self {
            cfg,
            key,
            fee_rate: request.fee_rate,
            costs,
            script,
            stage: Stage::Unfunded,
            funded: None,
            psbt: None,
            commit: None,
            reveal_vout: None,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn reveal_address(&self) -> Address {
        self.script.address(self.cfg.network)
    }

    pub fn reveal_amount(&self) -> u64 {
        self.costs.reveal_amount
    }

    fn expect_stage(&self, from: Stage, to: Stage) -> Result<()> {
        if self.stage != from {
            return Err(Error::Psbt(format!(
                "cannot move to {:?} from {:?}",
                to, self.stage
            )));
        }
        Ok(())
    }

    /// Only called once the step's work succeeded, so a failed step can be
    /// retried from the same stage.
    fn advance(&mut self, from: Stage, to: Stage) -> Result<()> {
        self.expect_stage(from, to)?;
        debug!("inscription {:?} -> {:?}", from, to);
        self.stage = to;
        Ok(())
    }

    /// Working copy of the transaction in progress; `self.psbt` is only
    /// replaced when a step succeeds.
    fn current_psbt(&self) -> Result<Psbt> {
        self.psbt
            .clone()
            .ok_or_else(|| Error::Psbt("no transaction in progress".to_string()))
    }

    /// Selects funding and lays out the commit: reveal output first, then
    /// any price and service fee outputs, then change above dust.
    pub fn build_commit(&mut self, funding: &Funding) -> Result<()> {
        if self.stage != Stage::Unfunded {
            return Err(Error::Psbt(format!("commit already built ({:?})", self.stage)));
        }
        require_owned(self.key, funding)?;
        if funding.utxos.is_empty() {
            return Err(Error::NoUtxos(funding.address.to_string()));
        }

        let estimator = FeeEstimator::new(self.cfg);
        let target = self.costs.fee_target(self.cfg, self.fee_rate, funding.kind)?;
        let funded = select_with_fee(&funding.utxos, self.costs.commit_target(), &estimator, &target)?;

        let reveal_spk = self.script.script_pubkey();
        let mut outputs = vec![TxOut {
            value: Amount::from_sat(self.costs.reveal_amount),
            script_pubkey: reveal_spk.clone(),
        }];
        for payment in self.costs.price.iter().chain(self.costs.service_fee.iter()) {
            outputs.push(payment.tx_out());
        }
        if let Some(change) = funded.selection.change_output(self.cfg.dust_threshold) {
            outputs.push(TxOut {
                value: Amount::from_sat(change),
                script_pubkey: funding.address.script_pubkey(),
            });
        }

        let inputs: Vec<OutPoint> = funded
            .selection
            .selected_utxos
            .iter()
            .map(|u| u.out_point)
            .collect();
        let tx = unsigned_tx(&inputs, outputs);
        let reveal_vout = tx
            .output
            .iter()
            .position(|o| o.script_pubkey == reveal_spk)
            .ok_or(Error::MissingRevealAddress)?;

        let mut psbt = new_psbt(tx)?;
        for (input, utxo) in psbt.inputs.iter_mut().zip(&funded.selection.selected_utxos) {
            describe_funding_input(input, utxo, funding)?;
        }

        self.reveal_vout = Some(reveal_vout as u32);
        self.funded = Some(funded);
        self.psbt = Some(psbt);
        self.advance(Stage::Unfunded, Stage::CommitBuilt)
    }

    /// Key-path signatures with the tweaked funding key on every input.
    pub fn sign_commit(&mut self) -> Result<()> {
        self.expect_stage(Stage::CommitBuilt, Stage::CommitSigned)?;
        let mut psbt = self.current_psbt()?;
        let signed = signer::sign_psbt(&mut psbt, self.key)?;
        if signed.len() != psbt.inputs.len() {
            return Err(Error::Signing(format!(
                "commit: signed {} of {} inputs",
                signed.len(),
                psbt.inputs.len()
            )));
        }
        self.psbt = Some(psbt);
        self.advance(Stage::CommitBuilt, Stage::CommitSigned)
    }

    pub fn finalize_commit(&mut self) -> Result<SignedTx> {
        self.expect_stage(Stage::CommitSigned, Stage::CommitFinalized)?;
        let (tx, signed) = finalize::finalize_and_extract(self.current_psbt()?)?;
        if let Some(funded) = &self.funded {
            check_estimate("commit", funded.vbytes, &tx);
        }
        info!("commit {} built", signed.txid);
        self.psbt = None;
        self.commit = Some(signed.clone());
        self.advance(Stage::CommitSigned, Stage::CommitFinalized)?;
        Ok(signed)
    }

    /// One script-path input spending the commit's reveal output, one
    /// dust output to the recipient.
    pub fn build_reveal(&mut self) -> Result<()> {
        self.expect_stage(Stage::CommitFinalized, Stage::RevealBuilt)?;
        let commit_txid = self
            .commit
            .as_ref()
            .map(|c| c.txid)
            .ok_or_else(|| Error::Psbt("commit missing".to_string()))?;
        let reveal_vout = self.reveal_vout.ok_or(Error::MissingRevealAddress)?;

        let output = TxOut {
            value: Amount::from_sat(self.cfg.dust_threshold),
            script_pubkey: self.costs.recipient.script_pubkey(),
        };
        let mut psbt = new_psbt(unsigned_tx(&[OutPoint::new(commit_txid, reveal_vout)], vec![output]))?;
        let input = &mut psbt.inputs[0];
        input.witness_utxo = Some(TxOut {
            value: Amount::from_sat(self.costs.reveal_amount),
            script_pubkey: self.script.script_pubkey(),
        });
        input.tap_internal_key = Some(self.script.internal_key);
        input.tap_merkle_root = self.script.spend_info.merkle_root();
        input.tap_scripts.insert(
            self.script.control_block.clone(),
            (self.script.leaf_script.clone(), LeafVersion::TapScript),
        );
        self.psbt = Some(psbt);
        self.advance(Stage::CommitFinalized, Stage::RevealBuilt)
    }

    /// Script-path signature with the untweaked key.
    pub fn sign_reveal(&mut self) -> Result<()> {
        self.expect_stage(Stage::RevealBuilt, Stage::RevealSigned)?;
        let mut psbt = self.current_psbt()?;
        if signer::sign_psbt(&mut psbt, self.key)? != vec![0] {
            return Err(Error::Signing("reveal input not signed".to_string()));
        }
        self.psbt = Some(psbt);
        self.advance(Stage::RevealBuilt, Stage::RevealSigned)
    }

    pub fn finalize_reveal(&mut self) -> Result<SignedTx> {
        self.expect_stage(Stage::RevealSigned, Stage::RevealFinalized)?;
        let (tx, signed) = finalize::finalize_and_extract(self.current_psbt()?)?;
        check_estimate("reveal", self.costs.reveal_vbytes, &tx);
        info!("reveal {} built", signed.txid);
        self.psbt = None;
        self.advance(Stage::RevealSigned, Stage::RevealFinalized)?;
        Ok(signed)
    }

    /// Runs every stage. Nothing is returned unless both transactions
    /// were built and signed.
    pub fn run(mut self, funding: &Funding) -> Result<CommitRevealTransaction> {
        self.build_commit(funding)?;
        self.sign_commit()?;
        let commit = self.finalize_commit()?;
        self.build_reveal()?;
        self.sign_reveal()?;
        let reveal = self.finalize_reveal()?;

        let commit_fee = self.funded.as_ref().map_or(0, |f| f.fee);
        Ok(CommitRevealTransaction {
            commit,
            reveal,
            reveal_address: self.reveal_address().to_string(),
            reveal_vout: self.reveal_vout.unwrap_or_default(),
            fees: self.costs.breakdown(self.cfg, self.fee_rate, commit_fee),
        })
    }
}

pub fn build_inscription(
    cfg: &ChainConfig,
    key: &SigningKey,
    funding: &Funding,
    request: &InscriptionRequest,
) -> Result<CommitRevealTransaction> {
    CommitRevealBuilder::new(cfg, key, request)?.run(funding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inscription::decode_leaf_script;
    use crate::test_utils::{test_key, utxo};
    use crate::witness::reveal_envelopes;
    use bitcoin::consensus::encode::deserialize;
    use bitcoin::hashes::Hash;
    use bitcoin::secp256k1::Message;
    use bitcoin::sighash::{Prevouts, SighashCache};
    use bitcoin::taproot::{ControlBlock, Signature};
    use bitcoin::{TapLeafHash, TapSighashType};

    fn decode(hex_str: &str) -> Transaction {
        deserialize(&hex::decode(hex_str).unwrap()).unwrap()
    }

    fn setup(value: u64) -> (ChainConfig, SigningKey, Funding) {
        let key = test_key(11);
        let addr = key.p2tr_address(Network::Bitcoin);
        let funding = Funding::new(addr.clone(), vec![utxo(1, 0, value, addr.script_pubkey())]).unwrap();
        (ChainConfig::default(), key, funding)
    }

    fn request(body_len: usize, price: Option<Payment>) -> InscriptionRequest {
        InscriptionRequest {
            envelope: InscriptionEnvelope::new("text/plain", vec![b'a'; body_len]),
            recipient: test_key(12).p2tr_address(Network::Bitcoin).to_string(),
            fee_rate: 10.0,
            price,
            service_fee: None,
        }
    }

    #[test]
    fn inscription_with_price_scenario() {
        let (cfg, key, funding) = setup(200_000);
        let seller = Payment {
            address: test_key(13).p2wpkh_address(Network::Bitcoin).unwrap(),
            amount: 1_000,
        };
        let req = request(1000, Some(seller.clone()));
        let res = build_inscription(&cfg, &key, &funding, &req).unwrap();

        // 10 + 41 + 43 + ceil((2 + 1164) / 4) vB at 10 sat/vB
        assert_eq!(res.fees.reveal_fee, 3_860);
        let reveal_amount = res.fees.total_amount - res.fees.price - res.fees.commit_fee;
        assert_eq!(reveal_amount, res.fees.reveal_fee + 546);
        assert_eq!(
            res.fees.total_amount,
            res.fees.commit_fee + res.fees.reveal_fee + 1_000 + 546
        );

        let commit = decode(&res.commit.hex);
        let reveal = decode(&res.reveal.hex);
        assert_eq!(res.reveal_vout, 0);
        assert_eq!(commit.output[0].value.to_sat(), reveal_amount);
        assert_eq!(
            commit.output[0].script_pubkey,
            Address::from_str(&res.reveal_address).unwrap().assume_checked().script_pubkey()
        );
        assert_eq!(commit.output[1], seller.tx_out());

        assert_eq!(reveal.input.len(), 1);
        assert_eq!(reveal.input[0].previous_output, OutPoint::new(res.commit.txid, 0));
        assert_eq!(reveal.output.len(), 1);
        assert_eq!(reveal.output[0].value.to_sat(), 546);

        // change is whatever the commit did not spend
        let change = commit.output[2].value.to_sat();
        assert!(change > 546);
        assert_eq!(200_000, res.fees.total_amount + change);
    }

    #[test]
    fn reveal_output_is_dust_regardless_of_body() {
        for len in [1, 520, 3000] {
            let (cfg, key, funding) = setup(500_000);
            let res = build_inscription(&cfg, &key, &funding, &request(len, None)).unwrap();
            let reveal = decode(&res.reveal.hex);
            assert_eq!(reveal.output[0].value.to_sat(), 546);
        }
    }

    #[test]
    fn reveal_pays_at_least_the_requested_rate() {
        for rate in [1.0, 10.0] {
            for len in [1, 520, 3000] {
                let (cfg, key, funding) = setup(500_000);
                let mut req = request(len, None);
                req.fee_rate = rate;
                let res = build_inscription(&cfg, &key, &funding, &req).unwrap();
                let reveal = decode(&res.reveal.hex);
                let vsize = reveal.vsize() as u64;
                assert!(
                    res.fees.reveal_fee as f64 >= vsize as f64 * rate,
                    "body {len}: fee {} for {vsize} vB at {rate}",
                    res.fees.reveal_fee
                );
                // fee is exactly what the reveal input locks beyond its dust output
                let commit = decode(&res.commit.hex);
                assert_eq!(
                    commit.output[0].value.to_sat() - reveal.output[0].value.to_sat(),
                    res.fees.reveal_fee
                );
            }
        }
    }

    #[test]
    fn reveal_witness_carries_the_inscription() {
        let (cfg, key, funding) = setup(100_000);
        let req = request(1200, None);
        let res = build_inscription(&cfg, &key, &funding, &req).unwrap();
        let commit = decode(&res.commit.hex);
        let reveal = decode(&res.reveal.hex);

        let witness = &reveal.input[0].witness;
        assert_eq!(witness.len(), 3);
        let leaf = ScriptBuf::from_bytes(witness.nth(1).unwrap().to_vec());
        assert_eq!(decode_leaf_script(&leaf).unwrap(), vec![req.envelope.clone()]);
        assert_eq!(reveal_envelopes(&reveal).unwrap(), vec![req.envelope]);

        let control_block = ControlBlock::decode(witness.nth(2).unwrap()).unwrap();
        let output_key = bitcoin::key::XOnlyPublicKey::from_slice(&commit.output[0].script_pubkey.as_bytes()[2..]).unwrap();
        assert!(control_block.verify_taproot_commitment(key.secp(), output_key, &leaf));

        // script-path signature by the untweaked key
        let sig = Signature::from_slice(witness.nth(0).unwrap()).unwrap();
        let prevouts = [commit.output[0].clone()];
        let sighash = SighashCache::new(&reveal)
            .taproot_script_spend_signature_hash(
                0,
                &Prevouts::All(&prevouts),
                TapLeafHash::from_script(&leaf, LeafVersion::TapScript),
                TapSighashType::Default,
            )
            .unwrap();
        let msg = Message::from_digest(sighash.to_byte_array());
        key.secp()
            .verify_schnorr(&sig.signature, &msg, &key.x_only())
            .unwrap();
    }

    #[test]
    fn service_fee_gets_its_own_output() {
        let (cfg, key, funding) = setup(100_000);
        let fee_to = test_key(14).p2tr_address(Network::Bitcoin);
        let mut req = request(100, None);
        req.service_fee = Some(Payment {
            address: fee_to.clone(),
            amount: 2_000,
        });
        let res = build_inscription(&cfg, &key, &funding, &req).unwrap();
        let commit = decode(&res.commit.hex);
        assert_eq!(commit.output[1].script_pubkey, fee_to.script_pubkey());
        assert_eq!(commit.output[1].value.to_sat(), 2_000);
        assert_eq!(res.fees.service_fee, 2_000);
        let reveal_amount =
            res.fees.total_amount - res.fees.price - res.fees.service_fee - res.fees.commit_fee;
        assert_eq!(commit.output[0].value.to_sat(), reveal_amount);
    }

    #[test]
    fn insufficient_funds_abort_before_building() {
        let (cfg, key, funding) = setup(3_000);
        let mut builder = CommitRevealBuilder::new(&cfg, &key, &request(1000, None)).unwrap();
        let err = builder.build_commit(&funding).unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance { .. }));
        assert_eq!(builder.stage(), Stage::Unfunded);
    }

    #[test]
    fn stages_run_in_order() {
        let (cfg, key, funding) = setup(100_000);
        let mut builder = CommitRevealBuilder::new(&cfg, &key, &request(10, None)).unwrap();
        assert!(builder.sign_commit().is_err());
        assert!(builder.build_reveal().is_err());

        builder.build_commit(&funding).unwrap();
        assert_eq!(builder.stage(), Stage::CommitBuilt);
        assert!(builder.finalize_commit().is_err());
        builder.sign_commit().unwrap();
        let commit = builder.finalize_commit().unwrap();
        builder.build_reveal().unwrap();
        builder.sign_reveal().unwrap();
        let reveal = builder.finalize_reveal().unwrap();
        assert_eq!(builder.stage(), Stage::RevealFinalized);
        assert_eq!(decode(&reveal.hex).input[0].previous_output.txid, commit.txid);
    }

    #[test]
    fn failed_signature_keeps_the_stage() {
        let (cfg, key, funding) = setup(100_000);
        let stranger = test_key(30);
        let mut builder = CommitRevealBuilder::new(&cfg, &key, &request(10, None)).unwrap();
        builder.build_commit(&funding).unwrap();

        builder.key = &stranger;
        assert!(matches!(builder.sign_commit(), Err(Error::Signing(_))));
        assert_eq!(builder.stage(), Stage::CommitBuilt);

        builder.key = &key;
        builder.sign_commit().unwrap();
        builder.finalize_commit().unwrap();
        builder.build_reveal().unwrap();

        builder.key = &stranger;
        assert!(matches!(builder.sign_reveal(), Err(Error::Signing(_))));
        assert_eq!(builder.stage(), Stage::RevealBuilt);

        builder.key = &key;
        builder.sign_reveal().unwrap();
        builder.finalize_reveal().unwrap();
        assert_eq!(builder.stage(), Stage::RevealFinalized);
    }

    #[test]
    fn no_change_below_dust() {
        let (cfg, key, _) = setup(0);
        let req = request(100, None);
        let quote = quote_inscription(&cfg, &req, ScriptKind::P2tr, 1).unwrap();
        // exactly enough for a commit without change plus 400 sat
        let no_change_commit_fee = (10 + 58 + 43) * 10;
        let value = quote.total_amount - quote.commit_fee + no_change_commit_fee + 400;
        let addr = key.p2tr_address(Network::Bitcoin);
        let funding = Funding::new(addr.clone(), vec![utxo(2, 0, value, addr.script_pubkey())]).unwrap();

        let res = build_inscription(&cfg, &key, &funding, &req).unwrap();
        let commit = decode(&res.commit.hex);
        assert_eq!(commit.output.len(), 1);
        assert_eq!(res.fees.commit_fee, no_change_commit_fee + 400);
    }

    #[test]
    fn quote_matches_formula() {
        let cfg = ChainConfig::default();
        let req = request(1000, None);
        let quote = quote_inscription(&cfg, &req, ScriptKind::P2tr, 2).unwrap();
        assert_eq!(quote.reveal_fee, 3_860);
        // 10 + 2 * 58 + 43 + 43
        assert_eq!(quote.commit_fee, 2_120);
        assert_eq!(quote.total_amount, 2_120 + 3_860 + 546);
        assert_eq!(quote.network_fee, 2_120 + 3_860);
    }

    #[test]
    fn tiny_price_is_rejected() {
        let (cfg, key, _) = setup(0);
        let seller = Payment {
            address: test_key(13).p2tr_address(Network::Bitcoin),
            amount: 100,
        };
        let err = CommitRevealBuilder::new(&cfg, &key, &request(10, Some(seller))).err();
        assert!(matches!(err, Some(Error::InvalidInput(_))));
    }
}
