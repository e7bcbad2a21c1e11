//! Marketplace purchases of an inscription parked in a vault.
//!
//! The buyer receives an unsigned PSBT, signs their own inputs, and hands
//! it back. The vault co-signs its single input only after checking that
//! the seller is paid at least the listed price.

use super::*;
use crate::coin_select::{select_with_fee, FeeTarget};
use crate::keys::SigningKey;
use crate::vsize::FeeEstimator;

/// What was agreed when the inscription was listed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    /// Inscription output held by the vault key.
    pub inscription: Utxo,
    pub seller: Address,
    pub price: u64,
}

#[derive(Clone, Debug)]
pub struct BuyPsbt {
    pub psbt: Psbt,
    pub fees: FeeBreakdown,
    pub change_amount: u64,
}

impl BuyPsbt {
    pub fn to_base64(&self) -> String {
        self.psbt.to_string()
    }
}

/// Vault input first, then buyer inputs. Outputs: the inscription to the
/// buyer, the price to the seller, the service fee, then buyer change.
pub fn build_buy_psbt(
    cfg: &ChainConfig,
    listing: &Listing,
    buyer: &Funding,
    receive_address: Option<&Address>,
    service_fee: Option<&Payment>,
    fee_rate: f64,
) -> Result<BuyPsbt> {
    if listing.inscription.spent {
        return Err(Error::ListingMismatch(format!(
            "inscription {} already spent",
            listing.inscription.out_point
        )));
    }
    if listing.price < cfg.dust_threshold {
        return Err(Error::InvalidInput(format!(
            "price {} is below the dust threshold",
            listing.price
        )));
    }
    let buyer_utxos: Vec<Utxo> = buyer
        .utxos
        .iter()
        .filter(|u| u.out_point != listing.inscription.out_point)
        .cloned()
        .collect();
    if buyer_utxos.is_empty() {
        return Err(Error::NoUtxos(buyer.address.to_string()));
    }

    let receive = receive_address.unwrap_or(&buyer.address);
    let receive_kind = address::script_kind(&receive.script_pubkey())
        .ok_or_else(|| Error::UnsupportedAddressFormat(receive.to_string()))?;
    let seller = Payment {
        address: listing.seller.clone(),
        amount: listing.price,
    };
    let service_fee = service_fee.filter(|p| p.amount > 0);

    let mut outputs = vec![receive_kind, seller.kind()?];
    if let Some(p) = service_fee {
        outputs.push(p.kind()?);
    }
    let target = FeeTarget {
        fee_rate,
        input_kind: buyer.kind,
        fixed_inputs: vec![ScriptKind::P2tr],
        outputs,
        change_kind: buyer.kind,
        inscription: None,
        dust_threshold: cfg.dust_threshold,
    };
    let service_amount = service_fee.map_or(0, |p| p.amount);
    let estimator = FeeEstimator::new(cfg);
    let funded = select_with_fee(&buyer_utxos, listing.price + service_amount, &estimator, &target)?;

    let mut inputs = vec![listing.inscription.out_point];
    inputs.extend(funded.selection.selected_utxos.iter().map(|u| u.out_point));

    let mut tx_outs = vec![
        TxOut {
            value: listing.inscription.value,
            script_pubkey: receive.script_pubkey(),
        },
        seller.tx_out(),
    ];
    if let Some(p) = service_fee {
        tx_outs.push(p.tx_out());
    }
    if let Some(change) = funded.selection.change_output(cfg.dust_threshold) {
        tx_outs.push(TxOut {
            value: Amount::from_sat(change),
            script_pubkey: buyer.address.script_pubkey(),
        });
    }

    let mut psbt = new_psbt(unsigned_tx(&inputs, tx_outs))?;
    psbt.inputs[0].witness_utxo = Some(listing.inscription.prevout());
    for (input, utxo) in psbt.inputs[1..]
        .iter_mut()
        .zip(&funded.selection.selected_utxos)
    {
        describe_funding_input(input, utxo, buyer)?;
    }

    info!(
        "buy psbt for {}: price {} service fee {} network fee {}",
        listing.inscription.out_point, listing.price, service_amount, funded.fee
    );
    Ok(BuyPsbt {
        psbt,
        fees: FeeBreakdown {
            fee_rate,
            price: listing.price,
            network_fee: funded.fee,
            service_fee: service_amount,
            commit_fee: 0,
            reveal_fee: 0,
            total_amount: listing.price + service_amount + funded.fee,
        },
        change_amount: funded.selection.change_amount,
    })
}

/// Largest output paying the seller, which must cover the listed price.
pub fn verify_seller_payout(psbt: &Psbt, listing: &Listing) -> Result<u64> {
    let seller_spk = listing.seller.script_pubkey();
    let paid = psbt
        .unsigned_tx
        .output
        .iter()
        .filter(|o| o.script_pubkey == seller_spk)
        .map(|o| o.value.to_sat())
        .max();

    match paid {
        Some(value) if value >= listing.price => Ok(value),
        actual => {
            warn!(
                "seller {} underpaid: expected {}, got {:?}",
                listing.seller, listing.price, actual
            );
            Err(Error::InvalidPayout {
                expected: listing.price,
                actual,
            })
        }
    }
}

/// Signs the vault's input, and nothing else, once the PSBT is known to
/// spend the listed inscription and pay the seller in full.
pub fn cosign_vault_input(psbt: &mut Psbt, listing: &Listing, vault: &SigningKey) -> Result<()> {
    let first = psbt
        .unsigned_tx
        .input
        .first()
        .ok_or_else(|| Error::ListingMismatch("psbt has no inputs".to_string()))?;
    if first.previous_output != listing.inscription.out_point {
        return Err(Error::ListingMismatch(format!(
            "input 0 spends {}, listing is {}",
            first.previous_output, listing.inscription.out_point
        )));
    }
    if vault.owns(&listing.inscription.script_pubkey) != Some(ScriptKind::P2tr) {
        return Err(Error::ListingMismatch(
            "inscription is not held by the vault key".to_string(),
        ));
    }
    if let Some(prev) = &psbt.inputs[0].witness_utxo {
        if prev != &listing.inscription.prevout() {
            return Err(Error::ListingMismatch(
                "input 0 describes a different output".to_string(),
            ));
        }
    }

    verify_seller_payout(psbt, listing)?;

    psbt.inputs[0].witness_utxo = Some(listing.inscription.prevout());
    let signed = signer::sign_psbt_inputs(psbt, vault, &[0])?;
    if signed != [0] {
        return Err(Error::Signing("vault input not signed".to_string()));
    }
    info!("co-signed purchase of {}", listing.inscription.out_point);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_key, utxo};
    use std::str::FromStr;

    struct Market {
        cfg: ChainConfig,
        vault: SigningKey,
        buyer: SigningKey,
        listing: Listing,
        funding: Funding,
        fee_to: Payment,
    }

    fn market() -> Market {
        let vault = test_key(20);
        let buyer = test_key(22);
        let vault_addr = vault.p2tr_address(Network::Bitcoin);
        let buyer_addr = buyer.p2wpkh_address(Network::Bitcoin).unwrap();
        Market {
            cfg: ChainConfig::default(),
            listing: Listing {
                inscription: utxo(40, 0, 546, vault_addr.script_pubkey()),
                seller: test_key(21).p2wpkh_address(Network::Bitcoin).unwrap(),
                price: 50_000,
            },
            funding: Funding::new(
                buyer_addr.clone(),
                vec![utxo(41, 1, 100_000, buyer_addr.script_pubkey())],
            )
            .unwrap(),
            fee_to: Payment {
                address: test_key(23).p2tr_address(Network::Bitcoin),
                amount: 1_000,
            },
            vault,
            buyer,
        }
    }

    fn buy(m: &Market) -> BuyPsbt {
        build_buy_psbt(&m.cfg, &m.listing, &m.funding, None, Some(&m.fee_to), 1.0).unwrap()
    }

    #[test]
    fn buy_psbt_layout() {
        let m = market();
        let res = buy(&m);
        let tx = &res.psbt.unsigned_tx;

        assert_eq!(tx.input[0].previous_output, m.listing.inscription.out_point);
        assert_eq!(tx.input.len(), 2);
        assert_eq!(tx.output[0].value.to_sat(), 546);
        assert_eq!(tx.output[0].script_pubkey, m.funding.address.script_pubkey());
        assert_eq!(tx.output[1].value.to_sat(), 50_000);
        assert_eq!(tx.output[2], m.fee_to.tx_out());
        // 10 + 58 + 68 + 31 + 31 + 43 + 31
        assert_eq!(res.fees.network_fee, 272);
        assert_eq!(res.change_amount, 100_000 - 50_000 - 1_000 - 272);
        assert_eq!(tx.output[3].value.to_sat(), res.change_amount);
        assert_eq!(res.fees.total_amount, 50_000 + 1_000 + 272);

        let parsed = Psbt::from_str(&res.to_base64()).unwrap();
        assert_eq!(parsed.unsigned_tx, res.psbt.unsigned_tx);
    }

    #[test]
    fn payout_guard() {
        let m = market();
        let mut psbt = buy(&m).psbt;
        assert_eq!(verify_seller_payout(&psbt, &m.listing).unwrap(), 50_000);

        psbt.unsigned_tx.output[1].value = Amount::from_sat(60_000);
        assert_eq!(verify_seller_payout(&psbt, &m.listing).unwrap(), 60_000);

        psbt.unsigned_tx.output[1].value = Amount::from_sat(49_999);
        assert!(matches!(
            verify_seller_payout(&psbt, &m.listing),
            Err(Error::InvalidPayout {
                expected: 50_000,
                actual: Some(49_999)
            })
        ));

        psbt.unsigned_tx.output.remove(1);
        let err = verify_seller_payout(&psbt, &m.listing).unwrap_err();
        assert!(matches!(err, Error::InvalidPayout { actual: None, .. }));
        assert_eq!(err.kind(), datatypes::ErrorKind::Validation);
    }

    #[test]
    fn underpaying_trade_is_never_signed() {
        let m = market();
        let mut psbt = buy(&m).psbt;
        psbt.unsigned_tx.output[1].value = Amount::from_sat(1_000);
        let err = cosign_vault_input(&mut psbt, &m.listing, &m.vault).unwrap_err();
        assert!(matches!(err, Error::InvalidPayout { .. }));
        assert!(psbt.inputs[0].tap_key_sig.is_none());
    }

    #[test]
    fn listing_must_match() {
        let m = market();
        let mut psbt = buy(&m).psbt;
        let other = Listing {
            inscription: utxo(42, 0, 546, m.listing.inscription.script_pubkey.clone()),
            ..m.listing.clone()
        };
        assert!(matches!(
            cosign_vault_input(&mut psbt, &other, &m.vault),
            Err(Error::ListingMismatch(_))
        ));
        assert!(matches!(
            cosign_vault_input(&mut psbt, &m.listing, &test_key(99)),
            Err(Error::ListingMismatch(_))
        ));
    }

    #[test]
    fn buyer_signs_then_vault_cosigns() {
        let m = market();
        let mut psbt = buy(&m).psbt;

        assert_eq!(signer::sign_psbt(&mut psbt, &m.buyer).unwrap(), vec![1]);
        assert!(psbt.inputs[0].tap_key_sig.is_none());

        cosign_vault_input(&mut psbt, &m.listing, &m.vault).unwrap();
        assert!(psbt.inputs[0].tap_key_sig.is_some());
        assert!(psbt.inputs[1].tap_key_sig.is_none());

        let (tx, signed) = finalize::finalize_and_extract(psbt).unwrap();
        assert_eq!(signed.txid, tx.compute_txid());
        assert_eq!(tx.input[0].witness.len(), 1);
        assert_eq!(tx.input[1].witness.len(), 2);
    }

    #[test]
    fn vault_alone_cannot_finalize() {
        let m = market();
        let mut psbt = buy(&m).psbt;
        cosign_vault_input(&mut psbt, &m.listing, &m.vault).unwrap();
        assert!(finalize::finalize_and_extract(psbt).is_err());
    }
}
