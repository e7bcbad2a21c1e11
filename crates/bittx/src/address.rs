use super::*;
use bitcoin::address::{AddressType, NetworkUnchecked};
use bitcoin::bip32::{ChildNumber, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::{NetworkKind, Script};

fn parse_unchecked(address: &str) -> Result<Address<NetworkUnchecked>> {
    Address::from_str(address.trim())
        .map_err(|_| Error::UnsupportedAddressFormat(address.to_string()))
}

fn kind_of(address: &Address<NetworkUnchecked>, raw: &str) -> Result<ScriptKind> {
    match address.assume_checked_ref().address_type() {
        Some(AddressType::P2pkh) => Ok(ScriptKind::P2pkh),
        Some(AddressType::P2sh) => Ok(ScriptKind::P2sh),
        Some(AddressType::P2wpkh) => Ok(ScriptKind::P2wpkh),
        Some(AddressType::P2wsh) => Ok(ScriptKind::P2wsh),
        Some(AddressType::P2tr) => Ok(ScriptKind::P2tr),
        _ => Err(Error::UnsupportedAddressFormat(raw.to_string())),
    }
}

/// Classifies an address of any network by its encoding.
///
/// Base58 addresses are told apart by version byte (`1`/`m`/`n` pay to a key
/// hash, `3`/`2` to a script hash); bech32 and bech32m ones by witness
/// version and program length. Anything else, including witness versions
/// with no known meaning, is rejected.
pub fn classify(address: &str) -> Result<AddressInfo> {
    let parsed = parse_unchecked(address)?;
    kind_of(&parsed, address).map(AddressInfo::from)
}

/// Parses `address`, requiring it to belong to `network`.
pub fn parse_address(address: &str, network: Network) -> Result<Address> {
    parse_unchecked(address)?
        .require_network(network)
        .map_err(|_| Error::NetworkMismatch {
            address: address.to_string(),
            network: network.to_string(),
        })
}

/// [`parse_address`] and [`classify`] in one step.
pub fn classify_for(address: &str, network: Network) -> Result<(Address, AddressInfo)> {
    let parsed = parse_unchecked(address)?;
    let kind = kind_of(&parsed, address)?;
    let checked = parsed
        .require_network(network)
        .map_err(|_| Error::NetworkMismatch {
            address: address.to_string(),
            network: network.to_string(),
        })?;
    Ok((checked, kind.into()))
}

/// Script kind of an output script, for inputs whose address is not at hand.
pub fn script_kind(script_pubkey: &Script) -> Option<ScriptKind> {
    if script_pubkey.is_p2tr() {
        Some(ScriptKind::P2tr)
    } else if script_pubkey.is_p2wpkh() {
        Some(ScriptKind::P2wpkh)
    } else if script_pubkey.is_p2wsh() {
        Some(ScriptKind::P2wsh)
    } else if script_pubkey.is_p2sh() {
        Some(ScriptKind::P2sh)
    } else if script_pubkey.is_p2pkh() {
        Some(ScriptKind::P2pkh)
    } else {
        None
    }
}

/// Resolves where a request's funds come from to one concrete address.
/// An extended key yields the key-path P2TR address of child `m/0/index`.
pub fn resolve_funding(source: &FundingSource, network: Network) -> Result<Address> {
    match source {
        FundingSource::Address(address) => parse_address(address, network),
        FundingSource::ExtendedKey { xpub, index } => {
            let xpub = Xpub::from_str(xpub.trim())
                .map_err(|e| Error::InvalidInput(format!("invalid extended key: {e}")))?;
            if xpub.network != NetworkKind::from(network) {
                return Err(Error::NetworkMismatch {
                    address: xpub.to_string(),
                    network: network.to_string(),
                });
            }
            let path = [
                ChildNumber::from_normal_idx(0),
                ChildNumber::from_normal_idx(*index),
            ]
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::InvalidInput(format!("invalid derivation index: {e}")))?;

            let secp = Secp256k1::verification_only();
            let child = xpub
                .derive_pub(&secp, &path)
                .map_err(|e| Error::InvalidInput(format!("derivation failed: {e}")))?;
            let address = Address::p2tr(&secp, child.to_x_only_pub(), None, network);
            debug!("resolved m/0/{} to {}", index, address);
            Ok(address)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SigningKey;
    use bitcoin::bip32::Xpriv;

    const GENESIS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
    const BIP173_P2WPKH: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const BIP173_P2WSH: &str = "bc1qrp33g0q5c5txsp9arysrx4k6zdkfs4nce4xj0gdcccefvpysxf3qccfmv3";

    #[test]
    fn known_addresses() {
        assert_eq!(classify(GENESIS).unwrap().script_kind, ScriptKind::P2pkh);
        assert_eq!(
            classify(BIP173_P2WPKH).unwrap().script_kind,
            ScriptKind::P2wpkh
        );
        let wsh = classify(BIP173_P2WSH).unwrap();
        assert_eq!(wsh.script_kind, ScriptKind::P2wsh);
        assert_eq!(wsh.output_vbytes, 43);
    }

    #[test]
    fn classification_round_trips_through_script() {
        let key = SigningKey::from_slice(&[5u8; 32], Network::Bitcoin).unwrap();
        let mut addresses: Vec<String> = vec![
            GENESIS.to_string(),
            BIP173_P2WPKH.to_string(),
            BIP173_P2WSH.to_string(),
        ];
        for network in [Network::Bitcoin, Network::Testnet] {
            for kind in [
                ScriptKind::P2tr,
                ScriptKind::P2wpkh,
                ScriptKind::P2sh,
                ScriptKind::P2pkh,
            ] {
                addresses.push(key.address(kind, network).unwrap().to_string());
            }
        }

        for addr in addresses {
            let info = classify(&addr).unwrap();
            let network = if addr.starts_with("bc1") || addr.starts_with('1') || addr.starts_with('3')
            {
                Network::Bitcoin
            } else {
                Network::Testnet
            };
            let (parsed, again) = classify_for(&addr, network).unwrap();
            assert_eq!(info, again);
            let spk = parsed.script_pubkey();
            assert_eq!(script_kind(&spk), Some(info.script_kind), "{addr}");
            let rebuilt = Address::from_script(&spk, network).unwrap();
            assert_eq!(rebuilt.to_string(), addr);
        }
    }

    #[test]
    fn unsupported_strings_fail_hard() {
        for bad in ["", "hello", "bc1qinvalid", "0x52908400098527886E0F7030069857D2E4169EE7"] {
            let err = classify(bad).unwrap_err();
            assert!(matches!(err, Error::UnsupportedAddressFormat(_)), "{bad}");
        }
    }

    #[test]
    fn wrong_network_is_rejected() {
        let err = parse_address(GENESIS, Network::Testnet).unwrap_err();
        assert!(matches!(err, Error::NetworkMismatch { .. }));
    }

    #[test]
    fn xpub_resolves_to_child_taproot_address() {
        let secp = Secp256k1::new();
        let master = Xpriv::new_master(Network::Bitcoin, &[1u8; 32]).unwrap();
        let xpub = Xpub::from_priv(&secp, &master);

        let source = FundingSource::ExtendedKey {
            xpub: xpub.to_string(),
            index: 7,
        };
        let resolved = resolve_funding(&source, Network::Bitcoin).unwrap();

        let path = [
            ChildNumber::from_normal_idx(0).unwrap(),
            ChildNumber::from_normal_idx(7).unwrap(),
        ];
        let child = master.derive_priv(&secp, &path).unwrap();
        let key = SigningKey::from_slice(&child.private_key.secret_bytes(), Network::Bitcoin)
            .unwrap();
        assert_eq!(resolved, key.p2tr_address(Network::Bitcoin));
        assert_eq!(classify(&resolved.to_string()).unwrap().script_kind, ScriptKind::P2tr);

        let plain = FundingSource::Address(GENESIS.to_string());
        assert_eq!(resolve_funding(&plain, Network::Bitcoin).unwrap().to_string(), GENESIS);
    }
}
