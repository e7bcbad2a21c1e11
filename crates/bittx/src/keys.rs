use super::*;
use bitcoin::key::{CompressedPublicKey, Keypair, TapTweak, XOnlyPublicKey};
use secp256k1::{All, Secp256k1, SecretKey};
use bitcoin::{NetworkKind, PrivateKey, PublicKey, Script};

/// The single private key a request signs with.
#[derive(Clone)]
pub struct SigningKey {
    secp: Secp256k1<All>,
    private_key: PrivateKey,
    keypair: Keypair,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("x_only", &self.x_only())
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    pub fn from_wif(wif: &str) -> Result<Self> {
        let private_key = PrivateKey::from_wif(wif.trim())
            .map_err(|e| Error::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_private_key(private_key))
    }

    /// Like [`SigningKey::from_wif`] but rejects keys encoded for another
    /// network kind.
    pub fn from_wif_for(wif: &str, network: Network) -> Result<Self> {
        let key = Self::from_wif(wif)?;
        if key.private_key.network != NetworkKind::from(network) {
            return Err(Error::NetworkMismatch {
                address: "<wif>".to_string(),
                network: network.to_string(),
            });
        }
        Ok(key)
    }

    pub fn from_slice(secret: &[u8], network: Network) -> Result<Self> {
        let inner =
            SecretKey::from_slice(secret).map_err(|e| Error::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_private_key(PrivateKey::new(inner, network)))
    }

    fn from_private_key(private_key: PrivateKey) -> Self {
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &private_key.inner);
        Self {
            secp,
            private_key,
            keypair,
        }
    }

    pub fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Untweaked key pair, used for script-path spends.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    /// Key pair tweaked with `TapTweak(internal_key)` and no script tree,
    /// used for key-path spends.
    pub fn tweaked_keypair(&self) -> Keypair {
        self.keypair.tap_tweak(&self.secp, None).to_inner()
    }

    pub fn x_only(&self) -> XOnlyPublicKey {
        self.keypair.x_only_public_key().0
    }

    pub fn public_key(&self) -> PublicKey {
        self.private_key.public_key(&self.secp)
    }

    pub fn compressed_public_key(&self) -> Option<CompressedPublicKey> {
        CompressedPublicKey::from_private_key(&self.secp, &self.private_key).ok()
    }

    pub fn p2tr_address(&self, network: Network) -> Address {
        Address::p2tr(&self.secp, self.x_only(), None, network)
    }

    pub fn p2wpkh_address(&self, network: Network) -> Option<Address> {
        self.compressed_public_key()
            .map(|pk| Address::p2wpkh(&pk, network))
    }

    pub fn p2sh_p2wpkh_address(&self, network: Network) -> Option<Address> {
        self.compressed_public_key()
            .map(|pk| Address::p2shwpkh(&pk, network))
    }

    pub fn p2pkh_address(&self, network: Network) -> Address {
        Address::p2pkh(self.public_key().pubkey_hash(), network)
    }

    /// The address of `kind` this key controls. P2WSH is never single-key.
    pub fn address(&self, kind: ScriptKind, network: Network) -> Result<Address> {
        let addr = match kind {
            ScriptKind::P2tr => Some(self.p2tr_address(network)),
            ScriptKind::P2wpkh => self.p2wpkh_address(network),
            ScriptKind::P2sh => self.p2sh_p2wpkh_address(network),
            ScriptKind::P2pkh => Some(self.p2pkh_address(network)),
            ScriptKind::P2wsh => None,
        };
        addr.ok_or_else(|| {
            Error::InvalidPrivateKey(format!("key cannot control a {:?} output", kind))
        })
    }

    /// Which of this key's single-key scripts `script_pubkey` is, if any.
    pub fn owns(&self, script_pubkey: &Script) -> Option<ScriptKind> {
        let pk = self.public_key();
        if script_pubkey.is_p2tr() {
            let ours = ScriptBuf::new_p2tr(&self.secp, self.x_only(), None);
            return (ours.as_script() == script_pubkey).then_some(ScriptKind::P2tr);
        }
        if script_pubkey.is_p2pkh() {
            let ours = ScriptBuf::new_p2pkh(&pk.pubkey_hash());
            return (ours.as_script() == script_pubkey).then_some(ScriptKind::P2pkh);
        }
        let wpkh = self.compressed_public_key()?.wpubkey_hash();
        let p2wpkh = ScriptBuf::new_p2wpkh(&wpkh);
        if p2wpkh.as_script() == script_pubkey {
            return Some(ScriptKind::P2wpkh);
        }
        if script_pubkey.is_p2sh() && p2wpkh.to_p2sh().as_script() == script_pubkey {
            return Some(ScriptKind::P2sh);
        }
        None
    }
}
