use bitcoin::Network;
use serde::Deserialize;

/// Outputs at or below this value are never created as change.
pub const DUST_THRESHOLD: u64 = 546;
/// Largest data push a script element may carry.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
/// Leaf version of BIP-342 tapscript.
pub const TAPSCRIPT_LEAF_VERSION: u8 = 0xc0;
/// BIP-141 witness discount.
pub const WITNESS_SCALE_FACTOR: u64 = 4;
/// Version, locktime, segwit marker and the input/output counts.
pub const BASE_TX_VBYTES: u64 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainVariant {
    #[default]
    Bitcoin,
    Fractal,
    Sidechain,
}

/// Per-call chain parameters. Never mutated once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainConfig {
    pub variant: ChainVariant,
    pub network: Network,
    pub witness_scale_factor: u64,
    pub dust_threshold: u64,
    pub base_tx_vbytes: u64,
    pub min_confirmations: u32,
}

impl ChainConfig {
    pub fn for_variant(variant: ChainVariant, network: Network) -> Self {
        Self {
            variant,
            network,
            witness_scale_factor: WITNESS_SCALE_FACTOR,
            dust_threshold: DUST_THRESHOLD,
            base_tx_vbytes: BASE_TX_VBYTES,
            min_confirmations: 0,
        }
    }

    pub fn bitcoin(network: Network) -> Self {
        Self::for_variant(ChainVariant::Bitcoin, network)
    }

    /// Fractal and the sidechain reuse bitcoin address encodings, only the
    /// indexer endpoints differ.
    pub fn default_indexer_url(&self) -> &'static str {
        match (self.variant, self.network) {
            (ChainVariant::Bitcoin, Network::Bitcoin) => "https://open-api.unisat.io/v1/indexer",
            (ChainVariant::Bitcoin, _) => "https://open-api-testnet.unisat.io/v1/indexer",
            (ChainVariant::Fractal, Network::Bitcoin) => {
                "https://open-api-fractal.unisat.io/v1/indexer"
            }
            (ChainVariant::Fractal, _) => "https://open-api-fractal-testnet.unisat.io/v1/indexer",
            (ChainVariant::Sidechain, _) => "http://127.0.0.1:3000",
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::bitcoin(Network::Bitcoin)
    }
}
