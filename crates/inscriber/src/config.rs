use anyhow::{Context, Result};
use bitcoin::{Network, OutPoint};
use clap::{Parser, Subcommand, ValueEnum};
use datatypes::types::ScriptKind;
use datatypes::{ChainConfig, ChainVariant};
use indexer::fee_rate::FeePriority;
use indexer::IndexerApi;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "inscriber", version, about = "Build, sign and broadcast inscription transactions")]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Script kind of the funding address derived from the signing key
    #[arg(long, value_enum, default_value_t = KeyKind::P2tr, global = true)]
    pub from_kind: KeyKind,

    /// Fee rate in sat/vB; the indexer's recommendation when omitted
    #[arg(long, global = true)]
    pub fee_rate: Option<f64>,

    #[arg(long, value_enum, default_value_t = Priority::HalfHour, global = true)]
    pub priority: Priority,

    /// Send the signed transactions to the node
    #[arg(long, global = true)]
    pub broadcast: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pay an amount to an address
    Transfer {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        change: Option<String>,
    },
    /// Inscribe a file or a data url
    Inscribe {
        #[arg(long)]
        to: String,
        #[arg(long, conflicts_with = "data_url", requires = "content_type")]
        file: Option<PathBuf>,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        data_url: Option<String>,
        /// Creator price paid by the commit
        #[arg(long, requires = "price_to")]
        price: Option<u64>,
        #[arg(long)]
        price_to: Option<String>,
        /// Fund from child m/0/<index> of this extended key
        #[arg(long, requires = "index")]
        xpub: Option<String>,
        #[arg(long)]
        index: Option<u32>,
    },
    /// Inscribe a BRC-20 operation
    Brc20 {
        #[arg(long)]
        to: String,
        #[command(subcommand)]
        op: Brc20Command,
    },
    /// Move an inscription, e.g. into the marketplace vault
    SendInscription {
        #[arg(long)]
        inscription: OutPoint,
        #[arg(long)]
        to: String,
    },
    /// Build the unsigned purchase PSBT of a listed inscription
    Buy {
        #[arg(long)]
        inscription: OutPoint,
        #[arg(long)]
        seller: String,
        #[arg(long)]
        price: u64,
        #[arg(long)]
        buyer: String,
    },
    /// Sign the inputs of a PSBT that belong to the signing key
    Sign {
        #[arg(long)]
        psbt: String,
    },
    /// Co-sign the vault input of a purchase PSBT
    Cosign {
        #[arg(long)]
        psbt: String,
        #[arg(long)]
        inscription: OutPoint,
        #[arg(long)]
        seller: String,
        #[arg(long)]
        price: u64,
    },
    /// Finalize a fully signed PSBT into a raw transaction
    Finalize {
        #[arg(long)]
        psbt: String,
    },
    /// Broadcast state of a transaction
    Status {
        #[arg(long)]
        txid: bitcoin::Txid,
    },
    /// Fee quote for an inscription, without touching any utxo
    Quote {
        #[arg(long)]
        to: String,
        #[arg(long)]
        content_type: String,
        #[arg(long)]
        size: usize,
        #[arg(long, default_value_t = 1)]
        inputs: usize,
    },
    /// Recommended fee rates
    Fees,
}

#[derive(Subcommand, Debug)]
pub enum Brc20Command {
    Deploy {
        #[arg(long)]
        tick: String,
        #[arg(long)]
        max: String,
        #[arg(long)]
        lim: Option<String>,
        #[arg(long)]
        dec: Option<u8>,
    },
    Mint {
        #[arg(long)]
        tick: String,
        #[arg(long)]
        amt: String,
    },
    Transfer {
        #[arg(long)]
        tick: String,
        #[arg(long)]
        amt: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeyKind {
    P2tr,
    P2wpkh,
    P2shP2wpkh,
    P2pkh,
}

impl From<KeyKind> for ScriptKind {
    fn from(kind: KeyKind) -> Self {
        match kind {
            KeyKind::P2tr => ScriptKind::P2tr,
            KeyKind::P2wpkh => ScriptKind::P2wpkh,
            KeyKind::P2shP2wpkh => ScriptKind::P2sh,
            KeyKind::P2pkh => ScriptKind::P2pkh,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Priority {
    Fastest,
    HalfHour,
    Hour,
    Economy,
}

impl From<Priority> for FeePriority {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Fastest => FeePriority::Fastest,
            Priority::HalfHour => FeePriority::HalfHour,
            Priority::Hour => FeePriority::Hour,
            Priority::Economy => FeePriority::Economy,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainSection,
    #[serde(default)]
    pub indexer: IndexerSection,
    pub rpc: Option<RpcSection>,
    #[serde(default)]
    pub market: MarketSection,
}

#[derive(Deserialize, Debug)]
pub struct ChainSection {
    #[serde(default)]
    pub variant: ChainVariant,
    #[serde(default = "default_network")]
    pub network: Network,
    #[serde(default)]
    pub min_confirmations: u32,
}

impl Default for ChainSection {
    fn default() -> Self {
        Self {
            variant: ChainVariant::default(),
            network: default_network(),
            min_confirmations: 0,
        }
    }
}

impl ChainSection {
    pub fn chain_config(&self) -> ChainConfig {
        let mut cfg = ChainConfig::for_variant(self.variant, self.network);
        cfg.min_confirmations = self.min_confirmations;
        cfg
    }
}

#[derive(Deserialize, Debug)]
pub struct IndexerSection {
    /// Defaults to the public endpoint of the configured chain
    pub url: Option<String>,
    #[serde(default)]
    pub api: IndexerApi,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// How long recommended fee rates are reused
    #[serde(default = "default_fee_ttl_secs")]
    pub fee_ttl_secs: u64,
}

impl Default for IndexerSection {
    fn default() -> Self {
        Self {
            url: None,
            api: IndexerApi::default(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            fee_ttl_secs: default_fee_ttl_secs(),
        }
    }
}

impl IndexerSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Debug)]
pub struct RpcSection {
    pub url: String,
    pub user: String,
    pub pass: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug, Default)]
pub struct MarketSection {
    pub vault_address: Option<String>,
    pub fee_address: Option<String>,
    #[serde(default)]
    pub service_fee: u64,
}

fn default_network() -> Network {
    Network::Bitcoin
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_fee_ttl_secs() -> u64 {
    60
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_test() {
        let cfg = load_config(Path::new("example_config.toml")).unwrap();
        assert_eq!(cfg.chain.network, Network::Testnet);
        assert_eq!(cfg.chain.chain_config().min_confirmations, 1);
        assert_eq!(cfg.indexer.api, IndexerApi::Esplora);
        assert_eq!(cfg.indexer.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.rpc.unwrap().user, "bitcoin");
        assert_eq!(cfg.market.service_fee, 1_000);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        let chain = cfg.chain.chain_config();
        assert_eq!(chain, ChainConfig::default());
        assert!(cfg.rpc.is_none());
        assert_eq!(cfg.indexer.timeout_secs, 30);
        assert_eq!(cfg.indexer.url, None);
    }

    #[test]
    fn fractal_section() {
        let cfg: Config = toml::from_str("[chain]\nvariant = \"fractal\"\n").unwrap();
        assert_eq!(cfg.chain.variant, ChainVariant::Fractal);
        assert_eq!(cfg.chain.network, Network::Bitcoin);
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "inscriber",
            "--fee-rate",
            "3.5",
            "transfer",
            "--to",
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            "--amount",
            "10000",
        ])
        .unwrap();
        assert_eq!(cli.fee_rate, Some(3.5));
        assert!(matches!(cli.command, Command::Transfer { amount: 10_000, .. }));

        let cli = Cli::try_parse_from([
            "inscriber",
            "brc20",
            "--to",
            "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
            "mint",
            "--tick",
            "ordi",
            "--amt",
            "1000",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Brc20 {
                op: Brc20Command::Mint { .. },
                ..
            }
        ));

        assert!(Cli::try_parse_from(["inscriber", "inscribe", "--to", "x", "--file", "a.png"]).is_err());
    }
}
