use bitcoin::{Address, Amount, Network, OutPoint, Psbt, ScriptBuf, Transaction, TxOut, Txid};
use datatypes::types::{
    AddressInfo, CommitRevealTransaction, FeeBreakdown, FundingSource, InscriptionEnvelope,
    ScriptKind, SelectionResult, SignedTx, TransferInfo, TxStatus, Utxo,
};
use datatypes::{ChainConfig, Error, Result};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, error, info, warn};

pub mod address;
pub mod brc20;
pub mod build_helper;
pub mod builder;
pub mod coin_select;
pub mod finalize;
pub mod inscription;
pub mod keys;
pub mod signer;
pub mod status;
pub mod vsize;
pub mod witness;

#[cfg(test)]
mod test_utils;

pub use builder::commit_reveal::{
    build_inscription, quote_inscription, CommitRevealBuilder, InscriptionRequest, Stage,
};
pub use builder::escrow::{build_buy_psbt, cosign_vault_input, verify_seller_payout, BuyPsbt, Listing};
pub use builder::inscription_send::build_inscription_send;
pub use builder::transfer::{build_transfer_tx, TransferResult};
pub use builder::{Funding, Payment};
pub use keys::SigningKey;
pub use status::{RawTxInfo, RpcClient, RpcFailure, TransactionStatusChecker};
pub use vsize::{FeeEstimator, InscriptionSize};
