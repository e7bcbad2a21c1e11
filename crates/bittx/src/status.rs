use super::*;
use bitcoin::BlockHash;

/// `RPC_INVALID_ADDRESS_OR_KEY`, which `getrawtransaction` answers for an
/// unknown txid.
pub const RPC_NOT_FOUND: i32 = -5;
const HTTP_NOT_FOUND: u16 = 404;

/// A node call that did not produce a result, before interpretation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RpcFailure {
    Rpc { code: i32, message: String },
    Http(u16),
    Transport(String),
    Timeout(String),
}

impl std::fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcFailure::Rpc { code, message } => write!(f, "rpc error {code}: {message}"),
            RpcFailure::Http(status) => write!(f, "http status {status}"),
            RpcFailure::Transport(e) => write!(f, "transport: {e}"),
            RpcFailure::Timeout(e) => write!(f, "timed out: {e}"),
        }
    }
}

/// The parts of a verbose `getrawtransaction` answer the checker needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawTxInfo {
    pub confirmations: Option<u32>,
    pub blockhash: Option<BlockHash>,
}

/// JSON-RPC surface of a node.
pub trait RpcClient: Send + Sync {
    fn get_raw_transaction_info(&self, txid: &Txid) -> std::result::Result<RawTxInfo, RpcFailure>;

    fn send_raw_transaction(&self, tx: &Transaction) -> std::result::Result<Txid, RpcFailure>;
}

impl<T: RpcClient + ?Sized> RpcClient for &T {
    fn get_raw_transaction_info(&self, txid: &Txid) -> std::result::Result<RawTxInfo, RpcFailure> {
        (**self).get_raw_transaction_info(txid)
    }

    fn send_raw_transaction(&self, tx: &Transaction) -> std::result::Result<Txid, RpcFailure> {
        (**self).send_raw_transaction(tx)
    }
}

fn network_error(context: &str, failure: RpcFailure) -> Error {
    error!("{} failed: {}", context, failure);
    match failure {
        RpcFailure::Timeout(e) => Error::NetworkTimeout(format!("{context}: {e}")),
        other => Error::Network(format!("{context}: {other}")),
    }
}

pub struct TransactionStatusChecker<R> {
    rpc: R,
}

impl<R: RpcClient> TransactionStatusChecker<R> {
    pub fn new(rpc: R) -> Self {
        Self { rpc }
    }

    /// Where `txid` stands. An unknown transaction is a normal answer,
    /// not an error.
    pub fn check(&self, txid: &Txid) -> Result<TxStatus> {
        match self.rpc.get_raw_transaction_info(txid) {
            Ok(info) => {
                let confirmations = match (info.confirmations, info.blockhash) {
                    (Some(c), _) => c,
                    (None, Some(_)) => 1,
                    (None, None) => 0,
                };
                Ok(TxStatus {
                    broadcasted: true,
                    in_mempool: confirmations == 0,
                    confirmations,
                })
            }
            Err(RpcFailure::Rpc { code, .. }) if code == RPC_NOT_FOUND => {
                debug!("{} not known to the node", txid);
                Ok(TxStatus::NOT_FOUND)
            }
            Err(RpcFailure::Http(HTTP_NOT_FOUND)) => {
                debug!("{} not found (http 404)", txid);
                Ok(TxStatus::NOT_FOUND)
            }
            Err(e) => Err(network_error("getrawtransaction", e)),
        }
    }

    pub fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        let txid = self
            .rpc
            .send_raw_transaction(tx)
            .map_err(|e| network_error("sendrawtransaction", e))?;
        info!("broadcast {}", txid);
        Ok(txid)
    }
}
