use anyhow::{anyhow, Result};
use bitcoin::{Transaction, Txid};
use bitcoincore_rpc::jsonrpc::{self, simple_http};
use bitcoincore_rpc::{Client, RpcApi};
use bittx::{RawTxInfo, RpcClient, RpcFailure};
use std::io::ErrorKind;
use std::time::Duration;
use tracing::debug;

/// Bitcoin Core JSON-RPC with a bounded request time.
pub struct BtcCli {
    rpc: Client,
}

impl BtcCli {
    pub fn new(url: &str, user: &str, pass: &str, timeout: Duration) -> Result<Self> {
        let transport = simple_http::Builder::new()
            .timeout(timeout)
            .url(url)
            .map_err(|e| anyhow!("invalid rpc url {}: {}", url, e))?
            .auth(user, Some(pass))
            .build();
        let rpc = Client::from_jsonrpc(jsonrpc::Client::with_transport(transport));
        Ok(Self { rpc })
    }
}

fn failure(e: bitcoincore_rpc::Error) -> RpcFailure {
    match e {
        bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Rpc(rpc)) => RpcFailure::Rpc {
            code: rpc.code,
            message: rpc.message,
        },
        bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Transport(t)) => {
            match t.downcast_ref::<simple_http::Error>() {
                Some(simple_http::Error::HttpErrorCode(code)) => RpcFailure::Http(*code),
                Some(simple_http::Error::SocketError(io))
                    if matches!(io.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
                {
                    RpcFailure::Timeout(io.to_string())
                }
                _ => RpcFailure::Transport(t.to_string()),
            }
        }
        other => RpcFailure::Transport(other.to_string()),
    }
}

impl RpcClient for BtcCli {
    fn get_raw_transaction_info(&self, txid: &Txid) -> std::result::Result<RawTxInfo, RpcFailure> {
        let info = self.rpc.get_raw_transaction_info(txid, None).map_err(failure)?;
        debug!("{} has {:?} confirmations", txid, info.confirmations);
        Ok(RawTxInfo {
            confirmations: info.confirmations,
            blockhash: info.blockhash,
        })
    }

    fn send_raw_transaction(&self, tx: &Transaction) -> std::result::Result<Txid, RpcFailure> {
        self.rpc.send_raw_transaction(tx).map_err(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoincore_rpc::jsonrpc::error::RpcError;
    use bittx::TransactionStatusChecker;
    use std::str::FromStr;

    fn rpc_error(code: i32) -> bitcoincore_rpc::Error {
        bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Rpc(RpcError {
            code,
            message: "No such mempool or blockchain transaction".to_string(),
            data: None,
        }))
    }

    #[test]
    fn maps_node_failures() {
        assert_eq!(
            failure(rpc_error(-5)),
            RpcFailure::Rpc {
                code: -5,
                message: "No such mempool or blockchain transaction".to_string()
            }
        );

        let http = bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Transport(Box::new(
            simple_http::Error::HttpErrorCode(404),
        )));
        assert_eq!(failure(http), RpcFailure::Http(404));

        let timeout = bitcoincore_rpc::Error::JsonRpc(jsonrpc::Error::Transport(Box::new(
            simple_http::Error::SocketError(std::io::Error::new(ErrorKind::TimedOut, "30s")),
        )));
        assert!(matches!(failure(timeout), RpcFailure::Timeout(_)));
    }

    #[test]
    fn unreachable_node_is_a_network_error() {
        // nothing listens on the discard port
        let cli = BtcCli::new("http://127.0.0.1:9", "u", "p", Duration::from_secs(1)).unwrap();
        let txid =
            Txid::from_str("4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b")
                .unwrap();
        let err = TransactionStatusChecker::new(cli).check(&txid).unwrap_err();
        assert_eq!(err.kind(), datatypes::ErrorKind::Network);
    }
}
