pub mod fee_rate;
pub mod tx;
pub mod utxo;

use async_trait::async_trait;
use bitcoin::{Address, Transaction, Txid};
use datatypes::{types::Utxo, Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only view of an address's funds, as seen by some external indexer.
#[async_trait]
pub trait UtxoSource: Send + Sync {
    /// Spendable outputs of `address`, largest value first. An empty vector
    /// means the address truly holds nothing; fetch failures are errors.
    async fn fetch_utxos(&self, address: &Address) -> Result<Vec<Utxo>>;

    /// Full previous transaction, needed to spend legacy inputs.
    /// `Ok(None)` when the indexer does not know the transaction.
    async fn fetch_raw_transaction(&self, txid: &Txid) -> Result<Option<Transaction>>;
}

/// Path conventions of the indexer being talked to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexerApi {
    /// `GET /address/{addr}/utxo-data`, `GET /rawtx/{txid}`
    #[default]
    Unisat,
    /// `GET /address/{addr}/utxo`, `GET /tx/{txid}/hex`
    Esplora,
}

#[derive(Clone, Debug)]
pub struct IndexerClient {
    base_url: String,
    api: IndexerApi,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl IndexerClient {
    pub fn new(base_url: &str, api: IndexerApi, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("failed to build http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api,
            api_key: None,
            http,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn api(&self) -> IndexerApi {
        self.api
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        debug!("GET {}", url);
        let req = self.http.get(url);
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

#[async_trait]
impl UtxoSource for IndexerClient {
    async fn fetch_utxos(&self, address: &Address) -> Result<Vec<Utxo>> {
        self.get_utxos(address).await
    }

    async fn fetch_raw_transaction(&self, txid: &Txid) -> Result<Option<Transaction>> {
        self.get_raw_tx(txid).await
    }
}

/// Maps a transport failure to the taxonomy, keeping timeouts distinct.
pub(crate) fn transport_error(context: &str, e: reqwest::Error) -> Error {
    error!("{} failed: {}", context, e);
    if e.is_timeout() {
        Error::NetworkTimeout(format!("{context}: {e}"))
    } else {
        Error::Network(format!("{context}: {e}"))
    }
}
