use super::*;
use bitcoin::consensus::encode::{deserialize, serialize_hex};
use bitcoin::hex::FromHex;
use reqwest::StatusCode;

#[derive(Debug, Deserialize)]
struct RawTxEnvelope {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    data: Option<String>,
}

/// Extracts the transaction hex from either a bare hex body or a
/// `{"code":0,"data":"<hex>"}` wrapper. `Ok(None)` when the wrapper says the
/// indexer has no such transaction.
pub fn parse_raw_tx_body(body: &str) -> Result<Option<Transaction>> {
    let trimmed = body.trim();
    let hex = if trimmed.starts_with('{') {
        let envelope: RawTxEnvelope = serde_json::from_str(trimmed)
            .map_err(|e| Error::Network(format!("unexpected raw tx response: {e}")))?;
        match envelope.data {
            Some(hex) if !hex.is_empty() => hex,
            _ => {
                debug!(
                    "indexer has no raw tx (code {:?}): {}",
                    envelope.code,
                    envelope.msg.unwrap_or_default()
                );
                return Ok(None);
            }
        }
    } else {
        trimmed.trim_matches('"').to_string()
    };

    let bytes = Vec::<u8>::from_hex(&hex)
        .map_err(|e| Error::Network(format!("indexer returned non-hex tx: {e}")))?;
    let tx: Transaction = deserialize(&bytes)
        .map_err(|e| Error::Network(format!("indexer returned undecodable tx: {e}")))?;
    Ok(Some(tx))
}

impl IndexerClient {
    pub async fn get_raw_tx(&self, txid: &Txid) -> Result<Option<Transaction>> {
        let path = match self.api {
            IndexerApi::Unisat => format!("/rawtx/{}", txid),
            IndexerApi::Esplora => format!("/tx/{}/hex", txid),
        };
        let url = self.url(&path);
        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("fetch raw tx", e))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            s if !s.is_success() => {
                return Err(Error::Network(format!(
                    "fetch raw tx {txid}: indexer answered {s}"
                )))
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error("read raw tx response", e))?;
        let tx = parse_raw_tx_body(&body)?;
        if let Some(tx) = &tx {
            if tx.compute_txid() != *txid {
                return Err(Error::Network(format!(
                    "indexer returned {} when asked for {}",
                    tx.compute_txid(),
                    txid
                )));
            }
        }
        Ok(tx)
    }

    /// Pushes a signed transaction through the indexer's `POST /tx`.
    /// Returns the txid the indexer reports.
    pub async fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        let url = self.url("/tx");
        let tx_hex = serialize_hex(tx);
        debug!("POST {} ({} bytes)", url, tx_hex.len() / 2);

        let mut req = self.http.post(&url).body(tx_hex);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req
            .send()
            .await
            .map_err(|e| transport_error("broadcast", e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("read broadcast response", e))?;
        if !status.is_success() {
            return Err(Error::Network(format!(
                "broadcast rejected ({status}): {}",
                body.trim()
            )));
        }

        let reported = body.trim().trim_matches('"');
        match reported.parse::<Txid>() {
            Ok(txid) => Ok(txid),
            Err(_) => {
                debug!("broadcast answered {:?}, using local txid", reported);
                Ok(tx.compute_txid())
            }
        }
    }
}
