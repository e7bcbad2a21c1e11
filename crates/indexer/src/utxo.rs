use super::*;
use bitcoin::{Amount, OutPoint, ScriptBuf};
use serde::de::{self, Deserializer};
use std::str::FromStr;

/// Height some indexers report for outputs that are still in the mempool.
const UNCONFIRMED_HEIGHT: u64 = 0x3f_ffff;

// Indexers are inconsistent about quoting numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(u64),
    Str(String),
}

impl NumOrStr {
    fn into_u64<E: de::Error>(self) -> std::result::Result<u64, E> {
        match self {
            NumOrStr::Num(n) => Ok(n),
            NumOrStr::Str(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("not a number: {s:?}"))),
        }
    }
}

fn de_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u64, D::Error> {
    NumOrStr::deserialize(d)?.into_u64()
}

fn de_u32<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<u32, D::Error> {
    let n = de_u64(d)?;
    u32::try_from(n).map_err(|_| de::Error::custom(format!("out of range: {n}")))
}

fn de_opt_u64<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Option<u64>, D::Error> {
    Option::<NumOrStr>::deserialize(d)?
        .map(NumOrStr::into_u64)
        .transpose()
}

#[derive(Debug, Deserialize)]
struct IndexerUtxo {
    txid: String,
    #[serde(deserialize_with = "de_u32")]
    vout: u32,
    #[serde(alias = "value", deserialize_with = "de_u64")]
    satoshi: u64,
    #[serde(default, deserialize_with = "de_opt_u64")]
    height: Option<u64>,
    #[serde(default, deserialize_with = "de_opt_u64")]
    confirmations: Option<u64>,
    #[serde(default, alias = "isSpent")]
    spent: bool,
}

#[derive(Debug, Deserialize)]
struct IndexerData {
    #[serde(default)]
    utxo: Vec<IndexerUtxo>,
}

#[derive(Debug, Deserialize)]
struct Status {
    confirmed: bool,
    #[serde(default)]
    block_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
    status: Status,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UtxoResponse {
    Esplora(Vec<EsploraUtxo>),
    Indexer {
        #[serde(default)]
        code: Option<i64>,
        #[serde(default)]
        msg: Option<String>,
        data: Option<IndexerData>,
    },
}

/// A record as it came off the wire, before validation.
struct RawUtxo {
    txid: String,
    vout: u32,
    value: u64,
    confirmations: u32,
    spent: bool,
}

impl From<IndexerUtxo> for RawUtxo {
    fn from(u: IndexerUtxo) -> Self {
        let confirmations = match (u.confirmations, u.height) {
            (Some(c), _) => u32::try_from(c).unwrap_or(u32::MAX),
            (None, Some(h)) if h > 0 && h < UNCONFIRMED_HEIGHT => 1,
            _ => 0,
        };
        Self {
            txid: u.txid,
            vout: u.vout,
            value: u.satoshi,
            confirmations,
            spent: u.spent,
        }
    }
}

impl From<EsploraUtxo> for RawUtxo {
    fn from(u: EsploraUtxo) -> Self {
        let confirmed = u.status.confirmed && u.status.block_height.map_or(true, |h| h > 0);
        Self {
            txid: u.txid,
            vout: u.vout,
            value: u.value,
            confirmations: u32::from(confirmed),
            spent: false,
        }
    }
}

/// Turns any supported response body into utxos locked by `script_pubkey`,
/// ordered by value, largest first.
pub fn normalize_utxos(body: &str, script_pubkey: &ScriptBuf) -> Result<Vec<Utxo>> {
    let resp: UtxoResponse = serde_json::from_str(body)
        .map_err(|e| Error::Network(format!("unexpected indexer utxo response: {e}")))?;

    let raw: Vec<RawUtxo> = match resp {
        UtxoResponse::Esplora(list) => list.into_iter().map(RawUtxo::from).collect(),
        UtxoResponse::Indexer {
            data: Some(data), ..
        } => data.utxo.into_iter().map(RawUtxo::from).collect(),
        UtxoResponse::Indexer { code, msg, data: None } => {
            return Err(Error::Network(format!(
                "indexer returned no data (code {:?}): {}",
                code,
                msg.unwrap_or_default()
            )))
        }
    };

    let mut utxos = raw
        .into_iter()
        .map(|r| {
            let txid = Txid::from_str(&r.txid)
                .map_err(|e| Error::Network(format!("indexer returned bad txid {}: {e}", r.txid)))?;
            Ok(Utxo {
                out_point: OutPoint::new(txid, r.vout),
                value: Amount::from_sat(r.value),
                script_pubkey: script_pubkey.clone(),
                confirmations: r.confirmations,
                spent: r.spent,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    sort_by_value_desc(&mut utxos);
    Ok(utxos)
}

/// Largest first; ties broken by outpoint so the order is fully determined.
pub fn sort_by_value_desc(utxos: &mut [Utxo]) {
    utxos.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then_with(|| a.out_point.cmp(&b.out_point))
    });
}

impl IndexerClient {
    pub async fn get_utxos(&self, address: &Address) -> Result<Vec<Utxo>> {
        let path = match self.api {
            IndexerApi::Unisat => format!("/address/{}/utxo-data", address),
            IndexerApi::Esplora => format!("/address/{}/utxo", address),
        };
        let url = self.url(&path);
        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("fetch utxos", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "fetch utxos for {address}: indexer answered {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error("read utxo response", e))?;
        let utxos = normalize_utxos(&body, &address.script_pubkey())?;
        debug!(
            "{} utxos for {} totaling {} sat",
            utxos.len(),
            address,
            utxos.iter().map(|u| u.value.to_sat()).sum::<u64>()
        );
        Ok(utxos)
    }
}
