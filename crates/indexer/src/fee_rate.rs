use super::*;
use std::time::Instant;
use tokio::sync::RwLock;

/// `GET /v1/fees/recommended`, sat/vB.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    pub fastest_fee: f64,
    pub half_hour_fee: f64,
    pub hour_fee: f64,
    #[serde(default)]
    pub economy_fee: f64,
    #[serde(default)]
    pub minimum_fee: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePriority {
    Fastest,
    #[default]
    HalfHour,
    Hour,
    Economy,
}

impl RecommendedFees {
    pub fn rate(&self, priority: FeePriority) -> f64 {
        let rate = match priority {
            FeePriority::Fastest => self.fastest_fee,
            FeePriority::HalfHour => self.half_hour_fee,
            FeePriority::Hour => self.hour_fee,
            FeePriority::Economy => self.economy_fee,
        };
        // never go under the relay floor the indexer reports
        rate.max(self.minimum_fee)
    }
}

#[async_trait]
pub trait FeeSource: Send + Sync {
    async fn recommended_fees(&self) -> Result<RecommendedFees>;
}

#[async_trait]
impl FeeSource for IndexerClient {
    async fn recommended_fees(&self) -> Result<RecommendedFees> {
        let url = self.url("/v1/fees/recommended");
        let response = self
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error("fetch recommended fees", e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!(
                "fetch recommended fees: indexer answered {status}"
            )));
        }
        response
            .json::<RecommendedFees>()
            .await
            .map_err(|e| transport_error("decode recommended fees", e))
    }
}

/// Caches the last recommended-fee answer for `ttl`. Owned by whoever wants
/// caching; builders only ever see the resulting `f64`.
pub struct FeeRateCache<S> {
    source: S,
    ttl: Duration,
    cached: RwLock<Option<(Instant, RecommendedFees)>>,
}

impl<S: FeeSource> FeeRateCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub async fn fees(&self) -> Result<RecommendedFees> {
        if let Some((at, fees)) = *self.cached.read().await {
            if at.elapsed() < self.ttl {
                return Ok(fees);
            }
        }

        let mut slot = self.cached.write().await;
        // another task may have refreshed while we waited for the lock
        if let Some((at, fees)) = *slot {
            if at.elapsed() < self.ttl {
                return Ok(fees);
            }
        }
        let fees = self.source.recommended_fees().await?;
        debug!("refreshed recommended fees: {:?}", fees);
        *slot = Some((Instant::now(), fees));
        Ok(fees)
    }

    pub async fn rate(&self, priority: FeePriority) -> Result<f64> {
        Ok(self.fees().await?.rate(priority))
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}
