use crate::btcrpc::BtcCli;
use crate::config::{Brc20Command, Cli, Command, Config, MarketSection};
use anyhow::{anyhow, bail, Context, Result};
use bitcoin::consensus::encode::deserialize_hex;
use bitcoin::{Address, OutPoint, Psbt, Transaction, Txid};
use bittx::brc20::Brc20Op;
use bittx::build_helper;
use bittx::{
    address, finalize, inscription, quote_inscription, signer, InscriptionRequest, Listing,
    Payment, SigningKey, TransactionStatusChecker,
};
use datatypes::types::{FundingSource, InscriptionEnvelope, SignedTx, TransferInfo};
use datatypes::ChainConfig;
use indexer::fee_rate::FeeRateCache;
use indexer::{IndexerClient, UtxoSource};
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the WIF of the signing key.
pub const KEY_ENV: &str = "INSCRIBER_WIF";

pub struct App {
    chain: ChainConfig,
    indexer: IndexerClient,
    fees: FeeRateCache<IndexerClient>,
    rpc: Option<BtcCli>,
    market: MarketSection,
}

impl App {
    pub fn new(cfg: Config) -> Result<Self> {
        let chain = cfg.chain.chain_config();
        let url = cfg
            .indexer
            .url
            .clone()
            .unwrap_or_else(|| chain.default_indexer_url().to_string());
        let indexer = IndexerClient::new(&url, cfg.indexer.api, cfg.indexer.timeout())?
            .with_api_key(cfg.indexer.api_key.clone());
        let fees = FeeRateCache::new(
            indexer.clone(),
            Duration::from_secs(cfg.indexer.fee_ttl_secs),
        );
        let rpc = match &cfg.rpc {
            Some(rpc) => Some(BtcCli::new(
                &rpc.url,
                &rpc.user,
                &rpc.pass,
                Duration::from_secs(rpc.timeout_secs),
            )?),
            None => None,
        };
        info!("{:?} {} via {}", chain.variant, chain.network, url);
        Ok(Self {
            chain,
            indexer,
            fees,
            rpc,
            market: cfg.market,
        })
    }

    fn key(&self) -> Result<SigningKey> {
        let wif = std::env::var(KEY_ENV).with_context(|| format!("{KEY_ENV} is not set"))?;
        Ok(SigningKey::from_wif_for(wif.trim(), self.chain.network)?)
    }

    async fn fee_rate(&self, cli: &Cli) -> Result<f64> {
        match cli.fee_rate {
            Some(rate) => Ok(rate),
            None => {
                let rate = self.fees.rate(cli.priority.into()).await?;
                info!("using recommended fee rate {} sat/vB", rate);
                Ok(rate)
            }
        }
    }

    fn service_fee(&self) -> Result<Option<Payment>> {
        match (&self.market.fee_address, self.market.service_fee) {
            (Some(addr), fee) if fee > 0 => Ok(Some(Payment::parse(addr, fee, self.chain.network)?)),
            _ => Ok(None),
        }
    }

    /// Node first when configured, the indexer otherwise.
    async fn broadcast(&self, signed: &SignedTx) -> Result<Txid> {
        let tx: Transaction = deserialize_hex(&signed.hex)?;
        let txid = match &self.rpc {
            Some(rpc) => TransactionStatusChecker::new(rpc).broadcast(&tx)?,
            None => self.indexer.broadcast(&tx).await?,
        };
        if txid != signed.txid {
            warn!("broadcast returned {} for {}", txid, signed.txid);
        }
        Ok(txid)
    }

    async fn listing(&self, inscription: &OutPoint, seller: &str, price: u64) -> Result<Listing> {
        let vault = self
            .market
            .vault_address
            .as_deref()
            .ok_or_else(|| anyhow!("market.vault_address is not configured"))?;
        let vault = address::parse_address(vault, self.chain.network)?;
        let utxo = self
            .indexer
            .fetch_utxos(&vault)
            .await?
            .into_iter()
            .find(|u| u.out_point == *inscription)
            .ok_or_else(|| anyhow!("{} is not held by the vault {}", inscription, vault))?;
        Ok(Listing {
            inscription: utxo,
            seller: address::parse_address(seller, self.chain.network)?,
            price,
        })
    }

    fn funding_address(&self, cli: &Cli, key: &SigningKey) -> Result<Address> {
        Ok(key.address(cli.from_kind.into(), self.chain.network)?)
    }

    pub async fn run(&self, cli: &Cli) -> Result<Value> {
        match &cli.command {
            Command::Transfer { to, amount, change } => {
                let key = self.key()?;
                let from = self.funding_address(cli, &key)?;
                let info = TransferInfo {
                    sender: from.to_string(),
                    recipient: to.clone(),
                    amount: *amount,
                    fee_rate: self.fee_rate(cli).await?,
                    change_address: change.clone(),
                };
                let res = build_helper::transfer(&self.indexer, &self.chain, &key, &info).await?;
                let mut out = json!(res);
                if cli.broadcast {
                    out["broadcast"] = json!(self.broadcast(&res.tx).await?);
                }
                Ok(out)
            }
            Command::Inscribe {
                to,
                file,
                content_type,
                data_url,
                price,
                price_to,
                xpub,
                index,
            } => {
                let envelope = match (file, data_url) {
                    (Some(path), _) => {
                        let body = std::fs::read(path)
                            .with_context(|| format!("failed to read {}", path.display()))?;
                        let content_type = content_type
                            .as_deref()
                            .ok_or_else(|| anyhow!("--content-type is required with --file"))?;
                        InscriptionEnvelope::new(content_type, body)
                    }
                    (None, Some(url)) => inscription::from_data_url(url)?,
                    (None, None) => bail!("either --file or --data-url is required"),
                };
                let price = match (price, price_to) {
                    (Some(amount), Some(addr)) => Some(Payment::parse(addr, *amount, self.chain.network)?),
                    _ => None,
                };
                let request = InscriptionRequest {
                    envelope,
                    recipient: to.clone(),
                    fee_rate: self.fee_rate(cli).await?,
                    price,
                    service_fee: self.service_fee()?,
                };
                let key = self.key()?;
                let funding = match (xpub, index) {
                    (Some(xpub), Some(index)) => FundingSource::ExtendedKey {
                        xpub: xpub.clone(),
                        index: *index,
                    },
                    _ => FundingSource::Address(self.funding_address(cli, &key)?.to_string()),
                };
                let res =
                    build_helper::inscribe(&self.indexer, &self.chain, &key, &funding, &request).await?;
                self.reveal_output(cli, json!(res), &res.commit, &res.reveal).await
            }
            Command::Brc20 { to, op } => {
                let op = match op {
                    Brc20Command::Deploy { tick, max, lim, dec } => {
                        Brc20Op::deploy(tick, max, lim.as_deref(), *dec)?
                    }
                    Brc20Command::Mint { tick, amt } => Brc20Op::mint(tick, amt)?,
                    Brc20Command::Transfer { tick, amt } => Brc20Op::transfer(tick, amt)?,
                };
                let key = self.key()?;
                let funding = FundingSource::Address(self.funding_address(cli, &key)?.to_string());
                let res = build_helper::inscribe_brc20(
                    &self.indexer,
                    &self.chain,
                    &key,
                    &funding,
                    &op,
                    to,
                    self.fee_rate(cli).await?,
                    self.service_fee()?,
                )
                .await?;
                self.reveal_output(cli, json!(res), &res.commit, &res.reveal).await
            }
            Command::SendInscription { inscription, to } => {
                let key = self.key()?;
                let from = self.funding_address(cli, &key)?;
                let res = build_helper::send_inscription(
                    &self.indexer,
                    &self.chain,
                    &key,
                    &from.to_string(),
                    inscription,
                    to,
                    self.fee_rate(cli).await?,
                )
                .await?;
                let mut out = json!(res);
                if cli.broadcast {
                    out["broadcast"] = json!(self.broadcast(&res.tx).await?);
                }
                Ok(out)
            }
            Command::Buy {
                inscription,
                seller,
                price,
                buyer,
            } => {
                let listing = self.listing(inscription, seller, *price).await?;
                let service_fee = self.service_fee()?;
                let res = build_helper::buy(
                    &self.indexer,
                    &self.chain,
                    &listing,
                    buyer,
                    service_fee.as_ref(),
                    self.fee_rate(cli).await?,
                )
                .await?;
                Ok(json!({ "psbt": res.to_base64(), "fees": res.fees, "changeAmount": res.change_amount }))
            }
            Command::Sign { psbt } => {
                let mut psbt = Psbt::from_str(psbt.trim())?;
                let signed = signer::sign_psbt(&mut psbt, &self.key()?)?;
                Ok(json!({ "psbt": psbt.to_string(), "signedInputs": signed }))
            }
            Command::Cosign {
                psbt,
                inscription,
                seller,
                price,
            } => {
                let listing = self.listing(inscription, seller, *price).await?;
                let mut psbt = Psbt::from_str(psbt.trim())?;
                bittx::cosign_vault_input(&mut psbt, &listing, &self.key()?)?;
                Ok(json!({ "psbt": psbt.to_string() }))
            }
            Command::Finalize { psbt } => {
                let psbt = Psbt::from_str(psbt.trim())?;
                let (_, signed) = finalize::finalize_and_extract(psbt)?;
                let mut out = json!(signed);
                if cli.broadcast {
                    out["broadcast"] = json!(self.broadcast(&signed).await?);
                }
                Ok(out)
            }
            Command::Status { txid } => {
                let rpc = self
                    .rpc
                    .as_ref()
                    .ok_or_else(|| anyhow!("status needs an [rpc] section"))?;
                let status = TransactionStatusChecker::new(rpc).check(txid)?;
                Ok(json!(status))
            }
            Command::Quote {
                to,
                content_type,
                size,
                inputs,
            } => {
                let request = InscriptionRequest {
                    envelope: InscriptionEnvelope::new(content_type, vec![0; *size]),
                    recipient: to.clone(),
                    fee_rate: self.fee_rate(cli).await?,
                    price: None,
                    service_fee: self.service_fee()?,
                };
                let quote = quote_inscription(&self.chain, &request, cli.from_kind.into(), *inputs)?;
                Ok(json!(quote))
            }
            Command::Fees => Ok(json!(self.fees.fees().await?)),
        }
    }

    /// The commit must be accepted before the reveal can be.
    async fn reveal_output(
        &self,
        cli: &Cli,
        mut out: Value,
        commit: &SignedTx,
        reveal: &SignedTx,
    ) -> Result<Value> {
        if cli.broadcast {
            let commit_txid = self.broadcast(commit).await?;
            info!("commit {} sent", commit_txid);
            let reveal_txid = self.broadcast(reveal).await?;
            out["broadcast"] = json!({ "commit": commit_txid, "reveal": reveal_txid });
        }
        Ok(out)
    }
}
