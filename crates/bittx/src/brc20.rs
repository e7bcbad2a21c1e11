use super::*;
use serde::Serialize;

pub const BRC20_CONTENT_TYPE: &str = "text/plain;charset=utf-8";
const PROTOCOL: &str = "brc-20";
const TICK_LEN: usize = 4;
const MAX_DECIMALS: u8 = 18;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Brc20Op {
    Deploy {
        tick: String,
        max: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lim: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        dec: Option<String>,
    },
    Mint {
        tick: String,
        amt: String,
    },
    Transfer {
        tick: String,
        amt: String,
    },
}

#[derive(Serialize)]
struct Payload<'a> {
    p: &'static str,
    #[serde(flatten)]
    op: &'a Brc20Op,
}

fn check_tick(tick: &str) -> Result<()> {
    if tick.len() != TICK_LEN {
        return Err(Error::InvalidInput(format!(
            "tick {tick:?} must be exactly {TICK_LEN} bytes"
        )));
    }
    Ok(())
}

fn check_amount(field: &str, value: &str) -> Result<()> {
    let bad = || Error::InvalidInput(format!("{field} {value:?} is not a positive decimal"));
    let (int, frac) = value.split_once('.').unwrap_or((value, ""));
    let digits_ok = !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
        && !(value.contains('.') && frac.is_empty());
    if !digits_ok {
        return Err(bad());
    }
    if value.bytes().all(|b| b == b'0' || b == b'.') {
        return Err(bad());
    }
    Ok(())
}

impl Brc20Op {
    pub fn deploy(tick: &str, max: &str, lim: Option<&str>, dec: Option<u8>) -> Result<Self> {
        check_tick(tick)?;
        check_amount("max", max)?;
        if let Some(lim) = lim {
            check_amount("lim", lim)?;
        }
        if let Some(dec) = dec {
            if dec > MAX_DECIMALS {
                return Err(Error::InvalidInput(format!(
                    "dec {dec} exceeds {MAX_DECIMALS}"
                )));
            }
        }
        Ok(Brc20Op::Deploy {
            tick: tick.to_string(),
            max: max.to_string(),
            lim: lim.map(str::to_string),
            dec: dec.map(|d| d.to_string()),
        })
    }

    pub fn mint(tick: &str, amt: &str) -> Result<Self> {
        check_tick(tick)?;
        check_amount("amt", amt)?;
        Ok(Brc20Op::Mint {
            tick: tick.to_string(),
            amt: amt.to_string(),
        })
    }

    pub fn transfer(tick: &str, amt: &str) -> Result<Self> {
        check_tick(tick)?;
        check_amount("amt", amt)?;
        Ok(Brc20Op::Transfer {
            tick: tick.to_string(),
            amt: amt.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&Payload { p: PROTOCOL, op: self })
            .map_err(|e| Error::InvalidInput(e.to_string()))
    }

    pub fn envelope(&self) -> Result<InscriptionEnvelope> {
        Ok(InscriptionEnvelope::new(
            BRC20_CONTENT_TYPE,
            self.to_json()?.into_bytes(),
        ))
    }
}
