use thiserror::Error;

/// The error taxonomy callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// No funds or not enough of them. Fixable by the user.
    Funding,
    /// Malformed caller input.
    Format,
    /// An internal invariant did not hold while assembling a transaction.
    Protocol,
    /// Indexer or node failure. The caller owns retry policy.
    Network,
    /// A trade would pay out less than agreed.
    Validation,
}

impl ErrorKind {
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Funding | ErrorKind::Format | ErrorKind::Validation => 400,
            ErrorKind::Protocol => 500,
            ErrorKind::Network => 502,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no spendable utxos for {0}")]
    NoUtxos(String),

    #[error("insufficient balance: need {required} sat, have {available} sat")]
    InsufficientBalance { required: u64, available: u64 },

    #[error("unsupported address format: {0}")]
    UnsupportedAddressFormat(String),

    #[error("address {address} is not valid for {network}")]
    NetworkMismatch { address: String, network: String },

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("malformed data url: {0}")]
    MalformedDataUrl(String),

    #[error("invalid fee rate: {0}")]
    InvalidFeeRate(f64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("script construction failed: {0}")]
    ScriptConstruction(String),

    #[error("reveal address output not found in commit transaction")]
    MissingRevealAddress,

    #[error("psbt error: {0}")]
    Psbt(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("network timeout: {0}")]
    NetworkTimeout(String),

    #[error("seller payout invalid: expected at least {expected} sat, found {actual:?}")]
    InvalidPayout { expected: u64, actual: Option<u64> },

    #[error("psbt does not match the listing: {0}")]
    ListingMismatch(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoUtxos(_) | Error::InsufficientBalance { .. } => ErrorKind::Funding,
            Error::UnsupportedAddressFormat(_)
            | Error::NetworkMismatch { .. }
            | Error::InvalidPrivateKey(_)
            | Error::MalformedDataUrl(_)
            | Error::InvalidFeeRate(_)
            | Error::InvalidInput(_) => ErrorKind::Format,
            Error::ScriptConstruction(_)
            | Error::MissingRevealAddress
            | Error::Psbt(_)
            | Error::Signing(_) => ErrorKind::Protocol,
            Error::Network(_) | Error::NetworkTimeout(_) => ErrorKind::Network,
            Error::InvalidPayout { .. } | Error::ListingMismatch(_) => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
