use thiserror::Error;

/// Typed errors raised by the library.
///
/// The classifiers themselves never fail; these cover record constructors
/// that enforce invariants and the data/snapshot edges. Binary code wraps
/// them with `anyhow::Context`.
#[derive(Error, Debug)]
pub enum SentinelError {
    // -- Record invariants --------------------------------------------------
    #[error("invalid zone bounds: bottom {bottom} is above top {top}")]
    InvalidZone { bottom: f64, top: f64 },

    #[error("momentum history must contain at least one sample")]
    EmptyMomentumHistory,

    #[error("unknown timeframe: {0}")]
    UnknownTimeframe(String),

    // -- Data ---------------------------------------------------------------
    #[error("data source unavailable: {name}")]
    DataUnavailable { name: String },

    #[error("candles for {symbol} are not time-ascending at row {row}")]
    UnorderedCandles { symbol: String, row: usize },

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
