use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The two monthly price series published on the tariff page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    /// Prezzo Unico Nazionale, the wholesale electricity price.
    Pun,
    /// Punto di Scambio Virtuale, the wholesale natural gas price.
    Psv,
}

impl SeriesKind {
    /// Evaluation order: PUN first, then PSV.
    pub const ALL: [SeriesKind; 2] = [SeriesKind::Pun, SeriesKind::Psv];

    /// Name of the table this series is persisted to.
    pub fn table(&self) -> &'static str {
        match self {
            SeriesKind::Pun => "pun",
            SeriesKind::Psv => "psv",
        }
    }

    pub fn commodity(&self) -> &'static str {
        match self {
            SeriesKind::Pun => "energy",
            SeriesKind::Psv => "gas",
        }
    }
}

impl Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesKind::Pun => write!(f, "PUN"),
            SeriesKind::Psv => write!(f, "PSV"),
        }
    }
}

/// One observed market price, at month granularity (first of the month).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl Display for PricePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.6}", self.date, self.price)
    }
}

/// Built when the freshest scraped price undercuts the configured reference
/// price, and handed straight to the notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlert {
    pub kind: SeriesKind,
    pub market_price: f64,
    pub reference_price: f64,
    pub discount_percent: f64,
}

impl PriceAlert {
    pub fn new(kind: SeriesKind, market_price: f64, reference_price: f64) -> Self {
        Self {
            kind,
            market_price,
            reference_price,
            discount_percent: (reference_price - market_price) * 100.0 / market_price,
        }
    }
}

/// Per-series outcome of one scrape cycle, for diagnostic logging.
#[derive(Debug)]
pub struct SeriesReport {
    pub kind: SeriesKind,
    pub points: Vec<PricePoint>,
    pub watermark: NaiveDateTime,
    pub inserted: usize,
    pub alert: Option<PriceAlert>,
}

impl Display for SeriesReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} scraped entries, watermark {}, {} inserted, alert {}",
            self.kind,
            self.points.len(),
            self.watermark,
            self.inserted,
            if self.alert.is_some() { "fired" } else { "not fired" }
        )
    }
}
