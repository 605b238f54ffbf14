//! Record shapes for the three telemetry families plus the closed
//! family/category sets that drive path parsing and group validation.
//!
//! Embedded arrays (`strikes`, `max_priors`, `mini_contracts`) are kept as
//! raw JSON so replayed payloads stay bit-exact with the source files.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Structural shape of a record line, independent of which family directory
/// it was loaded from (`state` holds both chain and greek categories).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Gex,
    Greek,
    Orderflow,
}

impl RecordShape {
    pub fn type_url(&self) -> &'static str {
        match self {
            RecordShape::Gex => "proto.gex",
            RecordShape::Greek => "proto.greek",
            RecordShape::Orderflow => "proto.orderflow",
        }
    }
}

/// Chain-profile snapshot (classic and state gex_* categories).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GexRecord {
    pub timestamp: i64,
    pub ticker: String,
    #[serde(default)]
    pub min_dte: i32,
    #[serde(default)]
    pub sec_min_dte: i32,
    #[serde(default)]
    pub spot: f64,
    #[serde(default)]
    pub zero_gamma: f64,
    #[serde(default)]
    pub major_pos_vol: f64,
    #[serde(default)]
    pub major_pos_oi: f64,
    #[serde(default)]
    pub major_neg_vol: f64,
    #[serde(default)]
    pub major_neg_oi: f64,
    #[serde(default)]
    pub strikes: Option<Box<RawValue>>,
    #[serde(default)]
    pub sum_gex_vol: f64,
    #[serde(default)]
    pub sum_gex_oi: f64,
    #[serde(default)]
    pub delta_risk_reversal: f64,
    #[serde(default)]
    pub max_priors: Option<Box<RawValue>>,
}

/// Greek-profile snapshot (state delta/gamma/vanna/charm categories).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreekRecord {
    pub timestamp: i64,
    pub ticker: String,
    #[serde(default)]
    pub spot: f64,
    #[serde(default)]
    pub min_dte: i32,
    #[serde(default)]
    pub sec_min_dte: i32,
    #[serde(default)]
    pub major_positive: f64,
    #[serde(default)]
    pub major_negative: f64,
    #[serde(default)]
    pub major_long_gamma: f64,
    #[serde(default)]
    pub major_short_gamma: f64,
    #[serde(default)]
    pub mini_contracts: Option<Box<RawValue>>,
}

/// Orderflow snapshot. Spot and the eight gamma fields are scaled ×100 on
/// the wire; the remaining state/flow metrics are truncated to whole units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderflowRecord {
    pub timestamp: i64,
    pub ticker: String,
    #[serde(default)]
    pub spot: f64,
    #[serde(default)]
    pub z_mlgamma: f64,
    #[serde(default)]
    pub z_msgamma: f64,
    #[serde(default)]
    pub o_mlgamma: f64,
    #[serde(default)]
    pub o_msgamma: f64,
    #[serde(default)]
    pub zero_mcall: f64,
    #[serde(default)]
    pub zero_mput: f64,
    #[serde(default)]
    pub one_mcall: f64,
    #[serde(default)]
    pub one_mput: f64,
    #[serde(default)]
    pub zcvr: f64,
    #[serde(default)]
    pub ocvr: f64,
    #[serde(default)]
    pub zgr: f64,
    #[serde(default)]
    pub ogr: f64,
    #[serde(default)]
    pub zvanna: f64,
    #[serde(default)]
    pub ovanna: f64,
    #[serde(default)]
    pub zcharm: f64,
    #[serde(default)]
    pub ocharm: f64,
    #[serde(default)]
    pub agg_dex: f64,
    #[serde(default)]
    pub one_agg_dex: f64,
    #[serde(default)]
    pub agg_call_dex: f64,
    #[serde(default)]
    pub one_agg_call_dex: f64,
    #[serde(default)]
    pub agg_put_dex: f64,
    #[serde(default)]
    pub one_agg_put_dex: f64,
    #[serde(default)]
    pub net_dex: f64,
    #[serde(default)]
    pub one_net_dex: f64,
    #[serde(default)]
    pub net_call_dex: f64,
    #[serde(default)]
    pub one_net_call_dex: f64,
    #[serde(default)]
    pub net_put_dex: f64,
    #[serde(default)]
    pub one_net_put_dex: f64,
    #[serde(default)]
    pub dexoflow: f64,
    #[serde(default)]
    pub gexoflow: f64,
    #[serde(default)]
    pub cvroflow: f64,
    #[serde(default)]
    pub one_dexoflow: f64,
    #[serde(default)]
    pub one_gexoflow: f64,
    #[serde(default)]
    pub one_cvroflow: f64,
}

pub const FAMILY_ORDERFLOW: &str = "orderflow";
pub const FAMILY_CLASSIC: &str = "classic";
pub const FAMILY_STATE: &str = "state";

pub const GEX_CATEGORIES: [&str; 3] = ["gex_full", "gex_zero", "gex_one"];

pub const GREEK_CATEGORIES: [&str; 8] = [
    "delta_zero",
    "delta_one",
    "gamma_zero",
    "gamma_one",
    "vanna_zero",
    "vanna_one",
    "charm_zero",
    "charm_one",
];

/// Maps a (family, category) pair to its record shape, or `None` when the
/// pair falls outside the closed set.
pub fn shape_for(family: &str, category: &str) -> Option<RecordShape> {
    match family {
        FAMILY_ORDERFLOW if category == "orderflow" => Some(RecordShape::Orderflow),
        FAMILY_CLASSIC if GEX_CATEGORIES.contains(&category) => Some(RecordShape::Gex),
        FAMILY_STATE if GEX_CATEGORIES.contains(&category) => Some(RecordShape::Gex),
        FAMILY_STATE if GREEK_CATEGORIES.contains(&category) => Some(RecordShape::Greek),
        _ => None,
    }
}

/// Index products quoted without an underlying share listing.
const KNOWN_INDEXES: [&str; 4] = ["SPX", "VIX", "NDX", "RUT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerClass {
    Index,
    Future,
    Stock,
}

/// Futures tickers carry an underscore (e.g. `ES_SPX`).
pub fn classify_ticker(ticker: &str) -> TickerClass {
    if KNOWN_INDEXES.contains(&ticker) {
        TickerClass::Index
    } else if ticker.contains('_') {
        TickerClass::Future
    } else {
        TickerClass::Stock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_resolution_covers_closed_set() {
        assert_eq!(
            shape_for("orderflow", "orderflow"),
            Some(RecordShape::Orderflow)
        );
        assert_eq!(shape_for("classic", "gex_zero"), Some(RecordShape::Gex));
        assert_eq!(shape_for("state", "gex_full"), Some(RecordShape::Gex));
        assert_eq!(shape_for("state", "vanna_one"), Some(RecordShape::Greek));
        assert_eq!(shape_for("state", "orderflow"), None);
        assert_eq!(shape_for("classic", "delta_zero"), None);
        assert_eq!(shape_for("bogus", "gex_full"), None);
    }

    #[test]
    fn ticker_classification() {
        assert_eq!(classify_ticker("SPX"), TickerClass::Index);
        assert_eq!(classify_ticker("ES_SPX"), TickerClass::Future);
        assert_eq!(classify_ticker("AAPL"), TickerClass::Stock);
    }

    #[test]
    fn gex_record_preserves_embedded_arrays() {
        let line = r#"{"timestamp":1700000000,"ticker":"SPX","spot":4500.25,"strikes":[[4500.0,1.5,-2.5,[0.1,0.2]]],"max_priors":[[1.0,2.0]]}"#;
        let rec: GexRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.ticker, "SPX");
        let strikes = rec.strikes.as_ref().unwrap().get();
        assert_eq!(strikes, "[[4500.0,1.5,-2.5,[0.1,0.2]]]");
    }

    #[test]
    fn orderflow_record_defaults_missing_metrics() {
        let line = r#"{"timestamp":1,"ticker":"NDX","spot":15000.0}"#;
        let rec: OrderflowRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.zcvr, 0.0);
        assert_eq!(rec.one_cvroflow, 0.0);
    }
}
