//! Hub families and their group-name grammar.
//!
//! Group names look like `{prefix}_{ticker}_{infix}_{category}`. Tickers
//! may themselves contain underscores (`ES_SPX`), so parsing searches for
//! the family infix rather than splitting on `_`.

use crate::models::{RecordShape, FAMILY_CLASSIC, FAMILY_ORDERFLOW, FAMILY_STATE};

/// The five push hubs. Classic and state-chain share the chain shape;
/// the two greek hubs split the near/next expiry categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubKind {
    Orderflow,
    Classic,
    StateGex,
    StateGreeksZero,
    StateGreeksOne,
}

pub const ALL_HUBS: [HubKind; 5] = [
    HubKind::Orderflow,
    HubKind::Classic,
    HubKind::StateGex,
    HubKind::StateGreeksZero,
    HubKind::StateGreeksOne,
];

impl HubKind {
    /// Route segment and negotiate map key.
    pub fn name(&self) -> &'static str {
        match self {
            HubKind::Orderflow => "orderflow",
            HubKind::Classic => "classic",
            HubKind::StateGex => "state_gex",
            HubKind::StateGreeksZero => "state_greeks_zero",
            HubKind::StateGreeksOne => "state_greeks_one",
        }
    }

    pub fn from_name(name: &str) -> Option<HubKind> {
        ALL_HUBS.iter().copied().find(|k| k.name() == name)
    }

    /// Family directory the hub replays from.
    pub fn family(&self) -> &'static str {
        match self {
            HubKind::Orderflow => FAMILY_ORDERFLOW,
            HubKind::Classic => FAMILY_CLASSIC,
            HubKind::StateGex | HubKind::StateGreeksZero | HubKind::StateGreeksOne => FAMILY_STATE,
        }
    }

    /// Separator between ticker and category inside a group name.
    fn infix(&self) -> &'static str {
        match self {
            HubKind::Orderflow => "_orderflow_",
            HubKind::Classic => "_classic_",
            HubKind::StateGex | HubKind::StateGreeksZero | HubKind::StateGreeksOne => "_state_",
        }
    }

    /// Categories this hub accepts in group names.
    pub fn categories(&self) -> &'static [&'static str] {
        match self {
            HubKind::Orderflow => &["orderflow"],
            HubKind::Classic | HubKind::StateGex => &["gex_full", "gex_zero", "gex_one"],
            HubKind::StateGreeksZero => {
                &["delta_zero", "gamma_zero", "vanna_zero", "charm_zero"]
            }
            HubKind::StateGreeksOne => &["delta_one", "gamma_one", "vanna_one", "charm_one"],
        }
    }

    pub fn shape(&self) -> RecordShape {
        match self {
            HubKind::Orderflow => RecordShape::Orderflow,
            HubKind::Classic | HubKind::StateGex => RecordShape::Gex,
            HubKind::StateGreeksZero | HubKind::StateGreeksOne => RecordShape::Greek,
        }
    }

    pub fn type_url(&self) -> &'static str {
        self.shape().type_url()
    }

    /// Extracts `(ticker, category)` from a group name, or `None` when the
    /// name does not belong to this hub's grammar.
    pub fn parse_group(&self, prefix: &str, group: &str) -> Option<(String, String)> {
        let rest = group.strip_prefix(prefix)?.strip_prefix('_')?;
        let infix = self.infix();
        let at = rest.find(infix)?;
        let ticker = &rest[..at];
        let category = &rest[at + infix.len()..];
        if ticker.is_empty() || !self.categories().contains(&category) {
            return None;
        }
        Some((ticker.to_string(), category.to_string()))
    }

    pub fn validate_group(&self, prefix: &str, group: &str) -> bool {
        self.parse_group(prefix, group).is_some()
    }
}
