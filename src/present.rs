//! Price display tokens for the form renderer.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde_json::{Map, Value as Json};

use crate::types::{PricingResult, decimal_from_json};

/// Prefix of the slot names declared for pricing constants.
pub const PRICING_SLOT_PREFIX: &str = "pricing_";

/// Where a slot takes its amount from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSource {
    /// A pricing constant, shown as an absolute value.
    Constant(String),
    Registration(String),
    Camper { index: usize, rule: String },
    Total,
}

/// A named placeholder in the form text and the amount it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSlot {
    pub name: String,
    pub source: SlotSource,
}

/// How amounts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    symbol: String,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self::new("$")
    }
}

impl CurrencyFormat {
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_owned(),
        }
    }

    /// `$42` for whole amounts, `$42.50` otherwise, `-$10` for negatives.
    #[must_use]
    pub fn format(&self, amount: Decimal) -> String {
        let sign = if amount.is_sign_negative() && !amount.is_zero() {
            "-"
        } else {
            ""
        };
        let abs = amount.abs();
        if abs.fract().is_zero() {
            format!("{sign}{}{}", self.symbol, abs.trunc().normalize())
        } else {
            let mut cents = abs.round_dp(2);
            cents.rescale(2);
            format!("{sign}{}{cents}", self.symbol)
        }
    }
}

/// Maps a [`PricingResult`] and the pricing constants onto named display
/// slots. Read-only: rendering never touches the result.
#[derive(Debug, Clone, Default)]
pub struct PriceAdapter {
    slots: Vec<PriceSlot>,
    constants: Map<String, Json>,
    format: CurrencyFormat,
}

impl PriceAdapter {
    #[must_use]
    pub fn new(constants: Map<String, Json>) -> Self {
        Self {
            slots: Vec::new(),
            constants,
            format: CurrencyFormat::default(),
        }
    }

    /// An adapter declaring one `pricing_<key>` slot per numeric constant.
    #[must_use]
    pub fn from_pricing(constants: &Map<String, Json>) -> Self {
        let slots = constants
            .iter()
            .filter(|(_, value)| value.is_number())
            .map(|(key, _)| PriceSlot {
                name: format!("{PRICING_SLOT_PREFIX}{key}"),
                source: SlotSource::Constant(key.clone()),
            })
            .collect();
        Self {
            slots,
            ..Self::new(constants.clone())
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: CurrencyFormat) -> Self {
        self.format = format;
        self
    }

    /// Declare an additional slot.
    #[must_use]
    pub fn slot(mut self, name: &str, source: SlotSource) -> Self {
        self.slots.push(PriceSlot {
            name: name.to_owned(),
            source,
        });
        self
    }

    #[must_use]
    pub fn slots(&self) -> &[PriceSlot] {
        &self.slots
    }

    /// Render every declared slot. A slot whose source is missing or
    /// unavailable renders `None`.
    #[must_use]
    pub fn render(&self, result: &PricingResult) -> IndexMap<String, Option<String>> {
        self.slots
            .iter()
            .map(|slot| {
                let text = self.amount(&slot.source, result).map(|a| self.format.format(a));
                (slot.name.clone(), text)
            })
            .collect()
    }

    fn amount(&self, source: &SlotSource, result: &PricingResult) -> Option<Decimal> {
        match source {
            SlotSource::Constant(key) => self
                .constants
                .get(key)
                .and_then(Json::as_number)
                .and_then(decimal_from_json)
                .map(|d| d.abs()),
            SlotSource::Registration(rule) => result.registration_amount(rule),
            SlotSource::Camper { index, rule } => result.camper_amount(*index, rule),
            SlotSource::Total => Some(result.total),
        }
    }
}
