use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Flat price of the official jersey, in whole MXN.
pub const STANDARD_JERSEY_PRICE: u32 = 280;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JerseySize {
    XS,
    CH,
    M,
    G,
    XL,
    XXL,
    XXXL,
}

impl JerseySize {
    pub const ALL: [JerseySize; 7] = [
        JerseySize::XS,
        JerseySize::CH,
        JerseySize::M,
        JerseySize::G,
        JerseySize::XL,
        JerseySize::XXL,
        JerseySize::XXXL,
    ];

    pub fn label(self) -> &'static str {
        match self {
            JerseySize::XS => "XS",
            JerseySize::CH => "CH",
            JerseySize::M => "M",
            JerseySize::G => "G",
            JerseySize::XL => "XL",
            JerseySize::XXL => "XXL",
            JerseySize::XXXL => "XXXL",
        }
    }
}

impl fmt::Display for JerseySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JerseySize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        JerseySize::ALL
            .into_iter()
            .find(|size| size.label().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown jersey size '{value}'"))
    }
}

/// Whether a participant wants the jersey, and in which size.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JerseyRequest {
    pub wanted: bool,
    pub size: Option<JerseySize>,
}

impl JerseyRequest {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn sized(size: JerseySize) -> Self {
        Self {
            wanted: true,
            size: Some(size),
        }
    }

    pub fn set_wanted(&mut self, wanted: bool) {
        self.wanted = wanted;
        if !wanted {
            self.size = None;
        }
    }

    /// Zero unless the jersey is wanted and a size has been picked.
    pub fn price(&self, table: &PriceTable) -> u32 {
        match (self.wanted, self.size) {
            (true, Some(size)) => table.price(size),
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    prices: BTreeMap<JerseySize, u32>,
}

impl PriceTable {
    pub fn standard() -> Self {
        Self::flat(STANDARD_JERSEY_PRICE)
    }

    pub fn flat(price: u32) -> Self {
        Self {
            prices: JerseySize::ALL.into_iter().map(|size| (size, price)).collect(),
        }
    }

    pub fn price(&self, size: JerseySize) -> u32 {
        self.prices.get(&size).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> impl Iterator<Item = (JerseySize, u32)> + '_ {
        self.prices.iter().map(|(size, price)| (*size, *price))
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Number of participants that asked for a jersey.
pub fn jersey_count<'a>(requests: impl IntoIterator<Item = &'a JerseyRequest>) -> u32 {
    requests.into_iter().filter(|r| r.wanted).count() as u32
}

pub fn total_due<'a>(
    requests: impl IntoIterator<Item = &'a JerseyRequest>,
    table: &PriceTable,
) -> u32 {
    requests.into_iter().map(|r| r.price(table)).sum()
}
