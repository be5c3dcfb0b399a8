//! Entity sets exposed by the product master service

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported entity sets of `API_PRODUCT_SRV`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum EntitySet {
    /// Core product master records
    #[default]
    ProductMaster,
    /// Language-dependent product descriptions
    ProductDescription,
    /// Plant-level product data
    ProductPlant,
}

impl EntitySet {
    /// All supported entity sets in display order
    pub const ALL: [EntitySet; 3] = [
        Self::ProductMaster,
        Self::ProductDescription,
        Self::ProductPlant,
    ];

    /// Entity set name as used in the request path
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::ProductMaster => "A_Product",
            Self::ProductDescription => "A_ProductDescription",
            Self::ProductPlant => "A_ProductPlant",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductMaster => "Product Master",
            Self::ProductDescription => "Product Description",
            Self::ProductPlant => "Product Plant",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::ProductMaster => Self::ProductDescription,
            Self::ProductDescription => Self::ProductPlant,
            Self::ProductPlant => Self::ProductMaster,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Self::ProductMaster => Self::ProductPlant,
            Self::ProductDescription => Self::ProductMaster,
            Self::ProductPlant => Self::ProductDescription,
        }
    }
}

impl fmt::Display for EntitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for EntitySet {
    type Err = QueryError;

    /// Accepts the friendly name (any case, with or without dashes) or the wire name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let normalized: String = trimmed
            .chars()
            .filter(|c| *c != '-' && *c != '_' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|e| {
                e.wire_name().eq_ignore_ascii_case(trimmed)
                    || normalized == format!("{:?}", e).to_ascii_lowercase()
            })
            .ok_or_else(|| QueryError::UnsupportedEntity(trimmed.to_string()))
    }
}

impl TryFrom<String> for EntitySet {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
