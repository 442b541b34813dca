//! # Catalog Filtering
//!
//! Marketplace search over active vouchers. The database returns the active
//! set; narrowing and ordering happen here so they can be tested without a
//! store.
//!
//! ```text
//!   ?search=amazon&category=Shopping&price=medium
//!        │              │                 │
//!        ▼              ▼                 ▼
//!   title/description  exact match     low ≤ 100
//!   /brand contains    ("all" = any)   medium 101..=500
//!   (case-insensitive)                 high > 500
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::Voucher;
use crate::validation::ValidationResult;

/// Coin price bands offered by the marketplace filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PriceBand {
    Low,
    Medium,
    High,
}

impl PriceBand {
    pub fn contains(&self, coin_value: i64) -> bool {
        match self {
            PriceBand::Low => coin_value <= 100,
            PriceBand::Medium => (101..=500).contains(&coin_value),
            PriceBand::High => coin_value > 500,
        }
    }

    /// Parses a query value; empty and `all` mean no band.
    pub fn parse(value: &str) -> ValidationResult<Option<PriceBand>> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(None),
            "low" => Ok(Some(PriceBand::Low)),
            "medium" => Ok(Some(PriceBand::Medium)),
            "high" => Ok(Some(PriceBand::High)),
            other => Err(ValidationError::InvalidFormat {
                field: "price".to_string(),
                reason: format!("unknown price band '{other}'"),
            }),
        }
    }
}

/// A parsed marketplace query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoucherFilter {
    /// Lowercased search term.
    pub search: Option<String>,
    pub category: Option<String>,
    pub price: Option<PriceBand>,
}

impl VoucherFilter {
    /// Builds a filter from raw query-string values.
    pub fn from_query(
        search: Option<&str>,
        category: Option<&str>,
        price: Option<&str>,
    ) -> ValidationResult<Self> {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
            .map(str::to_string);
        let price = match price {
            Some(p) => PriceBand::parse(p)?,
            None => None,
        };
        Ok(VoucherFilter {
            search,
            category,
            price,
        })
    }

    pub fn matches(&self, voucher: &Voucher) -> bool {
        if let Some(term) = &self.search {
            let hit = voucher.title.to_lowercase().contains(term)
                || voucher.description.to_lowercase().contains(term)
                || voucher
                    .brand
                    .as_deref()
                    .is_some_and(|b| b.to_lowercase().contains(term));
            if !hit {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &voucher.category != category {
                return false;
            }
        }
        if let Some(band) = self.price {
            if !band.contains(voucher.coin_value) {
                return false;
            }
        }
        true
    }

    /// Filters active vouchers and orders them featured first, then by price.
    pub fn apply(&self, vouchers: Vec<Voucher>) -> Vec<Voucher> {
        let mut hits: Vec<Voucher> = vouchers
            .into_iter()
            .filter(|v| v.is_active && self.matches(v))
            .collect();
        hits.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then(a.coin_value.cmp(&b.coin_value))
                .then_with(|| a.title.cmp(&b.title))
        });
        hits
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
