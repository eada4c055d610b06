//! Listing payloads: the raw submission shape and its normalized form.
//!
//! Storefront clients send categories either as a bare name or as an object,
//! prices as numbers or numeric strings, and variant attributes either flat or
//! nested. Everything is normalized into [`ListingDraft`] here, before it
//! reaches the aggregate.

use serde::{Deserialize, Serialize};

use bazaar_core::{DomainError, DomainResult, ValueObject};

/// Largest accepted amount, in centavos (₱10 billion).
const MAX_CENTAVOS: u64 = 1_000_000_000_000;

/// A non-negative amount in the marketplace currency (PHP), in centavos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_centavos(centavos: u64) -> DomainResult<Self> {
        if centavos > MAX_CENTAVOS {
            return Err(DomainError::validation("price exceeds the maximum allowed amount"));
        }
        Ok(Self(centavos))
    }

    /// Convert a decimal peso amount (e.g. `199.5`) into centavos.
    pub fn from_pesos(pesos: f64) -> DomainResult<Self> {
        if !pesos.is_finite() {
            return Err(DomainError::validation("price must be a finite number"));
        }
        if pesos < 0.0 {
            return Err(DomainError::validation("price cannot be negative"));
        }
        let centavos = (pesos * 100.0).round();
        if centavos > MAX_CENTAVOS as f64 {
            return Err(DomainError::validation("price exceeds the maximum allowed amount"));
        }
        Ok(Self(centavos as u64))
    }

    pub fn centavos(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PHP {}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Canonical category reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<String>,
    pub name: String,
}

impl ValueObject for Category {}

impl Category {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// A purchasable variant of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub price: Money,
    pub stock: u32,
    pub thumbnail: Option<String>,
}

/// Normalized, validated listing content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub name: String,
    pub category: Category,
    pub base_price: Money,
    pub description: String,
    pub images: Vec<String>,
    pub variants: Vec<Variant>,
}

impl ListingDraft {
    /// Well-formedness check applied on every submission and resubmission.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if self.category.name.trim().is_empty() {
            return Err(DomainError::validation("category cannot be empty"));
        }
        if self.base_price.centavos() > MAX_CENTAVOS {
            return Err(DomainError::validation("price exceeds the maximum allowed amount"));
        }
        if self.images.is_empty() {
            return Err(DomainError::validation("at least one image is required"));
        }
        if let Some(idx) = self.images.iter().position(|url| url.trim().is_empty()) {
            return Err(DomainError::validation(format!("image {idx} has an empty URL")));
        }
        for (idx, variant) in self.variants.iter().enumerate() {
            if variant.name.trim().is_empty() {
                return Err(DomainError::validation(format!("variant {idx} has an empty name")));
            }
        }
        Ok(())
    }
}

/// Category as it arrives from clients: `"Shoes"` or `{"id": "c-1", "name": "Shoes"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawCategory {
    Name(String),
    Object {
        #[serde(default)]
        id: Option<String>,
        name: String,
    },
}

/// Amount as it arrives from clients: `199.5` or `"199.50"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    fn to_money(&self, field: &str) -> DomainResult<Money> {
        match self {
            RawAmount::Number(n) => Money::from_pesos(*n),
            RawAmount::Text(s) => {
                let parsed: f64 = s.trim().parse().map_err(|_| {
                    DomainError::validation(format!("{field} must be numeric, got '{s}'"))
                })?;
                Money::from_pesos(parsed)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawVariantAttributes {
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, alias = "colour")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawVariant {
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, alias = "colour")]
    pub color: Option<String>,
    #[serde(default)]
    pub attributes: Option<RawVariantAttributes>,
    #[serde(default)]
    pub price: Option<RawAmount>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default, alias = "image")]
    pub thumbnail: Option<String>,
}

/// Submission payload before normalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawListingPayload {
    pub name: String,
    #[serde(default)]
    pub category: Option<RawCategory>,
    #[serde(default, alias = "price")]
    pub base_price: Option<RawAmount>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<RawVariant>,
}

impl RawListingPayload {
    /// Normalize into the canonical draft and validate it.
    pub fn normalize(self) -> DomainResult<ListingDraft> {
        let category = match self.category {
            Some(RawCategory::Name(name)) => Category::named(name.trim()),
            Some(RawCategory::Object { id, name }) => Category {
                id: id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
                name: name.trim().to_string(),
            },
            None => return Err(DomainError::validation("category is required")),
        };

        let base_price = match &self.base_price {
            Some(amount) => amount.to_money("price")?,
            None => return Err(DomainError::validation("price is required")),
        };

        let variants = self
            .variants
            .into_iter()
            .map(|v| normalize_variant(v, base_price))
            .collect::<DomainResult<Vec<_>>>()?;

        let draft = ListingDraft {
            name: self.name.trim().to_string(),
            category,
            base_price,
            description: self.description.unwrap_or_default().trim().to_string(),
            images: self.images.into_iter().map(|url| url.trim().to_string()).collect(),
            variants,
        };
        draft.validate()?;
        Ok(draft)
    }
}

fn normalize_variant(raw: RawVariant, base_price: Money) -> DomainResult<Variant> {
    let nested = raw.attributes.unwrap_or_default();
    let price = match &raw.price {
        Some(amount) => amount.to_money("variant price")?,
        None => base_price,
    };
    let stock = match raw.stock {
        None => 0,
        Some(n) if n < 0 => {
            return Err(DomainError::validation(format!(
                "variant '{}' has negative stock",
                raw.name
            )));
        }
        Some(n) => u32::try_from(n)
            .map_err(|_| DomainError::validation(format!("variant '{}' stock is too large", raw.name)))?,
    };

    Ok(Variant {
        name: raw.name.trim().to_string(),
        size: non_blank(raw.size.or(nested.size)),
        color: non_blank(raw.color.or(nested.color)),
        price,
        stock,
        thumbnail: non_blank(raw.thumbnail),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
