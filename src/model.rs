//! Data models for the lattice packing optimizer.
//!
//! This module defines the records the optimizer consumes and produces:
//! - `Comb`: a slotted strip type from the comb catalog
//! - `Cardboard`: an outer shipping box from the cardboard catalog
//! - `ItemSpec`: the item to be stored in the lattice cells
//! - `NotchSelection`: which notches of a comb are engaged
//!
//! Catalog records are read-only once loaded; `NotchSelection` is the only
//! mutable piece and is owned by a `Session`.

use serde::{Deserialize, Deserializer, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::validation::{validate_non_negative, validate_positive};

/// Catalog key of a comb type.
pub type CombId = String;

/// Validation error for catalog records and item specs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Empty catalog: no {0} available")]
    EmptyCatalog(&'static str),
    #[error("Notch selection for comb '{comb}' has {actual} entries, expected {expected}")]
    SelectionLength {
        comb: CombId,
        expected: usize,
        actual: usize,
    },
}

fn dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    validate_positive(value, name).map_err(ValidationError::InvalidDimension)
}

fn offset(value: f64, name: &str) -> Result<(), ValidationError> {
    validate_non_negative(value, name).map_err(ValidationError::InvalidDimension)
}

fn price(value: f64, name: &str) -> Result<(), ValidationError> {
    validate_non_negative(value, name).map_err(ValidationError::InvalidPrice)
}

/// Accepted spellings of an id in fetched catalogs.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl RawId {
    fn into_id(self) -> CombId {
        match self {
            RawId::Text(text) => text.trim().to_string(),
            RawId::Int(value) => value.to_string(),
            RawId::Float(value) => value.to_string(),
        }
    }

    /// `null`, `"none"`, empty strings and negative numbers mean "unbound".
    fn into_bind(self) -> Option<CombId> {
        match self {
            RawId::Int(value) if value < 0 => None,
            RawId::Float(value) if value < 0.0 => None,
            other => {
                let id = other.into_id();
                if id.is_empty() || id.eq_ignore_ascii_case("none") || id.starts_with('-') {
                    None
                } else {
                    Some(id)
                }
            }
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<CombId, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_id)
}

fn deserialize_bind<'de, D>(deserializer: D) -> Result<Option<CombId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.and_then(RawId::into_bind))
}

/// A slotted strip type.
///
/// Notches are cut at the boundaries between teeth; two perpendicular combs
/// slide into each other's engaged notches to form a lattice of cells.
///
/// # Fields
/// * `id` - Unique catalog key
/// * `bind` - Comb that must always sit on the opposite axis, if any
/// * `strict` - All notches are always engaged
/// * `tooths` - Ordered tooth lengths between consecutive notches
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "3NAC",
    "name": "3NAC",
    "bind": null,
    "strict": false,
    "width": 390.0,
    "depth": 205.0,
    "gap": 3.0,
    "margin": 5.5,
    "tooths": [185.0, 185.0],
    "price": 0.4
}))]
pub struct Comb {
    #[serde(deserialize_with = "deserialize_id")]
    #[schema(value_type = String)]
    pub id: CombId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_bind")]
    #[schema(value_type = Option<String>)]
    pub bind: Option<CombId>,
    #[serde(default)]
    pub strict: bool,
    pub width: f64,
    pub depth: f64,
    pub gap: f64,
    pub margin: f64,
    pub tooths: Vec<f64>,
    #[serde(default)]
    pub price: f64,
}

impl Comb {
    /// Creates an unbound, non-strict comb with validation.
    ///
    /// # Examples
    /// ```
    /// use lattice_pack::model::Comb;
    ///
    /// let comb = Comb::new("3NAC", 390.0, 205.0, 3.0, 5.5, vec![185.0, 185.0]);
    /// assert!(comb.is_ok());
    ///
    /// let invalid = Comb::new("broken", -1.0, 205.0, 3.0, 5.5, vec![185.0]);
    /// assert!(invalid.is_err());
    /// ```
    pub fn new(
        id: impl Into<CombId>,
        width: f64,
        depth: f64,
        gap: f64,
        margin: f64,
        tooths: Vec<f64>,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        let comb = Self {
            name: id.clone(),
            id,
            bind: None,
            strict: false,
            width,
            depth,
            gap,
            margin,
            tooths,
            price: 0.0,
        };
        comb.validate()?;
        Ok(comb)
    }

    /// Binds this comb to a partner on the opposite axis.
    pub fn with_bind(mut self, partner: impl Into<CombId>) -> Self {
        self.bind = Some(partner.into());
        self
    }

    /// Marks the comb as strict (every notch engaged).
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the unit price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    /// Checks the physical dimensions and price of the comb.
    pub fn validate(&self) -> Result<(), ValidationError> {
        dimension(self.width, "Comb width")?;
        dimension(self.depth, "Comb depth")?;
        offset(self.gap, "Comb gap")?;
        offset(self.margin, "Comb margin")?;
        for (idx, &tooth) in self.tooths.iter().enumerate() {
            dimension(tooth, &format!("Tooth #{} of comb '{}'", idx + 1, self.id))?;
        }
        price(self.price, "Comb price")?;
        Ok(())
    }

    /// Number of notch positions (`tooths.len() + 1`).
    #[inline]
    pub fn notch_count(&self) -> usize {
        self.tooths.len() + 1
    }

    /// Checks whether this comb's binding allows `other` on the opposite axis.
    #[inline]
    pub fn accepts_partner(&self, other: &Comb) -> bool {
        match &self.bind {
            None => true,
            Some(target) => *target == other.id,
        }
    }
}

/// Outer corrugated box used to ship finished lattices in bulk.
///
/// `width` and `length` describe the usable floor; lattices may be laid in
/// either orientation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "K-800",
    "width": 800.0,
    "length": 800.0,
    "depth": 220.0,
    "price": 4.5
}))]
pub struct Cardboard {
    #[serde(default)]
    pub name: Option<String>,
    pub width: f64,
    pub length: f64,
    pub depth: f64,
    pub price: f64,
}

impl Cardboard {
    /// Creates a new outer box after validating the parameters.
    pub fn new(
        name: Option<String>,
        width: f64,
        length: f64,
        depth: f64,
        price: f64,
    ) -> Result<Self, ValidationError> {
        let cardboard = Self {
            name,
            width,
            length,
            depth,
            price,
        };
        cardboard.validate()?;
        Ok(cardboard)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        dimension(self.width, "Cardboard width")?;
        dimension(self.length, "Cardboard length")?;
        dimension(self.depth, "Cardboard depth")?;
        price(self.price, "Cardboard price")?;
        Ok(())
    }
}

/// The item that should be stored, one per lattice cell.
///
/// # Fields
/// * `w` / `d` / `h` - Footprint along axis 1, axis 2 and its height
/// * `m` - Allowed slack per side; a cell may be up to `2 * m` larger
/// * `q` - Total quantity that has to be shipped
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "w": 50.0, "d": 50.0, "h": 50.0, "m": 2.0, "q": 100 }))]
pub struct ItemSpec {
    pub w: f64,
    pub d: f64,
    pub h: f64,
    pub m: f64,
    pub q: u32,
}

impl ItemSpec {
    /// Creates an item spec with validation.
    pub fn new(w: f64, d: f64, h: f64, m: f64, q: u32) -> Result<Self, ValidationError> {
        let item = Self { w, d, h, m, q };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        dimension(self.w, "Item width")?;
        dimension(self.d, "Item depth")?;
        dimension(self.h, "Item height")?;
        dimension(self.m, "Item margin")?;
        if self.q == 0 {
            return Err(ValidationError::InvalidQuantity(
                "Quantity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Engaged/disengaged flag per notch position of one comb.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Vec<bool>)]
pub struct NotchSelection(Vec<bool>);

impl NotchSelection {
    /// Every notch engaged.
    pub fn all(len: usize) -> Self {
        Self(vec![true; len])
    }

    /// No notch engaged.
    pub fn none(len: usize) -> Self {
        Self(vec![false; len])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether notch `idx` is engaged; out-of-range indices are not.
    #[inline]
    pub fn is_active(&self, idx: usize) -> bool {
        self.0.get(idx).copied().unwrap_or(false)
    }

    /// Sets notch `idx`. Returns `false` if the index is out of range.
    pub fn set(&mut self, idx: usize, active: bool) -> bool {
        match self.0.get_mut(idx) {
            Some(slot) => {
                *slot = active;
                true
            }
            None => false,
        }
    }

    /// Flips notch `idx` and returns its new state.
    pub fn toggle(&mut self, idx: usize) -> Option<bool> {
        let slot = self.0.get_mut(idx)?;
        *slot = !*slot;
        Some(*slot)
    }

    /// Number of engaged notches.
    pub fn active_count(&self) -> usize {
        self.iter().filter(|&active| active).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Checks that the selection matches the notch count of `comb`.
    pub fn check_len(&self, comb: &Comb) -> Result<(), ValidationError> {
        if self.len() != comb.notch_count() {
            return Err(ValidationError::SelectionLength {
                comb: comb.id.clone(),
                expected: comb.notch_count(),
                actual: self.len(),
            });
        }
        Ok(())
    }
}

impl From<Vec<bool>> for NotchSelection {
    fn from(flags: Vec<bool>) -> Self {
        Self(flags)
    }
}
