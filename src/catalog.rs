//! Comb and cardboard catalogs.
//!
//! Catalogs are loaded once at startup, either from a JSON file or from the
//! built-in table, and are read-only afterwards.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::geometry::expected_width;
use crate::model::{Cardboard, Comb, CombId, ValidationError};
use crate::types::approx_eq;

/// Maximum deviation between the declared and the geometric comb width.
const WIDTH_TOLERANCE: f64 = 1e-6;

/// Errors while loading or checking a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Could not read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid catalog JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Comb id '{0}' is used more than once")]
    DuplicateComb(CombId),
    #[error("Comb '{comb}' is bound to unknown comb '{target}'")]
    UnknownBind { comb: CombId, target: CombId },
    #[error("Comb '{comb}' declares width {declared} but its notch layout needs {expected}")]
    WidthMismatch {
        comb: CombId,
        declared: f64,
        expected: f64,
    },
}

/// A comb whose declared width differs from its geometric width.
#[derive(Clone, Debug, PartialEq)]
pub struct WidthMismatch {
    pub comb: CombId,
    pub declared: f64,
    pub expected: f64,
}

/// All comb types and outer boxes available to the optimizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Catalog {
    pub combs: Vec<Comb>,
    #[serde(default)]
    pub cardboards: Vec<Cardboard>,
}

impl Catalog {
    pub fn new(combs: Vec<Comb>, cardboards: Vec<Cardboard>) -> Self {
        Self { combs, cardboards }
    }

    /// Static fallback table used when no catalog file is configured.
    pub fn builtin() -> Self {
        let combs = vec![
            Comb {
                id: "17NAC".to_string(),
                name: "17NAC".to_string(),
                bind: None,
                strict: false,
                width: 390.0,
                depth: 205.0,
                gap: 3.0,
                margin: 9.5,
                tooths: vec![20.0; 16],
                price: 0.35,
            },
            Comb {
                id: "3NAC".to_string(),
                name: "3NAC".to_string(),
                bind: None,
                strict: false,
                width: 390.0,
                depth: 205.0,
                gap: 3.0,
                margin: 5.5,
                tooths: vec![185.0, 185.0],
                price: 0.25,
            },
        ];

        let cardboards = vec![
            Cardboard {
                name: Some("K-400".to_string()),
                width: 400.0,
                length: 400.0,
                depth: 220.0,
                price: 1.8,
            },
            Cardboard {
                name: Some("K-800x400".to_string()),
                width: 800.0,
                length: 400.0,
                depth: 220.0,
                price: 3.1,
            },
            Cardboard {
                name: Some("K-800".to_string()),
                width: 800.0,
                length: 800.0,
                depth: 220.0,
                price: 5.2,
            },
        ];

        Self { combs, cardboards }
    }

    /// Parses and validates a catalog from JSON text.
    pub fn from_json_str(raw: &str, strict_width: bool) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_json::from_str(raw)?;
        catalog.validate(strict_width)?;
        Ok(catalog)
    }

    /// Reads, parses and validates a catalog file.
    pub fn from_path(path: &Path, strict_width: bool) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw, strict_width)
    }

    /// Looks up a comb by id.
    pub fn comb(&self, id: &str) -> Option<&Comb> {
        self.combs.iter().find(|c| c.id == id)
    }

    /// Lists combs whose declared width disagrees with their notch layout.
    pub fn width_mismatches(&self) -> Vec<WidthMismatch> {
        self.combs
            .iter()
            .filter_map(|comb| {
                let expected = expected_width(comb);
                if approx_eq(comb.width, expected, WIDTH_TOLERANCE) {
                    None
                } else {
                    Some(WidthMismatch {
                        comb: comb.id.clone(),
                        declared: comb.width,
                        expected,
                    })
                }
            })
            .collect()
    }

    /// Checks records, id uniqueness and bind targets.
    ///
    /// Width mismatches are logged and tolerated unless `strict_width` is
    /// set; the declared width is then only used for the lattice footprint.
    pub fn validate(&self, strict_width: bool) -> Result<(), CatalogError> {
        if self.combs.is_empty() {
            return Err(ValidationError::EmptyCatalog("combs").into());
        }
        if self.cardboards.is_empty() {
            return Err(ValidationError::EmptyCatalog("cardboards").into());
        }

        let mut ids = HashSet::new();
        for comb in &self.combs {
            comb.validate()?;
            if !ids.insert(comb.id.as_str()) {
                return Err(CatalogError::DuplicateComb(comb.id.clone()));
            }
        }

        for comb in &self.combs {
            if let Some(target) = &comb.bind {
                if !ids.contains(target.as_str()) {
                    return Err(CatalogError::UnknownBind {
                        comb: comb.id.clone(),
                        target: target.clone(),
                    });
                }
            }
        }

        for cardboard in &self.cardboards {
            cardboard.validate()?;
        }

        for mismatch in self.width_mismatches() {
            if strict_width {
                return Err(CatalogError::WidthMismatch {
                    comb: mismatch.comb,
                    declared: mismatch.declared,
                    expected: mismatch.expected,
                });
            }
            log::warn!(
                "⚠️ Comb '{}' declares width {} but its notch layout needs {}",
                mismatch.comb,
                mismatch.declared,
                mismatch.expected
            );
        }

        Ok(())
    }
}
