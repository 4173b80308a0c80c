//! Bidirectional mapping between industries and matrix positions.
//!
//! An EE-MRIO table is indexed by (region, sector) pairs. Every matrix and
//! vector in the engine uses the same ordering, fixed once when the table is
//! loaded: the insertion order of the source table. The index is validated
//! eagerly (no duplicates, no empty labels) so later operations can assume
//! aligned, in-bounds positions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{MrioError, MrioResult};

/// A (region, sector) pair, the atomic unit of the model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Industry {
    pub region: String,
    pub sector: String,
}

impl Industry {
    pub fn new(region: impl Into<String>, sector: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            sector: sector.into(),
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.sector)
    }
}

/// Fixed, insertion-ordered index of industries.
///
/// Shared behind an [`Arc`] by every table built on it; two tables are
/// aligned when they hold the same index (pointer-equal or label-equal).
#[derive(Debug, Clone)]
pub struct IndustryIndex {
    industries: Vec<Industry>,
    positions: HashMap<Industry, usize>,
    regions: Vec<String>,
    sectors: Vec<String>,
}

impl IndustryIndex {
    /// Build from explicit (region, sector) pairs in source-table order.
    pub fn from_pairs<I, R, S>(pairs: I) -> MrioResult<Self>
    where
        I: IntoIterator<Item = (R, S)>,
        R: Into<String>,
        S: Into<String>,
    {
        let mut industries = Vec::new();
        let mut positions = HashMap::new();
        let mut regions: Vec<String> = Vec::new();
        let mut sectors: Vec<String> = Vec::new();

        for (region, sector) in pairs {
            let industry = Industry::new(region, sector);
            if industry.region.is_empty() || industry.sector.is_empty() {
                return Err(MrioError::InvalidTable(format!(
                    "empty label at position {}",
                    industries.len()
                )));
            }
            if positions.contains_key(&industry) {
                return Err(MrioError::InvalidTable(format!(
                    "duplicate industry {industry}"
                )));
            }
            if !regions.contains(&industry.region) {
                regions.push(industry.region.clone());
            }
            if !sectors.contains(&industry.sector) {
                sectors.push(industry.sector.clone());
            }
            positions.insert(industry.clone(), industries.len());
            industries.push(industry);
        }

        Ok(Self {
            industries,
            positions,
            regions,
            sectors,
        })
    }

    /// Build the region-major cartesian product of `regions` × `sectors`,
    /// the layout EE-MRIO databases use (every region carries every sector).
    pub fn from_regions_and_sectors<R, S>(regions: &[R], sectors: &[S]) -> MrioResult<Self>
    where
        R: AsRef<str>,
        S: AsRef<str>,
    {
        let pairs = regions.iter().flat_map(|region| {
            sectors
                .iter()
                .map(move |sector| (region.as_ref().to_string(), sector.as_ref().to_string()))
        });
        Self::from_pairs(pairs)
    }

    /// Wrap in an `Arc` for sharing between tables.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Position of a (region, sector) pair.
    pub fn position(&self, region: &str, sector: &str) -> MrioResult<usize> {
        // HashMap<Industry, _> needs an owned key for lookup
        self.positions
            .get(&Industry::new(region, sector))
            .copied()
            .ok_or_else(|| MrioError::unknown_industry(region, sector))
    }

    /// Position of an industry value.
    pub fn position_of(&self, industry: &Industry) -> MrioResult<usize> {
        self.positions
            .get(industry)
            .copied()
            .ok_or_else(|| MrioError::unknown_industry(&industry.region, &industry.sector))
    }

    /// Industry at a position.
    pub fn industry(&self, position: usize) -> Option<&Industry> {
        self.industries.get(position)
    }

    /// `region/sector` label for a position, or `#<pos>` when out of range.
    pub fn label(&self, position: usize) -> String {
        self.industry(position)
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("#{position}"))
    }

    pub fn len(&self) -> usize {
        self.industries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.industries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Industry)> {
        self.industries.iter().enumerate()
    }

    /// Regions in first-appearance order.
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Sectors in first-appearance order.
    pub fn sectors(&self) -> &[String] {
        &self.sectors
    }

    pub fn positions_in_region(&self, region: &str) -> Vec<usize> {
        self.iter()
            .filter(|(_, ind)| ind.region == region)
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn positions_of_sector(&self, sector: &str) -> Vec<usize> {
        self.iter()
            .filter(|(_, ind)| ind.sector == sector)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Whether `other` indexes the same industries in the same order.
    pub fn is_aligned_with(&self, other: &IndustryIndex) -> bool {
        std::ptr::eq(self, other) || self.industries == other.industries
    }

    /// Fail with [`MrioError::DimensionMismatch`] unless aligned with `other`.
    pub fn ensure_aligned(&self, other: &IndustryIndex, what: &str) -> MrioResult<()> {
        if self.is_aligned_with(other) {
            Ok(())
        } else {
            Err(MrioError::dimension(
                format!("{what} (industry index differs)"),
                self.len(),
                other.len(),
            ))
        }
    }
}

impl PartialEq for IndustryIndex {
    fn eq(&self, other: &Self) -> bool {
        self.is_aligned_with(other)
    }
}
