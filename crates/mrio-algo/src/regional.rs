//! Aggregation of per-industry values over regions.

use mrio_core::{IndustryIndex, MrioError, MrioResult};
use serde::Serialize;

use crate::leontief::LeontiefInverse;

/// One region's share of an aggregated quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionTotal {
    pub region: String,
    pub value: f64,
    /// value / Σ values, zero when the sum is zero.
    pub share: f64,
}

/// Sum `values` (one per industry) over the region each industry sits in.
///
/// Regions come back in index order, including those whose total is zero.
pub fn aggregate_by_region(index: &IndustryIndex, values: &[f64]) -> MrioResult<Vec<RegionTotal>> {
    if values.len() != index.len() {
        return Err(MrioError::dimension("regional aggregation", index.len(), values.len()));
    }

    let mut totals: Vec<RegionTotal> = index
        .regions()
        .iter()
        .map(|region| RegionTotal {
            region: region.clone(),
            value: 0.0,
            share: 0.0,
        })
        .collect();

    for (pos, industry) in index.iter() {
        if let Some(slot) = totals.iter_mut().find(|t| t.region == industry.region) {
            slot.value += values[pos];
        }
    }

    let sum: f64 = totals.iter().map(|t| t.value).sum();
    if sum != 0.0 {
        for t in &mut totals {
            t.share = t.value / sum;
        }
    }
    Ok(totals)
}

/// Output required from each supplying region per unit of final demand
/// spread over `buyers`: Σ_{j ∈ buyers} L[i,j], grouped by the region of i.
///
/// The buyers' own unit of output is included (L contains the identity).
pub fn requirements_by_region(
    inverse: &LeontiefInverse,
    buyers: &[usize],
) -> MrioResult<Vec<RegionTotal>> {
    let n = inverse.n_industries();
    if let Some(&bad) = buyers.iter().find(|&&j| j >= n) {
        return Err(MrioError::dimension("buyer position", n, bad));
    }

    let per_supplier: Vec<f64> = (0..n)
        .map(|i| {
            let row = inverse.row(i);
            buyers.iter().map(|&j| row[j]).sum()
        })
        .collect();
    aggregate_by_region(inverse.index(), &per_supplier)
}
