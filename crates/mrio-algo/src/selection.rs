//! Region/sector filters over an industry index.

use mrio_core::{FinalDemandVector, IndustryIndex, MrioError, MrioResult};
use serde::{Deserialize, Serialize};

/// A set of industries picked by region and sector labels.
///
/// An empty filter matches everything, so the default selection covers the
/// whole table. A selection naming regions but no sectors is *regional*:
/// stage decomposition then books production inside those regions as the
/// retail stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndustrySelection {
    pub regions: Vec<String>,
    pub sectors: Vec<String>,
}

impl IndustrySelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sectors<I, S>(mut self, sectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sectors = sectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_regional(&self) -> bool {
        !self.regions.is_empty() && self.sectors.is_empty()
    }

    /// Matching positions, ascending.
    ///
    /// Labels the index does not know fail with `UnknownIndustry` (the
    /// missing half of the pair is reported as `*`).
    pub fn resolve(&self, index: &IndustryIndex) -> MrioResult<Vec<usize>> {
        if let Some(region) = self.regions.iter().find(|r| !index.regions().contains(r)) {
            return Err(MrioError::unknown_industry(region.as_str(), "*"));
        }
        if let Some(sector) = self.sectors.iter().find(|s| !index.sectors().contains(s)) {
            return Err(MrioError::unknown_industry("*", sector.as_str()));
        }

        Ok(index
            .iter()
            .filter(|(_, industry)| {
                (self.regions.is_empty() || self.regions.contains(&industry.region))
                    && (self.sectors.is_empty() || self.sectors.contains(&industry.sector))
            })
            .map(|(pos, _)| pos)
            .collect())
    }

    /// Positions inside the selected regions regardless of sector. Empty
    /// when no region is named.
    pub fn region_positions(&self, index: &IndustryIndex) -> MrioResult<Vec<usize>> {
        if self.regions.is_empty() {
            return Ok(Vec::new());
        }
        IndustrySelection::all()
            .with_regions(self.regions.iter().cloned())
            .resolve(index)
    }

    /// Demand restricted to the selection.
    pub fn restrict(&self, demand: &FinalDemandVector) -> MrioResult<FinalDemandVector> {
        let positions = self.resolve(demand.index())?;
        Ok(demand.restricted_to(&positions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> IndustryIndex {
        IndustryIndex::from_regions_and_sectors(&["DE", "FR", "CN"], &["Steel", "Mining"]).unwrap()
    }

    #[test]
    fn test_empty_selection_covers_everything() {
        let selection = IndustrySelection::all();
        assert_eq!(selection.resolve(&index()).unwrap(), vec![0, 1, 2, 3, 4, 5]);
        assert!(!selection.is_regional());
    }

    #[test]
    fn test_region_and_sector_filters() {
        let index = index();
        let regional = IndustrySelection::all().with_regions(["FR", "DE"]);
        assert!(regional.is_regional());
        assert_eq!(regional.resolve(&index).unwrap(), vec![0, 1, 2, 3]);

        let mixed = IndustrySelection::all()
            .with_regions(["CN"])
            .with_sectors(["Mining"]);
        assert!(!mixed.is_regional());
        assert_eq!(mixed.resolve(&index).unwrap(), vec![5]);
        assert_eq!(mixed.region_positions(&index).unwrap(), vec![4, 5]);

        let sectoral = IndustrySelection::all().with_sectors(["Steel"]);
        assert_eq!(sectoral.resolve(&index).unwrap(), vec![0, 2, 4]);
        assert!(sectoral.region_positions(&index).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_label_rejected() {
        let result = IndustrySelection::all().with_regions(["XX"]).resolve(&index());
        assert!(matches!(
            result,
            Err(MrioError::UnknownIndustry { ref region, .. }) if region == "XX"
        ));
    }

    #[test]
    fn test_restrict_demand() {
        let index = index().into_shared();
        let demand = FinalDemandVector::new(index, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let restricted = IndustrySelection::all()
            .with_sectors(["Mining"])
            .restrict(&demand)
            .unwrap();
        assert_eq!(restricted.values(), &[0.0, 2.0, 0.0, 4.0, 0.0, 6.0]);
    }
}
