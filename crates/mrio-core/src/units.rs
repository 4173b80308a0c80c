//! Impact categories and their display units.
//!
//! Extension data is stored in the database's base unit (kg CO2-eq, m³, TJ,
//! ...). Reports usually want a scaled unit instead (Mt CO2-eq, km³). A
//! [`UnitConversion`] divides the raw value and relabels it; categories
//! without one are reported in their base unit.
//!
//! # Usage
//!
//! ```
//! use mrio_core::units::{ImpactCategory, UnitConversion};
//!
//! let ghg = ImpactCategory::new("GHG emissions", "kg CO2-eq")
//!     .with_conversion(UnitConversion::new(1e9, "Mt CO2-eq"));
//!
//! let (value, unit) = ghg.display(2.5e9);
//! assert_eq!(value, 2.5);
//! assert_eq!(unit, "Mt CO2-eq");
//! ```

use serde::{Deserialize, Serialize};

/// Scale factor and label applied when presenting a category's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    /// Raw values are divided by this factor.
    pub divisor: f64,
    /// Label of the converted unit.
    pub unit: String,
}

impl UnitConversion {
    pub fn new(divisor: f64, unit: impl Into<String>) -> Self {
        Self {
            divisor,
            unit: unit.into(),
        }
    }
}

/// One row of an extension matrix: an environmental or resource category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactCategory {
    pub name: String,
    /// Base unit of the raw intensities.
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<UnitConversion>,
}

impl ImpactCategory {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            conversion: None,
        }
    }

    pub fn with_conversion(mut self, conversion: UnitConversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    /// Convert a raw value to the display unit.
    pub fn display(&self, raw: f64) -> (f64, &str) {
        match &self.conversion {
            Some(conv) if conv.divisor != 0.0 => (raw / conv.divisor, conv.unit.as_str()),
            _ => (raw, self.unit.as_str()),
        }
    }

    /// Unit label values are displayed in.
    pub fn display_unit(&self) -> &str {
        self.conversion
            .as_ref()
            .map(|c| c.unit.as_str())
            .unwrap_or(self.unit.as_str())
    }
}
