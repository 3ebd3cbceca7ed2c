//! Unit catalog and run filters.
//!
//! The catalog is supplied externally (unit/workarea table lookup is not
//! this crate's concern); it is just the input contract for the queue
//! builder.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One row of the externally supplied unit table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub unit_name: String,
    pub chiplet: String,
    pub workarea: PathBuf,
}

/// The full unit table for a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitCatalog {
    pub entries: Vec<UnitEntry>,
}

impl UnitCatalog {
    pub fn new(entries: Vec<UnitEntry>) -> Self {
        Self { entries }
    }

    /// Load a catalog from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let catalog = serde_yaml::from_str(&raw)?;
        Ok(catalog)
    }

    pub fn has_chiplet(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.chiplet == name)
    }

    pub fn has_unit(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.unit_name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Filters selecting which jobs a run includes.
///
/// Empty lists mean "no restriction" for chiplets and units. The regression
/// type list is the set of requested types; an empty list yields an empty
/// queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFilter {
    pub chiplets: Vec<String>,
    pub units: Vec<String>,
    pub regression_types: Vec<String>,
}

impl RunFilter {
    /// True if the entry passes the chiplet and unit allow-lists.
    pub fn matches(&self, entry: &UnitEntry) -> bool {
        (self.chiplets.is_empty() || self.chiplets.contains(&entry.chiplet))
            && (self.units.is_empty() || self.units.contains(&entry.unit_name))
    }
}
