//! Job queue construction.
//!
//! Turns the filtered unit catalog into an ordered, immutable list of jobs.
//! Ordering is deterministic — regression type, then chiplet, then unit
//! name — so two runs with identical filters assign identical ordinals.
//! The ordinal is a stable resume key component.

use std::collections::HashSet;

use crate::catalog::{RunFilter, UnitCatalog, UnitEntry};
use crate::domain::Job;
use crate::error::{RegrunError, Result};

/// Build the job queue for a run.
///
/// Fails with a configuration error if a named chiplet or unit does not
/// exist in the catalog. An empty filter result is a valid zero-length
/// queue, not an error.
pub fn build_queue(catalog: &UnitCatalog, filter: &RunFilter) -> Result<Vec<Job>> {
    for chiplet in &filter.chiplets {
        if !catalog.has_chiplet(chiplet) {
            return Err(RegrunError::Configuration(format!(
                "unknown chiplet: {chiplet}"
            )));
        }
    }
    for unit in &filter.units {
        if !catalog.has_unit(unit) {
            return Err(RegrunError::Configuration(format!("unknown unit: {unit}")));
        }
    }

    let mut types: Vec<&String> = filter.regression_types.iter().collect();
    types.sort();
    types.dedup();

    let mut selected: Vec<&UnitEntry> = catalog
        .entries
        .iter()
        .filter(|e| filter.matches(e))
        .collect();
    selected.sort_by(|a, b| {
        a.chiplet
            .cmp(&b.chiplet)
            .then_with(|| a.unit_name.cmp(&b.unit_name))
    });

    let mut jobs = Vec::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for regression_type in types {
        for entry in &selected {
            // A catalog may list the same unit twice (e.g. two workareas);
            // identity is (type, unit), so only the first survives.
            if !seen.insert((regression_type.clone(), entry.unit_name.clone())) {
                tracing::warn!(
                    unit = %entry.unit_name,
                    regression = %regression_type,
                    "duplicate catalog entry ignored"
                );
                continue;
            }
            jobs.push(Job {
                regression_type: regression_type.clone(),
                ordinal: jobs.len(),
                unit_name: entry.unit_name.clone(),
                chiplet: entry.chiplet.clone(),
                workarea: entry.workarea.clone(),
            });
        }
    }

    tracing::debug!(jobs = jobs.len(), "job queue built");
    Ok(jobs)
}
