//! JSON export of a realization catalogue.
//!
//! One record per composite realization, flattened so downstream tools can
//! read it without knowing the catalogue's arena layout.

use crate::loader::HarnessError;
use logictree_core::{LogicTreeMode, RealizationCatalogue, ResolvedModel};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// One composite realization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedRealization {
    pub index: usize,
    pub weight: f64,

    /// Source-model path, branch ids joined with `_`
    pub source_model_path: String,

    /// GSIM path, branch ids joined with `_`
    pub gsim_path: String,

    /// Models of both paths, source model first
    pub models: Vec<ResolvedModel>,
}

/// Complete catalogue export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueExport {
    /// Scenario name, if the catalogue came from a built-in scenario
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    /// Master seed, if sampling was involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub mode: LogicTreeMode,
    pub source_model_tree: String,
    pub gsim_tree: String,
    pub total_weight: f64,
    pub realizations: Vec<ExportedRealization>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl CatalogueExport {
    /// Flattens a catalogue.
    pub fn from_catalogue(catalogue: &RealizationCatalogue) -> Self {
        let realizations = catalogue
            .iter()
            .map(|rlz| ExportedRealization {
                index: rlz.index(),
                weight: rlz.weight(),
                source_model_path: rlz.source_model().path.to_string(),
                gsim_path: rlz.gsim().path.to_string(),
                models: rlz.models().cloned().collect(),
            })
            .collect();

        Self {
            scenario: None,
            seed: None,
            mode: catalogue.mode(),
            source_model_tree: catalogue.source_model().tree_id().to_string(),
            gsim_tree: catalogue.gsim().tree_id().to_string(),
            total_weight: catalogue.total_weight(),
            realizations,
            warnings: catalogue.warnings().iter().map(ToString::to_string).collect(),
        }
    }

    /// Tags the export with the scenario that produced it.
    pub fn with_scenario(mut self, scenario: &str, seed: u64) -> Self {
        self.scenario = Some(scenario.to_string());
        if self.mode.is_sampling() {
            self.seed = Some(seed);
        }
        self
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), HarnessError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| HarnessError::Encode {
            path: path.to_string(),
            source,
        })?;
        let io_err = |source: std::io::Error| HarnessError::Io {
            path: path.to_string(),
            source,
        };
        let mut file = File::create(path).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{ScenarioId, FOUR_GMPE_NAMES};
    use logictree_core::{AxisParams, ComposedLogicTree};

    #[test]
    fn test_export_four_gmpe() {
        let (sm, gsim) = ScenarioId::FourGmpe.trees().unwrap();
        let catalogue = ComposedLogicTree::new(&sm, &gsim)
            .build(&AxisParams::enumerate(), &AxisParams::enumerate())
            .unwrap();

        let export = CatalogueExport::from_catalogue(&catalogue).with_scenario("four_gmpe", 42);
        assert_eq!(export.scenario.as_deref(), Some("four_gmpe"));
        assert_eq!(export.seed, None);
        assert_eq!(export.realizations.len(), 4);
        assert_eq!(export.gsim_tree, "lt1");

        for (rlz, gsim) in export.realizations.iter().zip(FOUR_GMPE_NAMES) {
            assert_eq!(rlz.weight, 0.25);
            assert_eq!(rlz.models.last().unwrap().value, gsim);
        }

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["mode"]["mode"], "enumeration");
        assert_eq!(json["realizations"][1]["gsim_path"], "b2");
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn test_write_to_file() {
        let (sm, gsim) = ScenarioId::EmptyTree.trees().unwrap();
        let catalogue = ComposedLogicTree::new(&sm, &gsim)
            .build(&AxisParams::enumerate(), &AxisParams::enumerate())
            .unwrap();
        let export = CatalogueExport::from_catalogue(&catalogue);

        let path = std::env::temp_dir().join("logictree_sim_export_test.json");
        let path = path.to_string_lossy().to_string();
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: CatalogueExport = serde_json::from_str(&text).unwrap();
        assert_eq!(back.realizations.len(), 1);
        assert_eq!(back.total_weight, 1.0);
        let _ = std::fs::remove_file(&path);
    }
}
