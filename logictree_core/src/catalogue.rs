//! The ordered result set handed to hazard calculators.
//!
//! Per-axis realizations live in two flat arenas; each composite realization
//! is an index pair into them plus its joint weight. Indices are stable and
//! the catalogue is immutable once built.

use crate::error::ValidationWarning;
use crate::realization::{Realization, ResolvedModel, TreeRealizations};
use crate::tree::UncertaintyType;
use logictree_env::LogicTreeMode;
use serde::{Deserialize, Serialize};

/// One source-model realization joined with one GSIM realization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeRealization {
    pub index: usize,

    /// Index into the source-model arena
    pub source_model: usize,

    /// Index into the GSIM arena
    pub gsim: usize,

    pub weight: f64,
}

/// Ordered, immutable set of composite realizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizationCatalogue {
    mode: LogicTreeMode,
    source_model: TreeRealizations,
    gsim: TreeRealizations,
    entries: Vec<CompositeRealization>,
    warnings: Vec<ValidationWarning>,
}

impl RealizationCatalogue {
    /// Full cross product, source-model major; weight = product.
    pub(crate) fn cross_product(source_model: TreeRealizations, gsim: TreeRealizations) -> Self {
        let mut entries = Vec::with_capacity(source_model.len() * gsim.len());
        for sm in &source_model {
            for gs in &gsim {
                entries.push(CompositeRealization {
                    index: entries.len(),
                    source_model: sm.index,
                    gsim: gs.index,
                    weight: sm.weight * gs.weight,
                });
            }
        }

        Self::assemble(LogicTreeMode::Enumeration, source_model, gsim, entries, Vec::new())
    }

    /// Positional pairing of two sampled axes; each pair weighs 1/pairs.
    ///
    /// Axes that lost different numbers of draws are truncated to the shorter
    /// one and reported.
    pub(crate) fn paired(samples: u32, source_model: TreeRealizations, gsim: TreeRealizations) -> Self {
        let pairs = source_model.len().min(gsim.len());
        let mut warnings = Vec::new();
        if source_model.len() != gsim.len() {
            warnings.push(ValidationWarning::UnpairedSamples {
                source_model: source_model.len(),
                gsim: gsim.len(),
            });
        }

        let weight = 1.0 / pairs as f64;
        let entries = (0..pairs)
            .map(|index| CompositeRealization {
                index,
                source_model: index,
                gsim: index,
                weight,
            })
            .collect();

        Self::assemble(LogicTreeMode::Sampling { samples }, source_model, gsim, entries, warnings)
    }

    fn assemble(
        mode: LogicTreeMode,
        source_model: TreeRealizations,
        gsim: TreeRealizations,
        entries: Vec<CompositeRealization>,
        own: Vec<ValidationWarning>,
    ) -> Self {
        let warnings = source_model
            .warnings()
            .iter()
            .chain(gsim.warnings())
            .cloned()
            .chain(own)
            .collect();

        Self {
            mode,
            source_model,
            gsim,
            entries,
            warnings,
        }
    }

    pub fn mode(&self) -> LogicTreeMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Realization at a stable index.
    pub fn get(&self, index: usize) -> Option<RealizationView<'_>> {
        self.entries.get(index).map(|entry| RealizationView {
            catalogue: self,
            entry,
        })
    }

    /// Realizations in index order.
    pub fn iter(&self) -> impl Iterator<Item = RealizationView<'_>> + '_ {
        self.entries.iter().map(move |entry| RealizationView {
            catalogue: self,
            entry,
        })
    }

    pub fn entries(&self) -> &[CompositeRealization] {
        &self.entries
    }

    /// Per-axis realizations of the source-model tree.
    pub fn source_model(&self) -> &TreeRealizations {
        &self.source_model
    }

    /// Per-axis realizations of the GSIM tree.
    pub fn gsim(&self) -> &TreeRealizations {
        &self.gsim
    }

    /// Warnings of both axes followed by composition warnings.
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }
}

/// Borrowed view of one composite realization.
#[derive(Debug, Clone, Copy)]
pub struct RealizationView<'a> {
    catalogue: &'a RealizationCatalogue,
    entry: &'a CompositeRealization,
}

impl<'a> RealizationView<'a> {
    pub fn index(&self) -> usize {
        self.entry.index
    }

    pub fn weight(&self) -> f64 {
        self.entry.weight
    }

    pub fn source_model(&self) -> &'a Realization {
        &self.catalogue.source_model.realizations()[self.entry.source_model]
    }

    pub fn gsim(&self) -> &'a Realization {
        &self.catalogue.gsim.realizations()[self.entry.gsim]
    }

    /// Models resolved on both paths, source model first.
    pub fn models(&self) -> impl Iterator<Item = &'a ResolvedModel> {
        self.source_model().models.iter().chain(self.gsim().models.iter())
    }

    /// First model value selected for an uncertainty type on either path.
    pub fn value_of(&self, uncertainty_type: UncertaintyType) -> Option<&'a str> {
        self.models()
            .find(|m| m.uncertainty_type == uncertainty_type)
            .map(|m| m.value.as_str())
    }

    /// GSIM chosen for a tectonic region type.
    pub fn gsim_for_region(&self, trt: &str) -> Option<&'a str> {
        self.gsim().gsim_for_region(trt)
    }

    /// Both paths, `source~gsim`.
    pub fn label(&self) -> String {
        format!("{}~{}", self.source_model().path, self.gsim().path)
    }
}
