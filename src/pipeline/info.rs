//! Capability descriptors for the node system.
//!
//! Each node declares what it consumes (`input_info`) and what it produces
//! (`output_info`). The pipeline uses these to validate edge connections and
//! nodes use them to validate their own outputs.

use crate::types::{AttributeKind, DatasetKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Attribute name wildcard.
pub const ANY_ATTRIBUTE: &str = "any";

/// Declared dataset/attribute capabilities of one side of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInfo {
    datasets: BTreeSet<DatasetKind>,
    attribute_types: BTreeSet<AttributeKind>,
    attributes: BTreeSet<String>,
}

impl PipelineInfo {
    /// Descriptor over the given dataset kinds, any attribute.
    pub fn new(datasets: &[DatasetKind]) -> Self {
        Self {
            datasets: datasets.iter().copied().collect(),
            attribute_types: BTreeSet::from([AttributeKind::Any]),
            attributes: BTreeSet::from([ANY_ATTRIBUTE.to_string()]),
        }
    }

    /// Accepts/produces every dataset kind.
    pub fn any() -> Self {
        Self::new(&[DatasetKind::Any])
    }

    /// Requires/produces no dataset.
    pub fn none() -> Self {
        Self::new(&[DatasetKind::None])
    }

    pub fn with_attribute_types(mut self, types: &[AttributeKind]) -> Self {
        self.attribute_types = types.iter().copied().collect();
        self
    }

    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        self.attributes = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn datasets(&self) -> &BTreeSet<DatasetKind> {
        &self.datasets
    }

    pub fn attribute_types(&self) -> &BTreeSet<AttributeKind> {
        &self.attribute_types
    }

    pub fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    /// Whether a concrete dataset kind is covered by this descriptor.
    pub fn accepts(&self, kind: DatasetKind) -> bool {
        if self.datasets.contains(&DatasetKind::None) {
            return false;
        }
        self.datasets.contains(&DatasetKind::Any) || self.datasets.contains(&kind)
    }

    /// Whether something producing `self` can feed something consuming `input`.
    pub fn is_compatible_with(&self, input: &PipelineInfo) -> bool {
        let produces_none = self.datasets.contains(&DatasetKind::None);
        let requires_none = input.datasets.contains(&DatasetKind::None);
        if produces_none || requires_none {
            return produces_none && requires_none;
        }

        let datasets_ok = self.datasets.contains(&DatasetKind::Any)
            || input.datasets.contains(&DatasetKind::Any)
            || !self.datasets.is_disjoint(&input.datasets);

        let types_ok = self.attribute_types.contains(&AttributeKind::Any)
            || input.attribute_types.contains(&AttributeKind::Any)
            || !self.attribute_types.is_disjoint(&input.attribute_types);

        let names_ok = self.attributes.contains(ANY_ATTRIBUTE)
            || input.attributes.contains(ANY_ATTRIBUTE)
            || !self.attributes.is_disjoint(&input.attributes);

        datasets_ok && types_ok && names_ok
    }
}

impl Default for PipelineInfo {
    fn default() -> Self {
        Self::any()
    }
}
