//! Dataset registry.
//!
//! Specs are collected in a [`RegistryBuilder`] at startup and frozen into a
//! read-only [`Registry`] before any pipeline is built. There is no way to
//! mutate a frozen registry, which keeps a run reproducible for a fixed
//! configuration.

mod errors;
mod global;

pub use errors::RegistryError;
pub use global::{global, install};

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::schema::DatasetSpec;

/// Mutable registration phase.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    specs: BTreeMap<String, DatasetSpec>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: DatasetSpec) -> Result<(), RegistryError> {
        spec.validate().map_err(|reason| RegistryError::InvalidSpec {
            id: spec.id.clone(),
            reason,
        })?;
        if self.specs.contains_key(&spec.id) {
            return Err(RegistryError::DuplicateDataset(spec.id));
        }
        self.specs.insert(spec.id.clone(), spec);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, spec: DatasetSpec) -> Result<Self, RegistryError> {
        self.register(spec)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Freezes the registry.
    pub fn build(self) -> Registry {
        let specs: BTreeMap<String, Arc<DatasetSpec>> = self
            .specs
            .into_iter()
            .map(|(id, spec)| (id, Arc::new(spec)))
            .collect();
        info!(datasets = specs.len(), "dataset registry frozen");
        Registry {
            specs: Arc::new(specs),
        }
    }
}

/// Read-only, cheaply clonable view of the registered datasets.
#[derive(Debug, Clone)]
pub struct Registry {
    specs: Arc<BTreeMap<String, Arc<DatasetSpec>>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registers every spec from a configuration table. The table key is the
    /// dataset id; a spec that names a different id is rejected.
    pub fn from_table(
        table: impl IntoIterator<Item = (String, DatasetSpec)>,
    ) -> Result<Self, RegistryError> {
        let mut builder = RegistryBuilder::new();
        for (id, mut spec) in table {
            if spec.id.is_empty() {
                spec.id = id;
            } else if spec.id != id {
                return Err(RegistryError::InvalidSpec {
                    id,
                    reason: format!("table key disagrees with spec id '{}'", spec.id),
                });
            }
            builder.register(spec)?;
        }
        Ok(builder.build())
    }

    pub fn resolve(&self, id: &str) -> Result<Arc<DatasetSpec>, RegistryError> {
        self.specs
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownDataset(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.specs.contains_key(id)
    }

    /// Dataset ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
