//! Immutable per-job view of a group's document type catalog

use serde::{Deserialize, Serialize};

use super::entity::{DocumentTypeId, DocumentTypeSpec};
use super::normalizer::normalize;

/// Where the candidates of a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSource {
    /// The group has its own document type configuration
    Group,
    /// The group has no configuration; the global catalog applies
    Global,
}

/// Ordered candidate list resolved once per unit of work.
///
/// Candidates are sorted by normalized name length, longest first. The sort
/// is stable so equally long names keep their configured order.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    source: CatalogSource,
    candidates: Vec<DocumentTypeSpec>,
}

impl CatalogSnapshot {
    /// Builds a snapshot from a group's own configuration
    pub fn from_group(types: Vec<DocumentTypeSpec>) -> Self {
        Self::sorted(CatalogSource::Group, types)
    }

    /// Builds a snapshot from the global catalog; every type is required
    pub fn from_global(types: Vec<DocumentTypeSpec>) -> Self {
        let types = types
            .into_iter()
            .map(|t| t.with_required(true))
            .collect();
        Self::sorted(CatalogSource::Global, types)
    }

    fn sorted(source: CatalogSource, mut candidates: Vec<DocumentTypeSpec>) -> Self {
        candidates.sort_by_key(|c| std::cmp::Reverse(normalize(&c.name).chars().count()));
        Self { source, candidates }
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }

    pub fn candidates(&self) -> &[DocumentTypeSpec] {
        &self.candidates
    }

    pub fn find(&self, id: &DocumentTypeId) -> Option<&DocumentTypeSpec> {
        self.candidates.iter().find(|c| &c.id == id)
    }

    /// Types the group expects to be present
    pub fn required_types(&self) -> impl Iterator<Item = &DocumentTypeSpec> {
        self.candidates.iter().filter(|c| c.required)
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(snapshot: &CatalogSnapshot) -> Vec<&str> {
        snapshot.candidates().iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_sorted_longest_first() {
        let snapshot = CatalogSnapshot::from_group(vec![
            DocumentTypeSpec::new("1", "Contrato"),
            DocumentTypeSpec::new("2", "Contrato de Trabajo"),
            DocumentTypeSpec::new("3", "Cédula"),
        ]);

        assert_eq!(names(&snapshot), vec!["Contrato de Trabajo", "Contrato", "Cédula"]);
    }

    #[test]
    fn test_ties_keep_configured_order() {
        let snapshot = CatalogSnapshot::from_group(vec![
            DocumentTypeSpec::new("1", "Poder"),
            DocumentTypeSpec::new("2", "Boleta"),
            DocumentTypeSpec::new("3", "Pagos"),
        ]);

        assert_eq!(names(&snapshot), vec!["Boleta", "Poder", "Pagos"]);
    }

    #[test]
    fn test_global_types_are_required() {
        let snapshot = CatalogSnapshot::from_global(vec![
            DocumentTypeSpec::new("1", "Contrato"),
            DocumentTypeSpec::new("2", "Finiquito"),
        ]);

        assert_eq!(snapshot.source(), CatalogSource::Global);
        assert_eq!(snapshot.required_types().count(), 2);
    }

    #[test]
    fn test_find_by_id() {
        let snapshot = CatalogSnapshot::from_group(vec![DocumentTypeSpec::new("7", "Mandato")]);
        assert_eq!(
            snapshot.find(&DocumentTypeId::new("7")).map(|c| c.name.as_str()),
            Some("Mandato")
        );
        assert!(snapshot.find(&DocumentTypeId::new("8")).is_none());
    }
}
