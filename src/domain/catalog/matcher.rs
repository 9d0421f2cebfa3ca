//! Filename classification against a catalog snapshot

use std::collections::HashMap;

use regex::Regex;
use tracing::warn;

use super::entity::{DocumentTypeId, DocumentTypeSpec};
use super::normalizer::normalize;
use super::snapshot::CatalogSnapshot;

/// Connector word ignored when building candidate patterns
const CONNECTOR: &str = "DE";

/// Compiled form of a single candidate
#[derive(Debug, Clone)]
pub enum CandidatePattern {
    Compiled(Regex),
    /// The candidate name has no words besides connectors
    NeverMatches,
}

impl CandidatePattern {
    /// Builds the pattern for a normalized candidate name.
    ///
    /// The first word is literal; each following word must be preceded by
    /// whitespace and an optional `DE` connector.
    pub fn for_name(normalized_name: &str) -> Self {
        let mut words = normalized_name
            .split_whitespace()
            .filter(|w| *w != CONNECTOR);

        let Some(first) = words.next() else {
            return Self::NeverMatches;
        };

        let mut pattern = regex::escape(first);
        for word in words {
            pattern.push_str(r"(?:\s+(?:DE\s+)?");
            pattern.push_str(&regex::escape(word));
            pattern.push(')');
        }

        match Regex::new(&pattern) {
            Ok(regex) => Self::Compiled(regex),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Failed to compile candidate pattern");
                Self::NeverMatches
            }
        }
    }

    pub fn is_match(&self, normalized: &str) -> bool {
        match self {
            Self::Compiled(regex) => regex.is_match(normalized),
            Self::NeverMatches => false,
        }
    }
}

/// Result of classifying a filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Matched(DocumentTypeSpec),
    Unclassified,
}

impl Classification {
    pub fn document_type(&self) -> Option<&DocumentTypeSpec> {
        match self {
            Self::Matched(spec) => Some(spec),
            Self::Unclassified => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}

/// Classifies filenames against a precompiled candidate table
#[derive(Debug, Clone)]
pub struct DocumentTypeMatcher {
    order: Vec<DocumentTypeSpec>,
    patterns: HashMap<DocumentTypeId, CandidatePattern>,
}

impl DocumentTypeMatcher {
    /// Compiles every candidate of the snapshot once
    pub fn compile(snapshot: &CatalogSnapshot) -> Self {
        let order = snapshot.candidates().to_vec();
        let patterns = order
            .iter()
            .map(|c| (c.id.clone(), CandidatePattern::for_name(&normalize(&c.name))))
            .collect();

        Self { order, patterns }
    }

    /// Classifies a raw filename
    pub fn classify(&self, filename: &str) -> Classification {
        self.classify_normalized(&normalize(filename))
    }

    /// Classifies an already normalized filename; first match in order wins
    pub fn classify_normalized(&self, normalized: &str) -> Classification {
        self.order
            .iter()
            .find(|candidate| {
                self.patterns
                    .get(&candidate.id)
                    .is_some_and(|p| p.is_match(normalized))
            })
            .map(|candidate| Classification::Matched(candidate.clone()))
            .unwrap_or(Classification::Unclassified)
    }

    pub fn pattern_for(&self, id: &DocumentTypeId) -> Option<&CandidatePattern> {
        self.patterns.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(names: &[&str]) -> DocumentTypeMatcher {
        let types = names
            .iter()
            .enumerate()
            .map(|(i, name)| DocumentTypeSpec::new(i.to_string(), *name))
            .collect();
        DocumentTypeMatcher::compile(&CatalogSnapshot::from_group(types))
    }

    fn matched_name(classification: Classification) -> Option<String> {
        classification.document_type().map(|t| t.name.clone())
    }

    #[test]
    fn test_longest_candidate_wins() {
        let matcher = matcher(&["CONTRATO", "CONTRATO DE TRABAJO"]);

        assert_eq!(
            matched_name(matcher.classify("contrato_de_trabajo_firmado.pdf")),
            Some("CONTRATO DE TRABAJO".to_string())
        );
    }

    #[test]
    fn test_connector_is_optional_in_filename() {
        let matcher = matcher(&["Certificado de Antigüedad"]);

        assert!(matcher.classify("certificado antiguedad.pdf").is_matched());
        assert!(matcher.classify("CERTIFICADO-DE-ANTIGUEDAD.pdf").is_matched());
    }

    #[test]
    fn test_shorter_candidate_matches_when_longer_does_not() {
        let matcher = matcher(&["CONTRATO", "CONTRATO DE TRABAJO"]);

        assert_eq!(
            matched_name(matcher.classify("contrato_arriendo.pdf")),
            Some("CONTRATO".to_string())
        );
    }

    #[test]
    fn test_unclassified_when_nothing_matches() {
        let matcher = matcher(&["FINIQUITO"]);
        assert_eq!(matcher.classify("liquidacion_marzo.pdf"), Classification::Unclassified);
    }

    #[test]
    fn test_connector_only_candidate_never_matches() {
        let matcher = matcher(&["De", "Poder"]);

        assert!(matches!(
            matcher.pattern_for(&DocumentTypeId::new("0")),
            Some(CandidatePattern::NeverMatches)
        ));
        assert_eq!(
            matched_name(matcher.classify("de poder.pdf")),
            Some("Poder".to_string())
        );
    }

    #[test]
    fn test_empty_catalog() {
        let matcher = matcher(&[]);
        assert!(matcher.is_empty());
        assert_eq!(matcher.classify("anything.pdf"), Classification::Unclassified);
    }

    #[test]
    fn test_words_must_appear_in_order() {
        let matcher = matcher(&["CONTRATO DE TRABAJO"]);
        assert!(!matcher.classify("trabajo contrato.pdf").is_matched());
    }
}
