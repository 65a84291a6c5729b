use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The controlled vocabularies a registry record can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyKind {
    Species,
    BrainRegion,
    CellType,
    DataModality,
    TestType,
    ModelScope,
    AbstractionLevel,
    ScoreType,
    Organization,
    ImplementationStatus,
}

impl VocabularyKind {
    pub const ALL: [VocabularyKind; 10] = [
        VocabularyKind::Species,
        VocabularyKind::BrainRegion,
        VocabularyKind::CellType,
        VocabularyKind::DataModality,
        VocabularyKind::TestType,
        VocabularyKind::ModelScope,
        VocabularyKind::AbstractionLevel,
        VocabularyKind::ScoreType,
        VocabularyKind::Organization,
        VocabularyKind::ImplementationStatus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VocabularyKind::Species => "species",
            VocabularyKind::BrainRegion => "brain_region",
            VocabularyKind::CellType => "cell_type",
            VocabularyKind::DataModality => "data_modality",
            VocabularyKind::TestType => "test_type",
            VocabularyKind::ModelScope => "model_scope",
            VocabularyKind::AbstractionLevel => "abstraction_level",
            VocabularyKind::ScoreType => "score_type",
            VocabularyKind::Organization => "organization",
            VocabularyKind::ImplementationStatus => "implementation_status",
        }
    }
}

impl fmt::Display for VocabularyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VocabularyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VocabularyKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown vocabulary '{}'", s))
    }
}

/// One allowed value of a vocabulary.
///
/// `label` is the canonical value stored on records; `synonyms` are alternative
/// spellings accepted from clients (e.g. "Mouse (Mus musculus)" for "Mus musculus").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyTerm {
    pub kind: VocabularyKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
}

impl VocabularyTerm {
    pub fn new(kind: VocabularyKind, label: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
            synonyms: Vec::new(),
        }
    }

    pub fn with_synonyms(mut self, synonyms: &[&str]) -> Self {
        self.synonyms = synonyms.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Case-insensitive match against the label or any synonym.
    pub fn answers_to(&self, value: &str) -> bool {
        let value = value.trim();
        self.label.eq_ignore_ascii_case(value)
            || self.synonyms.iter().any(|s| s.eq_ignore_ascii_case(value))
    }
}

/// Snapshot of every vocabulary, keyed by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: BTreeMap<VocabularyKind, Vec<VocabularyTerm>>,
}

impl Vocabulary {
    pub fn from_terms(terms: impl IntoIterator<Item = VocabularyTerm>) -> Self {
        let mut vocabulary = Self::default();
        for term in terms {
            vocabulary.insert(term);
        }
        vocabulary
    }

    /// Insert a term, replacing any existing term with the same label.
    pub fn insert(&mut self, term: VocabularyTerm) {
        let entries = self.terms.entry(term.kind).or_default();
        match entries.iter_mut().find(|t| t.label == term.label) {
            Some(existing) => *existing = term,
            None => entries.push(term),
        }
    }

    pub fn terms(&self, kind: VocabularyKind) -> &[VocabularyTerm] {
        self.terms.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn labels(&self, kind: VocabularyKind) -> Vec<&str> {
        self.terms(kind).iter().map(|t| t.label.as_str()).collect()
    }

    pub fn find(&self, kind: VocabularyKind, value: &str) -> Option<&VocabularyTerm> {
        self.terms(kind).iter().find(|t| t.answers_to(value))
    }

    /// Labels of every vocabulary, keyed by kind name, for the `/vocab/` listing.
    pub fn to_label_map(&self) -> BTreeMap<&'static str, Vec<&str>> {
        VocabularyKind::ALL
            .iter()
            .map(|kind| (kind.as_str(), self.labels(*kind)))
            .collect()
    }
}
