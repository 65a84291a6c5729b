use thiserror::Error;
use uuid::Uuid;

use crate::logic::vocabulary::resolve_term;
use crate::model::{
    ModelInstance, Person, ScientificModel, Simulation, TestInstance, Timestamp, ValidationResult,
    ValidationTest, Vocabulary, VocabularyKind,
};

/// Errors raised while turning request parameters into a [`Filter`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("'{value}' is not a valid value for {kind}")]
    UnknownTerm { kind: VocabularyKind, value: String },

    #[error("'{0}' is not a valid identifier")]
    InvalidId(String),

    #[error("'{value}' is not a valid value for {parameter}")]
    InvalidValue { parameter: String, value: String },

    #[error("date_from ({from}) is later than date_to ({to})")]
    InvertedDateRange { from: String, to: String },
}

/// Record attributes a filter clause can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Alias,
    Version,
    AppId,
    Organization,
    Private,
    ImplementationStatus,
    Species,
    BrainRegion,
    CellType,
    DataType,
    DataModality,
    TestType,
    ScoreType,
    ModelScope,
    AbstractionLevel,
    Author,
    Owner,
    ModelId,
    TestDefinitionId,
    ModelInstanceId,
    TestInstanceId,
}

impl Field {
    /// Key of the attribute in the serialized record.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Alias => "alias",
            Field::Version => "version",
            Field::AppId => "app_id",
            Field::Organization => "organization",
            Field::Private => "private",
            Field::ImplementationStatus => "implementation_status",
            Field::Species => "species",
            Field::BrainRegion => "brain_region",
            Field::CellType => "cell_type",
            Field::DataType => "data_type",
            Field::DataModality => "data_modality",
            Field::TestType => "test_type",
            Field::ScoreType => "score_type",
            Field::ModelScope => "model_scope",
            Field::AbstractionLevel => "abstraction_level",
            Field::Author => "author",
            Field::Owner => "owner",
            Field::ModelId => "model_id",
            Field::TestDefinitionId => "test_definition_id",
            Field::ModelInstanceId => "model_instance_id",
            Field::TestInstanceId => "test_instance_id",
        }
    }
}

/// One conjunct of a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// The stored value equals one of `values`.
    OneOf { field: Field, values: Vec<String> },
    /// A person listed under `field` has one of `names` (lowercase) as family or full name.
    PersonNamed { field: Field, names: Vec<String> },
    /// Creation time falls within the inclusive range.
    CreatedWithin {
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    },
    /// The record is public or belongs to one of `collabs`.
    VisibleTo { collabs: Vec<String> },
}

/// A conjunction of clauses. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub fn matches<R: Filterable + ?Sized>(&self, record: &R) -> bool {
        self.clauses.iter().all(|clause| clause_matches(clause, record))
    }
}

fn clause_matches<R: Filterable + ?Sized>(clause: &Clause, record: &R) -> bool {
    match clause {
        Clause::OneOf { field, values } => record
            .field_values(*field)
            .iter()
            .any(|stored| values.contains(stored)),
        Clause::PersonNamed { field, names } => record
            .people(*field)
            .iter()
            .any(|person| names.iter().any(|name| person.matches_name(name))),
        Clause::CreatedWithin { from, to } => {
            let created = record.created_at();
            from.map_or(true, |from| created >= from) && to.map_or(true, |to| created <= to)
        }
        Clause::VisibleTo { collabs } => {
            let public = record.field_values(Field::Private) != ["true"];
            public
                || record
                    .field_values(Field::AppId)
                    .iter()
                    .any(|app_id| collabs.contains(app_id))
        }
    }
}

/// Records that can be evaluated against a [`Filter`] in memory.
pub trait Filterable {
    /// Stored values of `field`; empty when the record has no such attribute or it is unset.
    fn field_values(&self, field: Field) -> Vec<String>;

    fn people(&self, _field: Field) -> &[Person] {
        &[]
    }

    fn created_at(&self) -> Timestamp;
}

/// Builds a [`Filter`] from optional request parameters.
///
/// Every method is a no-op when given no values, so omitted parameters
/// impose no constraint.
pub struct FilterBuilder<'a> {
    vocabulary: &'a Vocabulary,
    filter: Filter,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(vocabulary: &'a Vocabulary) -> Self {
        Self {
            vocabulary,
            filter: Filter::new(),
        }
    }

    pub fn one_of(mut self, field: Field, values: Vec<String>) -> Self {
        if !values.is_empty() {
            self.filter.push(Clause::OneOf { field, values });
        }
        self
    }

    /// Constrain an identifier field; every value must parse as a UUID.
    pub fn ids(self, field: Field, values: Vec<String>) -> Result<Self, FilterError> {
        let ids = values
            .iter()
            .map(|value| {
                Uuid::parse_str(value.trim())
                    .map(|id| id.to_string())
                    .map_err(|_| FilterError::InvalidId(value.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.one_of(field, ids))
    }

    /// Constrain a vocabulary field after mapping each label to its canonical value.
    pub fn terms(
        self,
        field: Field,
        kind: VocabularyKind,
        values: Vec<String>,
    ) -> Result<Self, FilterError> {
        let labels = values
            .iter()
            .map(|value| resolve_term(self.vocabulary, kind, value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.one_of(field, labels))
    }

    pub fn people(mut self, field: Field, names: Vec<String>) -> Self {
        if !names.is_empty() {
            let names = names.iter().map(|n| n.trim().to_lowercase()).collect();
            self.filter.push(Clause::PersonNamed { field, names });
        }
        self
    }

    pub fn created_within(
        mut self,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> Result<Self, FilterError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(FilterError::InvertedDateRange {
                    from: from.to_rfc3339(),
                    to: to.to_rfc3339(),
                });
            }
        }
        if from.is_some() || to.is_some() {
            self.filter.push(Clause::CreatedWithin { from, to });
        }
        Ok(self)
    }

    pub fn visible_to(mut self, collabs: Vec<String>) -> Self {
        self.filter.push(Clause::VisibleTo { collabs });
        self
    }

    pub fn build(self) -> Filter {
        self.filter
    }
}

/// Offset pagination applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub from_index: usize,
    pub size: usize,
}

impl Page {
    pub const DEFAULT_SIZE: usize = 100;
    pub const MAX_SIZE: usize = 1000;

    pub fn new(from_index: usize, size: usize) -> Result<Self, FilterError> {
        if size == 0 || size > Self::MAX_SIZE {
            return Err(FilterError::InvalidValue {
                parameter: "size".to_string(),
                value: size.to_string(),
            });
        }
        Ok(Self { from_index, size })
    }

    /// Every record; used for internal lookups that must not be truncated.
    pub fn unbounded() -> Self {
        Self {
            from_index: 0,
            size: usize::MAX,
        }
    }

    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.from_index)
            .take(self.size)
            .collect()
    }

    pub fn limit(&self) -> i64 {
        i64::try_from(self.size).unwrap_or(i64::MAX)
    }

    pub fn offset(&self) -> i64 {
        i64::try_from(self.from_index).unwrap_or(i64::MAX)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            from_index: 0,
            size: Self::DEFAULT_SIZE,
        }
    }
}

fn single(value: &Option<String>) -> Vec<String> {
    value.iter().cloned().collect()
}

impl Filterable for ScientificModel {
    fn field_values(&self, field: Field) -> Vec<String> {
        match field {
            Field::Id => vec![self.id.to_string()],
            Field::Name => vec![self.name.clone()],
            Field::Alias => single(&self.alias),
            Field::AppId => single(&self.app_id),
            Field::Organization => single(&self.organization),
            Field::Private => vec![self.private.to_string()],
            Field::Species => single(&self.species),
            Field::BrainRegion => single(&self.brain_region),
            Field::CellType => single(&self.cell_type),
            Field::ModelScope => single(&self.model_scope),
            Field::AbstractionLevel => single(&self.abstraction_level),
            _ => Vec::new(),
        }
    }

    fn people(&self, field: Field) -> &[Person] {
        match field {
            Field::Author => &self.author,
            Field::Owner => &self.owner,
            _ => &[],
        }
    }

    fn created_at(&self) -> Timestamp {
        self.date_created
    }
}

impl Filterable for ValidationTest {
    fn field_values(&self, field: Field) -> Vec<String> {
        match field {
            Field::Id => vec![self.id.to_string()],
            Field::Name => vec![self.name.clone()],
            Field::Alias => single(&self.alias),
            Field::AppId => single(&self.app_id),
            Field::ImplementationStatus => single(&self.implementation_status),
            Field::Species => single(&self.species),
            Field::BrainRegion => single(&self.brain_region),
            Field::CellType => single(&self.cell_type),
            Field::DataType => single(&self.data_type),
            Field::DataModality => single(&self.data_modality),
            Field::TestType => single(&self.test_type),
            Field::ScoreType => single(&self.score_type),
            _ => Vec::new(),
        }
    }

    fn people(&self, field: Field) -> &[Person] {
        match field {
            Field::Author => &self.author,
            _ => &[],
        }
    }

    fn created_at(&self) -> Timestamp {
        self.date_created
    }
}

impl Filterable for ModelInstance {
    fn field_values(&self, field: Field) -> Vec<String> {
        match field {
            Field::Id => vec![self.id.to_string()],
            Field::ModelId => vec![self.model_id.to_string()],
            Field::Version => vec![self.version.clone()],
            _ => Vec::new(),
        }
    }

    fn created_at(&self) -> Timestamp {
        self.timestamp
    }
}

impl Filterable for TestInstance {
    fn field_values(&self, field: Field) -> Vec<String> {
        match field {
            Field::Id => vec![self.id.to_string()],
            Field::TestDefinitionId => vec![self.test_definition_id.to_string()],
            Field::Version => vec![self.version.clone()],
            _ => Vec::new(),
        }
    }

    fn created_at(&self) -> Timestamp {
        self.timestamp
    }
}

impl Filterable for ValidationResult {
    fn field_values(&self, field: Field) -> Vec<String> {
        match field {
            Field::Id => vec![self.id.to_string()],
            Field::ModelInstanceId => vec![self.model_instance_id.to_string()],
            Field::TestInstanceId => vec![self.test_instance_id.to_string()],
            Field::AppId => single(&self.app_id),
            _ => Vec::new(),
        }
    }

    fn created_at(&self) -> Timestamp {
        self.timestamp
    }
}

impl Filterable for Simulation {
    fn field_values(&self, field: Field) -> Vec<String> {
        match field {
            Field::Id => vec![self.id.to_string()],
            Field::ModelInstanceId => vec![self.model_instance_id.to_string()],
            Field::AppId => single(&self.app_id),
            _ => Vec::new(),
        }
    }

    fn created_at(&self) -> Timestamp {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{generate_id, VocabularyTerm};
    use chrono::{Duration, Utc};

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_terms(vec![
            VocabularyTerm::new(VocabularyKind::Species, "Mus musculus")
                .with_synonyms(&["Mouse (Mus musculus)"]),
            VocabularyTerm::new(VocabularyKind::Species, "Rattus norvegicus"),
            VocabularyTerm::new(VocabularyKind::BrainRegion, "Hippocampus"),
        ])
    }

    fn test_definition(name: &str, species: Option<&str>) -> ValidationTest {
        ValidationTest {
            id: generate_id(),
            name: name.to_string(),
            alias: None,
            implementation_status: None,
            species: species.map(str::to_string),
            brain_region: Some("Hippocampus".to_string()),
            cell_type: None,
            age: None,
            data_location: vec![],
            data_type: None,
            data_modality: None,
            test_type: None,
            score_type: None,
            protocol: None,
            author: vec![Person::new("Andrew", "Davison")],
            publication: None,
            app_id: Some("collab-1".to_string()),
            date_created: Utc::now(),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = FilterBuilder::new(&vocabulary()).build();
        assert!(filter.is_empty());
        assert!(filter.matches(&test_definition("a", None)));
    }

    #[test]
    fn test_vocabulary_synonym_resolves_to_stored_label() {
        let vocabulary = vocabulary();
        let filter = FilterBuilder::new(&vocabulary)
            .terms(
                Field::Species,
                VocabularyKind::Species,
                vec!["Mouse (Mus musculus)".to_string()],
            )
            .unwrap()
            .build();

        assert_eq!(
            filter.clauses(),
            &[Clause::OneOf {
                field: Field::Species,
                values: vec!["Mus musculus".to_string()],
            }]
        );
        assert!(filter.matches(&test_definition("a", Some("Mus musculus"))));
        assert!(!filter.matches(&test_definition("b", Some("Rattus norvegicus"))));
        assert!(!filter.matches(&test_definition("c", None)));
    }

    #[test]
    fn test_unknown_term_names_the_offending_value() {
        let vocabulary = vocabulary();
        let err = FilterBuilder::new(&vocabulary)
            .terms(
                Field::Species,
                VocabularyKind::Species,
                vec!["Mus musculus".to_string(), "Unicorn".to_string()],
            )
            .err()
            .unwrap();
        assert!(err.to_string().contains("Unicorn"));
        assert!(err.to_string().contains("species"));
    }

    #[test]
    fn test_clauses_are_conjunctive_and_lists_are_membership() {
        let vocabulary = vocabulary();
        let filter = FilterBuilder::new(&vocabulary)
            .terms(
                Field::Species,
                VocabularyKind::Species,
                vec!["Mus musculus".to_string(), "Rattus norvegicus".to_string()],
            )
            .unwrap()
            .one_of(Field::Name, vec!["a".to_string()])
            .build();

        assert!(filter.matches(&test_definition("a", Some("Rattus norvegicus"))));
        assert!(!filter.matches(&test_definition("b", Some("Rattus norvegicus"))));
    }

    #[test]
    fn test_author_matches_family_or_full_name() {
        let vocabulary = vocabulary();
        let record = test_definition("a", None);

        for name in ["davison", "Andrew Davison", " DAVISON "] {
            let filter = FilterBuilder::new(&vocabulary)
                .people(Field::Author, vec![name.to_string()])
                .build();
            assert!(filter.matches(&record), "{} should match", name);
        }

        let filter = FilterBuilder::new(&vocabulary)
            .people(Field::Author, vec!["Andrew".to_string()])
            .build();
        assert!(!filter.matches(&record));
    }

    #[test]
    fn test_ids_are_validated_and_normalised() {
        let vocabulary = vocabulary();
        let record = test_definition("a", None);
        let upper = record.id.to_string().to_uppercase();

        let filter = FilterBuilder::new(&vocabulary)
            .ids(Field::Id, vec![upper])
            .unwrap()
            .build();
        assert!(filter.matches(&record));

        let err = FilterBuilder::new(&vocabulary)
            .ids(Field::Id, vec!["not-a-uuid".to_string()])
            .err()
            .unwrap();
        assert_eq!(err, FilterError::InvalidId("not-a-uuid".to_string()));
    }

    #[test]
    fn test_created_within_is_inclusive() {
        let vocabulary = vocabulary();
        let record = test_definition("a", None);
        let created = record.date_created;

        let filter = FilterBuilder::new(&vocabulary)
            .created_within(Some(created), Some(created))
            .unwrap()
            .build();
        assert!(filter.matches(&record));

        let filter = FilterBuilder::new(&vocabulary)
            .created_within(Some(created + Duration::seconds(1)), None)
            .unwrap()
            .build();
        assert!(!filter.matches(&record));

        assert!(FilterBuilder::new(&vocabulary)
            .created_within(Some(created), Some(created - Duration::days(1)))
            .is_err());
    }

    #[test]
    fn test_visibility_hides_private_records_of_other_collabs() {
        let vocabulary = vocabulary();
        let mut model = ScientificModel {
            id: generate_id(),
            name: "m".to_string(),
            alias: None,
            author: vec![],
            owner: vec![],
            app_id: Some("collab-1".to_string()),
            organization: None,
            private: true,
            species: None,
            brain_region: None,
            cell_type: None,
            model_scope: None,
            abstraction_level: None,
            description: None,
            date_created: Utc::now(),
        };

        let outsider = FilterBuilder::new(&vocabulary).visible_to(vec![]).build();
        let member = FilterBuilder::new(&vocabulary)
            .visible_to(vec!["collab-1".to_string()])
            .build();
        assert!(!outsider.matches(&model));
        assert!(member.matches(&model));

        model.private = false;
        assert!(outsider.matches(&model));
    }

    #[test]
    fn test_page_bounds() {
        assert!(Page::new(0, 0).is_err());
        assert!(Page::new(0, Page::MAX_SIZE + 1).is_err());
        let page = Page::new(2, 2).unwrap();
        assert_eq!(page.apply(0..10), vec![2, 3]);
        assert_eq!(Page::unbounded().limit(), i64::MAX);
    }
}
