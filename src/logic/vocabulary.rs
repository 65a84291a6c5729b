use crate::logic::FilterError;
use crate::model::{
    CollabParameters, ScientificModel, ValidationTest, Vocabulary, VocabularyKind,
};

/// Map an external label (or synonym) to the canonical stored label.
pub fn resolve_term(
    vocabulary: &Vocabulary,
    kind: VocabularyKind,
    value: &str,
) -> Result<String, FilterError> {
    vocabulary
        .find(kind, value)
        .map(|term| term.label.clone())
        .ok_or_else(|| FilterError::UnknownTerm {
            kind,
            value: value.to_string(),
        })
}

fn normalize_optional(
    vocabulary: &Vocabulary,
    kind: VocabularyKind,
    value: &mut Option<String>,
) -> Result<(), FilterError> {
    if let Some(current) = value.as_deref() {
        *value = Some(resolve_term(vocabulary, kind, current)?);
    }
    Ok(())
}

fn normalize_list(
    vocabulary: &Vocabulary,
    kind: VocabularyKind,
    values: &mut Vec<String>,
) -> Result<(), FilterError> {
    let mut resolved = Vec::with_capacity(values.len());
    for value in values.iter() {
        let label = resolve_term(vocabulary, kind, value)?;
        if !resolved.contains(&label) {
            resolved.push(label);
        }
    }
    *values = resolved;
    Ok(())
}

/// Replace every vocabulary-typed field of a model with its canonical label.
pub fn normalize_model(
    vocabulary: &Vocabulary,
    model: &mut ScientificModel,
) -> Result<(), FilterError> {
    normalize_optional(vocabulary, VocabularyKind::Species, &mut model.species)?;
    normalize_optional(vocabulary, VocabularyKind::BrainRegion, &mut model.brain_region)?;
    normalize_optional(vocabulary, VocabularyKind::CellType, &mut model.cell_type)?;
    normalize_optional(vocabulary, VocabularyKind::ModelScope, &mut model.model_scope)?;
    normalize_optional(
        vocabulary,
        VocabularyKind::AbstractionLevel,
        &mut model.abstraction_level,
    )?;
    normalize_optional(vocabulary, VocabularyKind::Organization, &mut model.organization)?;
    Ok(())
}

/// Replace every vocabulary-typed field of a test definition with its canonical label.
pub fn normalize_test(
    vocabulary: &Vocabulary,
    test: &mut ValidationTest,
) -> Result<(), FilterError> {
    normalize_optional(
        vocabulary,
        VocabularyKind::ImplementationStatus,
        &mut test.implementation_status,
    )?;
    normalize_optional(vocabulary, VocabularyKind::Species, &mut test.species)?;
    normalize_optional(vocabulary, VocabularyKind::BrainRegion, &mut test.brain_region)?;
    normalize_optional(vocabulary, VocabularyKind::CellType, &mut test.cell_type)?;
    normalize_optional(vocabulary, VocabularyKind::DataModality, &mut test.data_modality)?;
    normalize_optional(vocabulary, VocabularyKind::TestType, &mut test.test_type)?;
    normalize_optional(vocabulary, VocabularyKind::ScoreType, &mut test.score_type)?;
    Ok(())
}

pub fn normalize_collab_parameters(
    vocabulary: &Vocabulary,
    parameters: &mut CollabParameters,
) -> Result<(), FilterError> {
    for (kind, values) in parameters.value_lists_mut() {
        normalize_list(vocabulary, kind, values)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VocabularyTerm;

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_terms(vec![
            VocabularyTerm::new(VocabularyKind::Species, "Mus musculus")
                .with_synonyms(&["Mouse (Mus musculus)"]),
            VocabularyTerm::new(VocabularyKind::TestType, "single cell activity"),
        ])
    }

    #[test]
    fn test_collab_parameters_are_canonicalised_and_deduplicated() {
        let mut parameters = CollabParameters::empty("collab-1");
        parameters.species = vec![
            "mouse (mus musculus)".to_string(),
            "Mus musculus".to_string(),
        ];
        parameters.test_type = vec!["Single Cell Activity".to_string()];

        normalize_collab_parameters(&vocabulary(), &mut parameters).unwrap();
        assert_eq!(parameters.species, vec!["Mus musculus".to_string()]);
        assert_eq!(parameters.test_type, vec!["single cell activity".to_string()]);
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        let mut parameters = CollabParameters::empty("collab-1");
        parameters.species = vec!["Dragon".to_string()];
        let err = normalize_collab_parameters(&vocabulary(), &mut parameters).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnknownTerm {
                kind: VocabularyKind::Species,
                value: "Dragon".to_string()
            }
        );
    }
}
