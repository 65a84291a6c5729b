use crate::model::{VocabularyKind, VocabularyTerm};

fn terms(kind: VocabularyKind, labels: &[&str]) -> Vec<VocabularyTerm> {
    labels
        .iter()
        .map(|label| VocabularyTerm::new(kind, label))
        .collect()
}

/// Reference vocabularies loaded into a fresh registry.
pub fn vocabulary_terms() -> Vec<VocabularyTerm> {
    use VocabularyKind::*;

    let mut all = vec![
        VocabularyTerm::new(Species, "Mus musculus")
            .with_synonyms(&["Mouse (Mus musculus)", "mouse"]),
        VocabularyTerm::new(Species, "Rattus norvegicus")
            .with_synonyms(&["Rat (Rattus rattus)", "rat"]),
        VocabularyTerm::new(Species, "Homo sapiens")
            .with_synonyms(&["Human (Homo sapiens)", "human"]),
        VocabularyTerm::new(Species, "Macaca mulatta").with_synonyms(&["Rhesus macaque"]),
        VocabularyTerm::new(CellType, "Pyramidal cell").with_synonyms(&["pyramidal neuron"]),
    ];

    all.extend(terms(
        BrainRegion,
        &[
            "Hippocampus",
            "Hippocampus CA1",
            "Somatosensory cortex",
            "Cerebellum",
            "Basal ganglia",
            "Thalamus",
            "Whole brain",
        ],
    ));
    all.extend(terms(
        CellType,
        &[
            "Interneuron",
            "Purkinje cell",
            "Granule cell",
            "Medium spiny neuron",
            "Not applicable",
        ],
    ));
    all.extend(terms(
        DataModality,
        &[
            "Electrophysiology",
            "Fluorescence imaging",
            "Histology",
            "Morphology",
            "Behavioural measures",
        ],
    ));
    all.extend(terms(
        TestType,
        &[
            "single cell activity",
            "network structure",
            "network activity",
            "behaviour",
            "subcellular",
        ],
    ));
    all.extend(terms(
        ModelScope,
        &[
            "subcellular",
            "single cell",
            "network: microcircuit",
            "network: brain region",
            "network: whole brain",
        ],
    ));
    all.extend(terms(
        AbstractionLevel,
        &[
            "protein structure",
            "biophysical model",
            "spiking neurons",
            "rate neurons",
            "population modelling",
            "cognitive modelling",
        ],
    ));
    all.extend(terms(
        ScoreType,
        &["Other", "Rsquare", "p-value", "ZScore", "Mean squared error"],
    ));
    all.extend(terms(
        Organization,
        &[
            "HBP-SP1",
            "HBP-SP4",
            "HBP-SP6",
            "Blue Brain Project",
            "Allen Institute",
            "KOKI-UNIC",
            "<<empty>>",
        ],
    ));
    all.extend(terms(
        ImplementationStatus,
        &["in development", "proposal", "published"],
    ));

    all
}
