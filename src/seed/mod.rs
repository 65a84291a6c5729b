mod data;

pub use data::vocabulary_terms;

use crate::model::{NewScientificModel, NewValidationResult, NewValidationTest};
use crate::store::traits::Store;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;

/// Upsert the reference vocabularies.
pub async fn load_vocabularies<S: Store>(store: &S) -> Result<()> {
    let terms = vocabulary_terms();
    let count = terms.len();
    for term in terms {
        store.upsert_term(term).await?;
    }
    log::info!("Loaded {} vocabulary terms", count);
    Ok(())
}

/// Insert a small set of tests, models and one result for demonstration.
pub async fn load_sample_data<S: Store>(store: &S) -> Result<()> {
    let now = Utc::now();

    let tests: Vec<NewValidationTest> = serde_json::from_value(json!([
        {
            "name": "Hippocampus CA1 interneuron somatic spikes",
            "alias": "hippo_ca1_in_spikes",
            "implementation_status": "published",
            "species": "Mus musculus",
            "brain_region": "Hippocampus",
            "cell_type": "Interneuron",
            "data_modality": "Electrophysiology",
            "test_type": "single cell activity",
            "score_type": "ZScore",
            "protocol": "Compare somatic spike features against patch clamp recordings.",
            "author": [{"given_name": "Sara", "family_name": "Saray"}],
            "data_location": ["https://example.org/data/ca1_in_features.json"],
            "instances": [
                {"repository": "https://github.com/KaliLab/hippounit", "version": "1.0", "path": "hippounit.tests.SomaticFeaturesTest"}
            ]
        },
        {
            "name": "Hippocampus interneuron depolarization block",
            "alias": "hippo_in_depol_block",
            "implementation_status": "in development",
            "species": "Mus musculus",
            "brain_region": "Hippocampus",
            "cell_type": "Interneuron",
            "data_modality": "Electrophysiology",
            "test_type": "single cell activity",
            "score_type": "ZScore",
            "author": [{"given_name": "Sara", "family_name": "Saray"}],
            "instances": [
                {"repository": "https://github.com/KaliLab/hippounit", "version": "1.0", "path": "hippounit.tests.DepolarizationBlockTest"}
            ]
        },
        {
            "name": "Cerebellar Purkinje cell soma input resistance",
            "alias": "purkinje_input_resistance",
            "implementation_status": "proposal",
            "species": "Rattus norvegicus",
            "brain_region": "Cerebellum",
            "cell_type": "Purkinje cell",
            "data_modality": "Electrophysiology",
            "test_type": "single cell activity",
            "score_type": "Rsquare",
            "author": [{"given_name": "Lungsi", "family_name": "Sharma"}]
        }
    ]))
    .context("sample tests")?;

    let mut first_test_instance = None;
    for payload in tests {
        let (test, instances) = payload.into_records(now);
        if first_test_instance.is_none() {
            first_test_instance = instances.first().map(|i| i.id);
        }
        store.insert_test(test, instances).await?;
    }

    let models: Vec<NewScientificModel> = serde_json::from_value(json!([
        {
            "name": "CA1 basket cell",
            "alias": "ca1_basket",
            "species": "Mus musculus",
            "brain_region": "Hippocampus",
            "cell_type": "Interneuron",
            "model_scope": "single cell",
            "abstraction_level": "biophysical model",
            "organization": "HBP-SP6",
            "author": [{"given_name": "Rosanna", "family_name": "Migliore"}],
            "owner": [{"given_name": "Rosanna", "family_name": "Migliore"}],
            "description": "Detailed multi-compartment model of a CA1 basket cell.",
            "instances": [
                {"version": "1.0", "source": "https://example.org/models/ca1_basket_v1.zip", "code_format": "hoc", "license": "CC BY 4.0"},
                {"version": "1.1", "source": "https://example.org/models/ca1_basket_v1_1.zip", "code_format": "hoc", "license": "CC BY 4.0"}
            ],
            "images": [
                {"url": "https://example.org/images/ca1_basket.png", "caption": "Reconstructed morphology"}
            ]
        },
        {
            "name": "Purkinje cell reduced model",
            "alias": "purkinje_reduced",
            "species": "Rattus norvegicus",
            "brain_region": "Cerebellum",
            "cell_type": "Purkinje cell",
            "model_scope": "single cell",
            "abstraction_level": "spiking neurons",
            "author": [{"given_name": "Shailesh", "family_name": "Appukuttan"}],
            "instances": [
                {"version": "0.1", "source": "https://example.org/models/purkinje.py", "code_format": "python"}
            ]
        }
    ]))
    .context("sample models")?;

    let mut first_model_instance = None;
    for payload in models {
        let (model, instances, images) = payload.into_records(now);
        if first_model_instance.is_none() {
            first_model_instance = instances.first().map(|i| i.id);
        }
        store.insert_model(model, instances, images).await?;
    }

    if let (Some(model_instance_id), Some(test_instance_id)) =
        (first_model_instance, first_test_instance)
    {
        let result: NewValidationResult = serde_json::from_value(json!({
            "model_instance_id": model_instance_id,
            "test_instance_id": test_instance_id,
            "score": 0.83,
            "normalized_score": 0.83,
            "passed": true,
            "results_storage": ["https://example.org/results/ca1_basket_spikes.json"]
        }))
        .context("sample result")?;
        store.insert_result(result.into_record(now)).await?;
    }

    log::info!("Loaded sample tests, models and results");
    Ok(())
}

/// Vocabularies followed by the sample records.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    load_vocabularies(store).await?;
    load_sample_data(store).await
}
