use churn_prediction_pipeline::models::{
    ArtifactStore, InferenceService, TrainingConfig, TrainingPipeline,
};
use churn_prediction_pipeline::types::RiskLevelThresholds;
use churn_prediction_pipeline::{explain_for_report, ingest, report, ChurnError, CoercionMode};

fn corpus() -> String {
    let mut csv = String::from(
        "Name,Email,Gender,Income,Age,Country,Total_Amount,Feedback,Order_Status,Ratings,Churn,Churn_Reason\n",
    );
    for i in 0..40 {
        let churn = i % 4 == 0;
        let country = if i % 2 == 0 { "US" } else { "UK" };
        let row = if churn {
            format!(
                "C{i},c{i}@example.com,F,Low,{},{country},{},Bad,Returned,2,Yes,\n",
                20 + i,
                100 + i
            )
        } else {
            format!(
                "C{i},c{i}@example.com,M,High,{},{country},{},Good,Delivered,9,No,\n",
                30 + i,
                3000 + i
            )
        };
        csv.push_str(&row);
    }
    csv
}

#[test]
fn train_persist_load_predict() {
    let records = ingest::read_csv(corpus().as_bytes()).unwrap();
    let artifact = TrainingPipeline::default().train_records(&records).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    store.save(&artifact).unwrap();

    let in_memory = InferenceService::new(artifact);
    let loaded = InferenceService::from_store(&store, CoercionMode::Lenient).unwrap();
    assert_eq!(loaded.current().artifact_id(), in_memory.current().artifact_id());

    for record in &records {
        assert_eq!(in_memory.predict(record).unwrap(), loaded.predict(record).unwrap());
    }
}

#[test]
fn unseen_country_is_rejected_with_field_and_value() {
    let records = ingest::read_csv(corpus().as_bytes()).unwrap();
    let artifact = TrainingPipeline::default().train_records(&records).unwrap();
    let service = InferenceService::new(artifact);

    let mut record = records[0].clone();
    record.country = "FR".to_string();

    match service.score(&record, &RiskLevelThresholds::default()) {
        Err(ChurnError::UnknownCategory { field, value }) => {
            assert_eq!(field, "Country");
            assert_eq!(value, "FR");
        }
        other => panic!("expected an unknown category error, got {other:?}"),
    }
}

#[test]
fn reload_picks_up_newly_published_artifact() {
    let records = ingest::read_csv(corpus().as_bytes()).unwrap();
    let pipeline = TrainingPipeline::default();
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());

    let first = pipeline.train_records(&records).unwrap();
    store.save(&first).unwrap();
    let service = InferenceService::from_store(&store, CoercionMode::Lenient).unwrap();

    let second = pipeline.train_records(&records).unwrap();
    let second_id = second.artifact_id().to_string();
    store.save(&second).unwrap();

    let previous = service.reload(&store).unwrap();
    assert_eq!(previous.artifact_id(), first.artifact_id());
    assert_eq!(service.current().artifact_id(), second_id);
    assert!(service.predict(&records[0]).is_ok());
}

#[test]
fn minority_churners_score_above_retained() {
    let records = ingest::read_csv(corpus().as_bytes()).unwrap();
    assert_eq!(records.iter().filter(|r| r.is_churned()).count(), 10);

    for validation_fraction in [0.0, 0.2] {
        let pipeline = TrainingPipeline::new(TrainingConfig {
            validation_fraction,
            ..Default::default()
        });
        let service = InferenceService::new(pipeline.train_records(&records).unwrap());

        let churner = service.predict(&records[0]).unwrap();
        assert_eq!(churner.label, 1);
        assert!(churner.probability > 0.5, "churner scored {}", churner.probability);

        let retained = service.predict(&records[1]).unwrap();
        assert_eq!(retained.label, 0);
        assert!(retained.probability < 0.5, "retained scored {}", retained.probability);
    }
}

#[tokio::test]
async fn reload_from_blocking_pool_swaps_artifact() {
    let records = ingest::read_csv(corpus().as_bytes()).unwrap();
    let pipeline = TrainingPipeline::default();
    let dir = tempfile::tempdir().unwrap();
    let store = std::sync::Arc::new(ArtifactStore::new(dir.path()));

    store.save(&pipeline.train_records(&records).unwrap()).unwrap();
    let service = InferenceService::from_store(&store, CoercionMode::Lenient).unwrap();

    let next = pipeline.train_records(&records).unwrap();
    let next_id = next.artifact_id().to_string();
    store.save(&next).unwrap();

    let loader = store.clone();
    let artifact = tokio::task::spawn_blocking(move || loader.load_current())
        .await
        .unwrap()
        .unwrap();
    service.swap(artifact);

    assert_eq!(service.current().artifact_id(), next_id);
    assert_eq!(service.predict(&records[0]).unwrap().label, 1);
}

#[test]
fn reporting_path() {
    let csv = "\
Name,Email,Income,Country,Total_Amount,Feedback,Order_Status,Ratings,Churn,Churn_Reason
A,a@example.com,High,US,100,Great,Delivered,9,Yes,Found a cheaper shop
B,b@example.com,High,US,200,Great,Delivered,9,No,
C,c@example.com,Low,UK,300,Bad,Returned,3,Yes,
";
    let records = ingest::read_csv(csv.as_bytes()).unwrap();

    let summary = report::summarize(&records);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.churn_rate_pct, 66.7);
    assert_eq!(summary.at_risk_count, 2);
    assert_eq!(summary.total_revenue, 600.0);

    assert_eq!(explain_for_report(&records[0]).to_string(), "Found a cheaper shop");
    assert_eq!(
        explain_for_report(&records[2]).to_string(),
        "Low rating (3), Negative feedback, Low spending (300), Problem order status (Returned), Low income group"
    );

    let top = report::top_high_risk(&records, 5);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].name, "C");
    assert_eq!(top[1].name, "A");
}
