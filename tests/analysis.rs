//! Eligibility analyzer and policy comparator over mocked providers

mod common;

use std::sync::Arc;

use common::{make_chunk, MockEmbedder, ScriptedLlm};
use policy_rag::analysis::{EligibilityAnalyzer, PolicyComparator};
use policy_rag::config::RetrievalConfig;
use policy_rag::index::EmbeddingIndex;
use policy_rag::retrieval::QaEngine;
use policy_rag::types::EligibilityStatus;

async fn indexed_engine(dir: &std::path::Path, llm: ScriptedLlm) -> (Arc<QaEngine>, Arc<EmbeddingIndex>) {
    let index = Arc::new(EmbeddingIndex::open(dir, Arc::new(MockEmbedder::new()), 8).unwrap());
    index
        .upsert(
            "Gold Plan",
            &[
                make_chunk("Gold Plan", 0, "Coverage applies to trips within ASEAN countries."),
                make_chunk("Gold Plan", 1, "Trips to the United States are excluded."),
                make_chunk("Gold Plan", 2, "Medical expenses are covered up to USD 50,000."),
            ],
        )
        .await
        .unwrap();
    let engine = Arc::new(QaEngine::new(
        Arc::clone(&index),
        Arc::new(llm),
        RetrievalConfig::default(),
    ));
    (engine, index)
}

#[tokio::test]
async fn check_many_folds_verdicts_into_a_summary() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlm::with_responses(
        vec![
            // Singapore, coverage question then restrictions question
            "Yes, Singapore is covered as part of the ASEAN region. [Source: gold-plan.pdf, Page 1]",
            "There are no geographic limits within ASEAN, so the plan applies.",
            // United States
            "Trips to the United States are not covered and are excluded. [Source: gold-plan.pdf, Page 2]",
            "The United States is excluded from all benefits.",
        ],
        "No further detail.",
    );
    let (engine, _) = indexed_engine(dir.path(), llm).await;
    let analyzer = EligibilityAnalyzer::new(engine);

    let summary = analyzer
        .check_many("Gold Plan", &["Singapore".to_string(), "USA".to_string()])
        .await;

    assert_eq!(summary.eligible, vec!["Singapore"]);
    assert_eq!(summary.not_eligible, vec!["USA"]);
    assert!(summary.uncertain.is_empty());
    assert_eq!(summary.total(), 2);

    let usa = &summary.verdicts[1];
    assert_eq!(usa.country_normalized, "United States");
    assert_eq!(usa.status, EligibilityStatus::NotEligible);
    assert!(!usa.citations.is_empty());
}

#[tokio::test]
async fn unanswerable_country_is_uncertain_not_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    // Index is empty for this policy scope: retrieval finds nothing, the
    // answer is the insufficient-information response, and the verdict is
    // uncertain rather than an aborted batch.
    let index = Arc::new(EmbeddingIndex::open(dir.path(), Arc::new(MockEmbedder::new()), 8).unwrap());
    let engine = Arc::new(QaEngine::new(
        index,
        Arc::new(ScriptedLlm::with_fallback("unused")),
        RetrievalConfig::default(),
    ));
    let analyzer = EligibilityAnalyzer::new(engine);

    let summary = analyzer
        .check_many("Ghost Plan", &["France".to_string(), "Japan".to_string()])
        .await;

    assert_eq!(summary.uncertain.len(), 2);
    assert!(summary.eligible.is_empty());
    assert!(summary.not_eligible.is_empty());
}

#[tokio::test]
async fn generation_failure_during_check_becomes_uncertain() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = indexed_engine(dir.path(), ScriptedLlm::failing()).await;
    let analyzer = EligibilityAnalyzer::new(engine);

    let summary = analyzer.check_many("Gold Plan", &["Singapore".to_string()]).await;
    assert_eq!(summary.uncertain, vec!["Singapore"]);
    assert!(summary.verdicts[0].detail.contains("check failed"));
}

#[tokio::test]
async fn covered_countries_extracts_names_from_the_answer() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlm::with_fallback(
        "The policy covers Singapore, Malaysia, and Thailand, with worldwide emergency evacuation. \
         [Source: gold-plan.pdf, Page 1]",
    );
    let (engine, _) = indexed_engine(dir.path(), llm).await;
    let analyzer = EligibilityAnalyzer::new(engine);

    let covered = analyzer.covered_countries("Gold Plan").await.unwrap();
    assert!(covered.countries.contains(&"Singapore".to_string()));
    assert!(covered.countries.contains(&"Malaysia".to_string()));
    assert!(covered.countries.contains(&"Worldwide".to_string()));
    assert!(!covered.citations.is_empty());
}

#[tokio::test]
async fn comparison_table_stays_rectangular_with_not_found_cells() {
    let dir = tempfile::tempdir().unwrap();
    let llm = ScriptedLlm::with_fallback("Covered up to USD 50,000 per trip.");
    let (engine, index) = indexed_engine(dir.path(), llm).await;

    // Second policy exists; third was never indexed
    index
        .upsert(
            "Silver Plan",
            &[make_chunk("Silver Plan", 0, "Medical expenses are covered up to USD 20,000.")],
        )
        .await
        .unwrap();

    let llm_for_normalization = Arc::new(ScriptedLlm::with_fallback("USD 50,000 limit."));
    let comparator = PolicyComparator::new(engine, llm_for_normalization);

    let policies = vec![
        "Gold Plan".to_string(),
        "Silver Plan".to_string(),
        "Ghost Plan".to_string(),
    ];
    let categories = vec!["Medical".to_string(), "Baggage".to_string()];
    let table = comparator.compare(&policies, Some(&categories)).await.unwrap();

    assert_eq!(table.rows.len(), 2);
    for row in &table.rows {
        assert_eq!(row.values.len(), 3, "table must stay rectangular");
    }

    // The unindexed policy is explicitly "not found", never omitted
    let ghost_cell = table.cell("Medical", "Ghost Plan").unwrap();
    assert_eq!(ghost_cell.value, "not found");
    assert!(!ghost_cell.is_found());

    let gold_cell = table.cell("Medical", "Gold Plan").unwrap();
    assert!(gold_cell.is_found());
    assert!(!gold_cell.value.is_empty());
}
