//! End-to-end tests over the public `MatchingService` surface.

mod common;

use common::KeywordProvider;
use resumatch::{
    BatchRecord, ContentType, InMemoryContentStore, KeywordOverlapAnalyzer, MatchConfig,
    MatchQuality, MatchingService, MetadataFilter, MetadataMap, MetadataValue, QualityBands,
    Settings,
};
use std::sync::Arc;

const RESUME: &str = "Senior Software Engineer, Python, AWS, 6 years";

fn service() -> MatchingService {
    common::init_tracing();
    MatchingService::new(
        Settings::default(),
        Arc::new(KeywordProvider::new()),
        Arc::new(KeywordOverlapAnalyzer),
        Arc::new(InMemoryContentStore::new()),
    )
}

fn job(id: &str, text: &str) -> BatchRecord {
    BatchRecord {
        content_id: id.to_string(),
        content_type: ContentType::Job,
        text: text.to_string(),
        metadata: MetadataMap::new(),
        owner_id: None,
    }
}

#[tokio::test]
async fn relevant_job_matches_and_irrelevant_job_is_filtered() {
    let service = service();
    service
        .batch_upsert(vec![
            job("job_1", "Senior Python Developer, 5 years, AWS"),
            job("job_2", "Junior Graphic Designer"),
        ])
        .await
        .unwrap();

    let outcome = service.match_resume_to_jobs(RESUME, None, None).await.unwrap();

    assert!(!outcome.degraded);
    assert_eq!(outcome.results.len(), 1);

    let top = &outcome.results[0];
    assert_eq!(top.content_id, "job_1");
    assert!(top.combined_score >= 0.7);
    assert!(top.vector_score > 0.0 && top.semantic_score > 0.0);
    let expected = 0.6 * top.vector_score + 0.4 * top.semantic_score;
    assert!((top.combined_score - expected).abs() < 1e-6);
    assert_eq!(top.match_quality, MatchQuality::Good);
    assert_eq!(top.recommendation, "Consider");
}

#[tokio::test]
async fn pooled_matching_with_defaults_keeps_only_strong_matches() {
    let service = service();
    service
        .batch_upsert(vec![
            job("job_1", "Senior Python Developer, 5 years, AWS"),
            job("job_2", "Junior Graphic Designer"),
        ])
        .await
        .unwrap();

    let pool = vec!["job_1".to_string(), "job_2".to_string()];
    let outcome = service
        .match_resume_to_jobs(RESUME, Some(&pool), None)
        .await
        .unwrap();

    assert_eq!(outcome.results[0].content_id, "job_1");
    assert!(outcome.results[0].combined_score >= 0.7);
    assert!(!outcome.results.iter().any(|r| r.content_id == "job_2"));
}

#[tokio::test]
async fn matching_works_in_both_directions() {
    let service = service();
    service
        .upsert(ContentType::Resume, "resume_1", RESUME, MetadataMap::new(), None)
        .await
        .unwrap();
    service
        .upsert(
            ContentType::Job,
            "job_1",
            "Senior Python Developer, 5 years, AWS",
            MetadataMap::new(),
            None,
        )
        .await
        .unwrap();

    let forward = service
        .match_resume_to_jobs(RESUME, None, None)
        .await
        .unwrap();
    assert_eq!(forward.results[0].content_id, "job_1");

    let reverse = service
        .match_jobs_to_resume("Senior Python Developer, 5 years, AWS", None, None)
        .await
        .unwrap();
    assert_eq!(reverse.results[0].content_id, "resume_1");
}

#[tokio::test]
async fn custom_match_config_overrides_defaults() {
    let service = service();
    service
        .batch_upsert(vec![
            job("job_1", "Senior Python Developer, 5 years, AWS"),
            job("job_2", "Junior Graphic Designer"),
        ])
        .await
        .unwrap();

    // Permissive config surfaces the weak match too
    let config = MatchConfig {
        min_combined_score: 0.0,
        bands: QualityBands {
            excellent: 0.9,
            very_good: 0.5,
            good: 0.0,
        },
        ..Default::default()
    };
    let outcome = service
        .match_resume_to_jobs(RESUME, None, Some(config))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].content_id, "job_1");
    assert_eq!(outcome.results[1].content_id, "job_2");
    assert!(outcome.results[0].combined_score > outcome.results[1].combined_score);
}

#[tokio::test]
async fn candidate_pool_restricts_matching() {
    let service = service();
    service
        .batch_upsert(vec![
            job("job_1", "Senior Python Developer, 5 years, AWS"),
            job("job_2", "Senior Python Developer, AWS, remote"),
        ])
        .await
        .unwrap();

    let pool = vec!["job_2".to_string()];
    let config = MatchConfig {
        min_combined_score: 0.0,
        bands: QualityBands {
            excellent: 0.9,
            very_good: 0.5,
            good: 0.0,
        },
        ..Default::default()
    };
    let outcome = service
        .match_resume_to_jobs(RESUME, Some(&pool), Some(config))
        .await
        .unwrap();

    assert!(!outcome.results.is_empty());
    assert!(outcome.results.iter().all(|r| r.content_id == "job_2"));
}

#[tokio::test]
async fn search_filters_on_metadata() {
    let service = service();

    let mut tokyo = MetadataMap::new();
    tokyo.insert("location".to_string(), MetadataValue::from("Tokyo"));
    tokyo.insert("experience_years".to_string(), MetadataValue::from(5.0));
    let mut berlin = MetadataMap::new();
    berlin.insert("location".to_string(), MetadataValue::from("Berlin"));

    service
        .upsert(ContentType::Job, "job_tokyo", "python developer", tokyo, None)
        .await
        .unwrap();
    service
        .upsert(ContentType::Job, "job_berlin", "python developer", berlin, None)
        .await
        .unwrap();

    let filter = MetadataFilter::new()
        .equals("location", "Tokyo")
        .range("experience_years", Some(3.0), Some(8.0));
    let results = service
        .search("python", ContentType::Job, None, Some(-1.0), Some(&filter))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content_id, "job_tokyo");
}

#[tokio::test]
async fn batch_partial_failure_reports_both_sides() {
    let service = service();

    let outcome = service
        .batch_upsert(vec![
            job("job_1", "Senior Python Developer"),
            job("job_2", ""),
            job("job_3", "Junior Graphic Designer"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.succeeded, vec!["job_1", "job_3"]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].content_id, "job_2");
    assert_eq!(outcome.failed[0].error_kind, "INVALID_INPUT");

    // Failed record is absent from search results
    let results = service
        .search("anything", ContentType::Job, None, Some(-1.0), None)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn repeated_ingest_hits_the_embedding_cache() {
    common::init_tracing();
    let provider = Arc::new(KeywordProvider::new());
    let service = MatchingService::new(
        Settings::default(),
        Arc::clone(&provider) as Arc<dyn resumatch::EmbeddingProvider>,
        Arc::new(KeywordOverlapAnalyzer),
        Arc::new(InMemoryContentStore::new()),
    );

    let text = "Senior Python Developer, 5 years, AWS";
    service
        .upsert(ContentType::Job, "job_1", text, MetadataMap::new(), None)
        .await
        .unwrap();
    let calls_after_first = provider.call_count();

    // Same text, different id: embedding comes from cache
    service
        .upsert(ContentType::Job, "job_copy", text, MetadataMap::new(), None)
        .await
        .unwrap();
    assert_eq!(provider.call_count(), calls_after_first);
}

#[tokio::test]
async fn outcome_serializes_to_stable_json_shape() {
    let service = service();
    service
        .upsert(
            ContentType::Job,
            "job_1",
            "Senior Python Developer, 5 years, AWS",
            MetadataMap::new(),
            None,
        )
        .await
        .unwrap();

    let outcome = service.match_resume_to_jobs(RESUME, None, None).await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["degraded"], serde_json::json!(false));
    let first = &json["results"][0];
    assert_eq!(first["content_id"], "job_1");
    assert!(first["vector_score"].is_number());
    assert!(first["semantic_score"].is_number());
    assert!(first["combined_score"].is_number());
    assert_eq!(first["recommendation"], "Consider");
}
