//! Integration tests for the in-memory knowledge base.

use std::sync::Arc;

use forge_rag::{
    connection_plan, ClientType, RagConfig, RagService, RetrievalService, DEFAULT_DATABASE,
    NO_RESULTS,
};
use serde_json::{json, Map, Value};

fn metadata(source: &str) -> Map<String, Value> {
    match json!({ "source": source }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[tokio::test]
async fn test_default_config_builds_offline_service() {
    let config = RagConfig::default();
    assert_eq!(config.client_type, ClientType::Memory);

    let service = RagService::from_config(&config).await.unwrap();
    assert_eq!(service.query("anything", 1).await, NO_RESULTS);
}

#[tokio::test]
async fn test_ingest_then_lookup_through_trait_object() {
    let service = RagService::from_config(&RagConfig::default()).await.unwrap();
    let docs = vec![
        "arcade.Window.on_update(delta_time) advances the game state".to_string(),
        "arcade.Sprite.center_x and center_y position a sprite".to_string(),
    ];
    let metas = vec![metadata("window.md"), metadata("sprite.md")];
    service.batch_insert(&docs, Some(&metas)).await.unwrap();

    let retrieval: Arc<dyn RetrievalService> = Arc::new(service);
    let hit = retrieval.query("where is the sprite center", 1).await;
    assert!(hit.contains("center_x"), "unexpected hit: {}", hit);
}

#[test]
fn test_fallback_always_ends_at_default_database() {
    for preferred in ["arcade", "docs_v2", DEFAULT_DATABASE] {
        let plan = connection_plan(preferred);
        assert_eq!(plan.last().map(|s| s.database.as_str()), Some(DEFAULT_DATABASE));
        assert!(plan.iter().filter(|s| !s.probe).count() == 1);
    }
}
