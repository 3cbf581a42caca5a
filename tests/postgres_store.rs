//! PostgreSQL vector store integration tests
//!
//! Run against a live database with pgvector available:
//! `TEST_DATABASE_URL=postgres://... cargo test --test postgres_store`
//! Each test is a no-op when the variable is unset.

use semantic_memory::config::PostgresConfig;
use semantic_memory::database::{init_pool_for_migrations, migrations, PostgresPool, PostgresVectorStore};
use semantic_memory::{Error, VectorRecord, VectorStore};
use uuid::Uuid;

async fn test_pool() -> Option<PostgresPool> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let pool = init_pool_for_migrations(&PostgresConfig::new(url))
        .await
        .expect("connect to TEST_DATABASE_URL");
    migrations::run(&pool, true).await.expect("run migrations");
    Some(pool)
}

fn unique_collection() -> String {
    format!("it_{}", Uuid::new_v4().simple())
}

async fn search_example(store: &PostgresVectorStore) {
    let collection = unique_collection();

    store
        .upsert(&collection, VectorRecord::new("a", "first", vec![1.0, 0.0, 0.0]))
        .await
        .unwrap();
    store
        .upsert(&collection, VectorRecord::new("b", "second", vec![0.0, 1.0, 0.0]))
        .await
        .unwrap();

    let results = store.search(&collection, &[0.9, 0.1, 0.0], 1, 0.0).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.id, "a");
    assert!((results[0].score - 0.9939).abs() < 1e-3);

    let all = store.search(&collection, &[0.9, 0.1, 0.0], 10, 0.0).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].score >= all[1].score);

    store.delete_collection(&collection).await.unwrap();
}

#[tokio::test]
async fn test_native_search_example() {
    let Some(pool) = test_pool().await else { return };
    let store = PostgresVectorStore::new(pool, 3).unwrap();
    search_example(&store).await;
}

#[tokio::test]
async fn test_array_search_example() {
    let Some(pool) = test_pool().await else { return };
    let store = PostgresVectorStore::new(pool, 3).unwrap().with_pgvector(false);
    search_example(&store).await;
}

#[tokio::test]
async fn test_upsert_get_delete() {
    let Some(pool) = test_pool().await else { return };
    let store = PostgresVectorStore::new(pool, 3).unwrap();
    let collection = unique_collection();

    let record = VectorRecord::new("doc", "original", vec![1.0, 2.0, 3.0])
        .add_metadata("lang", "en")
        .with_description("a document")
        .as_reference("wiki");
    store.upsert(&collection, record.clone()).await.unwrap();

    let stored = store.get(&collection, "doc").await.unwrap();
    assert!(stored.same_content(&record));

    let replacement = VectorRecord::new("doc", "replaced", vec![3.0, 2.0, 1.0]);
    store.upsert(&collection, replacement.clone()).await.unwrap();
    let stored = store.get(&collection, "doc").await.unwrap();
    assert!(stored.same_content(&replacement));
    assert!(stored.timestamp >= record.timestamp);

    let batch = store
        .get_batch(&collection, &["doc".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(batch.len(), 1);

    store.delete(&collection, "doc").await.unwrap();
    store.delete(&collection, "doc").await.unwrap();
    assert!(matches!(
        store.get(&collection, "doc").await,
        Err(Error::NotFound { .. })
    ));

    store.delete_collection(&collection).await.unwrap();
}

#[tokio::test]
async fn test_empty_and_missing_collections() {
    let Some(pool) = test_pool().await else { return };
    let store = PostgresVectorStore::new(pool, 3).unwrap();
    let collection = unique_collection();

    assert!(store.search(&collection, &[1.0, 0.0, 0.0], 5, 0.0).await.unwrap().is_empty());
    assert!(!store.does_collection_exist(&collection).await.unwrap());

    store.create_collection(&collection).await.unwrap();
    assert!(store.does_collection_exist(&collection).await.unwrap());
    assert!(store.list_collections().await.unwrap().contains(&collection));
    assert!(store.search(&collection, &[1.0, 0.0, 0.0], 5, 0.0).await.unwrap().is_empty());

    store.delete_collection(&collection).await.unwrap();
    assert!(!store.does_collection_exist(&collection).await.unwrap());
}

#[tokio::test]
async fn test_ties_keep_insertion_order() {
    let Some(pool) = test_pool().await else { return };
    let store = PostgresVectorStore::new(pool, 2).unwrap();
    let collection = unique_collection();

    let records = ["x", "y", "z"]
        .into_iter()
        .map(|id| VectorRecord::new(id, id, vec![1.0, 1.0]))
        .collect();
    store.upsert_batch(&collection, records).await.unwrap();

    let ids: Vec<String> = store
        .search(&collection, &[1.0, 1.0], 3, 0.0)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.record.id)
        .collect();
    assert_eq!(ids, vec!["x", "y", "z"]);

    store.delete_collection(&collection).await.unwrap();
}

#[tokio::test]
async fn test_existing_collection_with_other_dimension() {
    let Some(pool) = test_pool().await else { return };
    let collection = unique_collection();

    let small = PostgresVectorStore::new(pool.clone(), 3).unwrap();
    small.create_collection(&collection).await.unwrap();

    let large = PostgresVectorStore::new(pool, 4).unwrap();
    let err = large
        .upsert(&collection, VectorRecord::new("a", "a", vec![0.0; 4]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDimension { expected: 4, actual: 3, .. }));

    small.delete_collection(&collection).await.unwrap();
}

#[tokio::test]
async fn test_dimension_mismatch_rejected() {
    let Some(pool) = test_pool().await else { return };
    let store = PostgresVectorStore::new(pool, 3).unwrap();
    let collection = unique_collection();

    let err = store
        .upsert(&collection, VectorRecord::new("a", "a", vec![1.0, 0.0]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    assert!(!store.does_collection_exist(&collection).await.unwrap());
}

async fn concurrent_first_writes(store: PostgresVectorStore) {
    for _ in 0..5 {
        let collection = unique_collection();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                let collection = collection.clone();
                tokio::spawn(async move {
                    let record = VectorRecord::new(format!("r{}", i), "text", vec![1.0, i as f32, 0.0]);
                    store.upsert(&collection, record).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let ids: Vec<String> = (0..8).map(|i| format!("r{}", i)).collect();
        assert_eq!(store.get_batch(&collection, &ids).await.unwrap().len(), 8);

        store.delete_collection(&collection).await.unwrap();
    }
}

#[tokio::test]
async fn test_concurrent_first_writes_native() {
    let Some(pool) = test_pool().await else { return };
    concurrent_first_writes(PostgresVectorStore::new(pool, 3).unwrap()).await;
}

#[tokio::test]
async fn test_concurrent_first_writes_array() {
    let Some(pool) = test_pool().await else { return };
    concurrent_first_writes(PostgresVectorStore::new(pool, 3).unwrap().with_pgvector(false)).await;
}

async fn zero_vector_ranks_by_score(store: PostgresVectorStore) {
    let collection = unique_collection();
    let records = vec![
        VectorRecord::new("neg", "neg", vec![-1.0, 0.2]),
        VectorRecord::new("zero", "zero", vec![0.0, 0.0]),
        VectorRecord::new("pos", "pos", vec![1.0, 0.0]),
    ];
    store.upsert_batch(&collection, records).await.unwrap();

    let results = store.search(&collection, &[1.0, 0.0], 10, -1.0).await.unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.record.id.as_str()).collect();
    assert_eq!(ids, vec!["pos", "zero", "neg"]);
    assert_eq!(results[1].score, 0.0);

    store.delete_collection(&collection).await.unwrap();
}

#[tokio::test]
async fn test_zero_vector_ranks_by_score_native() {
    let Some(pool) = test_pool().await else { return };
    zero_vector_ranks_by_score(PostgresVectorStore::new(pool, 2).unwrap()).await;
}

#[tokio::test]
async fn test_zero_vector_ranks_by_score_array() {
    let Some(pool) = test_pool().await else { return };
    zero_vector_ranks_by_score(PostgresVectorStore::new(pool, 2).unwrap().with_pgvector(false)).await;
}
