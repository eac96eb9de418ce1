use replyguy::providers::MockProvider;
use replyguy::{JsonFileStore, MemoryStore, SavedStore};

#[tokio::test]
async fn json_store_persists_across_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("saved.json");
    let posts = MockProvider.candidates();

    let store = JsonFileStore::load(path.clone()).await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());
    assert!(store.put(posts[0].clone()).await.unwrap());
    assert!(store.put(posts[4].clone()).await.unwrap());
    assert!(!store.put(posts[0].clone()).await.unwrap());

    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0]["id"], "t1");
    assert_eq!(raw[0]["isSaved"], true);

    let reloaded = JsonFileStore::load(path.clone()).await.unwrap();
    let saved = reloaded.get_all().await.unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.contains("t5"));

    assert!(reloaded.delete("t1").await.unwrap());
    assert!(!reloaded.delete("t1").await.unwrap());

    let again = JsonFileStore::load(path).await.unwrap();
    let ids: Vec<String> = again
        .get_all()
        .await
        .unwrap()
        .list()
        .iter()
        .map(|post| post.id.clone())
        .collect();
    assert_eq!(ids, vec!["t5"]);
}

#[tokio::test]
async fn saved_copies_are_frozen_at_save_time() {
    let store = MemoryStore::new();
    let mut post = MockProvider.candidates().remove(0);
    store.put(post.clone()).await.unwrap();

    post.metrics.likes += 1_000;
    let saved = store.get_all().await.unwrap();
    assert_eq!(saved.list()[0].metrics.likes, 15_432);
}

#[tokio::test]
async fn blank_file_loads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.json");
    std::fs::write(&path, "  \n").unwrap();

    let store = JsonFileStore::load(path).await.unwrap();
    assert!(store.get_all().await.unwrap().is_empty());
}
