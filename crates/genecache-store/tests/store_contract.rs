// SPDX-License-Identifier: Apache-2.0

use genecache_model::{FlattenedRecord, GeneId};
use genecache_store::{
    ArtifactStore, MemoryArtifactStore, MemoryPrimaryStore, PrimaryStore, RedisArtifactStore,
    RedisPolicy, RedisPrimaryStore, StoreErrorKind, SCAN_BATCH,
};
use std::time::Duration;

fn id(raw: &str) -> GeneId {
    GeneId::parse(raw).expect("gene id")
}

fn fields(pairs: &[(&str, &str)]) -> FlattenedRecord {
    pairs.iter().copied().collect()
}

async fn assert_primary_contract(store: &dyn PrimaryStore) {
    store.wipe_all().await.expect("wipe");

    let brca1 = fields(&[("hgnc_id", "HGNC:1100"), ("symbol", "BRCA1")]);
    store
        .upsert_fields(&id("HGNC:1100"), &brca1)
        .await
        .expect("upsert");
    store
        .upsert_fields(&id("HGNC:1100"), &brca1)
        .await
        .expect("repeat upsert");
    assert_eq!(
        store.get_record(&id("HGNC:1100")).await.expect("get"),
        Some(brca1.clone())
    );

    store
        .upsert_fields(&id("HGNC:1100"), &fields(&[("symbol", "BRCA1-new")]))
        .await
        .expect("partial upsert");
    let merged = store
        .get_record(&id("HGNC:1100"))
        .await
        .expect("get")
        .expect("present");
    assert_eq!(merged.get("symbol"), Some("BRCA1-new"));
    assert_eq!(merged.get("hgnc_id"), Some("HGNC:1100"));

    assert_eq!(
        store.get_record(&id("nonexistent")).await.expect("get"),
        None
    );

    store
        .upsert_fields(&id("HGNC:5"), &fields(&[("symbol", "A1BG")]))
        .await
        .expect("upsert");
    let mut keys = store.list_keys().await.expect("keys");
    keys.sort();
    assert_eq!(keys, vec![id("HGNC:1100"), id("HGNC:5")]);
    assert_eq!(store.get_all().await.expect("all").len(), 2);

    store.wipe_all().await.expect("wipe");
    assert!(store.list_keys().await.expect("keys").is_empty());
    assert!(store.get_all().await.expect("all").is_empty());
}

async fn assert_artifact_contract(store: &dyn ArtifactStore) {
    store.wipe().await.expect("wipe");
    assert_eq!(store.get().await.expect("get"), None);

    let bytes = vec![0x89, b'P', b'N', b'G', 0, 255, 7];
    store.put(bytes.clone()).await.expect("put");
    assert_eq!(store.get().await.expect("get"), Some(bytes));

    store.put(b"second".to_vec()).await.expect("overwrite");
    assert_eq!(store.get().await.expect("get"), Some(b"second".to_vec()));

    store.wipe().await.expect("wipe");
    assert_eq!(store.get().await.expect("get"), None);
}

#[tokio::test]
async fn memory_primary_store_honors_contract() {
    assert_primary_contract(&MemoryPrimaryStore::default()).await;
}

#[tokio::test]
async fn memory_artifact_store_honors_contract() {
    assert_artifact_contract(&MemoryArtifactStore::default()).await;
}

#[tokio::test]
async fn memory_primary_store_distinguishes_zero_field_record_from_missing() {
    let store = MemoryPrimaryStore::default();
    store
        .upsert_fields(&id("HGNC:7"), &FlattenedRecord::default())
        .await
        .expect("upsert");
    assert_eq!(
        store.get_record(&id("HGNC:7")).await.expect("get"),
        Some(FlattenedRecord::default())
    );
    assert_eq!(store.get_record(&id("HGNC:8")).await.expect("get"), None);
}

#[tokio::test]
async fn artifact_and_primary_wipes_are_independent() {
    let primary = MemoryPrimaryStore::default();
    let artifact = MemoryArtifactStore::default();
    primary
        .upsert_fields(&id("HGNC:5"), &fields(&[("symbol", "A1BG")]))
        .await
        .expect("upsert");
    artifact.put(b"png".to_vec()).await.expect("put");

    primary.wipe_all().await.expect("wipe primary");
    assert_eq!(artifact.get().await.expect("get"), Some(b"png".to_vec()));

    primary
        .upsert_fields(&id("HGNC:5"), &fields(&[("symbol", "A1BG")]))
        .await
        .expect("upsert");
    artifact.wipe().await.expect("wipe artifact");
    assert_eq!(primary.list_keys().await.expect("keys").len(), 1);
}

#[tokio::test]
async fn unavailable_memory_store_reports_connection_errors() {
    let store = MemoryPrimaryStore::default();
    store.set_unavailable(true);
    let err = store.list_keys().await.expect_err("must fail");
    assert_eq!(err.kind, StoreErrorKind::Connection);
    store.set_unavailable(false);
    assert!(store.list_keys().await.is_ok());
}

#[tokio::test]
async fn unreachable_redis_fails_fast_with_store_error() {
    let policy = RedisPolicy {
        connect_timeout: Duration::from_millis(200),
        command_timeout: Duration::from_millis(50),
    };
    let err = match RedisPrimaryStore::connect("redis://127.0.0.1:6390/0", policy).await {
        Ok(_) => return,
        Err(e) => e,
    };
    assert!(matches!(
        err.kind,
        StoreErrorKind::Connection | StoreErrorKind::Timeout
    ));
}

fn redis_url(db: u8) -> Option<String> {
    let base = std::env::var("REDIS_URL").ok()?;
    Some(format!("{}/{db}", base.trim_end_matches('/')))
}

#[tokio::test]
#[ignore = "requires REDIS_URL and local Redis; non-CI integration test"]
async fn redis_primary_store_honors_contract() {
    let Some(url) = redis_url(14) else {
        eprintln!("skipping redis_primary_store_honors_contract: REDIS_URL not set");
        return;
    };
    let store = RedisPrimaryStore::connect(&url, RedisPolicy::default())
        .await
        .expect("connect redis");
    assert_primary_contract(&store).await;
}

#[tokio::test]
#[ignore = "requires REDIS_URL and local Redis; non-CI integration test"]
async fn redis_full_scan_spans_batches_and_skips_foreign_keys() {
    let Some(url) = redis_url(13) else {
        eprintln!("skipping redis full scan test: REDIS_URL not set");
        return;
    };
    let store = RedisPrimaryStore::connect(&url, RedisPolicy::default())
        .await
        .expect("connect redis");
    store.wipe_all().await.expect("wipe");

    let total = SCAN_BATCH * 2 + 7;
    for n in 0..total {
        let raw = format!("HGNC:{n}");
        store
            .upsert_fields(&id(&raw), &fields(&[("hgnc_id", &raw)]))
            .await
            .expect("upsert");
    }
    let client = redis::Client::open(url.as_str()).expect("client");
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .expect("raw connection");
    let _: () = redis::cmd("HSET")
        .arg(" foreign")
        .arg("symbol")
        .arg("X")
        .query_async(&mut conn)
        .await
        .expect("foreign key");

    let keys = store.list_keys().await.expect("keys");
    let records = store.get_all().await.expect("scan");
    assert_eq!(keys.len(), total);
    assert_eq!(records.len(), keys.len());
    store.wipe_all().await.expect("wipe");
}

#[tokio::test]
#[ignore = "requires REDIS_URL and local Redis; non-CI integration test"]
async fn redis_artifact_store_honors_contract() {
    let Some(url) = redis_url(15) else {
        eprintln!("skipping redis_artifact_store_honors_contract: REDIS_URL not set");
        return;
    };
    let store = RedisArtifactStore::connect(&url, RedisPolicy::default())
        .await
        .expect("connect redis");
    assert_artifact_contract(&store).await;
}
