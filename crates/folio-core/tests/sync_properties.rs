//! End-to-end sync scenarios
//!
//! Several simulated browser tabs (one `SyncClient` each) share a single
//! in-process `ContentStore`. Timer-driven behaviour runs on tokio's paused
//! clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use folio_core::models::UploadResponse;
use folio_core::sync::{ContentApi, InProcessContentApi};
use folio_core::{
    Config, ContentDocument, ContentKey, ContentSnapshot, ContentStore, ContentValue, SkillList, SnapshotCache,
    Source, SyncClient, SyncError, Tagline, Viewer,
};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Notify;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// In-process transport that can be told to fail
#[derive(Clone)]
struct FlakyApi {
    inner: InProcessContentApi,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    fetches: Arc<AtomicUsize>,
}

impl FlakyApi {
    fn new(store: &Arc<ContentStore>) -> Self {
        Self {
            inner: InProcessContentApi::new(Arc::clone(store)),
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn offline() -> SyncError {
        SyncError::transport("http://offline.test", "connection refused")
    }
}

impl ContentApi for FlakyApi {
    async fn fetch_all(&self) -> Result<ContentSnapshot, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::offline());
        }
        self.inner.fetch_all().await
    }

    async fn write(&self, key: ContentKey, value: &ContentValue) -> Result<i64, SyncError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::offline());
        }
        self.inner.write(key, value).await
    }

    async fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, SyncError> {
        self.inner.upload(file_name, mime_type, bytes).await
    }

    fn endpoint(&self) -> String {
        "flaky".to_string()
    }
}

/// Serves a fixed sequence of snapshots, then repeats the last one
struct ScriptedApi {
    script: Mutex<VecDeque<ContentSnapshot>>,
    last: Mutex<Option<ContentSnapshot>>,
}

impl ScriptedApi {
    fn new(timestamps: &[i64]) -> Self {
        let script = timestamps
            .iter()
            .map(|ts| ContentSnapshot::new(*ts).with(ContentKey::Tagline, format!("v{}", ts)))
            .collect();
        Self {
            script: Mutex::new(script),
            last: Mutex::new(None),
        }
    }
}

impl ContentApi for ScriptedApi {
    async fn fetch_all(&self) -> Result<ContentSnapshot, SyncError> {
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(snapshot) = next {
            *last = Some(snapshot);
        }
        last.clone().ok_or_else(|| SyncError::transport("script", "empty"))
    }

    async fn write(&self, _key: ContentKey, _value: &ContentValue) -> Result<i64, SyncError> {
        Err(SyncError::Status {
            status: 405,
            message: "read-only".into(),
        })
    }

    async fn upload(&self, _: &str, _: &str, _: Vec<u8>) -> Result<UploadResponse, SyncError> {
        Err(SyncError::Status {
            status: 405,
            message: "read-only".into(),
        })
    }

    fn endpoint(&self) -> String {
        "scripted".to_string()
    }
}

/// In-process transport whose next fetch can be held after it reads the store
#[derive(Clone)]
struct HeldFetch {
    inner: InProcessContentApi,
    armed: Arc<AtomicBool>,
    read: Arc<Notify>,
    release: Arc<Notify>,
}

impl HeldFetch {
    fn new(store: &Arc<ContentStore>) -> Self {
        Self {
            inner: InProcessContentApi::new(Arc::clone(store)),
            armed: Arc::new(AtomicBool::new(false)),
            read: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }

    /// Hold the next fetch once it has its snapshot
    fn hold_next(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl ContentApi for HeldFetch {
    async fn fetch_all(&self) -> Result<ContentSnapshot, SyncError> {
        let snapshot = self.inner.fetch_all().await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.read.notify_one();
            self.release.notified().await;
        }
        snapshot
    }

    async fn write(&self, key: ContentKey, value: &ContentValue) -> Result<i64, SyncError> {
        self.inner.write(key, value).await
    }

    async fn upload(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadResponse, SyncError> {
        self.inner.upload(file_name, mime_type, bytes).await
    }

    fn endpoint(&self) -> String {
        "held".to_string()
    }
}

/// A store holding tagline "Old", then moved on by an edit to another field
fn store_moved_past_old_tagline() -> Arc<ContentStore> {
    let store = Arc::new(ContentStore::new());
    store
        .write(Some(ContentKey::Tagline.as_str()), Some(json!("Old")))
        .unwrap();
    store
        .write(Some(ContentKey::Skills.as_str()), Some(json!(skills(&["Rust"]).as_str())))
        .unwrap();
    store
}

fn tab(store: &Arc<ContentStore>) -> (SyncClient<FlakyApi>, FlakyApi) {
    let api = FlakyApi::new(store);
    let cache = Arc::new(SnapshotCache::in_memory(1 << 20, DAY));
    (SyncClient::new(api.clone(), cache), api)
}

fn skills(names: &[&str]) -> ContentValue {
    let list: Vec<_> = names
        .iter()
        .map(|n| json!({"id": n, "title": n}))
        .collect();
    ContentValue::from_json(&list).unwrap()
}

#[tokio::test(start_paused = true)]
async fn repeated_polls_at_same_timestamp_change_nothing() {
    let store = Arc::new(ContentStore::new());
    let (client, api) = tab(&store);
    client
        .write(ContentKey::Tagline, ContentValue::new("Hello"))
        .await
        .unwrap();

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    let handle = client.poll(Duration::from_millis(100), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_millis(1_050)).await;

    assert!(api.fetches.load(Ordering::SeqCst) >= 10);
    assert_eq!(changes.load(Ordering::SeqCst), 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn out_of_order_snapshots_never_go_backwards() {
    let cache = Arc::new(SnapshotCache::in_memory(1 << 20, DAY));
    let client = SyncClient::new(ScriptedApi::new(&[2, 1, 3, 2, 1]), cache);

    let applied = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&applied);
    let handle = client.poll(Duration::from_millis(100), move |snapshot| {
        sink.lock().unwrap().push(snapshot.last_updated());
    });

    tokio::time::sleep(Duration::from_millis(750)).await;
    handle.stop().await;

    assert_eq!(*applied.lock().unwrap(), vec![2, 3]);
}

#[tokio::test]
async fn failed_network_write_is_kept_locally_and_reported() {
    let store = Arc::new(ContentStore::new());
    let (client, api) = tab(&store);
    api.fail_writes.store(true, Ordering::SeqCst);

    let err = client
        .write(ContentKey::Tagline, ContentValue::new("offline edit"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Transport { .. }));
    assert_eq!(
        client.cache().read_content(ContentKey::Tagline),
        Some(ContentValue::new("offline edit"))
    );
    assert_eq!(store.get(ContentKey::Tagline).unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn notification_arrives_before_next_poll() {
    let store = Arc::new(ContentStore::new());
    let (client, _api) = tab(&store);
    let events = Arc::new(Mutex::new(Vec::<String>::new()));

    let sink = Arc::clone(&events);
    let _sub = client.subscribe(ContentKey::Tagline, move |n| {
        sink.lock().unwrap().push(format!("notify:{}", n.payload));
        Ok(())
    });
    let sink = Arc::clone(&events);
    let handle = client.poll(Duration::from_secs(10), move |snapshot| {
        if let Some(value) = snapshot.get(ContentKey::Tagline) {
            sink.lock().unwrap().push(format!("poll:{}", value));
        }
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    client
        .write(ContentKey::Tagline, ContentValue::new("Hello"))
        .await
        .unwrap();
    assert_eq!(*events.lock().unwrap(), vec!["notify:Hello"]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(
        *events.lock().unwrap(),
        vec!["notify:Hello", "poll:Hello"]
    );
    handle.stop().await;
}

#[tokio::test]
async fn reads_fall_back_server_then_cache_then_default() {
    let store = Arc::new(ContentStore::new());
    let (client, api) = tab(&store);

    api.fail_reads.store(true, Ordering::SeqCst);
    let loaded = client.load::<SkillList>().await;
    assert_eq!(loaded.source, Source::Default);
    assert_eq!(loaded.doc, SkillList::builtin_default());

    client.cache().store_content(ContentKey::Skills, &skills(&["Rust"]));
    let loaded = client.load::<SkillList>().await;
    assert_eq!(loaded.source, Source::Cache);
    assert_eq!(loaded.doc.0[0].title, "Rust");

    api.fail_reads.store(false, Ordering::SeqCst);
    store
        .write(Some("skills-list"), Some(json!(skills(&["Go"]).as_str())))
        .unwrap();
    let loaded = client.load::<SkillList>().await;
    assert_eq!(loaded.source, Source::Server);
    assert_eq!(loaded.doc.0[0].title, "Go");

    // The server value was written through
    assert_eq!(client.cache().read_content(ContentKey::Skills), Some(skills(&["Go"])));
}

#[tokio::test]
async fn malformed_cache_entry_falls_through_to_default() {
    let store = Arc::new(ContentStore::new());
    let (client, api) = tab(&store);
    api.fail_reads.store(true, Ordering::SeqCst);

    client
        .cache()
        .store_content(ContentKey::Skills, &ContentValue::new("{not json"));
    let loaded = client.load::<SkillList>().await;

    assert_eq!(loaded.source, Source::Default);
}

#[tokio::test(start_paused = true)]
async fn last_write_wins_between_tabs() {
    let store = Arc::new(ContentStore::new());
    let (first, _) = tab(&store);
    let (second, _) = tab(&store);

    first
        .write(ContentKey::Tagline, ContentValue::new("Hello"))
        .await
        .unwrap();
    let seen = second.fetch_all().await.unwrap();
    assert_eq!(seen.get(ContentKey::Tagline), Some(&ContentValue::new("Hello")));

    let latest = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&latest);
    let handle = first.poll(Duration::from_secs(1), move |snapshot| {
        *sink.lock().unwrap() = snapshot.get(ContentKey::Tagline).cloned();
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    second
        .write(ContentKey::Tagline, ContentValue::new("World"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(*latest.lock().unwrap(), Some(ContentValue::new("World")));
    handle.stop().await;
}

#[tokio::test]
async fn invalid_projects_write_leaves_previous_value() {
    let store = Arc::new(ContentStore::new());
    let (client, _) = tab(&store);
    client
        .write(ContentKey::Projects, ContentValue::new("[]"))
        .await
        .unwrap();

    let err = client
        .write(ContentKey::Projects, ContentValue::new("{not valid json array}"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Validation { .. }));
    assert_eq!(
        store.get(ContentKey::Projects).unwrap(),
        Some(ContentValue::new("[]"))
    );
}

#[tokio::test(start_paused = true)]
async fn second_tab_receives_update_by_its_own_poll() {
    let store = Arc::new(ContentStore::new());
    store
        .write(Some("skills-list"), Some(json!(skills(&["A", "B"]).as_str())))
        .unwrap();
    let (tab1, _) = tab(&store);
    let (tab2, tab2_api) = tab(&store);

    let handle = tab2.start_sync(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Two components mounted in tab 2
    let received = Arc::new(Mutex::new(Vec::new()));
    let subs: Vec<_> = (0..2)
        .map(|component| {
            let sink = Arc::clone(&received);
            tab2.subscribe(ContentKey::Skills, move |n| {
                sink.lock().unwrap().push((component, n.payload.clone()));
                Ok(())
            })
        })
        .collect();

    tab1.write(ContentKey::Skills, skills(&["A", "B", "C"]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let expected = skills(&["A", "B", "C"]);
    assert_eq!(
        *received.lock().unwrap(),
        vec![(0, expected.clone()), (1, expected.clone())]
    );
    // One fetch at start and one at the next tick; subscribers add none
    assert_eq!(tab2_api.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(tab2.cache().read_content(ContentKey::Skills), Some(expected));

    drop(subs);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_poll_ticks_are_retried_next_interval() {
    let store = Arc::new(ContentStore::new());
    let (client, api) = tab(&store);
    api.fail_reads.store(true, Ordering::SeqCst);

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    let handle = client.poll(Duration::from_millis(500), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(changes.load(Ordering::SeqCst), 0);

    api.fail_reads.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(changes.load(Ordering::SeqCst), 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn cancelled_poll_never_calls_back() {
    let store = Arc::new(ContentStore::new());
    let (client, _) = tab(&store);

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    let handle = client.poll(Duration::from_millis(100), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(changes.load(Ordering::SeqCst), 1);

    drop(handle);
    client
        .write(ContentKey::Tagline, ContentValue::new("after unmount"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(changes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn write_in_another_process_triggers_early_fetch() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    let store = Arc::new(ContentStore::new());

    // Both tabs share one cache file, as browser tabs share storage
    let tab1 = SyncClient::new(
        FlakyApi::new(&store),
        Arc::new(SnapshotCache::open(&config).unwrap()),
    );
    let tab2 = SyncClient::new(
        FlakyApi::new(&store),
        Arc::new(SnapshotCache::open(&config).unwrap()),
    );

    let handle = tab2.start_sync(Duration::from_secs(60));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let received = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&received);
    let _sub = tab2.subscribe(ContentKey::Tagline, move |n| {
        *sink.lock().unwrap() = Some(n.payload.clone());
        Ok(())
    });

    tab1.write(ContentKey::Tagline, ContentValue::new("from tab 1"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(
        *received.lock().unwrap(),
        Some(ContentValue::new("from tab 1"))
    );
    handle.stop().await;
}

#[tokio::test]
async fn typed_load_of_raw_tagline() {
    let store = Arc::new(ContentStore::new());
    let (client, _) = tab(&store);
    client
        .write(ContentKey::Tagline, ContentValue::new("plain text, not JSON"))
        .await
        .unwrap();

    let loaded = client.load::<Tagline>().await;
    assert_eq!(loaded.doc, Tagline("plain text, not JSON".into()));
}

#[tokio::test]
async fn shared_poll_started_before_a_write_never_restores_the_old_value() {
    let store = store_moved_past_old_tagline();
    let api = HeldFetch::new(&store);
    let cache = Arc::new(SnapshotCache::in_memory(1 << 20, DAY));
    let client = SyncClient::new(api.clone(), cache);

    let events = Arc::new(Mutex::new(Vec::<(ContentKey, String)>::new()));
    let sink = Arc::clone(&events);
    let _sub = client.bus().subscribe_all(move |n| {
        sink.lock().unwrap().push((n.field, n.payload.to_string()));
        Ok(())
    });

    // The first fetch reads tagline "Old" and is held there
    api.hold_next();
    let handle = client.start_sync(Duration::from_secs(60));
    api.read.notified().await;

    client
        .write(ContentKey::Tagline, ContentValue::new("New"))
        .await
        .unwrap();
    api.release.notify_one();

    // The held snapshot still announces the skills it carries
    tokio::time::timeout(Duration::from_secs(5), async {
        while !events.lock().unwrap().iter().any(|(k, _)| *k == ContentKey::Skills) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    handle.stop().await;

    let taglines: Vec<String> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|(k, _)| *k == ContentKey::Tagline)
        .map(|(_, v)| v.clone())
        .collect();
    assert_eq!(taglines, vec!["New"]);
    assert_eq!(
        client.cache().read_content(ContentKey::Tagline),
        Some(ContentValue::new("New"))
    );
    assert_eq!(client.load_local::<Tagline>().doc, Tagline("New".into()));
}

#[tokio::test]
async fn viewer_poll_started_before_a_write_never_restores_the_old_value() {
    let store = store_moved_past_old_tagline();
    let api = HeldFetch::new(&store);
    let cache = Arc::new(SnapshotCache::in_memory(1 << 20, DAY));
    let client = SyncClient::new(api.clone(), cache);

    let viewer = Viewer::<Tagline>::mount(&client).await;
    assert_eq!(viewer.doc(), Tagline("Old".into()));

    // The viewer's first poll reads tagline "Old" and is held there
    api.hold_next();
    let viewer = viewer.with_polling(&client, Duration::from_secs(60));
    api.read.notified().await;

    client
        .write(ContentKey::Tagline, ContentValue::new("New"))
        .await
        .unwrap();
    let mut rx = viewer.watch();
    assert_eq!(rx.borrow_and_update().doc, Tagline("New".into()));

    api.release.notify_one();
    let changed = tokio::time::timeout(Duration::from_millis(500), rx.changed()).await;

    assert!(changed.is_err(), "viewer moved to {:?}", viewer.current());
    assert_eq!(viewer.doc(), Tagline("New".into()));
    assert_eq!(viewer.source(), Source::Notification);
    assert_eq!(
        client.cache().read_content(ContentKey::Tagline),
        Some(ContentValue::new("New"))
    );
}
