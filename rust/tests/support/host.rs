use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use push_core::{
    ActiveNotification, BridgeEmitter, ConversationPrefetcher, CredentialStore, FilePreferences,
    HostPlatform, NotificationChannel, NotificationDrawer, NotificationIndex,
    NotificationIndexStore, NotificationSpec, PushHandler, PushHost, PushPayload, ServerRegistry,
};
use tempfile::TempDir;

use super::write_config;

pub struct FakePlatform {
    sdk_int: u32,
    version: Mutex<String>,
    app_visible: AtomicBool,
    js_initialized: AtomicBool,
    icons: Vec<String>,
}

impl FakePlatform {
    pub fn new(sdk_int: u32) -> Self {
        Self {
            sdk_int,
            version: Mutex::new("1.0.0".into()),
            app_visible: AtomicBool::new(false),
            js_initialized: AtomicBool::new(false),
            icons: vec!["ic_notification".into(), "ic_launcher".into()],
        }
    }

    pub fn set_app_visible(&self, visible: bool) {
        self.app_visible.store(visible, Ordering::SeqCst);
    }

    pub fn set_js_initialized(&self, ready: bool) {
        self.js_initialized.store(ready, Ordering::SeqCst);
    }

    pub fn set_version(&self, version: &str) {
        *self.version.lock().unwrap() = version.to_string();
    }
}

impl HostPlatform for FakePlatform {
    fn sdk_int(&self) -> u32 {
        self.sdk_int
    }

    fn app_version(&self) -> String {
        self.version.lock().unwrap().clone()
    }

    fn is_app_visible(&self) -> bool {
        self.app_visible.load(Ordering::SeqCst)
    }

    fn is_js_initialized(&self) -> bool {
        self.js_initialized.load(Ordering::SeqCst)
    }

    fn has_icon_resource(&self, name: &str) -> bool {
        self.icons.iter().any(|icon| icon == name)
    }
}

#[derive(Default)]
struct DrawerState {
    channels: Vec<NotificationChannel>,
    posted: Vec<(i32, NotificationSpec)>,
    active: BTreeMap<i32, NotificationSpec>,
    cancelled: Vec<i32>,
    cancel_all_calls: usize,
}

/// In-memory drawer: posting replaces the entry with the same id.
#[derive(Default)]
pub struct FakeDrawer {
    state: Mutex<DrawerState>,
}

impl FakeDrawer {
    pub fn posted(&self) -> Vec<(i32, NotificationSpec)> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn posted_ids(&self) -> Vec<i32> {
        self.state.lock().unwrap().posted.iter().map(|(id, _)| *id).collect()
    }

    pub fn active(&self, id: i32) -> Option<NotificationSpec> {
        self.state.lock().unwrap().active.get(&id).cloned()
    }

    pub fn active_ids(&self) -> Vec<i32> {
        self.state.lock().unwrap().active.keys().copied().collect()
    }

    pub fn cancelled(&self) -> Vec<i32> {
        self.state.lock().unwrap().cancelled.clone()
    }

    pub fn cancel_all_calls(&self) -> usize {
        self.state.lock().unwrap().cancel_all_calls
    }

    pub fn channel_ids(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().channels.iter().map(|c| c.id).collect()
    }

    /// Simulates the OS dropping entries without telling the app.
    pub fn forget_all(&self) {
        self.state.lock().unwrap().active.clear();
    }
}

impl NotificationDrawer for FakeDrawer {
    fn create_channel(&self, channel: &NotificationChannel) {
        self.state.lock().unwrap().channels.push(channel.clone());
    }

    fn notify(&self, id: i32, spec: &NotificationSpec) {
        let mut state = self.state.lock().unwrap();
        state.posted.push((id, spec.clone()));
        state.active.insert(id, spec.clone());
    }

    fn cancel(&self, id: i32) {
        let mut state = self.state.lock().unwrap();
        state.cancelled.push(id);
        state.active.remove(&id);
    }

    fn cancel_all(&self) {
        let mut state = self.state.lock().unwrap();
        state.cancel_all_calls += 1;
        state.active.clear();
    }

    fn active_notifications(&self) -> Vec<ActiveNotification> {
        self.state
            .lock()
            .unwrap()
            .active
            .iter()
            .map(|(id, spec)| ActiveNotification {
                id: *id,
                extras: spec.extras.clone(),
            })
            .collect()
    }
}

#[derive(Default)]
pub struct StaticServers {
    by_id: Mutex<HashMap<String, String>>,
    only: Mutex<Option<String>>,
}

impl StaticServers {
    pub fn insert(&self, identifier: &str, url: &str) {
        self.by_id
            .lock()
            .unwrap()
            .insert(identifier.to_string(), url.to_string());
    }

    pub fn set_only(&self, url: &str) {
        *self.only.lock().unwrap() = Some(url.to_string());
    }
}

impl ServerRegistry for StaticServers {
    fn server_url_for_identifier(&self, identifier: &str) -> Option<String> {
        self.by_id.lock().unwrap().get(identifier).cloned()
    }

    fn only_server_url(&self) -> Option<String> {
        self.only.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MapCredentials {
    tokens: Mutex<HashMap<String, String>>,
}

impl MapCredentials {
    pub fn set(&self, server_url: &str, token: &str) {
        self.tokens
            .lock()
            .unwrap()
            .insert(server_url.to_string(), token.to_string());
    }
}

impl CredentialStore for MapCredentials {
    fn token_for_server(&self, server_url: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(server_url).cloned()
    }
}

#[derive(Clone, Default)]
pub struct RecordingBridge {
    events: Arc<Mutex<Vec<(String, PushPayload)>>>,
}

impl RecordingBridge {
    pub fn events(&self) -> Vec<(String, PushPayload)> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

impl BridgeEmitter for RecordingBridge {
    fn emit(&self, event_name: &str, payload: &PushPayload) {
        self.events
            .lock()
            .unwrap()
            .push((event_name.to_string(), payload.clone()));
    }
}

#[derive(Default)]
pub struct RecordingPrefetcher {
    calls: Mutex<Vec<String>>,
}

impl RecordingPrefetcher {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ConversationPrefetcher for RecordingPrefetcher {
    fn fetch_and_store(&self, server_url: &str, _payload: &PushPayload) {
        self.calls.lock().unwrap().push(server_url.to_string());
    }
}

/// A temp data dir plus fakes for every host collaborator.
pub struct TestHost {
    pub dir: TempDir,
    pub platform: Arc<FakePlatform>,
    pub drawer: Arc<FakeDrawer>,
    pub servers: Arc<StaticServers>,
    pub credentials: Arc<MapCredentials>,
    pub prefs: Arc<FilePreferences>,
    pub prefetcher: Arc<RecordingPrefetcher>,
    pub bridge: RecordingBridge,
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_sdk(33)
    }

    pub fn with_sdk(sdk_int: u32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap().to_string();
        write_config(&data_dir, 10);
        let prefs = Arc::new(FilePreferences::open(&data_dir).unwrap());
        Self {
            dir,
            platform: Arc::new(FakePlatform::new(sdk_int)),
            drawer: Arc::new(FakeDrawer::default()),
            servers: Arc::new(StaticServers::default()),
            credentials: Arc::new(MapCredentials::default()),
            prefs,
            prefetcher: Arc::new(RecordingPrefetcher::default()),
            bridge: RecordingBridge::default(),
        }
    }

    pub fn data_dir(&self) -> String {
        self.dir.path().to_str().unwrap().to_string()
    }

    pub fn push_host(&self) -> PushHost {
        PushHost {
            platform: self.platform.clone(),
            drawer: self.drawer.clone(),
            servers: self.servers.clone(),
            credentials: self.credentials.clone(),
            preferences: self.prefs.clone(),
            prefetcher: Some(self.prefetcher.clone() as Arc<dyn ConversationPrefetcher>),
        }
    }

    pub fn start(&self) -> Arc<PushHandler> {
        let handler = PushHandler::new(self.data_dir(), self.push_host()).unwrap();
        handler.set_bridge_emitter(Box::new(self.bridge.clone()));
        assert!(handler.wait_idle_for_tests(Duration::from_secs(5)));
        handler
    }

    pub fn index_store(&self) -> NotificationIndexStore {
        NotificationIndexStore::new(self.prefs.clone())
    }

    pub fn index(&self) -> NotificationIndex {
        self.index_store().load()
    }
}
