use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use vmix_control::{
    AudioBus, Command, FallbackSource, FetchSource, MixerClient, MixerConfig, MixerError,
    Notification, NotificationLevel,
};

const LIVE_XML: &str = r#"<vmix>
<version>28.0.0.1</version>
<edition>Pro</edition>
<inputs>
<input key="k1" number="1" type="Video" title="Clip" state="Paused" duration="5000" muted="True" audiobusses="M"/>
<input key="k2" number="2" type="GT" title="Lower Third" state="Paused"/>
<input key="k3" number="3" type="Mix" title="Screen" state="Paused"/>
</inputs>
<overlays><overlay number="1"/><overlay number="2">2</overlay><overlay number="3"/><overlay number="4"/></overlays>
<active>1</active>
<preview>2</preview>
<recording>True</recording>
</vmix>"#;

const SNAPSHOT_XML: &str = "<vmix><version>snapshot</version><inputs/></vmix>";

type Query_ = Vec<(String, String)>;

/// Minimal stand-in for the vMix web API
#[derive(Clone)]
struct FakeMixer {
    xml: Arc<Mutex<String>>,
    state_status: Arc<AtomicU16>,
    failing_function: Arc<Mutex<Option<String>>>,
    snapshot: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<Query_>>>,
    state_hits: Arc<AtomicUsize>,
    snapshot_hits: Arc<AtomicUsize>,
}

impl FakeMixer {
    fn new() -> Self {
        Self {
            xml: Arc::new(Mutex::new(LIVE_XML.to_string())),
            state_status: Arc::new(AtomicU16::new(200)),
            failing_function: Arc::new(Mutex::new(None)),
            snapshot: Arc::new(Mutex::new(Some(SNAPSHOT_XML.to_string()))),
            calls: Arc::new(Mutex::new(Vec::new())),
            state_hits: Arc::new(AtomicUsize::new(0)),
            snapshot_hits: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn functions(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|query| {
                query
                    .iter()
                    .find(|(k, _)| k == "Function")
                    .map(|(_, v)| v.clone())
            })
            .collect()
    }

    /// Serve on an ephemeral port, returning the API base URL
    async fn serve(&self) -> String {
        let app = Router::new()
            .route("/api/", get(api))
            .route("/snapshot.xml", get(snapshot))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

async fn api(State(mixer): State<FakeMixer>, Query(query): Query<Query_>) -> (StatusCode, String) {
    let function = query
        .iter()
        .find(|(k, _)| k == "Function")
        .map(|(_, v)| v.clone());

    match function {
        Some(function) => {
            mixer.calls.lock().push(query);
            if mixer.failing_function.lock().as_deref() == Some(function.as_str()) {
                (StatusCode::INTERNAL_SERVER_ERROR, "Error".to_string())
            } else {
                (StatusCode::OK, "Function completed successfully.".to_string())
            }
        }
        None => {
            mixer.state_hits.fetch_add(1, Ordering::SeqCst);
            let status = StatusCode::from_u16(mixer.state_status.load(Ordering::SeqCst)).unwrap();
            (status, mixer.xml.lock().clone())
        }
    }
}

async fn snapshot(State(mixer): State<FakeMixer>) -> (StatusCode, String) {
    mixer.snapshot_hits.fetch_add(1, Ordering::SeqCst);
    match mixer.snapshot.lock().clone() {
        Some(xml) => (StatusCode::OK, xml),
        None => (StatusCode::NOT_FOUND, String::new()),
    }
}

async fn client_for(mixer: &FakeMixer) -> MixerClient {
    let host = mixer.serve().await;
    let config = MixerConfig::new(format!("{}/api", host))
        .with_fallback(FallbackSource::Url(format!("{}/snapshot.xml", host)))
        .with_request_timeout(Duration::from_secs(2));
    MixerClient::new(config).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        out.push(notification);
    }
    out
}

#[tokio::test]
async fn refresh_installs_live_document() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;
    let mut notifications = client.notifications();

    let source = client.refresh().await.unwrap();

    assert_eq!(source, FetchSource::Primary);
    let doc = client.current().unwrap();
    assert_eq!(doc.config().version, "28.0.0.1");
    assert!(doc.status().recording);
    assert_eq!(doc.inputs().len(), 3);
    assert_eq!(mixer.snapshot_hits.load(Ordering::SeqCst), 0);
    let levels: Vec<_> = drain(&mut notifications).iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![NotificationLevel::Success]);
}

#[tokio::test]
async fn primary_failure_tries_fallback_once() {
    let mixer = FakeMixer::new();
    mixer.state_status.store(500, Ordering::SeqCst);
    let client = client_for(&mixer).await;

    let source = client.refresh().await.unwrap();

    assert_eq!(source, FetchSource::Fallback);
    assert_eq!(client.current().unwrap().config().version, "snapshot");
    assert_eq!(mixer.state_hits.load(Ordering::SeqCst), 1);
    assert_eq!(mixer.snapshot_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_document() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;
    client.refresh().await.unwrap();

    mixer.state_status.store(503, Ordering::SeqCst);
    *mixer.snapshot.lock() = None;
    let mut notifications = client.notifications();

    let err = client.refresh().await.unwrap_err();

    assert!(matches!(err, MixerError::Unavailable { .. }));
    assert_eq!(mixer.snapshot_hits.load(Ordering::SeqCst), 1);
    assert_eq!(client.current().unwrap().config().version, "28.0.0.1");
    let levels: Vec<_> = drain(&mut notifications).iter().map(|n| n.level).collect();
    assert_eq!(levels, vec![NotificationLevel::Error]);
}

#[tokio::test]
async fn malformed_primary_falls_back_to_bundled_snapshot() {
    let mixer = FakeMixer::new();
    *mixer.xml.lock() = "<vmix><inputs></vmix>".to_string();
    let host = mixer.serve().await;
    let client = MixerClient::new(MixerConfig::new(format!("{}/api", host))).unwrap();

    let source = client.refresh().await.unwrap();

    assert_eq!(source, FetchSource::Fallback);
    assert_eq!(client.current().unwrap().config().version, "27.0.0.49");
}

#[tokio::test]
async fn disabled_fallback_surfaces_error() {
    let mixer = FakeMixer::new();
    mixer.state_status.store(404, Ordering::SeqCst);
    let host = mixer.serve().await;
    let config =
        MixerConfig::new(format!("{}/api", host)).with_fallback(FallbackSource::Disabled);
    let client = MixerClient::new(config).unwrap();

    match client.refresh().await.unwrap_err() {
        MixerError::Unavailable { primary, fallback } => {
            assert!(matches!(*primary, MixerError::Status { status: 404, .. }));
            assert!(matches!(*fallback, MixerError::FallbackDisabled));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(client.current().is_none());
}

#[tokio::test]
async fn send_to_program_fades_then_refreshes() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;

    let started = Instant::now();
    client
        .execute(Command::SendToProgram {
            input: "k1".to_string(),
        })
        .await;

    assert!(started.elapsed() >= Duration::from_millis(600));
    let calls = mixer.calls.lock().clone();
    assert_eq!(calls.len(), 1);
    let expected: Vec<(String, String)> = [
        ("Function", "Fade"),
        ("Input", "k1"),
        ("Mix", "0"),
        ("Duration", "500"),
        ("Index", "2"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(calls[0], expected);
    assert_eq!(mixer.state_hits.load(Ordering::SeqCst), 1);
    assert!(client.current().is_some());
}

#[tokio::test]
async fn overlay_toggle_off_uses_longer_settle() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;
    client.refresh().await.unwrap();

    let started = Instant::now();
    client
        .execute(Command::ToggleOverlay {
            input: "k2".to_string(),
            slot: 2,
        })
        .await;

    assert!(started.elapsed() >= Duration::from_millis(550));
    assert_eq!(mixer.functions(), vec!["OverlayInput2"]);
}

#[tokio::test]
async fn toggles_read_state_before_dispatch() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;
    client.refresh().await.unwrap();

    client
        .execute(Command::ToggleAudio {
            input: "k1".to_string(),
        })
        .await;
    client
        .execute(Command::ToggleBus {
            input: "k1".to_string(),
            bus: AudioBus::Master,
        })
        .await;

    assert_eq!(mixer.functions(), vec!["AudioOn", "AudioBusOff"]);
    let calls = mixer.calls.lock().clone();
    assert!(calls[1].contains(&("Value".to_string(), "M".to_string())));
}

#[tokio::test]
async fn composite_command_aborts_but_still_refreshes() {
    let mixer = FakeMixer::new();
    *mixer.failing_function.lock() = Some("AudioOn".to_string());
    let client = client_for(&mixer).await;
    let mut notifications = client.notifications();

    client
        .execute(Command::QueuePlay {
            input: "k1".to_string(),
        })
        .await;

    assert_eq!(mixer.functions(), vec!["Restart", "AudioOn"]);
    assert_eq!(mixer.state_hits.load(Ordering::SeqCst), 1);
    let received = drain(&mut notifications);
    assert_eq!(received[0].level, NotificationLevel::Error);
    assert!(received[0].message.contains("queue and play"));
    assert_eq!(received[1].level, NotificationLevel::Success);
}

#[tokio::test]
async fn set_countdown_runs_stop_set_start() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;

    client
        .execute(Command::SetCountdown {
            input: "k2".to_string(),
            minutes: 90.0,
            start: true,
        })
        .await;

    assert_eq!(
        mixer.functions(),
        vec!["StopCountdown", "SetCountdown", "StartCountdown"]
    );
    let calls = mixer.calls.lock().clone();
    assert!(calls[1].contains(&("Value".to_string(), "01:30:00".to_string())));
}

#[tokio::test]
async fn late_subscriber_is_called_immediately() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;
    client.refresh().await.unwrap();

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    client.subscribe(move |doc| {
        assert_eq!(doc.config().version, "28.0.0.1");
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    // Once from the known document, once from the fetched one
    client.refresh().await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn failed_refresh_redelivers_known_document() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;
    client.refresh().await.unwrap();

    let versions = Arc::new(Mutex::new(Vec::new()));
    let sink = versions.clone();
    client.subscribe(move |doc| {
        sink.lock().push(doc.config().version.clone());
        Ok(())
    });

    mixer.state_status.store(500, Ordering::SeqCst);
    *mixer.snapshot.lock() = None;
    assert!(client.refresh().await.is_err());

    assert_eq!(
        *versions.lock(),
        vec!["28.0.0.1".to_string(), "28.0.0.1".to_string()]
    );
}

#[tokio::test]
async fn refresh_without_document_notifies_only_after_install() {
    let mixer = FakeMixer::new();
    let client = client_for(&mixer).await;

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    client.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    client.refresh().await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn polling_refreshes_until_stopped() {
    let mixer = FakeMixer::new();
    let host = mixer.serve().await;
    let config = MixerConfig::new(format!("{}/api", host))
        .with_poll_interval(Duration::from_millis(50));
    let client = MixerClient::new(config).unwrap();
    let mut updates = client.subscribe_updates();

    let mut poller = client.start_polling();
    assert!(poller.is_running());
    for _ in 0..2 {
        let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update.source, FetchSource::Primary);
    }
    poller.stop().await;

    assert!(!poller.is_running());
    let hits = mixer.state_hits.load(Ordering::SeqCst);
    assert!(hits >= 2);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(mixer.state_hits.load(Ordering::SeqCst), hits);
}
