#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dockhand::app::App;
use dockhand::config::Config;
use dockhand::container_management::NoticeKind;
use dockhand::inputs::key::Key;
use dockhand::io::handler::IoAsyncHandler;
use dockhand::io::IoEvent;
use tokio::sync::{mpsc, Mutex};

/// Shell stand-in for the engine CLI. Every call is appended to `calls` next
/// to the script. `logs` honours `--since` the way the engine does.
struct FakeEngine {
    dir: PathBuf,
}

impl FakeEngine {
    fn new(tag: &str, containers: &str, stop_delay_secs: u32) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "dockhand-engine-{}-{}",
            std::process::id(),
            tag
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let script = format!(
            r#"#!/bin/sh
dir=$(dirname "$0")
echo "$*" >> "$dir/calls"
case "$1" in
ps) printf '%s' '{containers}' ;;
images) ;;
stop)
  sleep {stop_delay_secs}
  echo 'Error response from daemon: No such container: a1' >&2
  exit 1
  ;;
stats) echo '1.0%;2.0%' ;;
logs)
  since=""
  while [ $# -gt 0 ]; do
    if [ "$1" = "--since" ]; then since="$2"; fi
    shift
  done
  printf '2099-01-01T00:00:00.000000001Z first\n2099-01-01T00:00:00.000000002Z second\n' |
    awk -v s="$since" 's == "" || $1 >= s'
  ;;
esac
"#
        );
        let path = dir.join("engine");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir }
    }

    fn config(&self) -> Config {
        Config {
            engine_binary: self.dir.join("engine").to_string_lossy().into_owned(),
            sample_interval_ms: 20,
            usage_frame_budget: None,
            log_follow_interval_ms: 20,
            ..Config::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.join("calls"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn stats_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with("stats"))
            .collect()
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

const ONE_CONTAINER: &str = "a1|nginx|Up 1 minute|web\n";

struct Harness {
    app: Arc<Mutex<App>>,
    rx: mpsc::Receiver<IoEvent>,
    handler: IoAsyncHandler,
}

impl Harness {
    fn new(engine: &FakeEngine) -> Self {
        let (tx, rx) = mpsc::channel(16);
        let app = Arc::new(Mutex::new(App::new(tx)));
        let handler = IoAsyncHandler::new(Arc::clone(&app), engine.config());
        Self { app, rx, handler }
    }

    /// Presses `key` and runs whatever it dispatched.
    async fn press(&mut self, key: Key) {
        self.app.lock().await.do_action(key).await;
        while let Ok(event) = self.rx.try_recv() {
            self.handler.handle_io_event(event).await;
        }
    }
}

#[tokio::test]
async fn ui_stays_responsive_while_engine_is_busy() {
    let engine = FakeEngine::new("busy", ONE_CONTAINER, 1);
    let (tx, mut rx) = mpsc::channel::<IoEvent>(1);
    let app = Arc::new(Mutex::new(App::new(tx)));
    let mut handler = IoAsyncHandler::new(Arc::clone(&app), engine.config());
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            handler.handle_io_event(event).await;
        }
    });

    app.lock().await.dispatch(IoEvent::RefreshContainers);
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.lock().await.containers().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    app.lock().await.do_action(Key::Char('x')).await;
    // Wait until the handler is inside the slow `stop`.
    while !engine.calls().iter().any(|call| call.starts_with("stop")) {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    tokio::time::timeout(Duration::from_millis(500), async {
        for _ in 0..2 {
            app.lock().await.do_action(Key::Char('r')).await;
        }
    })
    .await
    .expect("key presses blocked behind the engine");

    let notice = app.lock().await.notice().cloned().unwrap();
    assert_eq!(notice.kind, NoticeKind::Warning);
    assert_eq!(notice.title, "Busy");

    // The handler still gets the lock and reports the stop.
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            {
                let mut app = app.lock().await;
                match app.notice().map(|n| n.title.clone()) {
                    Some(title) if title == "Stop" => break,
                    Some(_) => {
                        app.do_action(Key::Esc).await;
                    }
                    None => {}
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn failed_stop_shows_engine_message() {
    let engine = FakeEngine::new("stop", ONE_CONTAINER, 0);
    let mut harness = Harness::new(&engine);
    harness.handler.handle_io_event(IoEvent::Initialize).await;
    // No images in this engine.
    harness.press(Key::Esc).await;
    assert!(harness.app.lock().await.notice().is_none());

    harness.press(Key::Char('x')).await;

    let app = harness.app.lock().await;
    let notice = app.notice().unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert_eq!(notice.title, "Stop");
    assert!(notice.body.contains("No such container: a1"));
    assert_eq!(app.containers().len(), 1);
}

#[tokio::test]
async fn empty_engine_warns_about_containers_and_images() {
    let engine = FakeEngine::new("empty", "", 0);
    let mut harness = Harness::new(&engine);
    harness.handler.handle_io_event(IoEvent::Initialize).await;

    let first = harness.app.lock().await.notice().map(|n| n.title.clone());
    let titles = [
        first,
        {
            harness.press(Key::Esc).await;
            harness.app.lock().await.notice().map(|n| n.title.clone())
        },
    ];
    assert_eq!(
        titles,
        [Some("No Containers".to_string()), Some("No Images".to_string())]
    );
    harness.press(Key::Esc).await;
    assert!(harness.app.lock().await.notice().is_none());
}

#[tokio::test]
async fn leaving_usage_view_stops_sampling() {
    let engine = FakeEngine::new("usage", ONE_CONTAINER, 0);
    let mut harness = Harness::new(&engine);
    harness.handler.handle_io_event(IoEvent::RefreshContainers).await;

    harness.press(Key::Char('u')).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    {
        let app = harness.app.lock().await;
        let usage = app.usage().expect("no usage snapshot posted");
        assert_eq!(usage.container_id, "a1");
        assert!(!usage.series.is_empty());
    }
    assert!(!engine.stats_calls().is_empty());

    harness.press(Key::Esc).await;
    assert!(harness.app.lock().await.usage().is_none());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let calls = engine.stats_calls().len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.stats_calls().len(), calls);
}

#[tokio::test]
async fn new_usage_view_replaces_running_sampler() {
    let engine = FakeEngine::new("switch", ONE_CONTAINER, 0);
    let mut harness = Harness::new(&engine);

    harness
        .handler
        .handle_io_event(IoEvent::ShowUsage("a1".into()))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness
        .handler
        .handle_io_event(IoEvent::ShowUsage("b2".into()))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let before = engine.stats_calls().len();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let calls = engine.stats_calls();
    assert!(calls.len() > before);
    assert!(calls[before..].iter().all(|call| call.ends_with(" b2")));
}

#[tokio::test]
async fn followed_logs_appear_once() {
    let engine = FakeEngine::new("logs", ONE_CONTAINER, 0);
    let mut harness = Harness::new(&engine);
    harness.handler.handle_io_event(IoEvent::RefreshContainers).await;

    harness.press(Key::Char('l')).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    let polls = engine
        .calls()
        .iter()
        .filter(|call| call.starts_with("logs"))
        .count();
    assert!(polls > 2);
    assert_eq!(harness.app.lock().await.logs(), ["first", "second"]);

    harness.press(Key::Esc).await;
}
