use std::io;
use std::sync::{Arc, Mutex};

use cf_telemetry::logging::{self, LogFormat};
use tracing_subscriber::EnvFilter;

/// Cloneable in-memory sink for a subscriber's output.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn make_writer(&self) -> impl Fn() -> Captured + Send + Sync + 'static {
        let sink = self.clone();
        move || sink.clone()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn json_lines_carry_message_and_fields() {
    let out = Captured::default();
    let subscriber = logging::json_subscriber(EnvFilter::new("info"), out.make_writer());

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(files = 2, "found 2 files in photos");
    });

    let text = out.text();
    let line = text.lines().next().expect("one json line");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["level"], "INFO");
    assert_eq!(event["fields"]["message"], "found 2 files in photos");
    assert_eq!(event["fields"]["files"], 2);
    assert!(event["line_number"].is_number());
}

#[test]
fn human_output_omits_target() {
    let out = Captured::default();
    let subscriber = logging::human_subscriber(EnvFilter::new("info"), out.make_writer());

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("listing files");
    });

    let text = out.text();
    assert!(text.contains("listing files"));
    assert!(text.contains("INFO"));
    assert!(!text.contains("logging_test"));
    assert!(serde_json::from_str::<serde_json::Value>(text.trim()).is_err());
}

#[test]
fn filter_drops_events_below_level() {
    let out = Captured::default();
    let subscriber = logging::human_subscriber(EnvFilter::new("warn"), out.make_writer());

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("getting stats");
        tracing::warn!("cannot remove files.txt");
    });

    let text = out.text();
    assert!(!text.contains("getting stats"));
    assert!(text.contains("cannot remove files.txt"));
}

#[test]
fn init_dispatches_on_format() {
    // Only the first call installs a global subscriber; neither may panic.
    logging::init(LogFormat::Json, "chronofile-test", "warn");
    logging::init(LogFormat::Human, "chronofile-test", "warn");
    assert_eq!(LogFormat::default(), LogFormat::Human);
}
