//! Logging integration: diagnostics are mirrored as tracing events

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use drawschema::core::logging::init_logging;
use drawschema::{infer, SchemaSnapshot};
use tracing::Level;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut bytes) = self.0.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const DUPLICATE_CITIES: &str = r#"<mxGraphModel><root>
    <object id="c1" label="City" EN="CITY" tags="_класс"><mxCell parent="1"/></object>
    <object id="a1" label="Name" EN="NAME" tags="_атрибут"><mxCell parent="c1"/></object>
    <object id="c2" label="Town" EN="CITY" tags="_класс"><mxCell parent="1"/></object>
    <object id="a2" label="Name" EN="NAME" tags="_атрибут"><mxCell parent="c2"/></object>
</root></mxGraphModel>"#;

#[test]
fn test_diagnostics_are_logged() {
    let buffer = SharedBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(Level::DEBUG)
        .finish();

    let report = tracing::subscriber::with_default(subscriber, || {
        infer(DUPLICATE_CITIES, &SchemaSnapshot::new()).unwrap()
    });
    assert_eq!(report.diagnostics.error_count(), 1);

    let output = buffer.contents();
    assert!(output.contains("WARN"));
    assert!(output.contains("duplicate-identifier"));
    assert!(output.contains("Diagram model built"));
}

#[test]
fn test_init_logging() {
    assert!(init_logging(Some("info"), Some("xml")).is_err());
    assert!(init_logging(Some("warn"), Some("json")).is_ok());
    // A global subscriber can only be installed once.
    assert!(init_logging(Some("warn"), Some("compact")).is_err());
}
