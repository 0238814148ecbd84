//! JSON lines transport.
//!
//! Serializes each delivered event as a single line of JSON. Write failures
//! surface as delivery errors, which the bus logs.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::event_bus::{Delivery, NerveEvent, Transport};

/// Transport appending one JSON object per event to a writer
pub struct JsonLinesTransport<W: Write + Send> {
    name: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    /// Wrap an arbitrary writer
    pub fn new(name: impl Into<String>, writer: W) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consume the transport and return the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesTransport<BufWriter<File>> {
    /// Append to a file, creating it if needed
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new("jsonl", BufWriter::new(file)))
    }
}

impl<W: Write + Send> Transport for JsonLinesTransport<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, event: &Arc<NerveEvent>) -> anyhow::Result<Delivery> {
        let line = serde_json::to_string(event.as_ref())?;
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(Delivery::Done)
    }
}

impl<W: Write + Send> std::fmt::Debug for JsonLinesTransport<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonLinesTransport")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::{MetricSnapshot, Signal};
    use std::io;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn event(value: f64) -> Arc<NerveEvent> {
        Arc::new(NerveEvent::new(
            Signal::Metric(MetricSnapshot::new("queue.size", value)),
            2,
        ))
    }

    #[test]
    fn test_writes_one_line_per_event() {
        let transport = JsonLinesTransport::new("mem", Vec::new());
        transport.send(&event(1.0)).expect("Should write");
        transport.send(&event(2.0)).expect("Should write");

        let output = String::from_utf8(transport.into_inner()).expect("Should be UTF-8");
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: NerveEvent = serde_json::from_str(lines[1]).expect("Should parse");
        assert!(matches!(parsed.signal(), Signal::Metric(m) if m.value == 2.0));
    }

    #[test]
    fn test_write_failure_is_reported() {
        let transport = JsonLinesTransport::new("broken", Broken);
        assert!(transport.send(&event(1.0)).is_err());
    }
}
