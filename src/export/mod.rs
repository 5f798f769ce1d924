//! Event delivery.
//!
//! Events are handed to a publisher one at a time; there is no batching
//! contract beyond that.

use crate::cloudwatch::Event;
use crate::core::{CollectorError, Result};
use std::io::Write;

/// Receives finished events, one per call.
pub trait EventPublisher {
    /// Publish a single event.
    fn publish(&mut self, event: &Event) -> Result<()>;
}

/// Writes each event as one JSON object per line.
pub struct JsonLinesPublisher<W: Write> {
    writer: W,
    published: usize,
}

impl<W: Write> JsonLinesPublisher<W> {
    /// Create a publisher over any writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            published: 0,
        }
    }

    /// Number of events written so far.
    pub fn published(&self) -> usize {
        self.published
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> EventPublisher for JsonLinesPublisher<W> {
    fn publish(&mut self, event: &Event) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event).map_err(|e| {
            CollectorError::publish(format!("failed to write event {}: {}", event.identity, e))
        })?;
        self.writer.write_all(b"\n")?;
        self.published += 1;
        Ok(())
    }
}

/// Publishes every event, stopping at the first failure.
pub fn publish_all<P: EventPublisher + ?Sized>(publisher: &mut P, events: &[Event]) -> Result<usize> {
    for event in events {
        publisher.publish(event)?;
    }
    Ok(events.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_lines() {
        let mut event = Event::for_test("i-1");
        event.put("aws.ec2.metrics.CPUUtilization.avg", 12.5);
        let events = vec![event, Event::for_test("i-2")];

        let mut publisher = JsonLinesPublisher::new(Vec::new());
        assert_eq!(publish_all(&mut publisher, &events).unwrap(), 2);
        assert_eq!(publisher.published(), 2);

        let output = String::from_utf8(publisher.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["aws.ec2.metrics.CPUUtilization.avg"], 12.5);
        assert_eq!(first["cloud.region"], "us-east-1");
    }
}
