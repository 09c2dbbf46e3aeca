//! Log output layer for the binary.
//!
//! The run summary owns stdout, so every log format is written to the writer
//! handed in here (stderr in the binary).

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Formatting layer writing plain or JSON lines to `writer`.
pub fn log_layer<S, W>(json: bool, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    if json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
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

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn json_lines_go_to_the_given_writer() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(log_layer(true, captured.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(flights = 3, "Loaded routes");
        });

        let text = captured.text();
        let line: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(line["fields"]["message"], "Loaded routes");
        assert_eq!(line["fields"]["flights"], 3);
    }

    #[test]
    fn plain_lines_go_to_the_given_writer() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::registry().with(log_layer(false, captured.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(flight_id = "A1", "Departure could not be separated");
        });

        let text = captured.text();
        assert!(text.contains("Departure could not be separated"));
        assert!(text.contains("A1"));
    }
}
