use std::io::{self, Write};

/// Receives text fragments as soon as they arrive
///
/// Writes are fire-and-forget: a sink has no way to slow the stream down or
/// to fail the turn.
pub trait TextSink {
    fn write_fragment(&mut self, fragment: &str);
}

/// Writes fragments to stdout, flushing after each one
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl TextSink for StdoutSink {
    fn write_fragment(&mut self, fragment: &str) {
        let mut stdout = io::stdout().lock();
        // Display only; a closed stdout must not abort the turn
        let _ = stdout.write_all(fragment.as_bytes());
        let _ = stdout.flush();
    }
}

/// Discards every fragment
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TextSink for NullSink {
    fn write_fragment(&mut self, _fragment: &str) {}
}

impl TextSink for String {
    fn write_fragment(&mut self, fragment: &str) {
        self.push_str(fragment);
    }
}

impl TextSink for Vec<String> {
    fn write_fragment(&mut self, fragment: &str) {
        self.push(fragment.to_string());
    }
}

impl<F> TextSink for F
where
    F: FnMut(&str),
{
    fn write_fragment(&mut self, fragment: &str) {
        self(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(sink: &mut dyn TextSink) {
        for fragment in ["Hel", "lo"] {
            sink.write_fragment(fragment);
        }
    }

    #[test]
    fn test_capturing_sinks() {
        let mut text = String::new();
        feed(&mut text);
        assert_eq!(text, "Hello");

        let mut fragments: Vec<String> = Vec::new();
        feed(&mut fragments);
        assert_eq!(fragments, ["Hel", "lo"]);

        let mut count = 0;
        feed(&mut |_: &str| count += 1);
        assert_eq!(count, 2);

        feed(&mut NullSink);
    }
}
