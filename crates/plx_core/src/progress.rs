//! Incremental parser for worker diagnostic output.
//!
//! The worker reports progress as plain text lines on its diagnostic
//! stream. Chunks arrive at arbitrary byte boundaries, so the parser
//! buffers partial lines (including markers whose multi-byte glyphs may be
//! split across reads) and only interprets complete lines. Anything that
//! is not a recognized marker is log noise and produces no signal.

/// A structured signal extracted from the diagnostic stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSignal {
    /// A `Progress: <processed>/<total>` marker.
    Processed { processed: u32, total: u32 },
    /// A per-item success marker.
    ItemSucceeded,
    /// A per-item failure marker.
    ItemFailed,
}

/// Line-buffering parser for one job's diagnostic stream.
#[derive(Debug, Default)]
pub struct ProgressParser {
    buffer: Vec<u8>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of stream bytes, returning signals for every complete
    /// line the chunk finishes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ProgressSignal> {
        self.buffer.extend_from_slice(chunk);

        let mut signals = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(signal) = parse_line(line.trim_end()) {
                signals.push(signal);
            }
        }
        signals
    }

    /// Drain the remaining unterminated line at end of stream.
    ///
    /// Safe to call once no further chunks can arrive; a final marker
    /// without a trailing newline is still interpreted.
    pub fn finish(&mut self) -> Option<ProgressSignal> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = String::from_utf8_lossy(&rest);
        let rest = rest.trim();
        if rest.is_empty() {
            None
        } else {
            parse_line(rest)
        }
    }
}

/// Interpret a single complete diagnostic line.
fn parse_line(line: &str) -> Option<ProgressSignal> {
    if let Some(rest) = marker_suffix(line, "Progress: ") {
        if let Some((processed, total)) = parse_fraction(rest) {
            return Some(ProgressSignal::Processed { processed, total });
        }
    }
    if line.contains("✓ Success:") {
        return Some(ProgressSignal::ItemSucceeded);
    }
    if line.contains("✗ Failed:") {
        return Some(ProgressSignal::ItemFailed);
    }
    None
}

/// Return the text following `marker`, wherever it occurs in the line.
fn marker_suffix<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.find(marker).map(|idx| &line[idx + marker.len()..])
}

/// Parse a `<processed>/<total>` fraction, ignoring trailing text.
fn parse_fraction(text: &str) -> Option<(u32, u32)> {
    let (lhs, rhs) = text.split_once('/')?;
    let processed = lhs.trim().parse().ok()?;
    let digits: &str = {
        let end = rhs
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rhs.len());
        &rhs[..end]
    };
    let total = digits.parse().ok()?;
    Some((processed, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_progress_marker() {
        let mut parser = ProgressParser::new();
        let signals = parser.feed(b"Progress: 6/12\n");
        assert_eq!(
            signals,
            vec![ProgressSignal::Processed {
                processed: 6,
                total: 12
            }]
        );
    }

    #[test]
    fn buffers_line_split_across_chunks() {
        let mut parser = ProgressParser::new();
        assert!(parser.feed(b"Progre").is_empty());
        assert!(parser.feed(b"ss: 6/1").is_empty());
        let signals = parser.feed(b"2\nProgress: 12/12\n");
        assert_eq!(
            signals,
            vec![
                ProgressSignal::Processed {
                    processed: 6,
                    total: 12
                },
                ProgressSignal::Processed {
                    processed: 12,
                    total: 12
                },
            ]
        );
    }

    #[test]
    fn outcome_markers() {
        let mut parser = ProgressParser::new();
        let signals = parser.feed("✓ Success: v1\n✗ Failed: v2 - no captions\n".as_bytes());
        assert_eq!(
            signals,
            vec![ProgressSignal::ItemSucceeded, ProgressSignal::ItemFailed]
        );
    }

    #[test]
    fn outcome_marker_glyph_split_across_chunks() {
        // The check glyph is three bytes; split it mid-character.
        let bytes = "✓ Success: v1\n".as_bytes();
        let mut parser = ProgressParser::new();
        assert!(parser.feed(&bytes[..2]).is_empty());
        let signals = parser.feed(&bytes[2..]);
        assert_eq!(signals, vec![ProgressSignal::ItemSucceeded]);
    }

    #[test]
    fn noise_lines_produce_no_signal() {
        let mut parser = ProgressParser::new();
        let signals = parser.feed(b"Waiting 8.0 seconds...\nFetching transcript for v3\n");
        assert!(signals.is_empty());
    }

    #[test]
    fn finish_drains_unterminated_tail() {
        let mut parser = ProgressParser::new();
        assert!(parser.feed(b"Progress: 12/12").is_empty());
        assert_eq!(
            parser.finish(),
            Some(ProgressSignal::Processed {
                processed: 12,
                total: 12
            })
        );
        assert_eq!(parser.finish(), None);
    }

    #[test]
    fn malformed_fraction_is_noise() {
        let mut parser = ProgressParser::new();
        assert!(parser.feed(b"Progress: six/twelve\n").is_empty());
        assert!(parser.feed(b"Progress: 6\n").is_empty());
    }
}
