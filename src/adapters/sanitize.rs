//! Log sanitization utilities for patient-identifier filtering.
//!
//! Report file names embed the patient's name, so any log line mentioning an
//! output path would leak it. This module redacts:
//! - Patient names inside report file names and `Patient Name:` lines
//! - SSN-like numbers and medical record numbers (MRNs)
//! - Email addresses and phone numbers
//!
//! # Important: prefer not logging identifiers at all
//!
//! Sanitizing strings is a fallback. Call sites should avoid putting names
//! into log messages in the first place.
//!
//! # Performance
//!
//! `sanitize()` caps the input it scans (see `HEARTVERSE_SANITIZE_MAX_BYTES`)
//! so a pathological log line cannot stall the writer.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

/// Compiled patterns for identifier detection and sanitization.
static PII_PATTERNS: OnceLock<PiiPatterns> = OnceLock::new();

/// Maximum number of bytes to sanitize per call. Defaults to 16 KiB.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// A compiled pattern with its replacement text.
struct PiiPattern {
    regex: Regex,
    replacement: &'static str,
}

struct PiiPatterns {
    set: RegexSet,
    patterns: Vec<PiiPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("HEARTVERSE_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static PiiPatterns {
    PII_PATTERNS.get_or_init(|| {
        let rules: Vec<(&'static str, &'static str)> = vec![
            // Report file names: everything after the last quote/separator is the name.
            (
                r#"[^"'/\\\n]*_heart_report\.pdf"#,
                "[REDACTED-NAME]_heart_report.pdf",
            ),
            // Report header line, if report text ever reaches a log
            (r"Patient Name:[^\n]*", "Patient Name: [REDACTED-NAME]"),
            // SSN-like patterns (xxx-xx-xxxx)
            (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
            // MRN patterns (common formats)
            (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
            // Email patterns (bounded labels; case-insensitive)
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            // Phone patterns
            (
                r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
                "[REDACTED-PHONE]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| PiiPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        PiiPatterns { set, patterns }
    })
}

/// Sanitize a string by replacing identifier patterns.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    // Only apply patterns that matched the scanned prefix.
    for idx in patterns.set.matches(prefix).into_iter() {
        let pattern = &patterns.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains a potential patient identifier.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().set.is_match(prefix)
}

/// Wraps any `MakeWriter` so every log line is redacted before it reaches
/// the sink (stderr or the log file).
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            sink: self.inner.make_writer(),
            pending: Vec::new(),
        }
    }
}

/// Per-event writer. Redaction works on whole lines, so bytes are held back
/// until a newline arrives, the writer is flushed or dropped, or the held
/// text outgrows twice the sanitize cap.
pub struct SanitizingWriter<W: std::io::Write> {
    sink: W,
    pending: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn emit(&mut self, raw: &[u8]) -> std::io::Result<()> {
        let clean = sanitize(&String::from_utf8_lossy(raw));
        self.sink.write_all(clean.as_bytes())
    }

    /// Emit every complete line held so far.
    fn drain_lines(&mut self) -> std::io::Result<()> {
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            self.emit(&line)?;
        }
        Ok(())
    }

    /// Emit whatever is held, complete line or not.
    fn drain_all(&mut self) -> std::io::Result<()> {
        self.drain_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        if self.pending.len() > max_sanitize_bytes().saturating_mul(2) {
            self.drain_all()?;
            self.sink.write_all(b"\n")?;
        } else {
            self.drain_lines()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.drain_all()?;
        self.sink.flush()
    }
}

impl<W: std::io::Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        // An event without a trailing newline must still be written, redacted.
        let _ = self.drain_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_report_path() {
        let input = r#"Report written to "out/Jane Doe_heart_report.pdf""#;
        let sanitized = sanitize(input);
        assert!(sanitized.contains("out/[REDACTED-NAME]_heart_report.pdf"));
        assert!(!sanitized.contains("Jane"));
        assert!(sanitized.starts_with("Report written to"));
    }

    #[test]
    fn test_sanitize_patient_name_line() {
        let sanitized = sanitize("Patient Name: Jane Doe\nGenerated On: 2026-01-01");
        assert!(sanitized.contains("Patient Name: [REDACTED-NAME]"));
        assert!(sanitized.contains("Generated On"));
        assert!(!sanitized.contains("Jane"));
    }

    #[test]
    fn test_sanitize_ssn() {
        let sanitized = sanitize("SSN: 123-45-6789");
        assert!(sanitized.contains("[REDACTED-SSN]"));
        assert!(!sanitized.contains("123-45-6789"));
    }

    #[test]
    fn test_sanitize_mrn() {
        assert!(sanitize("MRN:12345678 found").contains("[REDACTED-MRN]"));
    }

    #[test]
    fn test_sanitize_email() {
        assert!(sanitize("Contact: patient@hospital.com").contains("[REDACTED-EMAIL]"));
    }

    #[test]
    fn test_contains_pii() {
        assert!(contains_pii("wrote Bob_heart_report.pdf"));
        assert!(contains_pii("SSN: 123-45-6789"));
        assert!(!contains_pii("Loaded random_forest classifier with 15 features"));
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("prefix ä 0123456789 suffix", 9);
        assert!(sanitized.ends_with("[TRUNCATED]"));
    }

    fn sanitizing(out: &mut Vec<u8>) -> SanitizingWriter<&mut Vec<u8>> {
        SanitizingWriter {
            sink: out,
            pending: Vec::new(),
        }
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut out = Vec::new();
        {
            let mut writer = sanitizing(&mut out);
            writer.write_all(b"saving \"Ann_heart_").expect("write");
            writer.write_all(b"report.pdf\"\nnext line\n").expect("write");
            writer.flush().expect("flush");
        }
        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text, "saving \"[REDACTED-NAME]_heart_report.pdf\"\nnext line\n");
    }

    #[test]
    fn test_writer_emits_unterminated_tail_on_drop() {
        let mut out = Vec::new();
        {
            let mut writer = sanitizing(&mut out);
            writer.write_all(b"wrote Ann_heart_report.pdf").expect("write");
        }
        assert_eq!(out, b"wrote [REDACTED-NAME]_heart_report.pdf");
    }

    #[test]
    fn test_make_writer_wraps_sink() {
        let make = SanitizingMakeWriter::new(std::io::sink);
        let mut w = make.make_writer();
        w.write_all(b"Patient Name: Ann\n").expect("write");
        w.flush().expect("flush");
    }
}
