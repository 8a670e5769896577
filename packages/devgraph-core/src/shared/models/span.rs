use serde::{Deserialize, Serialize};

/// A 0-indexed, end-exclusive line range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub end_line: u32,
}

impl Span {
    pub fn new(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
        }
    }

    pub fn line_count(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line)
    }

    /// Render as the `<start>:<end>` form stored on chunks.
    pub fn as_str(&self) -> String {
        format!("{}:{}", self.start_line, self.end_line)
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (start, end) = s.split_once(':')?;
        Some(Self {
            start_line: start.parse().ok()?,
            end_line: end.parse().ok()?,
        })
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start_line, self.end_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_roundtrip() {
        let span = Span::new(3, 17);
        assert_eq!(span.as_str(), "3:17");
        assert_eq!(Span::parse("3:17"), Some(span));
        assert_eq!(span.line_count(), 14);
    }

    #[test]
    fn test_span_parse_invalid() {
        assert_eq!(Span::parse("3"), None);
        assert_eq!(Span::parse("a:b"), None);
    }
}
