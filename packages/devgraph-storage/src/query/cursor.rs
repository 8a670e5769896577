//! Keyset pagination cursors.

/// A parsed pagination cursor. The canonical form is
/// `"<timestamp>|<element_id>"`; a bare integer is accepted as a legacy
/// skip-count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Keyset { timestamp: String, element_id: String },
    LegacyOffset(usize),
}

impl Cursor {
    pub fn parse(raw: &str) -> Option<Cursor> {
        if let Some((timestamp, element_id)) = raw.split_once('|') {
            if timestamp.is_empty() || element_id.is_empty() {
                return None;
            }
            return Some(Cursor::Keyset {
                timestamp: timestamp.to_string(),
                element_id: element_id.to_string(),
            });
        }
        raw.parse::<usize>().ok().map(Cursor::LegacyOffset)
    }

    /// Render the cursor for the row after `(timestamp, element_id)`.
    pub fn encode(timestamp: &str, element_id: &str) -> String {
        format!("{}|{}", timestamp, element_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyset_roundtrip() {
        let encoded = Cursor::encode("2025-01-01T10:00:00Z", "4:abc:57");
        let parsed = Cursor::parse(&encoded).unwrap();
        assert_eq!(
            parsed,
            Cursor::Keyset {
                timestamp: "2025-01-01T10:00:00Z".into(),
                element_id: "4:abc:57".into(),
            }
        );
    }

    #[test]
    fn test_legacy_offset() {
        assert_eq!(Cursor::parse("250"), Some(Cursor::LegacyOffset(250)));
    }

    #[test]
    fn test_invalid_cursors() {
        assert_eq!(Cursor::parse("not-a-cursor"), None);
        assert_eq!(Cursor::parse("|"), None);
        assert_eq!(Cursor::parse("ts|"), None);
    }
}
