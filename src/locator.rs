//! Text search for key positions in the raw settings file.
//!
//! JSON parsing keeps no source positions, so keys are found by scanning
//! lines for the quoted key literal. This is an approximation: a key whose
//! name first appears as a string value on an earlier line is located at
//! that value, and keys repeated in different branches rely on the forward
//! cursor to tell occurrences apart.

use crate::types::LocatedPosition;

/// Find the first line at or after `search_start_line` containing `"leaf_key"`.
///
/// Returns the absolute zero-based line and the character column of the
/// opening quote.
pub fn locate(raw: &str, leaf_key: &str, search_start_line: usize) -> Option<LocatedPosition> {
    let needle = format!("\"{leaf_key}\"");
    return raw
        .lines()
        .enumerate()
        .skip(search_start_line)
        .find_map(|(line, text)| {
            let byte = text.find(&needle)?;
            let column = text.get(..byte).map_or(byte, |before| return before.chars().count());
            return Some(LocatedPosition { column, line });
        });
}

/// Forward search cursor for one document scan.
///
/// Walking a chain moves the cursor to each located key so the next key is
/// searched below its parent. One cursor serves a whole document scan and
/// never moves back up the file.
#[derive(Debug)]
pub struct LocatorCursor<'r> {
    /// Line the next search starts from.
    line: usize,
    /// Raw settings text.
    raw: &'r str,
}

impl<'r> LocatorCursor<'r> {
    /// Start a cursor at the top of `raw`.
    pub const fn new(raw: &'r str) -> Self {
        return Self { line: 0, raw };
    }

    /// Locate `key` from the cursor, advancing it to the match.
    /// The cursor stays put on a miss.
    pub fn advance(&mut self, key: &str) -> Option<LocatedPosition> {
        let position = locate(self.raw, key, self.line)?;
        self.line = position.line;
        return Some(position);
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    const RAW: &str = r#"{
  "public": {
    "name": "demo",
    "db": {
      "name": "public-db"
    }
  },
  "private": {
    "db": {
      "name": "private-db"
    }
  }
}"#;

    #[test]
    fn finds_first_occurrence() {
        assert_eq!(locate(RAW, "public", 0), Some(LocatedPosition { column: 2, line: 1 }));
    }

    #[test]
    fn column_zero_is_a_hit() {
        let raw = "\"top\": 1";
        assert_eq!(locate(raw, "top", 0), Some(LocatedPosition { column: 0, line: 0 }));
    }

    #[test]
    fn search_start_line_skips_earlier_matches() {
        assert_eq!(locate(RAW, "db", 0).map(|p| return p.line), Some(3));
        assert_eq!(locate(RAW, "db", 4).map(|p| return p.line), Some(8));
    }

    #[test]
    fn missing_key_is_not_found() {
        assert_eq!(locate(RAW, "absent", 0), None);
        assert_eq!(locate(RAW, "public", 2), None);
    }

    #[test]
    fn handles_crlf_line_endings() {
        let raw = "{\r\n  \"a\": {\r\n    \"b\": 1\r\n  }\r\n}";
        assert_eq!(locate(raw, "b", 0), Some(LocatedPosition { column: 4, line: 2 }));
    }

    #[test]
    fn cursor_disambiguates_repeated_keys() {
        let mut cursor = LocatorCursor::new(RAW);
        assert_eq!(cursor.advance("private").map(|p| return p.line), Some(7));
        assert_eq!(cursor.advance("db").map(|p| return p.line), Some(8));
        assert_eq!(cursor.advance("name").map(|p| return p.line), Some(9));
    }

    #[test]
    fn cursor_stays_put_on_miss() {
        let mut cursor = LocatorCursor::new(RAW);
        cursor.advance("private");
        assert_eq!(cursor.advance("nope"), None);
        assert_eq!(cursor.advance("db").map(|p| return p.line), Some(8));
    }

    #[test]
    fn cursor_never_moves_back_up() {
        let mut cursor = LocatorCursor::new(RAW);
        assert_eq!(cursor.advance("private").map(|p| return p.line), Some(7));
        assert_eq!(cursor.advance("public"), None);
        assert_eq!(cursor.advance("name").map(|p| return p.line), Some(9));
    }

    #[test]
    fn column_counts_characters_not_bytes() {
        let raw = "{ \"café\": 1, \"key\": 2 }";
        assert_eq!(locate(raw, "key", 0), Some(LocatedPosition { column: 13, line: 0 }));
    }

    #[test]
    fn value_on_earlier_line_is_mislocated() {
        // Documented approximation: the string value "db" wins over the key below it.
        let raw = "{\n  \"kind\": \"db\",\n  \"db\": {}\n}";
        assert_eq!(locate(raw, "db", 0).map(|p| return p.line), Some(1));
    }
}
