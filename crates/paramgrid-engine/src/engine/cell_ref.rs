//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "$B$2", "AA100") and 1-based column/row numbers, the same
//! numbering a worksheet displays.
//!
//! # Examples
//!
//! ```
//! use paramgrid_engine::engine::CellRef;
//!
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, 2);
//! assert_eq!(cell.row, 3);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Last addressable row of a worksheet.
pub const MAX_ROW: u32 = 1_048_576;
/// Last addressable column of a worksheet (`XFD`).
pub const MAX_COL: u32 = 16_384;

/// A reference to a cell by column and row numbers (1-based).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(col: u32, row: u32) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "$B2", "AA$10").
    /// Absolute markers are accepted and dropped. Returns None if the input is
    /// invalid or addresses a cell outside the worksheet.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        Self::parse_a1(name)
    }

    fn parse_a1(name: &str) -> Option<CellRef> {
        let caps = a1_re().captures(name)?;
        let col = Self::letters_to_col(&caps["letters"])?;
        let row = caps["numbers"].parse::<u32>().ok()?;
        if row == 0 || row > MAX_ROW {
            return None;
        }
        Some(CellRef::new(col, row))
    }

    /// Convert column letters to a column number ("A" -> 1, "AA" -> 27).
    pub fn letters_to_col(letters: &str) -> Option<u32> {
        if letters.is_empty() {
            return None;
        }
        let mut col = 0u32;
        for c in letters.to_ascii_uppercase().bytes() {
            if !c.is_ascii_uppercase() {
                return None;
            }
            let digit = (c - b'A') as u32 + 1;
            col = col.checked_mul(26)?.checked_add(digit)?;
        }
        (col <= MAX_COL).then_some(col)
    }

    /// Convert a column number to spreadsheet-style letters (1 -> A, 26 -> Z, 27 -> AA).
    pub fn col_to_letters(col: u32) -> String {
        let mut result = String::new();
        let mut n = col as u64;
        while n > 0 {
            n -= 1;
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        result
    }
}

fn a1_re() -> &'static Regex {
    static A1_RE: OnceLock<Regex> = OnceLock::new();
    A1_RE.get_or_init(|| {
        Regex::new(r"^\$?(?<letters>[A-Za-z]{1,3})\$?(?<numbers>[0-9]{1,7})$")
            .expect("A1 reference regex must compile")
    })
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_a1(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", CellRef::col_to_letters(self.col), self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::CellRef;

    #[test]
    fn test_parse_rejects_out_of_sheet_references() {
        assert!(CellRef::from_str("A0").is_none());
        assert!(CellRef::from_str("A1048577").is_none());
        assert!(CellRef::from_str("XFE1").is_none());
        assert!(CellRef::from_str("XFD1048576").is_some());
    }

    #[test]
    fn test_parse_accepts_absolute_markers() {
        assert_eq!(CellRef::from_str("$C$7"), Some(CellRef::new(3, 7)));
        assert_eq!(CellRef::from_str("c$7"), Some(CellRef::new(3, 7)));
    }

    #[test]
    fn test_col_to_letters_round_trips_through_letters_to_col() {
        for col in [1, 26, 27, 52, 702, 703, 16_384] {
            let letters = CellRef::col_to_letters(col);
            assert_eq!(CellRef::letters_to_col(&letters), Some(col));
        }
    }
}
