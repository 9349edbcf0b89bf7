//! Typed formula tokens.
//!
//! A formula is split once into literal text and reference tokens. Rewriting
//! works on the tokens and re-serialises, so moving `A2` never touches the
//! `A2` inside `A20`, a function name like `LOG10`, or a string literal.
//!
//! Handles:
//! - Cell references: `A1`, `$B$2`, `Sheet2!C3`, `'My Sheet'!C3`
//! - Range references: `A1:B5`, `Sheet2!A1:A9`
//! - String literals (`"A2"` is text, `""` escapes a quote)
//! - Error literals such as `#REF!`

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::cell_ref::CellRef;

/// Malformed reference syntax in a formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("unterminated string literal at offset {0}")]
    UnterminatedString(usize),

    #[error("unterminated quoted sheet name at offset {0}")]
    UnterminatedSheetName(usize),

    #[error("sheet qualifier '{0}' is not followed by a cell reference")]
    MissingReference(String),

    #[error("range at offset {0} has no valid end reference")]
    DanglingRange(usize),
}

/// One end of a reference, keeping its `$` markers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RefPoint {
    pub cell: CellRef,
    pub col_absolute: bool,
    pub row_absolute: bool,
}

impl RefPoint {
    pub fn new(cell: CellRef) -> RefPoint {
        RefPoint {
            cell,
            col_absolute: false,
            row_absolute: false,
        }
    }

    /// Parse `A1`, `$A1`, `A$1` or `$A$1`.
    pub fn parse(text: &str) -> Option<RefPoint> {
        let cell = CellRef::from_str(text)?;
        let col_absolute = text.starts_with('$');
        let row_absolute = text.trim_start_matches('$').contains('$');
        Some(RefPoint {
            cell,
            col_absolute,
            row_absolute,
        })
    }

    /// Same column and markers, different row.
    pub fn with_row(self, row: u32) -> RefPoint {
        RefPoint {
            cell: CellRef::new(self.cell.col, row),
            ..self
        }
    }
}

impl fmt::Display for RefPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let col_marker = if self.col_absolute { "$" } else { "" };
        let row_marker = if self.row_absolute { "$" } else { "" };
        write!(
            f,
            "{}{}{}{}",
            col_marker,
            CellRef::col_to_letters(self.cell.col),
            row_marker,
            self.cell.row
        )
    }
}

/// A single-cell reference, optionally qualified with a sheet name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CellToken {
    pub sheet: Option<String>,
    pub point: RefPoint,
}

impl CellToken {
    /// Sheet this reference points into when written on `anchor_sheet`.
    pub fn sheet_or<'a>(&'a self, anchor_sheet: &'a str) -> &'a str {
        self.sheet.as_deref().unwrap_or(anchor_sheet)
    }
}

/// A rectangular range reference, optionally qualified with a sheet name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RangeToken {
    pub sheet: Option<String>,
    pub start: RefPoint,
    pub end: RefPoint,
}

impl RangeToken {
    pub fn sheet_or<'a>(&'a self, anchor_sheet: &'a str) -> &'a str {
        self.sheet.as_deref().unwrap_or(anchor_sheet)
    }

    /// Rows covered by the range, lowest first.
    pub fn row_span(&self) -> (u32, u32) {
        let (a, b) = (self.start.cell.row, self.end.cell.row);
        (a.min(b), a.max(b))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Segment {
    Text(String),
    Cell(CellToken),
    Range(RangeToken),
}

/// A tokenized formula body (without the leading `=`).
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize)]
pub struct Formula {
    segments: Vec<Segment>,
}

impl Formula {
    /// Tokenize a formula, with or without its leading `=`.
    pub fn parse(text: &str) -> Result<Formula, FormulaError> {
        let body = text.strip_prefix('=').unwrap_or(text);
        Tokenizer::new(body).run()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Formula {
        let mut formula = Formula::default();
        for segment in segments {
            formula.push(segment);
        }
        formula
    }

    fn push(&mut self, segment: Segment) {
        if let Segment::Text(text) = &segment {
            if text.is_empty() {
                return;
            }
            if let Some(Segment::Text(last)) = self.segments.last_mut() {
                last.push_str(text);
                return;
            }
        }
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn cells(&self) -> impl Iterator<Item = &CellToken> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Cell(cell) => Some(cell),
            _ => None,
        })
    }

    pub fn ranges(&self) -> impl Iterator<Item = &RangeToken> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Range(range) => Some(range),
            _ => None,
        })
    }

    pub fn has_references(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, Segment::Text(_)))
    }

    /// Rebuild the formula, replacing every reference with whatever the
    /// callbacks return. Text segments are kept as they are.
    pub fn map_references<C, R>(&self, mut on_cell: C, mut on_range: R) -> Formula
    where
        C: FnMut(&CellToken) -> Segment,
        R: FnMut(&RangeToken) -> Segment,
    {
        Formula::from_segments(self.segments.iter().map(|segment| match segment {
            Segment::Text(text) => Segment::Text(text.clone()),
            Segment::Cell(cell) => on_cell(cell),
            Segment::Range(range) => on_range(range),
        }))
    }

    /// Serialise with single-cell references replaced by `label` where it
    /// returns a name. Ranges always keep their address.
    pub fn render_cells<F>(&self, mut label: F) -> String
    where
        F: FnMut(&CellToken) -> Option<String>,
    {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Cell(cell) => match label(cell) {
                    Some(name) => out.push_str(&name),
                    None => out.push_str(&segment_to_string(segment)),
                },
                other => out.push_str(&segment_to_string(other)),
            }
        }
        out
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            f.write_str(&segment_to_string(segment))?;
        }
        Ok(())
    }
}

fn segment_to_string(segment: &Segment) -> String {
    match segment {
        Segment::Text(text) => text.clone(),
        Segment::Cell(cell) => format!("{}{}", sheet_prefix(cell.sheet.as_deref()), cell.point),
        Segment::Range(range) => format!(
            "{}{}:{}",
            sheet_prefix(range.sheet.as_deref()),
            range.start,
            range.end
        ),
    }
}

/// `Sheet1!` or `'My Sheet'!`, empty for unqualified references.
pub fn sheet_prefix(sheet: Option<&str>) -> String {
    let Some(name) = sheet else {
        return String::new();
    };
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && CellRef::from_str(name).is_none();
    if plain {
        format!("{}!", name)
    } else {
        format!("'{}'!", name.replace('\'', "''"))
    }
}

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '$'
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    out: Formula,
}

impl Tokenizer {
    fn new(body: &str) -> Tokenizer {
        Tokenizer {
            chars: body.chars().collect(),
            pos: 0,
            out: Formula::default(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn text(&mut self, start: usize, end: usize) {
        let text: String = self.chars[start..end].iter().collect();
        self.out.push(Segment::Text(text));
    }

    fn run(mut self) -> Result<Formula, FormulaError> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            if c == '"' {
                self.string_literal()?;
                self.text(start, self.pos);
            } else if c == '\'' {
                let sheet = self.quoted_sheet_name()?;
                if self.peek() != Some('!') {
                    return Err(FormulaError::MissingReference(sheet));
                }
                self.pos += 1;
                self.qualified_reference(sheet)?;
            } else if c.is_ascii_digit()
                || (c == '.' && self.chars.get(self.pos + 1).is_some_and(|n| n.is_ascii_digit()))
            {
                self.number_literal();
                self.text(start, self.pos);
            } else if is_word_start(c) {
                let word = self.word();
                let after_error_marker = start > 0 && self.chars[start - 1] == '#';
                if self.peek() == Some('!') && !after_error_marker {
                    self.pos += 1;
                    self.qualified_reference(word)?;
                } else if let Some(point) =
                    RefPoint::parse(&word).filter(|_| !after_error_marker && !self.is_call())
                {
                    self.reference_tail(None, point, start)?;
                } else {
                    self.text(start, self.pos);
                }
            } else {
                self.pos += 1;
                self.text(start, self.pos);
            }
        }
        Ok(self.out)
    }

    fn string_literal(&mut self) -> Result<(), FormulaError> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(FormulaError::UnterminatedString(start)),
                Some('"') if self.chars.get(self.pos + 1) == Some(&'"') => self.pos += 2,
                Some('"') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn quoted_sheet_name(&mut self) -> Result<String, FormulaError> {
        let start = self.pos;
        self.pos += 1;
        let mut name = String::new();
        loop {
            match self.peek() {
                None => return Err(FormulaError::UnterminatedSheetName(start)),
                Some('\'') if self.chars.get(self.pos + 1) == Some(&'\'') => {
                    name.push('\'');
                    self.pos += 2;
                }
                Some('\'') => {
                    self.pos += 1;
                    return Ok(name);
                }
                Some(c) => {
                    name.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn number_literal(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || c == '.')
        {
            self.pos += 1;
        }
        // Exponent: 1E3, 2.5e-4
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut look = self.pos + 1;
            if matches!(self.chars.get(look), Some('+' | '-')) {
                look += 1;
            }
            if self.chars.get(look).is_some_and(|c| c.is_ascii_digit()) {
                self.pos = look;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
    }

    fn word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// A name directly followed by `(` is a function call, not a reference.
    fn is_call(&self) -> bool {
        self.chars[self.pos..]
            .iter()
            .find(|c| !c.is_whitespace())
            .is_some_and(|c| *c == '(')
    }

    fn qualified_reference(&mut self, sheet: String) -> Result<(), FormulaError> {
        let start = self.pos;
        if !self.peek().is_some_and(is_word_start) {
            return Err(FormulaError::MissingReference(sheet));
        }
        let word = self.word();
        match RefPoint::parse(&word) {
            Some(point) => self.reference_tail(Some(sheet), point, start),
            None => Err(FormulaError::MissingReference(sheet)),
        }
    }

    fn reference_tail(
        &mut self,
        sheet: Option<String>,
        start_point: RefPoint,
        start: usize,
    ) -> Result<(), FormulaError> {
        if self.peek() != Some(':') {
            self.out.push(Segment::Cell(CellToken {
                sheet,
                point: start_point,
            }));
            return Ok(());
        }
        self.pos += 1;
        if !self.peek().is_some_and(is_word_start) && self.peek() != Some('\'') {
            return Err(FormulaError::DanglingRange(start));
        }
        // `Sheet1!A1:Sheet1!B2` repeats the qualifier on the end point.
        if self.peek() == Some('\'') {
            self.quoted_sheet_name()?;
            if self.peek() != Some('!') {
                return Err(FormulaError::DanglingRange(start));
            }
            self.pos += 1;
        }
        let mut word = self.word();
        if self.peek() == Some('!') {
            self.pos += 1;
            word = self.word();
        }
        let end_point = RefPoint::parse(&word).ok_or(FormulaError::DanglingRange(start))?;
        self.out.push(Segment::Range(RangeToken {
            sheet,
            start: start_point,
            end: end_point,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_addresses(formula: &Formula) -> Vec<String> {
        formula.cells().map(|c| c.point.to_string()).collect()
    }

    #[test]
    fn test_parse_strips_leading_equals_and_round_trips() {
        let formula = Formula::parse("=SUM(C2:C4)*$B$3 + 'Unit Costs'!C7").unwrap();
        assert_eq!(formula.to_string(), "SUM(C2:C4)*$B$3 + 'Unit Costs'!C7");
        assert_eq!(formula.ranges().count(), 1);
        assert_eq!(cell_addresses(&formula), vec!["$B$3", "C7"]);
        assert_eq!(
            formula.cells().nth(1).unwrap().sheet.as_deref(),
            Some("Unit Costs")
        );
    }

    #[test]
    fn test_function_names_numbers_and_strings_are_not_references() {
        let formula = Formula::parse("LOG10(C2)+1E3+\"A2\"&ATAN2(C3, 2.5e-4)").unwrap();
        assert_eq!(cell_addresses(&formula), vec!["C2", "C3"]);
    }

    #[test]
    fn test_error_literal_is_text() {
        let formula = Formula::parse("#REF!+C2").unwrap();
        assert_eq!(cell_addresses(&formula), vec!["C2"]);
        assert_eq!(formula.to_string(), "#REF!+C2");
    }

    #[test]
    fn test_map_references_does_not_touch_longer_addresses() {
        let formula = Formula::parse("A2+A20").unwrap();
        let moved = formula.map_references(
            |cell| {
                let mut cell = cell.clone();
                if cell.point.cell.row == 2 {
                    cell.point = cell.point.with_row(5);
                }
                Segment::Cell(cell)
            },
            |range| Segment::Range(range.clone()),
        );
        assert_eq!(moved.to_string(), "A5+A20");
    }

    #[test]
    fn test_render_cells_substitutes_labels_but_not_ranges() {
        let formula = Formula::parse("C2*2+SUM(C3:C4)").unwrap();
        let human = formula.render_cells(|cell| (cell.point.cell.row == 2).then(|| "A".to_string()));
        assert_eq!(human, "A*2+SUM(C3:C4)");
    }

    #[test]
    fn test_malformed_syntax_is_reported() {
        assert_eq!(
            Formula::parse("\"abc").unwrap_err(),
            FormulaError::UnterminatedString(0)
        );
        assert!(matches!(
            Formula::parse("'Sheet 1!A1").unwrap_err(),
            FormulaError::UnterminatedSheetName(_)
        ));
        assert!(matches!(
            Formula::parse("Data!+1").unwrap_err(),
            FormulaError::MissingReference(_)
        ));
        assert!(matches!(
            Formula::parse("C2:+1").unwrap_err(),
            FormulaError::DanglingRange(_)
        ));
    }

    #[test]
    fn test_sheet_prefix_quotes_when_needed() {
        assert_eq!(sheet_prefix(Some("Data")), "Data!");
        assert_eq!(sheet_prefix(Some("My Data")), "'My Data'!");
        assert_eq!(sheet_prefix(Some("O'Neil")), "'O''Neil'!");
        assert_eq!(sheet_prefix(Some("B2")), "'B2'!");
        assert_eq!(sheet_prefix(None), "");
    }
}
