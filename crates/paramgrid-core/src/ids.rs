//! Identifier Resolver and the `(sheet, row) -> id` index.

use indexmap::IndexSet;
use paramgrid_engine::engine::ParamId;
use std::collections::HashMap;

use crate::reader::RawRow;

/// Assign an id to every row, in row order.
///
/// A name used by one row is its own id. A name shared by several rows,
/// anywhere in the workbook, gives each of them `{name}_{sheet}_r{row}`.
pub fn resolve_ids(rows: &[RawRow]) -> Vec<ParamId> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.name.as_str()).or_default() += 1;
    }

    let mut used: IndexSet<ParamId> = IndexSet::with_capacity(rows.len());
    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        let base = if counts[row.name.as_str()] > 1 {
            format!("{}_{}_r{}", row.name, row.sheet, row.row)
        } else {
            row.name.clone()
        };
        let id = unique_id(base, &used);
        used.insert(id.clone());
        ids.push(id);
    }
    ids
}

fn unique_id(base: ParamId, used: &IndexSet<ParamId>) -> ParamId {
    if !used.contains(&base) {
        return base;
    }
    let candidate = next_free_suffix(&base, used);
    log::warn!("id '{}' already taken; using '{}'", base, candidate);
    candidate
}

/// The first of `base_2`, `base_3`, ... not in `used`.
pub(crate) fn next_free_suffix(base: &str, used: &IndexSet<String>) -> String {
    (2u64..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_default()
}

/// Sheet name lookup for formula qualifiers. Exact match first, then
/// case-insensitive (full Unicode lowercase), the way spreadsheet
/// applications match qualifiers.
#[derive(Clone, Debug, Default)]
pub struct SheetNames {
    by_key: HashMap<String, String>,
}

impl SheetNames {
    pub fn insert(&mut self, name: &str) {
        self.by_key
            .entry(name.to_lowercase())
            .or_insert_with(|| name.to_string());
    }

    /// The stored spelling of `qualifier`, if it names a known sheet.
    pub fn resolve<'a>(&'a self, qualifier: &'a str) -> Option<&'a str> {
        if self.by_key.values().any(|s| s == qualifier) {
            return Some(qualifier);
        }
        self.by_key.get(&qualifier.to_lowercase()).map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for SheetNames {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut names = SheetNames::default();
        for name in iter {
            names.insert(name);
        }
        names
    }
}

/// Row-to-id lookup across every sheet.
#[derive(Clone, Debug, Default)]
pub struct LocationIndex {
    by_location: HashMap<(String, u32), ParamId>,
    sheets: SheetNames,
}

impl LocationIndex {
    pub fn new(rows: &[RawRow], ids: &[ParamId]) -> LocationIndex {
        let mut index = LocationIndex::default();
        for (row, id) in rows.iter().zip(ids) {
            index.insert(&row.sheet, row.row, id.clone());
        }
        index
    }

    pub fn insert(&mut self, sheet: &str, row: u32, id: ParamId) {
        self.sheets.insert(sheet);
        self.by_location.insert((sheet.to_string(), row), id);
    }

    /// The stored spelling of a sheet name.
    pub fn sheet_name<'a>(&'a self, sheet: &'a str) -> Option<&'a str> {
        self.sheets.resolve(sheet)
    }

    pub fn get(&self, sheet: &str, row: u32) -> Option<&ParamId> {
        let sheet = self.sheet_name(sheet)?;
        self.by_location.get(&(sheet.to_string(), row))
    }

    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}
