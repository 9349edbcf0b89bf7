//! Deduplicator: merges same-name-same-value rows and renames
//! same-name-different-value rows.
//!
//! Planning and applying are separate so the plan can drive both the new
//! parameter table and the workbook rewrite.

use indexmap::{IndexMap, IndexSet};
use paramgrid_engine::engine::{Formula, ParamId};
use serde::Serialize;

use crate::collect::Resolver;
use crate::ids::next_free_suffix;
use crate::param::{ParamValue, Parameter, ParameterTable, ValueKey};

/// Rows sharing a name and a value.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueGroup {
    pub value: ParamValue,
    pub ids: Vec<ParamId>,
    /// Name the group carries after deduplication.
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Deduplication {
    /// Replaced id -> canonical id.
    pub replacements: IndexMap<ParamId, ParamId>,
    /// Id -> new display name.
    pub renames: IndexMap<ParamId, String>,
    /// Name -> its value groups, for every name still shared after merging.
    pub value_groups: IndexMap<String, Vec<ValueGroup>>,
}

impl Deduplication {
    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.renames.is_empty()
    }

    /// Canonical id for `id` (itself unless replaced).
    pub fn canonical<'a>(&'a self, id: &'a str) -> &'a str {
        self.replacements.get(id).map(String::as_str).unwrap_or(id)
    }
}

/// Group by name, then by value, both in table order.
fn group_by_name_and_value<'a, I>(params: I) -> IndexMap<&'a str, IndexMap<ValueKey, Vec<&'a Parameter>>>
where
    I: IntoIterator<Item = &'a Parameter>,
{
    let mut groups: IndexMap<&str, IndexMap<ValueKey, Vec<&Parameter>>> = IndexMap::new();
    for param in params {
        groups
            .entry(param.name.as_str())
            .or_default()
            .entry(param.value.key())
            .or_default()
            .push(param);
    }
    groups
}

/// Formula texts in a merge group, first spelling of each, in row order.
fn distinct_formulas<'a>(members: &[&'a Parameter]) -> Vec<&'a str> {
    let formulas: IndexSet<&str> = members.iter().filter_map(|p| p.formula.as_deref()).collect();
    formulas.into_iter().collect()
}

/// Work out which rows merge and which get renamed.
pub fn plan_deduplication(parameters: &ParameterTable) -> Deduplication {
    let mut plan = Deduplication::default();

    // Same name, same value: one canonical row survives. Plain data rows
    // outrank formula rows; ties go to the earliest row.
    for (_, by_value) in group_by_name_and_value(parameters.values()) {
        for (_, members) in by_value {
            if members.len() < 2 {
                continue;
            }
            let canonical = members
                .iter()
                .enumerate()
                .min_by_key(|(pos, p)| (!p.is_plain(), *pos))
                .map(|(_, p)| p.id.clone());
            let Some(canonical) = canonical else {
                continue;
            };
            let formulas = distinct_formulas(&members);
            if formulas.len() > 1 {
                log::warn!(
                    "rows merged into '{}' have different formulas ({}); only the kept row's survives",
                    canonical,
                    formulas.join(" | ")
                );
            }
            for member in members {
                if member.id != canonical {
                    plan.replacements.insert(member.id.clone(), canonical.clone());
                }
            }
        }
    }

    // Same name, different value: value groups in value order, the first
    // keeps the name, the rest become name_2, name_3, ... skipping any
    // name a survivor already carries.
    let survivors: Vec<&Parameter> = parameters
        .values()
        .filter(|p| !plan.replacements.contains_key(&p.id))
        .collect();
    let mut taken: IndexSet<String> = survivors.iter().map(|p| p.name.clone()).collect();
    for (name, by_value) in group_by_name_and_value(survivors.iter().copied()) {
        if by_value.len() < 2 {
            continue;
        }
        let mut ordered: Vec<(ValueKey, Vec<&Parameter>)> = by_value.into_iter().collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0));

        let mut groups = Vec::with_capacity(ordered.len());
        for (counter, (_, members)) in ordered.into_iter().enumerate() {
            let group_name = if counter == 0 {
                name.to_string()
            } else {
                let fresh = next_free_suffix(name, &taken);
                taken.insert(fresh.clone());
                fresh
            };
            if counter > 0 {
                for member in &members {
                    plan.renames.insert(member.id.clone(), group_name.clone());
                }
            }
            groups.push(ValueGroup {
                value: members[0].value.clone(),
                ids: members.iter().map(|p| p.id.clone()).collect(),
                name: group_name,
            });
        }
        plan.value_groups.insert(name.to_string(), groups);
    }

    log::info!(
        "deduplication: {} replaced, {} renamed",
        plan.replacements.len(),
        plan.renames.len()
    );
    plan
}

/// The surviving parameters with renames applied, dependencies redirected to
/// canonical ids, and formulas described with final names.
pub fn apply_deduplication(
    parameters: &ParameterTable,
    formulas: &IndexMap<ParamId, Formula>,
    resolver: &Resolver<'_>,
    plan: &Deduplication,
) -> ParameterTable {
    let final_name = |id: &str| -> Option<String> {
        let id = plan.canonical(id);
        plan.renames
            .get(id)
            .cloned()
            .or_else(|| parameters.get(id).map(|p| p.name.clone()))
    };

    let mut survivors = ParameterTable::with_capacity(parameters.len() - plan.replacements.len());
    for (id, param) in parameters {
        if plan.replacements.contains_key(id) {
            continue;
        }
        let mut param = param.clone();
        if let Some(name) = plan.renames.get(id) {
            param.name = name.clone();
        }
        param.dependencies = param
            .dependencies
            .iter()
            .map(|dep| plan.canonical(dep).to_string())
            .filter(|dep| dep != id)
            .collect::<IndexSet<_>>();
        param.dependency_names = param
            .dependencies
            .iter()
            .filter_map(|dep| final_name(dep))
            .collect();
        if let Some(formula) = formulas.get(id) {
            param.human_formula = resolver.describe(formula, &param.sheet, param.row, final_name);
        }
        survivors.insert(id.clone(), param);
    }
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::collect_parameters;
    use crate::options::SheetLayout;
    use crate::reader::RawRow;
    use crate::workbook::CellValue;

    fn raw(row: u32, name: &str, value: CellValue, formula: Option<&str>) -> RawRow {
        RawRow {
            sheet: "S".to_string(),
            row,
            name: name.to_string(),
            unit: String::new(),
            value,
            formula: formula.map(str::to_string),
        }
    }

    fn dedup(rows: &[RawRow]) -> (Deduplication, ParameterTable) {
        let collected = collect_parameters(rows, &SheetLayout::default());
        let layout = SheetLayout::default();
        let resolver = Resolver::new(&collected.index, &layout);
        let plan = plan_deduplication(&collected.parameters);
        let table = apply_deduplication(&collected.parameters, &collected.formulas, &resolver, &plan);
        (plan, table)
    }

    #[test]
    fn test_same_value_merges_into_first() {
        let rows = vec![
            raw(2, "X", CellValue::Number(10.0), None),
            raw(3, "X", CellValue::Number(10.0), None),
        ];
        let (plan, table) = dedup(&rows);
        assert_eq!(plan.replacements.get("X_S_r3").map(String::as_str), Some("X_S_r2"));
        assert_eq!(table.len(), 1);
        assert!(table.contains_key("X_S_r2"));
    }

    #[test]
    fn test_plain_row_outranks_formula_row() {
        let rows = vec![
            raw(2, "One", CellValue::Number(1.0), None),
            raw(3, "X", CellValue::Number(2.0), Some("C2*2")),
            raw(4, "X", CellValue::Number(2.0), None),
            raw(5, "Y", CellValue::Empty, Some("C3+C4")),
        ];
        let (plan, table) = dedup(&rows);
        assert_eq!(plan.replacements.get("X_S_r3").map(String::as_str), Some("X_S_r4"));
        let y = &table["Y"];
        assert_eq!(y.dependencies.iter().collect::<Vec<_>>(), vec!["X_S_r4"]);
        assert_eq!(y.human_formula, "X+X");
    }

    #[test]
    fn test_different_values_are_renamed_in_value_order() {
        let rows = vec![
            raw(2, "Y", CellValue::Number(2.0), None),
            raw(3, "Y", CellValue::Empty, None),
            raw(4, "Y", CellValue::Number(1.0), None),
            raw(5, "Z", CellValue::Empty, Some("C2+C4")),
        ];
        let (plan, table) = dedup(&rows);
        assert!(plan.replacements.is_empty());
        assert_eq!(plan.renames.get("Y_S_r2").map(String::as_str), Some("Y_2"));
        assert_eq!(plan.renames.get("Y_S_r3").map(String::as_str), Some("Y_3"));
        assert!(!plan.renames.contains_key("Y_S_r4"));
        assert_eq!(plan.value_groups["Y"].len(), 3);
        assert_eq!(table["Y_S_r2"].name, "Y_2");
        assert_eq!(table["Z"].human_formula, "Y_2+Y");
    }

    #[test]
    fn test_rename_skips_names_already_in_use() {
        let rows = vec![
            raw(2, "Y", CellValue::Number(1.0), None),
            raw(3, "Y", CellValue::Number(2.0), None),
            raw(4, "Y_2", CellValue::Number(2.0), None),
        ];
        let (plan, table) = dedup(&rows);
        assert_eq!(plan.renames.get("Y_S_r3").map(String::as_str), Some("Y_3"));
        let names: Vec<&str> = table.values().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Y", "Y_3", "Y_2"]);
        assert!(plan_deduplication(&table).is_empty());
    }

    #[test]
    fn test_formula_rows_with_different_text_are_flagged() {
        let rows = vec![
            raw(2, "A", CellValue::Number(1.0), None),
            raw(3, "X", CellValue::Empty, Some("C2*2")),
            raw(4, "X", CellValue::Empty, Some("C2+5")),
            raw(5, "X", CellValue::Empty, Some("C2*2")),
        ];
        let collected = collect_parameters(&rows, &SheetLayout::default());
        let members: Vec<&Parameter> = collected.parameters.values().filter(|p| p.name == "X").collect();
        assert_eq!(distinct_formulas(&members), vec!["C2*2", "C2+5"]);

        let (plan, _) = dedup(&rows);
        assert_eq!(plan.replacements.len(), 2);
        assert_eq!(plan.replacements.get("X_S_r4").map(String::as_str), Some("X_S_r3"));
    }

    #[test]
    fn test_deduplication_is_idempotent() {
        let rows = vec![
            raw(2, "X", CellValue::Number(10.0), None),
            raw(3, "X", CellValue::Number(10.0), None),
            raw(4, "Y", CellValue::Number(1.0), None),
            raw(5, "Y", CellValue::Number(2.0), None),
        ];
        let (_, table) = dedup(&rows);
        let again = plan_deduplication(&table);
        assert!(again.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn value() -> impl Strategy<Value = CellValue> {
            prop_oneof![
                Just(CellValue::Empty),
                (0u8..3).prop_map(|n| CellValue::Number(f64::from(n))),
            ]
        }

        proptest! {
            #[test]
            fn survivors_have_unique_names(entries in prop::collection::vec(("[AB](_[23])?", value()), 1..12)) {
                let rows: Vec<RawRow> = entries
                    .iter()
                    .enumerate()
                    .map(|(i, (name, value))| raw(i as u32 + 2, name, value.clone(), None))
                    .collect();
                let (plan, table) = dedup(&rows);

                prop_assert_eq!(table.len() + plan.replacements.len(), rows.len());
                for canonical in plan.replacements.values() {
                    prop_assert!(table.contains_key(canonical));
                }
                let names: IndexSet<&str> = table.values().map(|p| p.name.as_str()).collect();
                prop_assert_eq!(names.len(), table.len());
                prop_assert!(plan_deduplication(&table).is_empty());
            }
        }
    }
}
