//! Reference resolution: raw rows become the parameter table and the
//! dependency graph.

use indexmap::{IndexMap, IndexSet};
use paramgrid_engine::engine::{CellToken, DependencyGraph, Formula, ParamId, extract_references};
use std::collections::HashMap;

use crate::error::Issue;
use crate::ids::{LocationIndex, resolve_ids};
use crate::options::SheetLayout;
use crate::param::{ParamValue, Parameter, ParameterTable};
use crate::reader::RawRow;

/// Prefix of the human formula when a formula could not be tokenized.
pub const FORMULA_ERROR_MARKER: &str = "#FORMULA ERROR: ";

/// Everything built from the raw rows in one sweep.
#[derive(Clone, Debug, Default)]
pub struct Collected {
    pub parameters: ParameterTable,
    /// Tokenized formulas of parameters whose formula parsed.
    pub formulas: IndexMap<ParamId, Formula>,
    pub index: LocationIndex,
    pub graph: DependencyGraph,
    pub issues: Vec<Issue>,
}

/// Maps references in a formula to the parameters occupying those rows.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    index: &'a LocationIndex,
    first_data_row: u32,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a LocationIndex, layout: &SheetLayout) -> Resolver<'a> {
        Resolver {
            index,
            first_data_row: layout.first_data_row,
        }
    }

    /// The parameter a reference to `row` points at, as seen from a formula
    /// on `anchor_sheet`/`anchor_row`. Header rows and the anchor's own row
    /// never count.
    pub fn resolve(
        &self,
        anchor_sheet: &str,
        anchor_row: u32,
        qualifier: Option<&str>,
        row: u32,
    ) -> Option<&'a ParamId> {
        if row < self.first_data_row {
            return None;
        }
        let sheet = match qualifier {
            Some(name) => self.index.sheet_name(name)?,
            None => anchor_sheet,
        };
        if sheet == anchor_sheet && row == anchor_row {
            return None;
        }
        self.index.get(sheet, row)
    }

    /// Ids read by a formula, direct references first, in formula order.
    pub fn dependencies(&self, formula: &Formula, anchor_sheet: &str, anchor_row: u32) -> IndexSet<ParamId> {
        extract_references(formula)
            .rows()
            .filter_map(|r| self.resolve(anchor_sheet, anchor_row, r.sheet.as_deref(), r.row))
            .cloned()
            .collect()
    }

    /// The formula with every resolvable single-cell reference shown as the
    /// referenced parameter's name. Ranges keep their addresses.
    pub fn describe<F>(&self, formula: &Formula, anchor_sheet: &str, anchor_row: u32, name_of: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        formula.render_cells(|cell: &CellToken| {
            let id = self.resolve(
                anchor_sheet,
                anchor_row,
                cell.sheet.as_deref(),
                cell.point.cell.row,
            )?;
            name_of(id)
        })
    }
}

/// Build the parameter table, tokenized formulas and raw dependency graph.
pub fn collect_parameters(rows: &[RawRow], layout: &SheetLayout) -> Collected {
    let ids = resolve_ids(rows);
    let index = LocationIndex::new(rows, &ids);
    let names: HashMap<&str, &str> = ids
        .iter()
        .zip(rows)
        .map(|(id, row)| (id.as_str(), row.name.as_str()))
        .collect();
    let name_of = |id: &str| names.get(id).map(|n| n.to_string());

    let mut parameters = ParameterTable::with_capacity(rows.len());
    let mut formulas = IndexMap::new();
    let mut graph = DependencyGraph::new();
    let mut issues = Vec::new();
    {
        let resolver = Resolver::new(&index, layout);
        for (row, id) in rows.iter().zip(&ids) {
            let mut param = Parameter {
                id: id.clone(),
                name: row.name.clone(),
                unit: row.unit.clone(),
                sheet: row.sheet.clone(),
                row: row.row,
                value: ParamValue::from(&row.value),
                formula: row.formula.clone(),
                human_formula: String::new(),
                dependencies: IndexSet::new(),
                dependency_names: IndexSet::new(),
                has_cycle: false,
            };

            if let Some(text) = &row.formula {
                match Formula::parse(text) {
                    Ok(formula) => {
                        param.dependencies = resolver.dependencies(&formula, &row.sheet, row.row);
                        param.dependency_names = param
                            .dependencies
                            .iter()
                            .filter_map(|dep| name_of(dep))
                            .collect();
                        param.human_formula = resolver.describe(&formula, &row.sheet, row.row, name_of);
                        graph.add_dependencies(id, param.dependencies.iter().cloned());
                        formulas.insert(id.clone(), formula);
                    }
                    Err(err) => {
                        param.human_formula = format!("{}{}", FORMULA_ERROR_MARKER, text);
                        issues.push(
                            Issue::FormulaParse {
                                id: id.clone(),
                                formula: text.clone(),
                                message: err.to_string(),
                            }
                            .logged(),
                        );
                    }
                }
            }
            parameters.insert(id.clone(), param);
        }
    }

    for (from, to) in graph.retain_known(|id| parameters.contains_key(id)) {
        if let Some(param) = parameters.get_mut(&from) {
            param.dependencies.shift_remove(&to);
        }
        issues.push(Issue::Integrity { from, to }.logged());
    }

    log::debug!(
        "collected {} parameters, {} formula edges",
        parameters.len(),
        graph.edge_count()
    );
    Collected {
        parameters,
        formulas,
        index,
        graph,
        issues,
    }
}
