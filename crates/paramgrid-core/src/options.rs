//! Knobs for one analysis pass.

use serde::{Deserialize, Serialize};

/// Where the parameter columns sit on every sheet. Columns and rows are
/// 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetLayout {
    pub name_col: u32,
    pub unit_col: u32,
    pub value_col: u32,
    pub first_data_row: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout {
            name_col: 1,
            unit_col: 2,
            value_col: 3,
            first_data_row: 2,
        }
    }
}

impl SheetLayout {
    pub fn header_row(&self) -> u32 {
        self.first_data_row.saturating_sub(1)
    }

    /// Rightmost column the layout reads.
    pub fn last_col(&self) -> u32 {
        self.name_col.max(self.unit_col).max(self.value_col)
    }

    pub fn columns(&self) -> [u32; 3] {
        [self.name_col, self.unit_col, self.value_col]
    }
}

/// Fill colours (`RRGGBB`) for annotated rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Palette {
    pub input: String,
    pub output: String,
    pub intermediate: String,
    pub circular: String,
    pub replaced: String,
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            input: "ADD8E6".to_string(),
            output: "F08080".to_string(),
            intermediate: "90EE90".to_string(),
            circular: "FFD700".to_string(),
            replaced: "DDDDDD".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub layout: SheetLayout,
    /// Appended to the input file stem to name the rewritten workbook.
    pub output_suffix: String,
    pub palette: Palette,
    pub write_output: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            layout: SheetLayout::default(),
            output_suffix: "_optimized".to_string(),
            palette: Palette::default(),
            write_output: true,
        }
    }
}
