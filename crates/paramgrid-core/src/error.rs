//! Error types for Paramgrid core.

use serde::Serialize;
use thiserror::Error;

/// Errors that abort a whole analysis pass.
#[derive(Error, Debug)]
pub enum ParamgridError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] umya_spreadsheet::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported workbook format: {0}")]
    UnsupportedFormat(String),

    #[error("Could not create sheet '{name}': {message}")]
    Sheet { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, ParamgridError>;

/// Problems confined to one sheet, row, formula or edge. They are logged and
/// collected; the pass carries on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    #[error("sheet '{sheet}' skipped: {reason}")]
    Structural { sheet: String, reason: String },

    #[error("formula of '{id}' could not be analysed: {message}")]
    FormulaParse {
        id: String,
        formula: String,
        message: String,
    },

    #[error("formula at {sheet}!{cell} left unchanged: {message}")]
    Rewrite {
        sheet: String,
        cell: String,
        message: String,
    },

    #[error("'{from}' references unknown parameter '{to}'; edge dropped")]
    Integrity { from: String, to: String },
}

impl Issue {
    /// Log the issue as a warning and hand it back for collection.
    pub(crate) fn logged(self) -> Issue {
        log::warn!("{}", self);
        self
    }
}
