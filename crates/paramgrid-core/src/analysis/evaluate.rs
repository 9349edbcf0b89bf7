//! The boundary to whatever recomputes parameter values.
//!
//! The analysis never does formula arithmetic. It hands an [`Evaluator`] the
//! parameters, an evaluation order and the caller's input overrides, and
//! expects one value or one error back per non-input parameter.

use indexmap::IndexMap;
use paramgrid_engine::engine::ParamId;
use thiserror::Error;

use super::Analysis;
use crate::param::{ParamValue, ParameterTable};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("no value available for '{0}'")]
    NoValue(ParamId),

    #[error("evaluation of '{id}' failed: {message}")]
    Failed { id: ParamId, message: String },
}

pub type EvaluationResults = IndexMap<ParamId, Result<ParamValue, EvaluationError>>;

pub struct EvaluationRequest<'a> {
    pub parameters: &'a ParameterTable,
    pub order: &'a [ParamId],
    /// Input parameter id -> value to use instead of the stored one.
    pub overrides: IndexMap<ParamId, ParamValue>,
    /// Ids that need a value back, in evaluation order.
    pub targets: Vec<ParamId>,
}

impl<'a> EvaluationRequest<'a> {
    /// Build a request from raw override text. Unknown ids are dropped with
    /// a warning.
    pub fn new<I, K, V>(analysis: &'a Analysis, overrides: I) -> EvaluationRequest<'a>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<ParamId>,
        V: AsRef<str>,
    {
        let mut accepted = IndexMap::new();
        for (id, text) in overrides {
            let id = id.into();
            if !analysis.parameters.contains_key(&id) {
                log::warn!("override for unknown parameter '{}' ignored", id);
                continue;
            }
            accepted.insert(id, coerce_override(text.as_ref()));
        }
        let targets = analysis
            .order
            .iter()
            .filter(|id| !analysis.classification.input.contains(*id))
            .cloned()
            .collect();
        EvaluationRequest {
            parameters: &analysis.parameters,
            order: &analysis.order,
            overrides: accepted,
            targets,
        }
    }

    /// The value an evaluator should use for `id`: the override if there is
    /// one, otherwise the stored value.
    pub fn input_value(&self, id: &str) -> Option<&ParamValue> {
        self.overrides
            .get(id)
            .or_else(|| self.parameters.get(id).map(|p| &p.value))
    }
}

/// Text containing `:` (times, ranges) stays text; anything else that parses
/// as a number becomes one.
pub fn coerce_override(text: &str) -> ParamValue {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ParamValue::Unset;
    }
    if !trimmed.contains(':') {
        if let Ok(n) = trimmed.parse::<f64>() {
            return ParamValue::Number(n);
        }
    }
    ParamValue::Text(trimmed.to_string())
}

pub trait Evaluator {
    fn evaluate(&mut self, request: &EvaluationRequest<'_>) -> EvaluationResults;
}

/// Answers with the values cached in the workbook. Overrides do not change
/// anything downstream; this is what a file without a live calculation
/// engine can offer.
#[derive(Clone, Copy, Debug, Default)]
pub struct CachedValueEvaluator;

impl Evaluator for CachedValueEvaluator {
    fn evaluate(&mut self, request: &EvaluationRequest<'_>) -> EvaluationResults {
        request
            .targets
            .iter()
            .map(|id| {
                let result = match request.parameters.get(id).map(|p| &p.value) {
                    Some(value) if !value.is_unset() => Ok(value.clone()),
                    _ => Err(EvaluationError::NoValue(id.clone())),
                };
                (id.clone(), result)
            })
            .collect()
    }
}
