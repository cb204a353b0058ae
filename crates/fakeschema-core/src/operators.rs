use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// Reduction applied across a row's fields (`row_op`) or across rows (`col_op`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Ignores its input and yields `Null`.
    #[default]
    Noop,
    #[serde(alias = "add")]
    Sum,
    #[serde(alias = "multiply", alias = "mul")]
    Product,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Noop => "noop",
            Operator::Sum => "sum",
            Operator::Product => "product",
        }
    }

    /// Reduce `values` to a single value.
    ///
    /// Integers stay integers until a float shows up or the integer result
    /// overflows; empty input yields `Null`.
    pub fn apply(self, values: &[Value]) -> Result<Value> {
        if self == Operator::Noop || values.is_empty() {
            return Ok(Value::Null);
        }

        if let Some(bad) = values.iter().find(|value| !value.is_numeric()) {
            return Err(Error::InvalidArguments(format!(
                "{} expects numeric values, got {bad}",
                self.as_str()
            )));
        }

        let ints: Option<Vec<i64>> = values.iter().map(Value::as_i64).collect();
        if let Some(ints) = ints {
            let folded = match self {
                Operator::Sum => ints.iter().try_fold(0i64, |acc, item| acc.checked_add(*item)),
                Operator::Product => ints
                    .iter()
                    .try_fold(1i64, |acc, item| acc.checked_mul(*item)),
                Operator::Noop => None,
            };
            if let Some(result) = folded {
                return Ok(Value::Int(result));
            }
        }

        let floats = values.iter().filter_map(Value::as_f64);
        let result: f64 = match self {
            Operator::Sum => floats.sum(),
            Operator::Product => floats.product(),
            Operator::Noop => return Ok(Value::Null),
        };
        Ok(Value::Float(result))
    }
}
