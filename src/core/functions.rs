use crate::types::{RasterError, RasterResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User-defined scalar or threshold operation applied after radiometric correction.
///
/// Threshold variants binarize the buffer to 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "operand")]
pub enum ProcessingFunction {
    #[serde(rename = ">")]
    Greater(f64),
    #[serde(rename = ">=")]
    GreaterEqual(f64),
    #[serde(rename = "<")]
    Less(f64),
    #[serde(rename = "<=")]
    LessEqual(f64),
    #[serde(rename = "==")]
    Equal(f64),
    #[serde(rename = "+")]
    Add(f64),
    #[serde(rename = "-")]
    Subtract(f64),
}

impl ProcessingFunction {
    pub fn symbol(&self) -> &'static str {
        match self {
            ProcessingFunction::Greater(_) => ">",
            ProcessingFunction::GreaterEqual(_) => ">=",
            ProcessingFunction::Less(_) => "<",
            ProcessingFunction::LessEqual(_) => "<=",
            ProcessingFunction::Equal(_) => "==",
            ProcessingFunction::Add(_) => "+",
            ProcessingFunction::Subtract(_) => "-",
        }
    }

    pub fn operand(&self) -> f64 {
        match *self {
            ProcessingFunction::Greater(v)
            | ProcessingFunction::GreaterEqual(v)
            | ProcessingFunction::Less(v)
            | ProcessingFunction::LessEqual(v)
            | ProcessingFunction::Equal(v)
            | ProcessingFunction::Add(v)
            | ProcessingFunction::Subtract(v) => v,
        }
    }

    /// Build a function from its operator symbol and operand
    pub fn from_symbol(symbol: &str, operand: f64) -> RasterResult<Self> {
        let function = match symbol {
            ">" => ProcessingFunction::Greater(operand),
            ">=" => ProcessingFunction::GreaterEqual(operand),
            "<" => ProcessingFunction::Less(operand),
            "<=" => ProcessingFunction::LessEqual(operand),
            "==" => ProcessingFunction::Equal(operand),
            "+" => ProcessingFunction::Add(operand),
            "-" => ProcessingFunction::Subtract(operand),
            other => {
                return Err(RasterError::Config(format!(
                    "Unknown processing function: {}",
                    other
                )))
            }
        };
        Ok(function)
    }

    /// Apply to a single value
    pub fn apply_value(&self, value: f64) -> f64 {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        match *self {
            ProcessingFunction::Greater(c) => flag(value > c),
            ProcessingFunction::GreaterEqual(c) => flag(value >= c),
            // Complement of the non-strict upper threshold
            ProcessingFunction::Less(c) => 1.0 - flag(value >= c),
            // Complement of the strict upper threshold
            ProcessingFunction::LessEqual(c) => 1.0 - flag(value > c),
            ProcessingFunction::Equal(c) => flag(value == c),
            ProcessingFunction::Add(c) => value + c,
            ProcessingFunction::Subtract(c) => value - c,
        }
    }

    /// Apply elementwise to a working buffer
    pub fn apply(&self, buffer: &mut Array2<f64>) {
        buffer.mapv_inplace(|v| self.apply_value(v));
    }
}

impl fmt::Display for ProcessingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.symbol(), self.operand())
    }
}

impl FromStr for ProcessingFunction {
    type Err = RasterError;

    /// Parse the textual form `"<op> <operand>"`, e.g. `"> 50"` or `">=0.2"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !matches!(c, '>' | '<' | '='))
            .unwrap_or(s.len());
        // A bare '+' or '-' is the operator; a sign on the operand needs a separating space
        let (symbol, rest) = if split == 0 {
            let first_len = s.chars().next().map(|c| c.len_utf8()).unwrap_or(0);
            s.split_at(first_len)
        } else {
            s.split_at(split)
        };
        let operand = rest.trim().parse::<f64>().map_err(|e| {
            RasterError::Config(format!("Invalid operand in function '{}': {}", s, e))
        })?;
        Self::from_symbol(symbol.trim(), operand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_greater_threshold() {
        let mut buffer = array![[40.0, 60.0]];
        ProcessingFunction::Greater(50.0).apply(&mut buffer);
        assert_eq!(buffer, array![[0.0, 1.0]]);
    }

    #[test]
    fn test_threshold_strictness_at_operand() {
        let at = 50.0;
        assert_eq!(ProcessingFunction::Greater(50.0).apply_value(at), 0.0);
        assert_eq!(ProcessingFunction::GreaterEqual(50.0).apply_value(at), 1.0);
        assert_eq!(ProcessingFunction::Less(50.0).apply_value(at), 0.0);
        assert_eq!(ProcessingFunction::LessEqual(50.0).apply_value(at), 1.0);
        assert_eq!(ProcessingFunction::Less(50.0).apply_value(49.9), 1.0);
        assert_eq!(ProcessingFunction::LessEqual(50.0).apply_value(50.1), 0.0);
    }

    #[test]
    fn test_equal_and_arithmetic() {
        let mut buffer = array![[3.0, 4.0, 3.0]];
        ProcessingFunction::Equal(3.0).apply(&mut buffer);
        assert_eq!(buffer, array![[1.0, 0.0, 1.0]]);

        let mut buffer = array![[1.0, 2.0]];
        ProcessingFunction::Add(2.5).apply(&mut buffer);
        ProcessingFunction::Subtract(1.0).apply(&mut buffer);
        assert_eq!(buffer, array![[2.5, 3.5]]);
    }

    #[test]
    fn test_parse_textual_form() {
        assert_eq!("> 50".parse::<ProcessingFunction>().unwrap(), ProcessingFunction::Greater(50.0));
        assert_eq!(">=0.2".parse::<ProcessingFunction>().unwrap(), ProcessingFunction::GreaterEqual(0.2));
        assert_eq!("<= -3".parse::<ProcessingFunction>().unwrap(), ProcessingFunction::LessEqual(-3.0));
        assert_eq!("- 1.5".parse::<ProcessingFunction>().unwrap(), ProcessingFunction::Subtract(1.5));
        assert_eq!("+ -2".parse::<ProcessingFunction>().unwrap(), ProcessingFunction::Add(-2.0));
        assert!("!= 4".parse::<ProcessingFunction>().is_err());
        assert!("> abc".parse::<ProcessingFunction>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let f = ProcessingFunction::Less(12.5);
        assert_eq!(f.to_string().parse::<ProcessingFunction>().unwrap(), f);
    }
}
