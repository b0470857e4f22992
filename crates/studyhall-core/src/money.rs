//! Boundary coercion for the loosely-typed numeric fields clients send.
//!
//! Registration forms arrive with money and id fields as either JSON numbers
//! or strings. Each field is normalized exactly once, here: absent or empty
//! means zero, anything else must parse. Non-empty garbage is a validation
//! error rather than a silent zero.

use serde::Deserialize;

use crate::error::{CoreError, Result};

/// A money or id field as received on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

/// Coerce a monetary field. `None` and whitespace-only strings default to 0.
pub fn parse_amount(field: &'static str, input: Option<&NumericInput>) -> Result<f64> {
    let value = match input {
        None => return Ok(0.0),
        Some(NumericInput::Number(n)) => *n,
        Some(NumericInput::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0.0);
            }
            trimmed.parse::<f64>().map_err(|_| {
                CoreError::Validation(format!("field '{field}' is not a number: '{trimmed}'"))
            })?
        }
    };

    if !value.is_finite() {
        return Err(CoreError::Validation(format!(
            "field '{field}' is not a finite number"
        )));
    }
    Ok(value)
}

/// Coerce an optional identifier field to an integer id.
pub fn parse_optional_id(field: &'static str, input: Option<&NumericInput>) -> Result<Option<i64>> {
    let value = match input {
        None => return Ok(None),
        Some(NumericInput::Number(n)) => {
            if n.fract() != 0.0 || !n.is_finite() {
                return Err(CoreError::Validation(format!(
                    "field '{field}' is not an integer id"
                )));
            }
            *n as i64
        }
        Some(NumericInput::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<i64>().map_err(|_| {
                CoreError::Validation(format!("field '{field}' is not an integer id: '{trimmed}'"))
            })?
        }
    };
    Ok(Some(value))
}

/// Coerce a required identifier field.
pub fn parse_required_id(field: &'static str, input: Option<&NumericInput>) -> Result<i64> {
    parse_optional_id(field, input)?
        .ok_or_else(|| CoreError::Validation(format!("field '{field}' is required")))
}

/// Coerce an ordered list of shift ids.
pub fn parse_id_list(field: &'static str, inputs: &[NumericInput]) -> Result<Vec<i64>> {
    inputs
        .iter()
        .map(|input| parse_required_id(field, Some(input)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_empty_amounts_default_to_zero() {
        assert_eq!(parse_amount("total_fee", None).unwrap(), 0.0);
        let empty = NumericInput::Text("   ".to_string());
        assert_eq!(parse_amount("total_fee", Some(&empty)).unwrap(), 0.0);
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let input = NumericInput::Text("1000.50".to_string());
        assert_eq!(parse_amount("total_fee", Some(&input)).unwrap(), 1000.50);
    }

    #[test]
    fn garbage_amounts_are_rejected_not_zeroed() {
        let input = NumericInput::Text("one thousand".to_string());
        assert!(parse_amount("total_fee", Some(&input)).is_err());
    }

    #[test]
    fn nan_strings_are_rejected() {
        let input = NumericInput::Text("NaN".to_string());
        assert!(parse_amount("total_fee", Some(&input)).is_err());
    }

    #[test]
    fn ids_must_be_integral() {
        let fractional = NumericInput::Number(1.5);
        assert!(parse_optional_id("seat_id", Some(&fractional)).is_err());

        let whole = NumericInput::Number(7.0);
        assert_eq!(parse_optional_id("seat_id", Some(&whole)).unwrap(), Some(7));

        let text = NumericInput::Text("42".to_string());
        assert_eq!(parse_optional_id("seat_id", Some(&text)).unwrap(), Some(42));
    }

    #[test]
    fn required_id_missing_is_a_validation_error() {
        let err = parse_required_id("branch_id", None).unwrap_err();
        assert!(err.to_string().contains("branch_id"));
    }

    #[test]
    fn shift_id_lists_coerce_each_element() {
        let inputs = vec![
            NumericInput::Number(2.0),
            NumericInput::Text("5".to_string()),
        ];
        assert_eq!(parse_id_list("shift_ids", &inputs).unwrap(), vec![2, 5]);
    }
}
