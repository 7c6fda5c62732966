//! Structural validation: shape and type coercion, no value cleaning.
//!
//! Coercion is lax the way the feed's own clients are: integers may arrive as
//! numeric strings, booleans as 0/1 or "true"/"false". Strings are strict.

use super::ValidationErrorKind;
use crate::event::{ProbabilityData, ValidatedEvent};
use crate::feed::RawRecord;
use serde_json::{Map, Value};

/// A record whose shape and types check out but whose prices are still raw.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredEvent(pub(crate) ValidatedEvent);

impl StructuredEvent {
    pub fn as_event(&self) -> &ValidatedEvent {
        &self.0
    }
}

type Kind = ValidationErrorKind;

/// Check that every mandatory field is present and coercible.
pub fn check_structure(record: &RawRecord) -> Result<StructuredEvent, Kind> {
    let obj = record.as_object().ok_or(Kind::NotAnObject)?;

    let event = ValidatedEvent {
        id: int_field(obj, "id")?,
        name: string_field(obj, "name")?,
        display_name: string_field(obj, "display_name")?,
        image_url: string_field(obj, "image_url")?,
        yes_price: string_field(obj, "yes_price")?,
        no_price: string_field(obj, "no_price")?,
        trading_info: string_field(obj, "trading_info")?,
        traders_count_numeric: int_field(obj, "traders_count_numeric")?,
        expiry_date: string_field(obj, "expiry_date")?,
        expiry_date_time_stamp: string_field(obj, "expiry_date_time_stamp")?,
        probability_data: probability_field(obj, "probability_data")?,
        event_type: match obj.get("type") {
            None => ValidatedEvent::DEFAULT_TYPE.to_string(),
            Some(v) => as_string("type", v)?,
        },
        is_event_active: match obj.get("is_event_active") {
            None => true,
            Some(v) => as_bool("is_event_active", v)?,
        },
        available_yes_price: optional_float(obj, "available_yes_price")?,
        available_no_price: optional_float(obj, "available_no_price")?,
    };

    Ok(StructuredEvent(event))
}

fn required<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, Kind> {
    obj.get(field).ok_or(Kind::MissingField(field))
}

fn string_field(obj: &Map<String, Value>, field: &'static str) -> Result<String, Kind> {
    as_string(field, required(obj, field)?)
}

fn int_field(obj: &Map<String, Value>, field: &'static str) -> Result<i64, Kind> {
    as_int(field, required(obj, field)?)
}

fn probability_field(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<ProbabilityData, Kind> {
    let inner = required(obj, field)?.as_object().ok_or(Kind::WrongType {
        field,
        expected: "object",
    })?;

    Ok(ProbabilityData {
        text: as_string(
            "probability_data.text",
            inner
                .get("text")
                .ok_or(Kind::MissingField("probability_data.text"))?,
        )?,
        value: as_int(
            "probability_data.value",
            inner
                .get("value")
                .ok_or(Kind::MissingField("probability_data.value"))?,
        )?,
    })
}

fn optional_float(obj: &Map<String, Value>, field: &'static str) -> Result<Option<f64>, Kind> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => as_float(field, v).map(Some),
    }
}

pub(crate) fn as_string(field: &'static str, v: &Value) -> Result<String, Kind> {
    v.as_str().map(str::to_string).ok_or(Kind::WrongType {
        field,
        expected: "string",
    })
}

pub(crate) fn as_int(field: &'static str, v: &Value) -> Result<i64, Kind> {
    let err = Kind::WrongType {
        field,
        expected: "integer",
    };
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                // Whole floats like 12.0 are accepted; 12.5 is not.
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
                _ => Err(err),
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| err),
        _ => Err(err),
    }
}

pub(crate) fn as_bool(field: &'static str, v: &Value) -> Result<bool, Kind> {
    let err = Kind::WrongType {
        field,
        expected: "boolean",
    };
    match v {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(err),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "t" | "y" => Ok(true),
            "false" | "0" | "no" | "off" | "f" | "n" => Ok(false),
            _ => Err(err),
        },
        _ => Err(err),
    }
}

pub(crate) fn as_float(field: &'static str, v: &Value) -> Result<f64, Kind> {
    let err = Kind::WrongType {
        field,
        expected: "number",
    };
    let f = match v {
        Value::Number(n) => n.as_f64().ok_or(err.clone())?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| err.clone())?,
        _ => return Err(err),
    };
    if f.is_finite() {
        Ok(f)
    } else {
        Err(err)
    }
}
