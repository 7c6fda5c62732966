//! Per-record validation: structural checks, then price normalization.
//!
//! Each record is validated independently. A failure is returned as a value,
//! logged with the record id, and never stops the rest of the batch.

pub mod normalize;
pub mod schema;

use crate::event::ValidatedEvent;
use crate::feed::RawRecord;
use thiserror::Error;
use tracing::warn;

pub use normalize::{is_well_formed_amount, normalize, strip_currency_prefix, CURRENCY_PREFIX};
pub use schema::{check_structure, StructuredEvent};

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is not a valid {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field `{field}` is not a well-formed amount: {value:?}")]
    MalformedPrice { field: &'static str, value: String },
}

/// A rejected record, tagged with its identifier when one could be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {}: {kind}", .record_id.as_deref().unwrap_or("unknown"))]
pub struct ValidationError {
    pub record_id: Option<String>,
    pub kind: ValidationErrorKind,
}

impl ValidationError {
    fn for_record(record: &RawRecord, kind: ValidationErrorKind) -> Self {
        Self {
            record_id: record_id(record),
            kind,
        }
    }
}

/// Best-effort identifier of a raw record, for diagnostics only.
pub fn record_id(record: &RawRecord) -> Option<String> {
    match record.get("id")? {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Validate and normalize one raw record.
pub fn validate_record(record: &RawRecord) -> Result<ValidatedEvent, ValidationError> {
    check_structure(record)
        .and_then(normalize)
        .map_err(|kind| ValidationError::for_record(record, kind))
}

/// Surviving events and rejections from one batch, both in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub events: Vec<ValidatedEvent>,
    pub rejected: Vec<ValidationError>,
}

/// Validate every record of a page. Rejections are logged and collected.
pub fn validate_batch(records: &[RawRecord]) -> BatchOutcome {
    let mut outcome = BatchOutcome {
        events: Vec::with_capacity(records.len()),
        rejected: Vec::new(),
    };

    for record in records {
        match validate_record(record) {
            Ok(event) => outcome.events.push(event),
            Err(err) => {
                warn!(
                    record_id = err.record_id.as_deref().unwrap_or("unknown"),
                    reason = %err.kind,
                    "Failed to validate record"
                );
                outcome.rejected.push(err);
            }
        }
    }

    outcome
}
