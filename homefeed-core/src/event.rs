//! Canonical cleaned market event.

use serde::{Deserialize, Serialize};

/// Label and integer value describing the event's current probability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilityData {
    pub text: String,
    pub value: i64,
}

/// One market event that passed structural validation and normalization.
///
/// Price fields hold decimal amounts with the currency prefix already removed.
/// Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedEvent {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub image_url: String,
    pub yes_price: String,
    pub no_price: String,
    pub trading_info: String,
    pub traders_count_numeric: i64,
    pub expiry_date: String,
    pub expiry_date_time_stamp: String,
    pub probability_data: ProbabilityData,
    #[serde(rename = "type")]
    pub event_type: String,
    pub is_event_active: bool,
    pub available_yes_price: Option<f64>,
    pub available_no_price: Option<f64>,
}

impl ValidatedEvent {
    pub const DEFAULT_TYPE: &'static str = "probabilistic";
}
