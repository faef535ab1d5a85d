use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use validator::{Validate, ValidationError};

use crate::{
    ServiceError, ServiceResult,
    match_record::{MatchId, MatchRecord, MatchResult, parse_timestamp},
};

pub const INVALID_DATE_MESSAGE: &str = "Date must be YYYY-MM-DD";
pub const INVALID_RESULT_MESSAGE: &str = "Result must be win or loss";
pub const NOT_AN_ARRAY_MESSAGE: &str = "matches must be an array";
pub const INVALID_ELEMENTS_MESSAGE: &str = "Invalid match object(s) in payload";
pub const DUPLICATE_IDS_MESSAGE: &str = "Duplicate match id(s) in payload";

/// Parses a strict `YYYY-MM-DD` date. Both the shape and the calendar day are
/// checked, so `2024-1-5` and `2024-13-40` are rejected.
pub fn parse_match_date(value: &str) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn validate_match_date(value: &str) -> Result<(), ValidationError> {
    match parse_match_date(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("match_date")),
    }
}

fn validate_match_result(value: &str) -> Result<(), ValidationError> {
    match value.parse::<MatchResult>() {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("match_result")),
    }
}

fn validate_created_at(value: &str) -> Result<(), ValidationError> {
    match parse_timestamp(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("created_at")),
    }
}

/// Checks the client supplied fields of a new match. The date is checked
/// before the result, and only the first failure is reported.
pub fn validate_new_match(
    date: Option<&str>,
    result: Option<&str>,
) -> ServiceResult<(NaiveDate, MatchResult)> {
    let Some(date) = date.and_then(parse_match_date) else {
        return ServiceError::bad_request(INVALID_DATE_MESSAGE);
    };
    let Some(result) = result.and_then(|r| r.parse::<MatchResult>().ok()) else {
        return ServiceError::bad_request(INVALID_RESULT_MESSAGE);
    };
    Ok((date, result))
}

#[derive(Deserialize, Validate)]
struct MatchCandidate {
    id: String,
    #[validate(custom(function = "validate_match_date"))]
    date: String,
    #[validate(custom(function = "validate_match_result"))]
    result: String,
    #[serde(rename = "createdAt")]
    #[validate(custom(function = "validate_created_at"))]
    created_at: String,
}

impl MatchCandidate {
    fn from_value(candidate: &Value) -> Option<Self> {
        if !candidate.is_object() {
            return None;
        }
        let candidate = Self::deserialize(candidate).ok()?;
        candidate.validate().ok()?;
        Some(candidate)
    }

    fn into_record(self) -> Option<MatchRecord> {
        Some(MatchRecord {
            id: MatchId(self.id),
            date: parse_match_date(&self.date)?,
            result: self.result.parse().ok()?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Structural check applied to every element of a bulk replace payload.
pub fn is_valid_match(candidate: &Value) -> bool {
    MatchCandidate::from_value(candidate).is_some()
}

/// Turns a bulk replace body into the records to install. The whole payload
/// is rejected if any element is invalid or if two elements share an id.
pub fn parse_replacement(payload: &Value) -> ServiceResult<Vec<MatchRecord>> {
    let Some(candidates) = payload.get("matches").and_then(Value::as_array) else {
        return ServiceError::bad_request(NOT_AN_ARRAY_MESSAGE);
    };

    let records = candidates
        .iter()
        .map(|candidate| MatchCandidate::from_value(candidate).and_then(MatchCandidate::into_record))
        .collect::<Option<Vec<_>>>();
    let Some(records) = records else {
        return ServiceError::bad_request(INVALID_ELEMENTS_MESSAGE);
    };

    let mut seen = HashSet::with_capacity(records.len());
    if !records.iter().all(|record| seen.insert(&record.id)) {
        return ServiceError::bad_request(DUPLICATE_IDS_MESSAGE);
    }

    Ok(records)
}
