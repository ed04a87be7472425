//! Request validation. Every offending field is reported, not just the first.

use crate::error::{AppError, FieldError};
use crate::model::{ExampleSortKey, ExampleStatus, NewExample, SortOrder};
use crate::service::example::ExampleQuery;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

pub const EXAMPLE_NAME_PATTERN: &str = r"^[a-zA-Z0-9\s\-_.]{1,255}$";
static EXAMPLE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(EXAMPLE_NAME_PATTERN).expect("example name regex"));
const DATE_FORMAT: &str = "%Y-%m-%d";

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;
pub const MAX_SKIP: i64 = 1_000_000;

/// Collects field errors under a location prefix such as `body` or `query`.
struct Errors {
    location: &'static str,
    items: Vec<FieldError>,
}

impl Errors {
    fn new(location: &'static str) -> Self {
        Errors {
            location,
            items: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, message: impl Into<String>, kind: &str) {
        self.items.push(FieldError {
            parameter: Some(format!("{} -> {}", self.location, field)),
            message: Some(message.into()),
            kind: Some(kind.to_string()),
        });
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, AppError> {
        match value {
            Some(v) if self.items.is_empty() => Ok(v),
            _ => Err(AppError::validation(self.items)),
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Validate a create-example body.
pub fn validate_new_example(body: &Value) -> Result<NewExample, AppError> {
    let mut errors = Errors::new("body");
    let Some(obj) = body.as_object() else {
        errors.push("body", "Input should be a valid dictionary or object", "dict_type");
        return errors.finish(None);
    };

    let example_name = match obj.get("example_name") {
        None | Some(Value::Null) => {
            errors.push("example_name", "Field required", "missing");
            None
        }
        Some(Value::String(s)) if EXAMPLE_NAME_RE.is_match(s) => Some(s.clone()),
        Some(Value::String(_)) => {
            errors.push(
                "example_name",
                format!("String should match pattern '{}'", EXAMPLE_NAME_PATTERN),
                "string_pattern_mismatch",
            );
            None
        }
        Some(_) => {
            errors.push("example_name", "Input should be a valid string", "string_type");
            None
        }
    };

    let example_date = match obj.get("example_date") {
        None | Some(Value::Null) => {
            errors.push("example_date", "Field required", "missing");
            None
        }
        Some(Value::String(s)) => {
            let d = parse_date(s);
            if d.is_none() {
                errors.push("example_date", "Invalid date format", "value_error");
            }
            d
        }
        Some(_) => {
            errors.push("example_date", "Invalid date format", "value_error");
            None
        }
    };

    let example_number = match obj.get("example_number") {
        None | Some(Value::Null) => Some(None),
        Some(v) => match v.as_i64() {
            Some(n) if (1..=12).contains(&n) => Some(Some(n as i32)),
            Some(n) if n < 1 => {
                errors.push("example_number", "Input should be greater than or equal to 1", "greater_than_equal");
                None
            }
            Some(_) => {
                errors.push("example_number", "Input should be less than or equal to 12", "less_than_equal");
                None
            }
            None => {
                errors.push("example_number", "Input should be a valid integer", "int_type");
                None
            }
        },
    };

    let example_status = match obj.get("example_status") {
        None | Some(Value::Null) => {
            errors.push("example_status", "Field required", "missing");
            None
        }
        Some(Value::String(s)) => match ExampleStatus::from_str(s) {
            Ok(status) => Some(status),
            Err(e) => {
                errors.push("example_status", e.to_string(), "enum");
                None
            }
        },
        Some(_) => {
            errors.push("example_status", "Input should be 'A' or 'B'", "enum");
            None
        }
    };

    let example_boolean = match obj.get("example_boolean") {
        None | Some(Value::Null) => Some(true),
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            errors.push("example_boolean", "Input should be a valid boolean", "bool_type");
            None
        }
    };

    let value = match (example_name, example_date, example_number, example_status, example_boolean) {
        (Some(example_name), Some(example_date), Some(example_number), Some(example_status), Some(example_boolean)) => {
            Some(NewExample {
                example_name,
                example_date,
                example_number,
                example_status,
                example_boolean,
            })
        }
        _ => None,
    };
    errors.finish(value)
}

fn query_enum<T: FromStr + Default>(
    errors: &mut Errors,
    params: &HashMap<String, String>,
    key: &str,
) -> T
where
    T::Err: std::fmt::Display,
{
    match params.get(key) {
        None => T::default(),
        Some(raw) => raw.parse().unwrap_or_else(|e: T::Err| {
            errors.push(key, e.to_string(), "enum");
            T::default()
        }),
    }
}

fn query_int(errors: &mut Errors, params: &HashMap<String, String>, key: &str, default: i64, max: i64) -> i64 {
    let Some(raw) = params.get(key) else {
        return default;
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n < 0 => {
            errors.push(key, "Input should be greater than or equal to 0", "greater_than_equal");
            default
        }
        Ok(n) if n > max => {
            errors.push(key, format!("Input should be less than or equal to {}", max), "less_than_equal");
            default
        }
        Ok(n) => n,
        Err(_) => {
            errors.push(key, "Input should be a valid integer", "int_parsing");
            default
        }
    }
}

/// Validate the query string of an example listing.
pub fn validate_example_query(params: &HashMap<String, String>) -> Result<ExampleQuery, AppError> {
    let mut errors = Errors::new("query");
    let example_date = match params.get("example_date").filter(|s| !s.trim().is_empty()) {
        None => None,
        Some(raw) => {
            let d = parse_date(raw);
            if d.is_none() {
                errors.push("example_date", "Input should be a valid date in the format YYYY-MM-DD", "date_from_datetime_parsing");
            }
            d
        }
    };
    let example_status: ExampleStatus = query_enum(&mut errors, params, "example_status");
    let sort_order: SortOrder = query_enum(&mut errors, params, "sort_order");
    let sort_key: ExampleSortKey = query_enum(&mut errors, params, "sort_key");
    let skip = query_int(&mut errors, params, "skip", 0, MAX_SKIP);
    let limit = query_int(&mut errors, params, "limit", DEFAULT_LIMIT, MAX_LIMIT);

    errors.finish(Some(ExampleQuery {
        example_date,
        example_status,
        sort_order,
        sort_key,
        skip,
        limit,
    }))
}

/// Parse a path id.
pub fn validate_uuid(field: &str, raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|e| {
        let mut errors = Errors::new("path");
        errors.push(field, format!("Input should be a valid UUID, {}", e), "uuid_parsing");
        AppError::validation(errors.items)
    })
}
