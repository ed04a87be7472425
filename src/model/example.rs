//! The `example` table: the entity every real entity is modelled after.

use super::common::{parse_variant, ParseEnumError};
use crate::repository::Entity;
use crate::sql::{ColumnDef, SqlValue};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Status of an example.
///
/// - A: example description for A.
/// - B: example description for B.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub enum ExampleStatus {
    #[default]
    A,
    B,
}

impl ExampleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExampleStatus::A => "A",
            ExampleStatus::B => "B",
        }
    }
}

impl FromStr for ExampleStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "example status",
            s,
            &[("A", ExampleStatus::A), ("B", ExampleStatus::B)],
            &["A", "B"],
        )
    }
}

impl TryFrom<String> for ExampleStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for ExampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column an example listing can be sorted by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExampleSortKey {
    #[default]
    Status,
    Name,
    Date,
    Number,
    CreatedAt,
    UpdatedAt,
}

const SORT_KEYS: &[(&str, ExampleSortKey)] = &[
    ("example_status", ExampleSortKey::Status),
    ("example_name", ExampleSortKey::Name),
    ("example_date", ExampleSortKey::Date),
    ("example_number", ExampleSortKey::Number),
    ("created_at", ExampleSortKey::CreatedAt),
    ("updated_at", ExampleSortKey::UpdatedAt),
];

impl ExampleSortKey {
    pub fn column(self) -> &'static str {
        SORT_KEYS
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(name, _)| *name)
            .unwrap_or("example_status")
    }
}

impl FromStr for ExampleSortKey {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(
            "sort key",
            s,
            SORT_KEYS,
            &[
                "example_status",
                "example_name",
                "example_date",
                "example_number",
                "created_at",
                "updated_at",
            ],
        )
    }
}

#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct Example {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub example_name: String,
    pub example_date: NaiveDate,
    pub example_number: Option<i32>,
    #[sqlx(try_from = "String")]
    pub example_status: ExampleStatus,
    pub example_boolean: bool,
}

const EXAMPLE_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "uuid"),
    ColumnDef::server_managed("created_at", "timestamptz"),
    ColumnDef::server_managed("updated_at", "timestamptz"),
    ColumnDef::new("example_name", "varchar"),
    ColumnDef::new("example_date", "date"),
    ColumnDef::new("example_number", "integer"),
    ColumnDef::enumeration("example_status", "example_status_enum"),
    ColumnDef::new("example_boolean", "boolean"),
];

impl Entity for Example {
    const NAME: &'static str = "Example";
    const TABLE: &'static str = "example";
    const COLUMNS: &'static [ColumnDef] = EXAMPLE_COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("id", self.id.into()),
            ("example_name", self.example_name.clone().into()),
            ("example_date", self.example_date.into()),
            ("example_number", self.example_number.into()),
            ("example_status", self.example_status.as_str().into()),
            ("example_boolean", self.example_boolean.into()),
        ]
    }
}

/// Validated input for a new example.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExample {
    pub example_name: String,
    pub example_date: NaiveDate,
    pub example_number: Option<i32>,
    pub example_status: ExampleStatus,
    pub example_boolean: bool,
}

impl Example {
    /// A not-yet-stored example with a fresh id. Timestamps are replaced by the database.
    pub fn new(input: NewExample) -> Self {
        let now = Utc::now();
        Example {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            example_name: input.example_name,
            example_date: input.example_date,
            example_number: input.example_number,
            example_status: input.example_status,
            example_boolean: input.example_boolean,
        }
    }
}

/// Request body accepted when creating an example. Statuses are matched ignoring case.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CreateExampleBody {
    #[schema(pattern = r"^[a-zA-Z0-9\s\-_.]{1,255}$", example = "Example Name")]
    pub example_name: String,
    #[schema(example = "2024-04-04")]
    pub example_date: NaiveDate,
    #[schema(minimum = 1, maximum = 12)]
    pub example_number: Option<i32>,
    pub example_status: ExampleStatus,
    /// Defaults to true.
    pub example_boolean: Option<bool>,
}

/// Example as returned by the API.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ExampleResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// The name associated with the entity.
    pub example_name: String,
    /// ISO 8601 date (YYYY-MM-DD).
    pub example_date: NaiveDate,
    /// Between 1 and 12, inclusive.
    pub example_number: Option<i32>,
    pub example_status: ExampleStatus,
    pub example_boolean: bool,
}

impl From<Example> for ExampleResponse {
    fn from(e: Example) -> Self {
        ExampleResponse {
            id: e.id,
            created_at: e.created_at,
            updated_at: e.updated_at,
            example_name: e.example_name,
            example_date: e.example_date,
            example_number: e.example_number,
            example_status: e.example_status,
            example_boolean: e.example_boolean,
        }
    }
}
