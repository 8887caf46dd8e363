//! Table layout for the relational backend.
//!
//! One table per kind, one column per field. Every table starts with the base
//! columns (`id`, `created_at`, `updated_at`); timestamps are stored as text in
//! canonical form so they survive any driver without precision loss. The SQL
//! sticks to the subset MySQL and SQLite share, with `?` placeholders.

use hbnb_core::{EntityKind, Fields, KIND_MARKER, Record, StoreError, StoreResult};
use serde_json::Value;
use sqlx::Row;
use sqlx::any::AnyRow;

/// How a field value travels to and from the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// Structured value stored as JSON text.
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

const fn column(name: &'static str, sql_type: &'static str, ty: ColumnType, nullable: bool) -> Column {
    Column {
        name,
        sql_type,
        ty,
        nullable,
    }
}

const BASE_COLUMNS: &[Column] = &[
    column("id", "VARCHAR(60)", ColumnType::Text, false),
    column("created_at", "VARCHAR(32)", ColumnType::Text, false),
    column("updated_at", "VARCHAR(32)", ColumnType::Text, false),
];

#[derive(Debug)]
pub struct Table {
    pub kind: EntityKind,
    pub name: &'static str,
    columns: &'static [Column],
}

static USERS: Table = Table {
    kind: EntityKind::User,
    name: "users",
    columns: &[
        column("email", "VARCHAR(128)", ColumnType::Text, false),
        column("password", "VARCHAR(128)", ColumnType::Text, false),
        column("first_name", "VARCHAR(128)", ColumnType::Text, true),
        column("last_name", "VARCHAR(128)", ColumnType::Text, true),
    ],
};

static PLACES: Table = Table {
    kind: EntityKind::Place,
    name: "places",
    columns: &[
        column("city_id", "VARCHAR(60)", ColumnType::Text, false),
        column("user_id", "VARCHAR(60)", ColumnType::Text, false),
        column("name", "VARCHAR(128)", ColumnType::Text, false),
        column("description", "VARCHAR(1024)", ColumnType::Text, true),
        column("number_rooms", "BIGINT", ColumnType::Integer, false),
        column("number_bathrooms", "BIGINT", ColumnType::Integer, false),
        column("max_guest", "BIGINT", ColumnType::Integer, false),
        column("price_by_night", "BIGINT", ColumnType::Integer, false),
        column("latitude", "DOUBLE", ColumnType::Real, true),
        column("longitude", "DOUBLE", ColumnType::Real, true),
        column("amenity_ids", "VARCHAR(4096)", ColumnType::Json, false),
    ],
};

static CITIES: Table = Table {
    kind: EntityKind::City,
    name: "cities",
    columns: &[
        column("state_id", "VARCHAR(60)", ColumnType::Text, false),
        column("name", "VARCHAR(128)", ColumnType::Text, false),
    ],
};

static STATES: Table = Table {
    kind: EntityKind::State,
    name: "states",
    columns: &[column("name", "VARCHAR(128)", ColumnType::Text, false)],
};

static AMENITIES: Table = Table {
    kind: EntityKind::Amenity,
    name: "amenities",
    columns: &[column("name", "VARCHAR(128)", ColumnType::Text, false)],
};

static REVIEWS: Table = Table {
    kind: EntityKind::Review,
    name: "reviews",
    columns: &[
        column("place_id", "VARCHAR(60)", ColumnType::Text, false),
        column("user_id", "VARCHAR(60)", ColumnType::Text, false),
        column("text", "VARCHAR(1024)", ColumnType::Text, false),
    ],
};

pub fn table(kind: EntityKind) -> &'static Table {
    match kind {
        EntityKind::User => &USERS,
        EntityKind::Place => &PLACES,
        EntityKind::City => &CITIES,
        EntityKind::State => &STATES,
        EntityKind::Amenity => &AMENITIES,
        EntityKind::Review => &REVIEWS,
    }
}

/// Every table, in [`EntityKind::ALL`] order.
pub fn tables() -> impl Iterator<Item = &'static Table> {
    EntityKind::ALL.iter().map(|kind| table(*kind))
}

/// A field value ready to be bound to a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Real(Option<f64>),
}

impl Table {
    /// Base columns followed by the kind's own.
    pub fn columns(&self) -> impl Iterator<Item = &'static Column> {
        let own: &'static [Column] = self.columns;
        BASE_COLUMNS.iter().chain(own.iter())
    }

    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns()
            .map(|c| {
                let null = if c.nullable { "" } else { " NOT NULL" };
                format!("{} {}{null}", c.name, c.sql_type)
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY (id))",
            self.name,
            columns.join(", ")
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }

    pub fn select_sql(&self) -> String {
        format!("SELECT {} FROM {}", self.column_list(), self.name)
    }

    pub fn insert_sql(&self) -> String {
        let placeholders = vec!["?"; self.columns().count()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            self.name,
            self.column_list()
        )
    }

    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE id = ?", self.name)
    }

    pub fn exists_sql(&self) -> String {
        format!("SELECT id FROM {} WHERE id = ?", self.name)
    }

    fn column_list(&self) -> String {
        self.columns().map(|c| c.name).collect::<Vec<_>>().join(", ")
    }

    /// Bind values for [`Table::insert_sql`], in column order.
    pub fn values(&self, record: &Record) -> StoreResult<Vec<SqlValue>> {
        let dict = record.to_dict()?;
        self.columns()
            .map(|c| to_sql_value(c, dict.get(c.name).unwrap_or(&Value::Null)))
            .collect()
    }

    /// Rebuild the record a row of [`Table::select_sql`] holds.
    pub fn record_from_row(&self, row: &AnyRow) -> StoreResult<Record> {
        let mut dict = Fields::new();
        for c in self.columns() {
            dict.insert(c.name.to_string(), read_column(self, c, row)?);
        }
        dict.insert(KIND_MARKER.to_string(), Value::from(self.kind.as_str()));
        Record::from_dict(&dict)
    }
}

fn to_sql_value(column: &Column, value: &Value) -> StoreResult<SqlValue> {
    let mistyped = || {
        StoreError::format(format!(
            "column {} cannot hold {value}",
            column.name
        ))
    };
    Ok(match (column.ty, value) {
        (ColumnType::Text, Value::Null) => SqlValue::Text(None),
        (ColumnType::Text, Value::String(s)) => SqlValue::Text(Some(s.clone())),
        (ColumnType::Integer, Value::Null) => SqlValue::Integer(None),
        (ColumnType::Integer, v) => SqlValue::Integer(Some(v.as_i64().ok_or_else(mistyped)?)),
        (ColumnType::Real, Value::Null) => SqlValue::Real(None),
        (ColumnType::Real, v) => SqlValue::Real(Some(v.as_f64().ok_or_else(mistyped)?)),
        (ColumnType::Json, Value::Null) => SqlValue::Text(None),
        (ColumnType::Json, v) => SqlValue::Text(Some(v.to_string())),
        (ColumnType::Text, _) => return Err(mistyped()),
    })
}

fn read_column(table: &Table, column: &Column, row: &AnyRow) -> StoreResult<Value> {
    let decode = |e: sqlx::Error| {
        StoreError::format(format!("{}.{}: {e}", table.name, column.name))
    };
    Ok(match column.ty {
        ColumnType::Text => row
            .try_get::<Option<String>, _>(column.name)
            .map_err(decode)?
            .map_or(Value::Null, Value::String),
        ColumnType::Integer => row
            .try_get::<Option<i64>, _>(column.name)
            .map_err(decode)?
            .map_or(Value::Null, Value::from),
        ColumnType::Real => row
            .try_get::<Option<f64>, _>(column.name)
            .map_err(decode)?
            .map_or(Value::Null, Value::from),
        ColumnType::Json => match row.try_get::<Option<String>, _>(column.name).map_err(decode)? {
            Some(text) => serde_json::from_str(&text).map_err(|e| {
                StoreError::format(format!("{}.{} is not valid JSON: {e}", table.name, column.name))
            })?,
            None => Value::Null,
        },
    })
}
