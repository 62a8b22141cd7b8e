use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use stockledger_inventory::{Direction, MostSoldRow, MovementEntry};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------
//
// Item, category and stock-adjustment bodies deserialize straight into the
// inventory forms (`ItemForm`, `CategoryForm`, `StockAdjustment`).

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub filter: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ItemFilterQuery {
    pub name: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

/// A ledger entry with its derived direction and display label.
#[derive(Debug, Serialize)]
pub struct MovementView<'a> {
    #[serde(flatten)]
    pub entry: &'a MovementEntry,
    pub direction: Direction,
    pub label: &'static str,
}

impl<'a> From<&'a MovementEntry> for MovementView<'a> {
    fn from(entry: &'a MovementEntry) -> Self {
        Self {
            entry,
            direction: entry.direction(),
            label: entry.action.label(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MostSoldView<'a> {
    #[serde(flatten)]
    pub row: &'a MostSoldRow,
    pub units_out: i64,
}

impl<'a> From<&'a MostSoldRow> for MostSoldView<'a> {
    fn from(row: &'a MostSoldRow) -> Self {
        Self {
            row,
            units_out: row.units_out(),
        }
    }
}

// -------------------------
// Extraction helpers
// -------------------------

pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
    })
}

/// Unwrap a JSON body, turning extractor rejections into the API's error shape.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(value)| value)
        .map_err(|rejection| {
            errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
        })
}
