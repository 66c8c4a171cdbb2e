//! Row to record mapping

use crate::error::{LetterError, Result};
use letter_types::{LetterKind, LetterRequest, ReferenceKey, ScheduleTable};
use sqlx::any::AnyRow;
use sqlx::{Column, Row};

pub const OCCUPIER_COLUMN: &str = "occupier";
pub const ADDRESS_COLUMN: &str = "address";
pub const CASE_REF_COLUMN: &str = "case_ref";
pub const PROPERTY_REF_COLUMN: &str = "property_ref";
pub const SUBSCRIPTIONS_COLUMN: &str = "num_subs";

/// Convert one listing row into the request shape of `kind`
pub fn map_request(kind: LetterKind, row: &AnyRow) -> Result<LetterRequest> {
    let occupier = required_text(row, OCCUPIER_COLUMN)?;
    let address = required_text(row, ADDRESS_COLUMN)?;

    let request = match kind {
        LetterKind::GardenWaste => LetterRequest::GardenWaste {
            occupier,
            address,
            reference: ReferenceKey::new(required_text(row, CASE_REF_COLUMN)?),
            subscriptions: subscription_count(row)?,
        },
        LetterKind::Recycling => LetterRequest::Recycling {
            occupier,
            address,
            reference: ReferenceKey::new(required_text(row, CASE_REF_COLUMN)?),
        },
        LetterKind::CollectionChange => LetterRequest::CollectionChange {
            occupier,
            address,
            property: ReferenceKey::new(required_text(row, PROPERTY_REF_COLUMN)?),
        },
    };

    Ok(request)
}

/// Schedule lookup row, every column rendered as text
pub fn map_schedule(row: &AnyRow) -> Result<ScheduleTable> {
    let mut headings = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        headings.push(column.name().to_string());
        values.push(display_value(row, index)?);
    }

    Ok(ScheduleTable::new(headings, values))
}

/// Non-empty text of a column. Numeric identifiers (UPRNs, case numbers)
/// are accepted and printed as digits.
fn required_text(row: &AnyRow, column: &str) -> Result<String> {
    let index = row
        .try_column(column)
        .map_err(|e| LetterError::Mapping(format!("column '{}': {}", column, e)))?
        .ordinal();

    let value = display_value(row, index)?;
    match value.trim() {
        "" => Err(LetterError::Mapping(format!("column '{}' is empty", column))),
        v => Ok(v.to_string()),
    }
}

/// `num_subs` comes back as an integer from some sources and as text from others
fn subscription_count(row: &AnyRow) -> Result<u32> {
    let count = match row.try_get::<Option<i64>, _>(SUBSCRIPTIONS_COLUMN) {
        Ok(value) => value,
        Err(_) => required_text(row, SUBSCRIPTIONS_COLUMN)?
            .parse::<i64>()
            .map(Some)
            .map_err(|e| {
                LetterError::Mapping(format!("column '{}' is not a number: {}", SUBSCRIPTIONS_COLUMN, e))
            })?,
    };

    match count {
        Some(n) if n >= 1 => u32::try_from(n).map_err(|_| {
            LetterError::Mapping(format!("column '{}' out of range: {}", SUBSCRIPTIONS_COLUMN, n))
        }),
        Some(n) => Err(LetterError::Mapping(format!(
            "column '{}' must be at least 1, got {}",
            SUBSCRIPTIONS_COLUMN, n
        ))),
        None => Err(LetterError::Mapping(format!("column '{}' is empty", SUBSCRIPTIONS_COLUMN))),
    }
}

fn display_value(row: &AnyRow, index: usize) -> Result<String> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value.unwrap_or_default());
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(|v| v.to_string()).unwrap_or_default());
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value.map(|v| v.to_string()).unwrap_or_default());
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return Ok(value.map(|v| if v { "Yes" } else { "No" }.to_string()).unwrap_or_default());
    }

    Err(LetterError::Mapping(format!(
        "column '{}' has a type that cannot be shown in a letter",
        row.columns()[index].name()
    )))
}
