//! Atomic counters for human-readable identifiers.
//!
//! Each scope owns one row in `sequence_counters`. Allocation makes sure the
//! row exists (insert ignored on conflict), bumps it with a single
//! `UPDATE ... SET value = value + 1` and reads the new value back. Run it on
//! the same transaction that inserts the numbered record: the row lock taken
//! by the update serializes concurrent allocators until commit, and a rolled
//! back insert gives its number back.

use chrono::{DateTime, Datelike, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::error::{AppError, Result};
use crate::models::sequence_counter;

/// Allocate the next value for `scope`, starting at 1
pub async fn next_value<C: ConnectionTrait>(conn: &C, scope: &str) -> Result<i64> {
    let now = Utc::now();

    sequence_counter::Entity::insert(sequence_counter::ActiveModel {
        scope: Set(scope.to_string()),
        value: Set(0),
        updated_at: Set(now),
    })
    .on_conflict(
        OnConflict::column(sequence_counter::Column::Scope)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(conn)
    .await?;

    let updated = sequence_counter::Entity::update_many()
        .col_expr(
            sequence_counter::Column::Value,
            Expr::col(sequence_counter::Column::Value).add(1),
        )
        .col_expr(sequence_counter::Column::UpdatedAt, Expr::value(now))
        .filter(sequence_counter::Column::Scope.eq(scope))
        .exec(conn)
        .await?;

    if updated.rows_affected != 1 {
        return Err(AppError::Internal(format!(
            "Sequence counter '{}' could not be incremented",
            scope
        )));
    }

    let counter = sequence_counter::Entity::find_by_id(scope.to_string())
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Sequence counter '{}' vanished", scope)))?;

    Ok(counter.value)
}

/// Counter scope for concern reference numbers of a year-month
pub fn concern_scope(at: DateTime<Utc>) -> String {
    format!("concern:{}", at.format("%Y%m"))
}

/// `CNR{YYYY}{MM}{seq:04}`
pub fn format_reference_number(at: DateTime<Utc>, seq: i64) -> String {
    format!("CNR{}{:04}", at.format("%Y%m"), seq)
}

/// Counter scope for student IDs of a year
pub fn student_scope(at: DateTime<Utc>) -> String {
    format!("student:{}", at.year())
}

/// `{YYYY}-{seq:03}`
pub fn format_student_id(at: DateTime<Utc>, seq: i64) -> String {
    format!("{}-{:03}", at.year(), seq)
}

/// Allocate the next concern reference number for the current month
pub async fn next_reference_number<C: ConnectionTrait>(conn: &C) -> Result<String> {
    let now = Utc::now();
    let seq = next_value(conn, &concern_scope(now)).await?;
    Ok(format_reference_number(now, seq))
}

/// Allocate the next student ID for the current year
pub async fn next_student_id<C: ConnectionTrait>(conn: &C) -> Result<String> {
    let now = Utc::now();
    let seq = next_value(conn, &student_scope(now)).await?;
    Ok(format_student_id(now, seq))
}
