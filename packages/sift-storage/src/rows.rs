use serde::Serialize;
use sqlx::{Column, Executor, Row, TypeInfo, postgres::PgRow};

use crate::{Result, db::Db};

/// A decoded result cell. The variant is chosen from the column's declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
	Null,
	Text(String),
	Integer(i64),
	Float(f64),
	Bool(bool),
	/// `bytea` payloads, coerced to text.
	Binary(String),
}
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRows {
	pub columns: Vec<String>,
	pub rows: Vec<Vec<CellValue>>,
}

/// Runs one statement inside a read-only transaction bounded by `statement_timeout_ms`.
///
/// The statement goes over the simple query protocol, so every value arrives in text format and
/// is classified by [`decode_text_cell`].
pub async fn fetch_read_only(db: &Db, sql: &str, statement_timeout_ms: u64) -> Result<QueryRows> {
	let mut tx = db.pool.begin().await?;

	(&mut *tx).execute(sqlx::raw_sql("SET TRANSACTION READ ONLY")).await?;

	let timeout_sql = format!("SET LOCAL statement_timeout = {statement_timeout_ms}");

	(&mut *tx).execute(sqlx::raw_sql(&timeout_sql)).await?;

	let rows = (&mut *tx).fetch_all(sqlx::raw_sql(sql)).await?;

	tx.rollback().await?;

	decode_rows(&rows)
}

fn decode_rows(rows: &[PgRow]) -> Result<QueryRows> {
	let Some(first) = rows.first() else {
		return Ok(QueryRows::default());
	};
	let columns = first.columns().iter().map(|column| column.name().to_string()).collect();
	let mut decoded = Vec::with_capacity(rows.len());

	for row in rows {
		let mut cells = Vec::with_capacity(row.len());

		for (index, column) in row.columns().iter().enumerate() {
			let raw: Option<String> = row.try_get_unchecked(index)?;

			cells.push(decode_text_cell(column.type_info().name(), raw));
		}

		decoded.push(cells);
	}

	Ok(QueryRows { columns, rows: decoded })
}

/// Maps a text-format Postgres value onto a [`CellValue`] by type name.
///
/// Values that fail to parse as their declared type fall back to `Text`. `NUMERIC` always stays
/// `Text` so arbitrary precision survives, and non-finite floats stay `Text` as well.
pub fn decode_text_cell(type_name: &str, raw: Option<String>) -> CellValue {
	let Some(raw) = raw else {
		return CellValue::Null;
	};

	match type_name {
		"INT2" | "INT4" | "INT8" | "OID" =>
			raw.parse().map(CellValue::Integer).unwrap_or(CellValue::Text(raw)),
		"FLOAT4" | "FLOAT8" => match raw.parse::<f64>() {
			Ok(value) if value.is_finite() => CellValue::Float(value),
			_ => CellValue::Text(raw),
		},
		"BOOL" => match raw.as_str() {
			"t" | "true" => CellValue::Bool(true),
			"f" | "false" => CellValue::Bool(false),
			_ => CellValue::Text(raw),
		},
		"BYTEA" => CellValue::Binary(bytea_to_text(&raw)),
		_ => CellValue::Text(raw),
	}
}

fn bytea_to_text(raw: &str) -> String {
	match raw.strip_prefix("\\x").map(hex::decode) {
		Some(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
		_ => raw.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn null_is_null_regardless_of_type() {
		assert_eq!(decode_text_cell("INT8", None), CellValue::Null);
		assert_eq!(decode_text_cell("TEXT", None), CellValue::Null);
		assert_eq!(decode_text_cell("BYTEA", None), CellValue::Null);
	}

	#[test]
	fn numeric_types_are_parsed() {
		assert_eq!(decode_text_cell("INT4", Some("42".to_string())), CellValue::Integer(42));
		assert_eq!(decode_text_cell("FLOAT8", Some("0.5".to_string())), CellValue::Float(0.5));
	}

	#[test]
	fn numeric_keeps_its_exact_digits() {
		assert_eq!(
			decode_text_cell("NUMERIC", Some("12345678901234567890.123456789".to_string())),
			CellValue::Text("12345678901234567890.123456789".to_string())
		);
		assert_eq!(
			decode_text_cell("NUMERIC", Some("18446744073709551614".to_string())),
			CellValue::Text("18446744073709551614".to_string())
		);
		assert_eq!(
			decode_text_cell("NUMERIC", Some("NaN".to_string())),
			CellValue::Text("NaN".to_string())
		);
	}

	#[test]
	fn non_finite_floats_stay_text() {
		assert_eq!(
			decode_text_cell("FLOAT8", Some("NaN".to_string())),
			CellValue::Text("NaN".to_string())
		);
		assert_eq!(
			decode_text_cell("FLOAT4", Some("-Infinity".to_string())),
			CellValue::Text("-Infinity".to_string())
		);
	}

	#[test]
	fn unparsable_numbers_fall_back_to_text() {
		assert_eq!(
			decode_text_cell("INT8", Some("12.5".to_string())),
			CellValue::Text("12.5".to_string())
		);
	}

	#[test]
	fn booleans_use_postgres_text_form() {
		assert_eq!(decode_text_cell("BOOL", Some("t".to_string())), CellValue::Bool(true));
		assert_eq!(decode_text_cell("BOOL", Some("f".to_string())), CellValue::Bool(false));
	}

	#[test]
	fn bytea_is_coerced_to_text() {
		assert_eq!(
			decode_text_cell("BYTEA", Some("\\x68656c6c6f".to_string())),
			CellValue::Binary("hello".to_string())
		);
		assert_eq!(
			decode_text_cell("BYTEA", Some("\\xzz".to_string())),
			CellValue::Binary("\\xzz".to_string())
		);
	}

	#[test]
	fn other_types_stay_text() {
		assert_eq!(
			decode_text_cell("TIMESTAMPTZ", Some("2024-01-01 00:00:00+00".to_string())),
			CellValue::Text("2024-01-01 00:00:00+00".to_string())
		);
	}
}
