//! Shared query helpers

use sqlx::QueryBuilder;

/// Appends a bound `(?, ?, ...)` list for an SQL `IN` clause
pub(crate) fn push_in<'a>(query: &mut QueryBuilder<'a, sqlx::Sqlite>, values: &'a [Box<str>]) {
	query.push("(");
	{
		let mut separated = query.separated(", ");
		for value in values {
			separated.push_bind(value.as_ref());
		}
	}
	query.push(")");
}

// vim: ts=4
