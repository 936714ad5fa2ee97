pub mod policy;
pub mod tool;

use std::ops::ControlFlow;

use sqlparser::{
	ast::{
		self, BinaryOperator, Expr, Ident, ObjectName, Query, Select, SetExpr, Statement,
		TableFactor, TableWithJoins, Value,
	},
	dialect::PostgreSqlDialect,
	parser::Parser,
};

use self::policy::SqlPolicy;

pub const MIN_SQL_BYTES: usize = 6;
pub const MAX_SQL_BYTES: usize = 4_096;

const TENANT_COLUMN: &str = "tenant_id";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
	#[error("query is empty")]
	Empty,
	#[error("query contains a NUL byte")]
	NulByte,
	#[error("query is shorter than 6 bytes")]
	TooShort,
	#[error("query is longer than 4096 bytes")]
	TooLong,
	#[error("syntax error: {0}")]
	Syntax(String),
	#[error("no statement found")]
	EmptyQuery,
	#[error("multiple statements are not allowed")]
	MultipleStatements,
	#[error("only SELECT queries are allowed")]
	NotSelect,
	#[error("UNION, INTERSECT and EXCEPT are not allowed")]
	CompoundQuery,
	#[error("WITH clauses are not allowed")]
	CommonTableExpression,
	#[error("SELECT INTO is not allowed")]
	SelectInto,
	#[error("locking clauses are not allowed")]
	LockingClause,
	#[error("subqueries are not allowed")]
	Subquery,
	#[error("only plain tables are allowed in FROM")]
	UnsupportedFromItem,
	#[error("schema {schema} is not allowed")]
	DisallowedSchema { schema: String },
	#[error("table {table} is not allowed")]
	DisallowedTable { table: String },
	#[error("function {name} is not allowed")]
	DangerousFunction { name: String },
	#[error("function {name} is not in the allowed function list")]
	DisallowedFunction { name: String },
	#[error("no valid table found")]
	NoTable,
}

/// A query that passed every gate, rewritten with its tenant predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
	pub sql: String,
	/// Whitelisted table names in FROM order, one entry per occurrence.
	pub tables: Vec<String>,
}

/// A FROM-clause table that passed the whitelist, with the qualifier predicates attach to.
struct ScopedTable {
	name: String,
	qualifier: Ident,
	tenant_scoped: bool,
}

/// Checks agent SQL against a [`SqlPolicy`] and scopes it to one tenant.
///
/// Build one per request; the tenant is never shared between validators.
pub struct SqlValidator {
	policy: &'static SqlPolicy,
	tenant_id: String,
}
impl SqlValidator {
	pub fn new(policy: &'static SqlPolicy, tenant_id: impl Into<String>) -> Self {
		Self { policy, tenant_id: tenant_id.into() }
	}

	pub fn validate(&self, sql: &str) -> Result<ValidatedQuery, ValidationError> {
		check_input(sql)?;

		let mut statement = parse_single(sql)?;
		let tables = {
			let Statement::Query(query) = &statement else {
				return Err(ValidationError::NotSelect);
			};
			let mut tables = Vec::new();

			self.check_query(query, &mut tables)?;

			tables
		};

		self.check_expressions(&statement)?;

		if tables.is_empty() {
			return Err(ValidationError::NoTable);
		}

		if let Statement::Query(query) = &mut statement {
			self.inject_tenant_filter(query, &tables);
		}

		Ok(ValidatedQuery {
			sql: statement.to_string(),
			tables: tables.into_iter().map(|table| table.name).collect(),
		})
	}

	fn check_query(
		&self,
		query: &Query,
		tables: &mut Vec<ScopedTable>,
	) -> Result<(), ValidationError> {
		if query.with.is_some() {
			return Err(ValidationError::CommonTableExpression);
		}
		if !query.locks.is_empty() {
			return Err(ValidationError::LockingClause);
		}

		match query.body.as_ref() {
			SetExpr::Select(select) => self.check_select(select, tables),
			SetExpr::Query(inner) => self.check_query(inner, tables),
			SetExpr::SetOperation { .. } => Err(ValidationError::CompoundQuery),
			_ => Err(ValidationError::NotSelect),
		}
	}

	fn check_select(
		&self,
		select: &Select,
		tables: &mut Vec<ScopedTable>,
	) -> Result<(), ValidationError> {
		if select.into.is_some() {
			return Err(ValidationError::SelectInto);
		}

		for item in &select.from {
			self.check_table_with_joins(item, tables)?;
		}

		Ok(())
	}

	fn check_table_with_joins(
		&self,
		item: &TableWithJoins,
		tables: &mut Vec<ScopedTable>,
	) -> Result<(), ValidationError> {
		self.check_table_factor(&item.relation, tables)?;

		for join in &item.joins {
			self.check_table_factor(&join.relation, tables)?;
		}

		Ok(())
	}

	fn check_table_factor(
		&self,
		factor: &TableFactor,
		tables: &mut Vec<ScopedTable>,
	) -> Result<(), ValidationError> {
		match factor {
			TableFactor::Table { name, alias, args: None, .. } => {
				// A column list renames columns by position, so `tenant_id` could name another one.
				if alias.as_ref().is_some_and(|alias| !alias.columns.is_empty()) {
					return Err(ValidationError::UnsupportedFromItem);
				}

				let table = self.resolve_table(name)?;
				let qualifier = match alias {
					Some(alias) => alias.name.clone(),
					None => name.0.last().cloned().unwrap_or_else(|| Ident::new(&table.0)),
				};

				tables.push(ScopedTable { name: table.0, qualifier, tenant_scoped: table.1 });

				Ok(())
			},
			TableFactor::NestedJoin { alias: Some(_), .. } =>
				Err(ValidationError::UnsupportedFromItem),
			TableFactor::NestedJoin { table_with_joins, alias: None, .. } =>
				self.check_table_with_joins(table_with_joins, tables),
			TableFactor::Derived { .. } => Err(ValidationError::Subquery),
			_ => Err(ValidationError::UnsupportedFromItem),
		}
	}

	fn resolve_table(&self, name: &ObjectName) -> Result<(String, bool), ValidationError> {
		let table = match name.0.as_slice() {
			[table] => table,
			[schema, table] => {
				if !schema.value.eq_ignore_ascii_case("public") {
					return Err(ValidationError::DisallowedSchema { schema: schema.value.clone() });
				}

				table
			},
			_ => return Err(ValidationError::DisallowedTable { table: name.to_string() }),
		};
		let rule = self
			.policy
			.table(&table.value)
			.ok_or_else(|| ValidationError::DisallowedTable { table: table.value.clone() })?;

		Ok((rule.name.to_string(), rule.tenant_scoped))
	}

	fn check_expressions(&self, statement: &Statement) -> Result<(), ValidationError> {
		let flow = ast::visit_expressions(statement, |expr| match expr {
			Expr::Subquery(_) | Expr::InSubquery { .. } | Expr::Exists { .. } =>
				ControlFlow::Break(ValidationError::Subquery),
			Expr::Function(function) => match self.check_function(&function.name) {
				Ok(()) => ControlFlow::Continue(()),
				Err(err) => ControlFlow::Break(err),
			},
			_ => ControlFlow::Continue(()),
		});

		match flow {
			ControlFlow::Break(err) => Err(err),
			ControlFlow::Continue(()) => Ok(()),
		}
	}

	fn check_function(&self, name: &ObjectName) -> Result<(), ValidationError> {
		let function = match name.0.as_slice() {
			[function] => function,
			[schema, function] if schema.value.eq_ignore_ascii_case("pg_catalog") => function,
			[schema, ..] =>
				return Err(ValidationError::DisallowedSchema { schema: schema.value.clone() }),
			[] => return Err(ValidationError::DisallowedFunction { name: String::new() }),
		};
		let lowered = function.value.to_ascii_lowercase();

		if self.policy.is_dangerous_function(&lowered) {
			return Err(ValidationError::DangerousFunction { name: lowered });
		}
		if !self.policy.is_allowed_function(&lowered) {
			return Err(ValidationError::DisallowedFunction { name: lowered });
		}

		Ok(())
	}

	fn inject_tenant_filter(&self, query: &mut Query, tables: &[ScopedTable]) {
		if self.tenant_id.is_empty() {
			return;
		}

		let Some(select) = innermost_select(query) else {
			return;
		};
		let mut present = Vec::new();

		if let Some(existing) = &select.selection {
			collect_conjuncts(existing, &mut present);
		}

		let Some(filter) = tables
			.iter()
			.filter(|table| table.tenant_scoped)
			.map(|table| tenant_predicate(&table.qualifier, &self.tenant_id))
			.filter(|predicate| !present.contains(&predicate.to_string()))
			.reduce(and)
		else {
			return;
		};

		select.selection = Some(match select.selection.take() {
			Some(existing) => and(filter, parenthesize_disjunction(existing)),
			None => filter,
		});
	}
}

fn check_input(sql: &str) -> Result<(), ValidationError> {
	if sql.trim().is_empty() {
		return Err(ValidationError::Empty);
	}
	if sql.contains('\0') {
		return Err(ValidationError::NulByte);
	}
	if sql.len() < MIN_SQL_BYTES {
		return Err(ValidationError::TooShort);
	}
	if sql.len() > MAX_SQL_BYTES {
		return Err(ValidationError::TooLong);
	}

	Ok(())
}

fn parse_single(sql: &str) -> Result<Statement, ValidationError> {
	let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
		.map_err(|err| ValidationError::Syntax(err.to_string()))?;

	match statements.len() {
		0 => Err(ValidationError::EmptyQuery),
		1 => statements.pop().ok_or(ValidationError::EmptyQuery),
		_ => Err(ValidationError::MultipleStatements),
	}
}

fn innermost_select(query: &mut Query) -> Option<&mut Select> {
	match query.body.as_mut() {
		SetExpr::Select(select) => Some(select),
		SetExpr::Query(inner) => innermost_select(inner),
		_ => None,
	}
}

fn tenant_predicate(qualifier: &Ident, tenant_id: &str) -> Expr {
	Expr::BinaryOp {
		left: Box::new(Expr::CompoundIdentifier(vec![
			qualifier.clone(),
			Ident::new(TENANT_COLUMN),
		])),
		op: BinaryOperator::Eq,
		right: Box::new(Expr::Value(Value::SingleQuotedString(tenant_id.to_string()))),
	}
}

/// Top-level AND operands of a condition, deparsed.
fn collect_conjuncts(expr: &Expr, out: &mut Vec<String>) {
	match expr {
		Expr::BinaryOp { left, op: BinaryOperator::And, right } => {
			collect_conjuncts(left, out);
			collect_conjuncts(right, out);
		},
		other => out.push(other.to_string()),
	}
}

fn and(left: Expr, right: Expr) -> Expr {
	Expr::BinaryOp { left: Box::new(left), op: BinaryOperator::And, right: Box::new(right) }
}

// AND binds tighter than OR, so an OR-rooted condition must keep its own group.
fn parenthesize_disjunction(expr: Expr) -> Expr {
	match expr {
		Expr::BinaryOp { op: BinaryOperator::Or | BinaryOperator::Xor, .. } =>
			Expr::Nested(Box::new(expr)),
		other => other,
	}
}
