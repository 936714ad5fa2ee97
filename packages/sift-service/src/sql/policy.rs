/// One table an agent may read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRule {
	pub name: &'static str,
	/// Scoped tables get a `tenant_id` predicate injected for every occurrence.
	pub tenant_scoped: bool,
}

/// The immutable surface a [`crate::sql::SqlValidator`] checks queries against.
#[derive(Debug, Clone, Copy)]
pub struct SqlPolicy {
	pub tables: &'static [TableRule],
	pub functions: &'static [&'static str],
	pub dangerous_prefixes: &'static [&'static str],
}
impl SqlPolicy {
	pub fn table(&self, name: &str) -> Option<&TableRule> {
		self.tables.iter().find(|rule| rule.name.eq_ignore_ascii_case(name))
	}

	pub fn is_dangerous_function(&self, name: &str) -> bool {
		self.dangerous_prefixes.iter().any(|prefix| name.starts_with(prefix))
	}

	pub fn is_allowed_function(&self, name: &str) -> bool {
		self.functions.contains(&name)
	}
}

pub static DEFAULT_POLICY: SqlPolicy = SqlPolicy {
	tables: &[
		TableRule { name: "knowledge_bases", tenant_scoped: true },
		TableRule { name: "knowledges", tenant_scoped: true },
		TableRule { name: "chunks", tenant_scoped: true },
		TableRule { name: "sessions", tenant_scoped: true },
		TableRule { name: "messages", tenant_scoped: true },
		TableRule { name: "agents", tenant_scoped: true },
		TableRule { name: "tools", tenant_scoped: true },
		TableRule { name: "faqs", tenant_scoped: true },
		TableRule { name: "models", tenant_scoped: true },
		TableRule { name: "users", tenant_scoped: true },
	],
	functions: &[
		// Aggregates.
		"count",
		"sum",
		"avg",
		"min",
		"max",
		"string_agg",
		"array_agg",
		"bool_and",
		"bool_or",
		// Conditionals.
		"coalesce",
		"nullif",
		"greatest",
		"least",
		// Strings.
		"lower",
		"upper",
		"length",
		"char_length",
		"trim",
		"ltrim",
		"rtrim",
		"substring",
		"substr",
		"concat",
		"concat_ws",
		"replace",
		"left",
		"right",
		"split_part",
		"strpos",
		"position",
		// Date and time.
		"now",
		"current_date",
		"current_timestamp",
		"date_trunc",
		"date_part",
		"extract",
		"to_char",
		"to_date",
		"to_timestamp",
		"age",
		// Math.
		"abs",
		"round",
		"ceil",
		"ceiling",
		"floor",
	],
	dangerous_prefixes: &[
		"pg_",
		"lo_",
		"dblink",
		"file_",
		"http_",
		"copy_",
		"set_config",
		"current_setting",
		"txid_",
		"query_to_xml",
	],
};
