pub fn render_schema() -> String {
	let init = include_str!("../../../sql/init.sql");

	expand_includes(init)
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_knowledge_bases.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_knowledge_bases.sql")),
				"tables/002_knowledges.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_knowledges.sql")),
				"tables/003_chunks.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_chunks.sql")),
				"tables/004_sessions.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_sessions.sql")),
				"tables/005_messages.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_messages.sql")),
				"tables/006_agents.sql" =>
					out.push_str(include_str!("../../../sql/tables/006_agents.sql")),
				"tables/007_tools.sql" =>
					out.push_str(include_str!("../../../sql/tables/007_tools.sql")),
				"tables/008_faqs.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_faqs.sql")),
				"tables/009_models.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_models.sql")),
				"tables/010_users.sql" =>
					out.push_str(include_str!("../../../sql/tables/010_users.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
