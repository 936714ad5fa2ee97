use sift_config::Postgres;
use sift_storage::{
	db::Db,
	queries,
	rows::{self, CellValue},
};
use sift_testkit::TestDatabase;

async fn bootstrapped_db(test_db: &TestDatabase) -> Db {
	let cfg = Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

async fn seed(db: &Db) {
	sqlx::raw_sql(
		"\
INSERT INTO knowledge_bases (id, tenant_id, name) VALUES
	('kb-1', 'tenant_alpha', 'Handbook'),
	('kb-2', 'tenant_beta', 'Other tenant');
INSERT INTO knowledges (id, tenant_id, knowledge_base_id, title, file_name, file_type, source) VALUES
	('k-1', 'tenant_alpha', 'kb-1', 'Onboarding', 'onboarding.pdf', 'pdf', 'upload'),
	('k-2', 'tenant_alpha', 'kb-1', '', 'notes.md', 'md', 'url'),
	('k-3', 'tenant_beta', 'kb-2', 'Secret', 'secret.pdf', 'pdf', 'upload');",
	)
	.execute(&db.pool)
	.await
	.expect("Failed to seed knowledge tables.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn db_connects_and_bootstraps_twice() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping db_connects_and_bootstraps_twice; set SIFT_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped_db(&test_db).await;

	db.ensure_schema().await.expect("Schema bootstrap must be idempotent.");

	let count: i64 = sqlx::query_scalar(
		"SELECT count(*) FROM information_schema.columns WHERE column_name = 'tenant_id' AND table_schema = 'public'",
	)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to query schema columns.");

	assert_eq!(count, 10);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn knowledge_lookups_are_tenant_scoped() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping knowledge_lookups_are_tenant_scoped; set SIFT_PG_DSN to run.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped_db(&test_db).await;

	seed(&db).await;

	let kb = queries::get_knowledge_base(&db, "tenant_alpha", "kb-1")
		.await
		.expect("Failed to fetch knowledge base.");

	assert_eq!(kb.map(|kb| kb.name), Some("Handbook".to_string()));

	let foreign = queries::get_knowledge_base(&db, "tenant_alpha", "kb-2")
		.await
		.expect("Failed to fetch knowledge base.");

	assert!(foreign.is_none());

	let ids = vec!["k-1".to_string(), "k-2".to_string(), "k-3".to_string(), "k-9".to_string()];
	let mut meta = queries::list_knowledge_meta(&db, "tenant_alpha", &ids)
		.await
		.expect("Failed to list knowledge metadata.");

	meta.sort_by(|a, b| a.id.cmp(&b.id));

	assert_eq!(meta.len(), 2);
	assert_eq!(meta[0].file_name, "onboarding.pdf");
	assert_eq!(meta[1].title, "");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set SIFT_PG_DSN to run."]
async fn read_only_fetch_decodes_cells_and_refuses_writes() {
	let Some(base_dsn) = sift_testkit::env_dsn() else {
		eprintln!("Skipping read_only_fetch_decodes_cells_and_refuses_writes; set SIFT_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = bootstrapped_db(&test_db).await;

	seed(&db).await;

	let result = rows::fetch_read_only(
		&db,
		"SELECT id, 3::int8 AS n, true AS flag, NULL::text AS missing, 'hi'::bytea AS raw, 9223372036854775807::numeric * 2 AS total FROM knowledges WHERE id = 'k-1'",
		5_000,
	)
	.await
	.expect("Failed to run read-only query.");

	assert_eq!(result.columns, vec!["id", "n", "flag", "missing", "raw", "total"]);
	assert_eq!(
		result.rows,
		vec![vec![
			CellValue::Text("k-1".to_string()),
			CellValue::Integer(3),
			CellValue::Bool(true),
			CellValue::Null,
			CellValue::Binary("hi".to_string()),
			CellValue::Text("18446744073709551614".to_string()),
		]]
	);

	let write = rows::fetch_read_only(&db, "DELETE FROM knowledges", 5_000).await;

	assert!(write.is_err(), "Read-only transaction must refuse writes.");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
