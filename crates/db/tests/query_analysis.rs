//! Database Query Analysis Tests
//!
//! These tests run EXPLAIN ANALYZE over the hot queries of the store layer.
//! They require a running `PostgreSQL` database (see `TestDbConfig`).
//!
//! Run with:
//! ```bash
//! docker-compose -f docker-compose.test.yml up -d
//! cargo test --features query-analysis -- query_analysis --nocapture
//! ```

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::needless_pass_by_value
)]
#![cfg(feature = "query-analysis")]

use asrama_db::test_utils::TestDatabase;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement, TransactionTrait};

/// Check if query analysis tests should be skipped (e.g., in CI).
fn should_skip() -> bool {
    std::env::var("SKIP_QUERY_ANALYSIS").is_ok()
}

macro_rules! skip_if_ci {
    () => {
        if should_skip() {
            eprintln!("Skipping query analysis test (SKIP_QUERY_ANALYSIS is set)");
            return;
        }
    };
}

#[derive(Debug)]
struct QueryPlan {
    query_name: String,
    execution_time_ms: f64,
    uses_index: bool,
    plan_text: String,
}

impl QueryPlan {
    fn from_explain_output(query_name: &str, rows: Vec<String>) -> Self {
        let plan_text = rows.join("\n");

        let execution_time_ms = rows
            .iter()
            .find(|r| r.contains("Execution Time:"))
            .and_then(|r| r.split(':').next_back())
            .and_then(|s| s.trim().trim_end_matches(" ms").parse::<f64>().ok())
            .unwrap_or(0.0);

        let uses_index = plan_text.contains("Index Scan")
            || plan_text.contains("Index Only Scan")
            || plan_text.contains("Bitmap Index Scan");

        Self {
            query_name: query_name.to_string(),
            execution_time_ms,
            uses_index,
            plan_text,
        }
    }

    fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("Query: {}", self.query_name);
        println!("Execution Time: {:.3} ms", self.execution_time_ms);
        println!("Uses Index:     {}", if self.uses_index { "YES" } else { "NO" });
        println!("\nPlan:\n{}", self.plan_text);
    }

    fn assert_uses_index(&self) {
        assert!(
            self.uses_index,
            "{}: Query should use an index but performed sequential scan",
            self.query_name
        );
    }
}

async fn run_explain_analyze(db: &DatabaseConnection, query_name: &str, sql: &str) -> QueryPlan {
    let txn = db.begin().await.expect("Failed to begin transaction");

    // Small tables make the planner prefer sequential scans regardless of indexes
    txn.execute(Statement::from_string(
        DbBackend::Postgres,
        "SET LOCAL enable_seqscan = off",
    ))
    .await
    .expect("Failed to disable seqscan");

    let explain_sql = format!("EXPLAIN (ANALYZE, FORMAT TEXT) {sql}");
    let rows: Vec<String> = txn
        .query_all(Statement::from_string(DbBackend::Postgres, explain_sql))
        .await
        .expect("Failed to execute EXPLAIN ANALYZE")
        .into_iter()
        .filter_map(|row| row.try_get_by_index::<String>(0).ok())
        .collect();

    txn.rollback().await.expect("Failed to roll back");
    QueryPlan::from_explain_output(query_name, rows)
}

/// 200 students, each with one completed and one active request, and 20
/// notifications per student spread over the last 60 days.
async fn setup_test_data(db: &TestDatabase) {
    db.cleanup().await.expect("Failed to clean database");

    let statements = [
        r#"INSERT INTO "user" (email, name, role)
          SELECT 'student' || i || '@asrama.test', 'Student ' || i, 'student'
          FROM generate_series(1, 200) AS i"#,
        r#"INSERT INTO student (user_id, nim, name, is_kipk)
          SELECT u.id, 'NIM' || u.id, u.name, u.id % 5 = 0
          FROM "user" u WHERE u.role = 'student'"#,
        r"INSERT INTO clearance_request (student_id, submission_number, total_fee, status)
          SELECT s.id, 'SBA-DONE-' || s.id, 2000000, 'COMPLETED' FROM student s",
        r"INSERT INTO clearance_request (student_id, submission_number, total_fee, status)
          SELECT s.id, 'SBA-OPEN-' || s.id, 2000000, 'AWAITING_PAYMENT' FROM student s",
        r"INSERT INTO notification (user_id, title, message, notification_type, reference_id, is_read, created_at)
          SELECT s.user_id, 'Status', 'Pesan ' || n, 'surat_bebas_asrama', n::text, n % 2 = 0,
                 NOW() - (n * 3 || ' days')::interval
          FROM student s, generate_series(1, 20) AS n",
        "ANALYZE",
    ];

    for sql in statements {
        db.conn
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .expect("Failed to seed query analysis data");
    }
}

#[tokio::test]
async fn analyze_active_request_lookup() {
    skip_if_ci!();
    let db = TestDatabase::new().await.expect("Failed to connect to database");
    setup_test_data(&db).await;

    let plan = run_explain_analyze(
        &db.conn,
        "Active request by student",
        "SELECT * FROM clearance_request WHERE student_id = 42 AND status <> 'COMPLETED'",
    )
    .await;

    plan.print_summary();
    plan.assert_uses_index();
    assert!(
        plan.plan_text.contains("idx_clearance_request_one_active"),
        "active lookup should use the partial unique index"
    );
}

#[tokio::test]
async fn analyze_notification_feed_query() {
    skip_if_ci!();
    let db = TestDatabase::new().await.expect("Failed to connect to database");
    setup_test_data(&db).await;

    let plan = run_explain_analyze(
        &db.conn,
        "Recent notifications of a user",
        "SELECT * FROM notification WHERE user_id = 42 AND created_at >= NOW() - INTERVAL '30 days' ORDER BY created_at DESC",
    )
    .await;

    plan.print_summary();
    plan.assert_uses_index();
}

#[tokio::test]
async fn analyze_announcement_cleanup_query() {
    skip_if_ci!();
    let db = TestDatabase::new().await.expect("Failed to connect to database");
    setup_test_data(&db).await;

    let plan = run_explain_analyze(
        &db.conn,
        "Notifications of an announcement",
        "SELECT id FROM notification WHERE notification_type = 'pengumuman' AND reference_id = '7'",
    )
    .await;

    plan.print_summary();
    plan.assert_uses_index();
}

#[tokio::test]
async fn analyze_manager_listing_by_status() {
    skip_if_ci!();
    let db = TestDatabase::new().await.expect("Failed to connect to database");
    setup_test_data(&db).await;

    let plan = run_explain_analyze(
        &db.conn,
        "Requests awaiting payment",
        "SELECT * FROM clearance_request WHERE status = 'AWAITING_PAYMENT' ORDER BY submitted_at DESC",
    )
    .await;

    plan.print_summary();
    plan.assert_uses_index();
}
