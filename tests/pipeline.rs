//! End-to-end tests for the ingestion pipeline and the paginated query
//! engine, driving the compiled `spp` binary against a temporary store.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use salespipe::query::encode_cursor;

fn spp_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("spp");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let landing_dir = root.join("landing");
    fs::create_dir_all(&landing_dir).unwrap();

    fs::write(
        landing_dir.join("sales1.csv"),
        "Cus ID,Date,Cus. Location,Age,Gender,Mobile Name,Sell Price,Does he.she come from facebook page.,Did he.she buy any mobile before.\n\
         101,15-01-2024,Dhaka,25, male ,Samsung Galaxy A54,35000,yes,no\n\
         102,16-01-2024,Chittagong,twenty,FEMALE,iPhone 13,not-a-price,No,maybe\n\
         103,bad-date,Old Dhaka,41,male,Xiaomi Redmi Note 12,22000,Y,n\n",
    )
    .unwrap();

    fs::write(
        landing_dir.join("sales2.json"),
        r#"[
            {"Cus ID": 104, "Date": "18-01-2024", "Cus. Location": "Sylhet", "Age": 33,
             "Gender": "female", "Mobile Name": "Samsung Galaxy S23", "Sell Price": 95000,
             "Warranty Months": 12},
            {"Cus ID": 105, "Date": "19-01-2024", "Age": 52, "Mobile Name": "Nokia G21"}
        ]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/spp.sqlite"

[ingest]
landing_dir = "{root}/landing"

[query]
default_limit = 50
max_limit = 100

[server]
bind = "127.0.0.1:7410"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("spp.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_spp(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = spp_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run spp binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Init + ingest the landing directory, panicking on failure.
fn init_and_ingest(config_path: &Path) {
    let (stdout, stderr, success) = run_spp(config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    let (stdout, stderr, success) = run_spp(config_path, &["ingest"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
}

/// Run `spp query` with extra args and parse the printed JSON page.
fn query_page(config_path: &Path, args: &[&str]) -> Value {
    let mut full_args = vec!["query"];
    full_args.extend_from_slice(args);
    let (stdout, stderr, success) = run_spp(config_path, &full_args);
    assert!(success, "query failed: stdout={}, stderr={}", stdout, stderr);
    serde_json::from_str(&stdout).expect("query output was not valid JSON")
}

fn items(page: &Value) -> &Vec<Value> {
    page["items"].as_array().unwrap()
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_spp(&config_path, &["init"]);
    assert!(success);
    assert!(stdout.contains("initialized"));

    let (_, _, success) = run_spp(&config_path, &["init"]);
    assert!(success, "second init failed (not idempotent)");
}

#[test]
fn test_ingest_mixed_sources() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_spp(&config_path, &["init"]);
    assert!(success);
    let (stdout, stderr, success) = run_spp(&config_path, &["ingest"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("files: 2 (parsed 2, skipped 0)"));
    assert!(stdout.contains("records persisted: 5"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_normalization_applied() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let page = query_page(&config_path, &[]);
    let records = items(&page);
    assert_eq!(records.len(), 5);

    // " male " -> "Male"; unparseable age -> 0; unparseable price -> 0
    let rec101 = &records[0];
    assert_eq!(rec101["customer_id"], 101);
    assert_eq!(rec101["gender"], "Male");
    assert_eq!(rec101["age"], 25);
    assert_eq!(rec101["date"], "2024-01-15");

    let rec102 = &records[1];
    assert_eq!(rec102["age"], 0);
    assert_eq!(rec102["sell_price"], 0.0);
    // out-of-enumeration answer coerced into the closed set
    assert_eq!(rec102["previous_purchase"], "Unknown");

    // malformed date cleared without losing the record
    let rec103 = &records[2];
    assert!(rec103["date"].is_null());
    assert_eq!(rec103["from_facebook"], "Yes");
    assert_eq!(rec103["previous_purchase"], "No");

    // missing fields defaulted
    let rec105 = &records[4];
    assert_eq!(rec105["customer_location"], "Unknown");
    assert_eq!(rec105["gender"], "Unknown");

    // tri-state invariant holds across the whole snapshot
    for rec in records {
        for field in [
            "from_facebook",
            "followed_page",
            "previous_purchase",
            "heard_of_shop",
        ] {
            let value = rec[field].as_str().unwrap();
            assert!(
                matches!(value, "Yes" | "No" | "Unknown"),
                "{field} held {value}"
            );
        }
    }
}

#[test]
fn test_extra_columns_unioned_across_documents() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let page = query_page(&config_path, &[]);
    let records = items(&page);

    // only the JSON document carried Warranty Months; every record has it
    // after harmonization, the others at the Unknown default
    assert_eq!(records[0]["extra"]["warranty_months"], "Unknown");
    assert_eq!(records[3]["extra"]["warranty_months"], "12");
}

#[test]
fn test_pagination_page_and_total() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let page = query_page(&config_path, &["--limit", "2"]);
    let records = items(&page);
    assert_eq!(records.len(), 2);
    assert_eq!(page["total_count"], 5);

    let second_id = records[1]["id"].as_i64().unwrap();
    assert_eq!(
        page["next_cursor"].as_str().unwrap(),
        encode_cursor(second_id)
    );
}

#[test]
fn test_pagination_exhaustive_walk() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let mut seen_ids: Vec<i64> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0;

    loop {
        let mut args = vec!["--limit", "2"];
        let token;
        if let Some(ref c) = cursor {
            token = c.clone();
            args.push("--cursor");
            args.push(&token);
        }
        let page = query_page(&config_path, &args);
        for rec in items(&page) {
            seen_ids.push(rec["id"].as_i64().unwrap());
        }
        pages += 1;
        assert!(pages <= 5, "pagination did not terminate");

        match page["next_cursor"].as_str() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    // full set, once each, ascending
    assert_eq!(seen_ids.len(), 5);
    let mut sorted = seen_ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(seen_ids, sorted);
}

#[test]
fn test_cursor_at_end_and_stale_cursor() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let page = query_page(&config_path, &[]);
    let last_id = items(&page).last().unwrap()["id"].as_i64().unwrap();

    let end = query_page(&config_path, &["--cursor", &encode_cursor(last_id)]);
    assert!(items(&end).is_empty());
    assert!(end["next_cursor"].is_null());

    // an id beyond anything in the snapshot is an empty page, not an error
    let stale = query_page(&config_path, &["--cursor", &encode_cursor(99999)]);
    assert!(items(&stale).is_empty());
    assert!(stale["next_cursor"].is_null());
}

#[test]
fn test_malformed_cursor_and_limit_rejected() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let (_, stderr, success) = run_spp(&config_path, &["query", "--cursor", "%%%"]);
    assert!(!success);
    assert!(stderr.contains("bad request"));

    for bad in ["0", "101"] {
        let (_, _, success) = run_spp(&config_path, &["query", "--limit", bad]);
        assert!(!success, "limit {bad} should be rejected");
    }
}

#[test]
fn test_filters() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    // substring, case-insensitive, not anchored: matches "Dhaka" and "Old Dhaka"
    let page = query_page(&config_path, &["--location", "dhaka"]);
    assert_eq!(page["total_count"], 2);

    let page = query_page(&config_path, &["--gender", "Female"]);
    assert_eq!(page["total_count"], 2);

    // null dates fall outside any range
    let page = query_page(
        &config_path,
        &["--date-from", "2024-01-16", "--date-to", "2024-01-18"],
    );
    assert_eq!(page["total_count"], 2);

    let page = query_page(&config_path, &["--age-min", "30", "--age-max", "60"]);
    assert_eq!(page["total_count"], 3);

    let page = query_page(&config_path, &["--product", "galaxy"]);
    assert_eq!(page["total_count"], 2);

    // filters AND together
    let page = query_page(
        &config_path,
        &["--product", "galaxy", "--gender", "Female"],
    );
    assert_eq!(page["total_count"], 1);
    assert_eq!(items(&page)[0]["customer_id"], 104);
}

#[test]
fn test_full_replace_supersedes_snapshot() {
    let (tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let before = query_page(&config_path, &[]);
    let max_id = items(&before).last().unwrap()["id"].as_i64().unwrap();

    let newer = tmp.path().join("newer.csv");
    fs::write(&newer, "Cus ID,Gender\n201,male\n202,female\n").unwrap();

    let (stdout, stderr, success) =
        run_spp(&config_path, &["ingest", newer.to_str().unwrap()]);
    assert!(success, "stdout={}, stderr={}", stdout, stderr);

    let after = query_page(&config_path, &[]);
    assert_eq!(after["total_count"], 2);
    // only the new snapshot is visible, and ids never restart
    for rec in items(&after) {
        assert!(rec["id"].as_i64().unwrap() > max_id);
        assert_eq!(rec["source_file"], "newer.csv");
    }
}

#[test]
fn test_empty_batch_preserves_previous_snapshot() {
    let (tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let bad = tmp.path().join("broken.json");
    fs::write(&bad, "not json at all {").unwrap();

    let (_, stderr, success) = run_spp(&config_path, &["ingest", bad.to_str().unwrap()]);
    assert!(!success, "ingest of an unparseable run must fail");
    assert!(stderr.contains("skipped broken.json"));
    assert!(stderr.contains("no usable records") || stderr.contains("no canonical records"));

    // previous snapshot still serves
    let page = query_page(&config_path, &[]);
    assert_eq!(page["total_count"], 5);
}

#[test]
fn test_dry_run_leaves_store_untouched() {
    let (_tmp, config_path) = setup_test_env();
    let (_, _, success) = run_spp(&config_path, &["init"]);
    assert!(success);

    let (stdout, _, success) = run_spp(&config_path, &["ingest", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("records: 5"));

    let page = query_page(&config_path, &[]);
    assert_eq!(page["total_count"], 0);
}

/// Drive the write and read paths through the library API rather than the
/// binary: ingest_documents → replace → compile/fetch_page.
#[tokio::test]
async fn test_library_write_and_read_path() {
    let (_tmp, config_path) = setup_test_env();
    let cfg = salespipe::config::load_config(&config_path).unwrap();

    salespipe::migrate::run_migrations(&cfg).await.unwrap();
    let pool = salespipe::db::connect(&cfg).await.unwrap();

    let documents = salespipe::sources::scan_landing(&cfg).unwrap();
    let report = salespipe::ingest::ingest_documents(&pool, &cfg, &documents)
        .await
        .unwrap();
    assert_eq!(report.record_count, 5);
    assert_eq!(report.version, 1);
    assert_eq!(report.last_id - report.first_id + 1, 5);

    let request = salespipe::query::QueryRequest {
        gender: Some("Male".to_string()),
        ..Default::default()
    };
    let plan = salespipe::query::compile(&request, &cfg.query).unwrap();
    let page = salespipe::query::fetch_page(&pool, &plan).await.unwrap();
    assert_eq!(page.total_count, 2);
    assert!(page.next_cursor.is_none());
    assert!(page.items.iter().all(|r| r.gender == "Male"));

    // an empty run must be rejected before the store is touched
    let err = salespipe::ingest::ingest_documents(&pool, &cfg, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, salespipe::error::PipelineError::EmptyBatch));

    pool.close().await;
}

#[test]
fn test_stats_reports_snapshot() {
    let (_tmp, config_path) = setup_test_env();
    init_and_ingest(&config_path);

    let (stdout, _, success) = run_spp(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Records:     5"));
    assert!(stdout.contains("sales1.csv"));
    assert!(stdout.contains("sales2.json"));
}
