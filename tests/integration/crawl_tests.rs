//! Integration tests for the orchestrator
//!
//! These tests use wiremock to serve category listing pages and detail
//! pages and drive complete runs end-to-end, including checkpointing and
//! resumption.

use catalog_harvest::config::{Config, CrawlConfig, FetchConfig, RunConfig, SiteConfig};
use catalog_harvest::crawler::{Orchestrator, RunOutcome};
use catalog_harvest::state::{Record, TaskState};
use catalog_harvest::storage::{CheckpointError, CheckpointStore, JsonCheckpointStore};
use catalog_harvest::{HarvestError, Task};
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration for categories `a` and `b` served by the
/// mock server, with every artifact inside `dir`
fn create_test_config(server: &MockServer, dir: &TempDir, start_year: i32, end_year: i32) -> Config {
    let mut site = SiteConfig {
        base_url: server.uri(),
        ..SiteConfig::default()
    };
    site.categories
        .insert("a".to_string(), "Category:{year}_A".to_string());
    site.categories
        .insert("b".to_string(), "Category:{year}_B".to_string());

    Config {
        crawl: CrawlConfig {
            start_year,
            end_year,
            categories: vec!["a".to_string(), "b".to_string()],
            priority_categories: vec![],
            prefer_priority: false,
        },
        fetch: FetchConfig {
            user_agent: "TestHarvester/1.0".to_string(),
            request_timeout_secs: 5,
            politeness_delay_ms: 0, // No delay for testing
            detail_workers: 4,
        },
        run: RunConfig {
            checkpoint_path: dir.path().join("checkpoint.json").display().to_string(),
            output_path: dir.path().join("records.csv").display().to_string(),
            failed_report_path: dir.path().join("failed.csv").display().to_string(),
            ..RunConfig::default()
        },
        site,
    }
}

/// Renders a category listing page
fn listing_page(titles: &[&str], next: Option<&str>) -> String {
    let items: String = titles
        .iter()
        .map(|t| format!(r#"<li><a href="/wiki/{}">{}</a></li>"#, t, t))
        .collect();
    let next_link = next
        .map(|href| format!(r#"(previous page) (<a href="{}">next page</a>)"#, href))
        .unwrap_or_default();

    format!(
        r#"<html><body><div id="mw-pages"><h2>Pages in category</h2>{}<ul>{}</ul></div></body></html>"#,
        next_link, items
    )
}

/// Renders a detail page with an infobox poster and a lead paragraph
fn detail_page(title: &str) -> String {
    format!(
        r#"<html><body>
        <table class="infobox"><tr><td><img src="//upload.example.org/{title}.jpg"></td></tr></table>
        <div class="mw-parser-output"><p>{title} is a film that was released to audiences and is described at length here.</p></div>
        </body></html>"#
    )
}

async fn mount_listing(server: &MockServer, page: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/wiki/{}", page)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, title: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/wiki/{}", title)))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(title)))
        .expect(expected)
        .mount(server)
        .await;
}

/// Mounts the reference scenario for 2001-2002 x {a, b}:
/// - 2001:a spans two pages, [X, Y] then [Y, Z]
/// - 2001:b lists X again (same year, so a duplicate) and W
/// - 2002:a lists X (new year, so accepted)
/// - 2002:b does not exist (404)
///
/// Every page, listing or detail, may only be fetched once.
async fn mount_scenario(server: &MockServer) {
    mount_listing(
        server,
        "Category:2001_A",
        listing_page(&["X", "Y"], Some("/w/index.php?title=Category:2001_A&pagefrom=Y")),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/w/index.php"))
        .and(query_param("title", "Category:2001_A"))
        .and(query_param("pagefrom", "Y"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["Y", "Z"], None)))
        .expect(1)
        .mount(server)
        .await;
    mount_listing(server, "Category:2001_B", listing_page(&["x", "W"], None), 1).await;
    mount_listing(server, "Category:2002_A", listing_page(&["X"], None), 1).await;

    for title in ["X", "Y", "Z", "W"] {
        mount_detail(server, title, 1).await;
    }
}

fn titles(records: &[Record]) -> Vec<(i32, &str, &str)> {
    records
        .iter()
        .map(|r| (r.year, r.category.as_str(), r.title.as_str()))
        .collect()
}

#[tokio::test]
async fn test_full_run_dedupes_across_pages_and_categories() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_scenario(&server).await;

    let config = create_test_config(&server, &dir, 2001, 2002);
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.tasks_completed, 4);
    assert_eq!(report.tasks_failed, 0);
    assert_eq!(report.records_added, 5);
    assert_eq!(report.details_fetched, 4);

    assert_eq!(
        titles(orchestrator.records()),
        vec![
            (2001, "a", "X"),
            (2001, "a", "Y"),
            (2001, "a", "Z"),
            (2001, "b", "W"),
            (2002, "a", "X"),
        ]
    );

    // Z was found on the second listing page
    let z = &orchestrator.records()[2];
    assert!(z.source_url.contains("pagefrom=Y"));
    assert_eq!(z.poster, "https://upload.example.org/Z.jpg");
    assert!(z.description.starts_with("Z is a film"));

    // The 2002 record reuses the detail data cached in 2001
    let x_2002 = &orchestrator.records()[4];
    assert_eq!(x_2002.poster, "https://upload.example.org/X.jpg");

    assert_eq!(
        orchestrator.task_state(&Task::new(2002, "b")),
        TaskState::Completed
    );

    let csv = fs::read_to_string(dir.path().join("records.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[0],
        "year,category,title,detail_url,poster,description,source_url"
    );
    assert!(lines[1].starts_with("2001,a,X,"));

    let failed = fs::read_to_string(dir.path().join("failed.csv")).unwrap();
    assert_eq!(failed.trim(), "task_key,error_message");
}

#[tokio::test]
async fn test_resume_after_finish_fetches_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_scenario(&server).await;

    let config = create_test_config(&server, &dir, 2001, 2002);
    let mut first = Orchestrator::new(config.clone()).unwrap();
    first.run().await.unwrap();
    let first_records = first.records().to_vec();

    let mut resumed_config = config;
    resumed_config.run.resume = true;
    let mut second = Orchestrator::new(resumed_config).unwrap();
    let report = second.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.tasks_skipped, 4);
    assert_eq!(report.records_added, 0);
    assert_eq!(second.records(), first_records.as_slice());
    // The mocks' expect(1) counts verify nothing was fetched again
}

#[tokio::test]
async fn test_detail_failure_is_isolated() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "Category:2001_A", listing_page(&["Good", "Bad"], None), 1).await;
    mount_listing(&server, "Category:2001_B", listing_page(&[], None), 1).await;
    mount_detail(&server, "Good", 1).await;
    Mock::given(method("GET"))
        .and(path("/wiki/Bad"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir, 2001, 2001);
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.tasks_completed, 2);
    assert_eq!(report.detail_failures, 1);
    assert!(orchestrator.failed_tasks().is_empty());

    let bad = orchestrator
        .records()
        .iter()
        .find(|r| r.title == "Bad")
        .unwrap();
    assert_eq!(bad.poster, "");
    assert_eq!(bad.description, "");
    assert!(orchestrator
        .detail_cache()
        .get(&format!("{}/wiki/Bad", server.uri()))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_listing_failure_marks_task_failed_and_run_continues() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/wiki/Category:2001_A"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, "Category:2001_B", listing_page(&["W"], None), 1).await;
    mount_detail(&server, "W", 1).await;

    let config = create_test_config(&server, &dir, 2001, 2001);
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.tasks_failed, 1);
    assert_eq!(report.tasks_completed, 1);
    assert_eq!(titles(orchestrator.records()), vec![(2001, "b", "W")]);

    let error = orchestrator.failed_tasks().get("2001:a").unwrap();
    assert!(error.contains("HTTP 503"), "unexpected error text: {}", error);

    let report_csv = fs::read_to_string(dir.path().join("failed.csv")).unwrap();
    let lines: Vec<&str> = report_csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("2001:a,"));

    // The checkpoint records the failure too
    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let state = store.read().unwrap().unwrap();
    assert!(state.failed_tasks.contains_key("2001:a"));
    assert!(state.completed_tasks.contains("2001:b"));
}

#[tokio::test]
async fn test_failed_only_retries_exactly_the_failed_tasks() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        "Category:2001_A",
        listing_page(&["X"], Some("/wiki/Category:2001_A_page2")),
        2,
    )
    .await;
    // Second page fails once, then recovers
    Mock::given(method("GET"))
        .and(path("/wiki/Category:2001_A_page2"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_listing(&server, "Category:2001_A_page2", listing_page(&["Y"], None), 1).await;
    mount_listing(&server, "Category:2001_B", listing_page(&["W"], None), 1).await;
    for title in ["X", "Y", "W"] {
        mount_detail(&server, title, 1).await;
    }

    let config = create_test_config(&server, &dir, 2001, 2001);
    let mut first = Orchestrator::new(config.clone()).unwrap();
    let first_report = first.run().await.unwrap();

    assert_eq!(first_report.tasks_failed, 1);
    // Records staged by the failed task are discarded
    assert_eq!(titles(first.records()), vec![(2001, "b", "W")]);

    let mut retry_config = config;
    retry_config.run.failed_only = true;
    let mut retry = Orchestrator::new(retry_config).unwrap();
    let report = retry.run().await.unwrap();

    assert_eq!(report.tasks_completed, 1);
    assert_eq!(report.tasks_failed, 0);
    assert_eq!(report.tasks_skipped, 0);
    assert!(retry.failed_tasks().is_empty());
    assert_eq!(
        titles(retry.records()),
        vec![(2001, "a", "X"), (2001, "a", "Y"), (2001, "b", "W")]
    );
}

#[tokio::test]
async fn test_pause_after_two_tasks_then_resume() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    // No listing mocks: every task hits a first-page 404 and completes empty

    let mut config = create_test_config(&server, &dir, 2001, 2002);
    config.run.pause_after = 2;
    let mut first = Orchestrator::new(config.clone()).unwrap();
    let report = first.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Paused);
    assert_eq!(report.tasks_completed, 2);
    assert_eq!(first.completed_tasks().len(), 2);
    assert!(first.completed_tasks().contains("2001:a"));
    assert!(first.completed_tasks().contains("2001:b"));
    assert!(dir.path().join("records.csv").exists());

    config.run.pause_after = 0;
    config.run.resume = true;
    let mut second = Orchestrator::new(config).unwrap();
    let report = second.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.tasks_skipped, 2);
    assert_eq!(report.tasks_completed, 2);
    assert_eq!(second.completed_tasks().len(), 4);
}

#[tokio::test]
async fn test_fingerprint_mismatch_aborts_before_work() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let config = create_test_config(&server, &dir, 2001, 2001);
    let mut first = Orchestrator::new(config.clone()).unwrap();
    first.run().await.unwrap();
    let saved = fs::read_to_string(dir.path().join("checkpoint.json")).unwrap();

    let mut changed = config;
    changed.crawl.end_year = 2002;
    changed.run.resume = true;

    match Orchestrator::new(changed) {
        Err(HarvestError::Checkpoint(CheckpointError::ConfigMismatch { expected, found })) => {
            assert_eq!(expected.end_year, 2002);
            assert_eq!(found.end_year, 2001);
        }
        Err(other) => panic!("expected ConfigMismatch, got {}", other),
        Ok(_) => panic!("expected ConfigMismatch, got an orchestrator"),
    }

    assert_eq!(
        fs::read_to_string(dir.path().join("checkpoint.json")).unwrap(),
        saved
    );
}

#[tokio::test]
async fn test_cancellation_before_start_persists_and_returns_interrupted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&["X"], None)))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir, 2001, 2002);
    let mut orchestrator = Orchestrator::new(config).unwrap();
    orchestrator.cancellation_token().cancel();

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert_eq!(report.tasks_completed + report.tasks_failed, 0);

    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let state = store.read().unwrap().unwrap();
    assert!(state.completed_tasks.is_empty());
    assert!(dir.path().join("records.csv").exists());
}

#[tokio::test]
async fn test_imported_record_blocks_crawled_duplicate() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server, "Category:2001_A", listing_page(&["Roja", "Minnale"], None), 1).await;
    mount_detail(&server, "Minnale", 1).await;
    // Roja's detail page must never be fetched
    mount_detail(&server, "Roja", 0).await;

    let config = create_test_config(&server, &dir, 2001, 2001);
    let mut orchestrator = Orchestrator::new(config).unwrap();
    orchestrator.import_records(vec![Record {
        year: 2001,
        category: "a".to_string(),
        title: "ROJA".to_string(),
        detail_url: "https://curated.example.org/roja".to_string(),
        poster: "https://curated.example.org/roja.jpg".to_string(),
        description: String::new(),
        source_url: "manual".to_string(),
    }]);
    orchestrator.mark_completed("2001:b").unwrap();

    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.tasks_completed, 1);
    assert_eq!(report.tasks_skipped, 1);
    assert_eq!(
        titles(orchestrator.records()),
        vec![(2001, "a", "Minnale"), (2001, "a", "ROJA")]
    );
    let roja = &orchestrator.records()[1];
    assert_eq!(roja.source_url, "manual");
}

#[tokio::test]
async fn test_legacy_checkpoint_is_migrated_and_resumed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_listing(&server, "Category:2001_B", listing_page(&["W", "x"], None), 1).await;
    mount_detail(&server, "W", 1).await;

    let legacy = format!(
        r#"{{
            "version": 1,
            "config": {{"start_year": 2001, "end_year": 2001, "languages": ["a", "b"]}},
            "completed_tasks": ["2001:a"],
            "records": [{{
                "year": 2001, "language": "a", "title": "X",
                "movie_page_url": "{uri}/wiki/X",
                "poster_url": "https://upload.example.org/X.jpg",
                "source_url": "{uri}/wiki/Category:2001_A"
            }}],
            "poster_cache": {{"{uri}/wiki/X": "https://upload.example.org/X.jpg"}}
        }}"#,
        uri = server.uri()
    );
    fs::write(dir.path().join("checkpoint.json"), legacy).unwrap();

    let mut config = create_test_config(&server, &dir, 2001, 2001);
    config.run.resume = true;
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.tasks_skipped, 1);
    assert_eq!(report.tasks_completed, 1);
    assert_eq!(
        titles(orchestrator.records()),
        vec![(2001, "a", "X"), (2001, "b", "W")]
    );

    // The checkpoint is rewritten in the current layout
    let saved = fs::read_to_string(dir.path().join("checkpoint.json")).unwrap();
    assert!(saved.contains("\"schemaVersion\": 2"));
}

#[tokio::test]
async fn test_later_page_not_found_fails_the_task() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        "Category:2001_A",
        listing_page(&["X"], Some("/wiki/Category:2001_A_page2")),
        1,
    )
    .await;
    // Category:2001_A_page2 is not mounted, so it answers 404
    mount_detail(&server, "X", 1).await;
    mount_listing(&server, "Category:2001_B", listing_page(&["W"], None), 1).await;
    mount_detail(&server, "W", 1).await;

    let config = create_test_config(&server, &dir, 2001, 2001);
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.tasks_failed, 1);
    assert_eq!(report.tasks_completed, 1);

    let error = orchestrator.failed_tasks().get("2001:a").unwrap();
    assert!(error.contains("HTTP 404"), "unexpected error text: {}", error);
    assert!(!orchestrator.completed_tasks().contains("2001:a"));
    assert!(orchestrator.completed_tasks().contains("2001:b"));
    // X was staged from page one and discarded with the failure
    assert_eq!(titles(orchestrator.records()), vec![(2001, "b", "W")]);
}

#[tokio::test]
async fn test_pagination_cycle_fetches_each_page_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        "Category:2001_A",
        listing_page(&["X"], Some("/wiki/Category:2001_A_page2")),
        1,
    )
    .await;
    mount_listing(
        &server,
        "Category:2001_A_page2",
        listing_page(&["Y"], Some("/wiki/Category:2001_A")),
        1,
    )
    .await;
    mount_detail(&server, "X", 1).await;
    mount_detail(&server, "Y", 1).await;

    let config = create_test_config(&server, &dir, 2001, 2001);
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.tasks_failed, 0);
    assert!(orchestrator.completed_tasks().contains("2001:a"));
    assert_eq!(
        orchestrator.task_state(&Task::new(2001, "a")),
        TaskState::Completed
    );
    assert_eq!(
        titles(orchestrator.records()),
        vec![(2001, "a", "X"), (2001, "a", "Y")]
    );
}

#[tokio::test]
async fn test_pause_counts_failed_tasks() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/wiki/Category:2001_A"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    // Every other listing answers 404 and completes empty

    let mut config = create_test_config(&server, &dir, 2001, 2002);
    config.run.pause_after = 2;
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Paused);
    assert_eq!(report.tasks_failed, 1);
    assert_eq!(report.tasks_completed, 1);
    assert!(orchestrator.failed_tasks().contains_key("2001:a"));
    assert!(orchestrator.completed_tasks().contains("2001:b"));
    assert_eq!(
        orchestrator.task_state(&Task::new(2002, "a")),
        TaskState::Pending
    );

    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let state = store.read().unwrap().unwrap();
    assert!(state.failed_tasks.contains_key("2001:a"));
    assert_eq!(state.completed_tasks.len(), 1);
}

#[tokio::test]
async fn test_cancellation_during_delay_keeps_finished_task() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    // No listing mocks: each task is a first-page 404 and completes at once

    let mut config = create_test_config(&server, &dir, 2001, 2002);
    config.fetch.politeness_delay_ms = 5_000;
    let checkpoint_path = dir.path().join("checkpoint.json");
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let token = orchestrator.cancellation_token();

    let watcher = tokio::spawn(async move {
        let store = JsonCheckpointStore::new(checkpoint_path);
        loop {
            if let Ok(Some(state)) = store.read() {
                if state.completed_tasks.contains("2001:a") {
                    token.cancel();
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    });

    let started = Instant::now();
    let report = orchestrator.run().await.unwrap();
    watcher.await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Interrupted);
    assert!(
        started.elapsed() < Duration::from_secs(4),
        "run waited out the delay: {:?}",
        started.elapsed()
    );
    assert_eq!(report.tasks_completed, 1);

    let store = JsonCheckpointStore::new(dir.path().join("checkpoint.json"));
    let state = store.read().unwrap().unwrap();
    assert_eq!(
        state.completed_tasks.iter().collect::<Vec<_>>(),
        vec!["2001:a"]
    );
    for task in [Task::new(2001, "b"), Task::new(2002, "a"), Task::new(2002, "b")] {
        assert_eq!(orchestrator.task_state(&task), TaskState::Pending);
    }
}

#[tokio::test]
async fn test_legacy_checkpoint_with_repeated_languages_resumes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let legacy = r#"{
        "version": 1,
        "config": {"start_year": 2001, "end_year": 2001, "languages": ["a", "b", "a"]},
        "completed_tasks": ["2001:a", "2001:b"],
        "records": [],
        "poster_cache": {}
    }"#;
    fs::write(dir.path().join("checkpoint.json"), legacy).unwrap();

    let mut config = create_test_config(&server, &dir, 2001, 2001);
    config.crawl.categories = vec!["a".to_string(), "b".to_string(), "a".to_string()];
    config.run.resume = true;
    let mut orchestrator = Orchestrator::new(config).unwrap();
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Finished);
    assert_eq!(report.tasks_skipped, 2);
    assert_eq!(report.tasks_completed, 0);
}

