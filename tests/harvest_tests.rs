//! Integration tests for OAI-PMH harvests
//!
//! These tests use wiremock to stand up mock OAI-PMH repositories and run
//! whole harvests against them through the reqwest fetcher.

use oai_seed::config::{
    load_config, Config, OutputConfig, ProfileConfig, ProfileKind, RetryConfig, SessionConfig,
    UserAgentConfig,
};
use oai_seed::harvest::OaiCrawlSeed;
use oai_seed::output::{load_manifest, MANIFEST_CONTENT_TYPE};
use oai_seed::protocol::HttpFetcher;
use oai_seed::storage::{ContentStore, SqliteContentStore};
use oai_seed::{ConfigError, ProtocolError, SeedError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration harvesting `base_url`
fn create_test_config(base_url: &str, kind: ProfileKind, year: Option<&str>) -> Config {
    Config {
        session: SessionConfig {
            base_url: base_url.to_string(),
            oai_request_url: None,
            metadata_prefix: "oai_dc".to_string(),
            set_spec: None,
            year: year.map(str::to_string),
            from: None,
            until: None,
            permission_urls: vec![],
            fail_on_empty: true,
        },
        profile: ProfileConfig {
            kind,
            ..ProfileConfig::default()
        },
        retry: RetryConfig {
            network_retries: 2,
            same_url_retries: 2,
            wait_ms: 0,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: ":memory:".to_string(),
        },
    }
}

fn create_seed(config: &Config) -> OaiCrawlSeed<SqliteContentStore> {
    let fetcher = HttpFetcher::from_config(&config.user_agent).expect("Failed to build client");
    let store = SqliteContentStore::open_in_memory().expect("Failed to open store");
    OaiCrawlSeed::from_config(config, Arc::new(fetcher), store).expect("Invalid config")
}

fn dc_record(id: &str, date: &str, identifier: &str) -> String {
    format!(
        r#"<record>
  <header><identifier>oai:repository:{id}</identifier><datestamp>2020-01-01</datestamp></header>
  <metadata>
    <oai_dc:dc xmlns:oai_dc="http://www.openarchives.org/OAI/2.0/oai_dc/" xmlns:dc="http://purl.org/dc/elements/1.1/">
      <dc:title>Record {id}</dc:title>
      <dc:date>{date}</dc:date>
      <dc:identifier>{identifier}</dc:identifier>
    </oai_dc:dc>
  </metadata>
</record>"#
    )
}

fn list_records(records: &[String], token: Option<&str>) -> String {
    let token = match token {
        Some(t) => format!("<resumptionToken>{}</resumptionToken>", t),
        None => String::new(),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">
  <responseDate>2024-01-01T00:00:00Z</responseDate>
  <ListRecords>{}{}</ListRecords>
</OAI-PMH>"#,
        records.concat(),
        token
    )
}

fn oai_error(code: &str) -> String {
    format!(
        r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/"><error code="{}">rejected</error></OAI-PMH>"#,
        code
    )
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/xml")
}

#[tokio::test]
async fn test_harvest_keeps_target_year() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .and(query_param("verb", "ListRecords"))
        .and(query_param("metadataPrefix", "oai_dc"))
        .respond_with(xml(list_records(
            &[
                dc_record("1", "2011-05-05", "http://hdl.handle.net/123456789/1"),
                dc_record("2", "2009-01-01", "http://hdl.handle.net/123456789/2"),
            ],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), ProfileKind::Dspace, Some("2011"));
    let mut seed = create_seed(&config);
    let outcome = seed.harvest().await.expect("Harvest failed");

    let expected = format!("{}/handle/123456789/1", mock_server.uri());
    assert_eq!(outcome.start_urls, vec![expected.clone()]);
    assert_eq!(outcome.report.records_seen, 2);
    assert_eq!(outcome.report.records_matched, 1);
    assert!(!outcome.report.degraded);

    // The manifest is stored under the first-page request URL
    let origin = seed.session().origin_url();
    assert_eq!(outcome.report.manifest_key.as_deref(), Some(origin.as_str()));
    let stored = seed.store().load(&origin).unwrap().expect("Manifest not stored");
    assert_eq!(stored.content_type(), Some(MANIFEST_CONTENT_TYPE));
    assert_eq!(
        String::from_utf8(stored.body).unwrap(),
        format!("<html>\n<a href=\"{0}\">{0}</a><br/>\n</html>", expected)
    );
}

#[tokio::test]
async fn test_harvest_follows_resumption_tokens() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    // Registered first so it wins over the first-page mock
    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .and(query_param("resumptionToken", "page-2"))
        .respond_with(xml(list_records(
            &[dc_record("3", "2011", &format!("{}/items/a", base))],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .and(query_param("verb", "ListRecords"))
        .respond_with(xml(list_records(
            &[
                dc_record("1", "2011", &format!("{}/items/c", base)),
                dc_record("2", "2011", &format!("{}/items/c", base)),
            ],
            Some("page-2"),
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base, ProfileKind::Generic, None);
    let mut seed = create_seed(&config);
    let outcome = seed.harvest().await.expect("Harvest failed");

    assert_eq!(
        outcome.start_urls,
        vec![format!("{}/items/a", base), format!("{}/items/c", base)]
    );
    assert_eq!(outcome.report.pages_fetched, 2);
    assert_eq!(outcome.report.duplicates, 1);
}

#[tokio::test]
async fn test_empty_harvest_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(xml(oai_error("noRecordsMatch")))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), ProfileKind::Generic, Some("2011"));
    let mut seed = create_seed(&config);
    let err = seed.harvest().await.unwrap_err();

    assert!(matches!(err, SeedError::NoStartUrls { .. }));
    assert!(seed.store().keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_harvest_tolerated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(xml(list_records(
            &[dc_record("1", "2009", "http://hdl.handle.net/123456789/1")],
            None,
        )))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), ProfileKind::Dspace, Some("2011"));
    config.session.fail_on_empty = false;
    let mut seed = create_seed(&config);
    let outcome = seed.harvest().await.expect("Harvest failed");

    assert!(outcome.start_urls.is_empty());
    let origin = seed.session().origin_url();
    assert_eq!(load_manifest(seed.store(), &origin).unwrap(), Some(vec![]));
}

#[tokio::test]
async fn test_bad_argument_is_config_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(xml(oai_error("cannotDisseminateFormat")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), ProfileKind::Generic, None);
    let mut seed = create_seed(&config);
    let err = seed.harvest().await.unwrap_err();

    assert!(err.is_config(), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(xml(list_records(
            &[dc_record("1", "2011", &format!("{}/items/1", base))],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base, ProfileKind::Generic, Some("2011"));
    let mut seed = create_seed(&config);
    let outcome = seed.harvest().await.expect("Harvest failed");

    assert_eq!(outcome.start_urls, vec![format!("{}/items/1", base)]);
}

#[tokio::test]
async fn test_retries_exhausted() {
    let mock_server = MockServer::start().await;

    // One attempt plus two retries
    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), ProfileKind::Generic, None);
    let mut seed = create_seed(&config);
    let err = seed.harvest().await.unwrap_err();

    assert!(matches!(
        err,
        SeedError::Protocol(ProtocolError::RetriesExhausted { retries: 2, .. })
    ));
}

#[tokio::test]
async fn test_truncated_body_is_fatal_read_error() {
    // Promises 1000 bytes, sends 5, hangs up
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/xml\r\nContent-Length: 1000\r\n\r\n<OAI-",
                )
                .await;
            let _ = socket.shutdown().await;
        }
    });

    let config = create_test_config(&format!("http://{}/", addr), ProfileKind::Generic, None);
    let mut seed = create_seed(&config);
    let err = seed.harvest().await.unwrap_err();

    assert!(
        matches!(err, SeedError::Protocol(ProtocolError::Read { .. })),
        "unexpected {:?}",
        err
    );
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    assert!(seed.store().keys().unwrap().is_empty());
}

#[test]
fn test_oversized_retry_wait_is_rejected() {
    let mut config = create_test_config("https://repository.example.edu/", ProfileKind::Generic, None);
    config.retry.wait_ms = u64::MAX;

    let fetcher = HttpFetcher::from_config(&config.user_agent).expect("Failed to build client");
    let store = SqliteContentStore::open_in_memory().expect("Failed to open store");
    let result = OaiCrawlSeed::from_config(&config, Arc::new(fetcher), store);

    assert!(matches!(result, Err(ConfigError::Validation(_))));
}

#[tokio::test]
async fn test_forbidden_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), ProfileKind::Generic, None);
    let mut seed = create_seed(&config);
    let err = seed.harvest().await.unwrap_err();

    assert!(matches!(err, SeedError::Protocol(ProtocolError::Fetch { .. })));
}

#[tokio::test]
async fn test_proxy_interference_degrades_to_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(
            ResponseTemplate::new(407)
                .set_body_string("Proxy Authentication Required")
                .insert_header("content-type", "text/plain"),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), ProfileKind::Ojs, Some("2011"));
    let mut seed = create_seed(&config);
    let outcome = seed.harvest().await.expect("Degraded harvest should succeed");

    assert!(outcome.report.degraded);
    assert_eq!(
        outcome.start_urls,
        vec![format!("{}/gateway/lockss?year=2011", mock_server.uri())]
    );
}

#[tokio::test]
async fn test_crawl_rule_rejects_foreign_urls() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/oai/request"))
        .respond_with(xml(list_records(
            &[
                dc_record("1", "2011", &format!("{}/items/1", base)),
                dc_record("2", "2011", "https://mirror.example.org/items/2"),
            ],
            None,
        )))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base, ProfileKind::Generic, None);
    config.profile.crawl_rule = Some(format!("^{}/", regex::escape(&base)));
    let mut seed = create_seed(&config);
    let outcome = seed.harvest().await.expect("Harvest failed");

    assert_eq!(outcome.start_urls, vec![format!("{}/items/1", base)]);
    assert_eq!(outcome.report.outside_crawl_rules, 1);
}

#[tokio::test]
async fn test_harvest_from_config_file() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/provider"))
        .and(query_param("set", "col_123456789_12"))
        .respond_with(xml(list_records(
            &[dc_record("1", "2011-05-05", "http://hdl.handle.net/123456789/1")],
            None,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("harvest.toml");
    let db_path = dir.path().join("seed.db");
    std::fs::write(
        &config_path,
        format!(
            r#"
[session]
base-url = "{base}"
oai-request-url = "{base}/provider"
set-spec = "col_123456789_12"
year = "2011"

[profile]
kind = "dspace"

[retry]
wait-ms = 0

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
database-path = "{db}"
"#,
            base = base,
            db = db_path.display()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).expect("Failed to load config");
    let fetcher = HttpFetcher::from_config(&config.user_agent).unwrap();
    let store = SqliteContentStore::new(&db_path).unwrap();
    let mut seed = OaiCrawlSeed::from_config(&config, Arc::new(fetcher), store).unwrap();

    let urls = seed.start_urls().await.expect("Harvest failed");
    assert_eq!(urls, vec![format!("{}/handle/123456789/1", base)]);
    assert_eq!(seed.permission_urls(), &[format!("{}/", base)]);
    assert!(seed.redirect_normalizer().is_some());
}
