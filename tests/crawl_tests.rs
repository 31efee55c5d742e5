//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small catalogue and run the full crawl
//! cycle end-to-end against a temporary database.

use dytt_index::config::{Config, SectionConfig};
use dytt_index::crawler::{Coordinator, CrawlEvent, EventKind, EventSink, StopHandle};
use dytt_index::storage::{QueueStatus, SessionHandle, SqliteStorage, Storage};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX: &str = "/html/gndy/dyzz/index.html";
const SECOND_PAGE: &str = "/html/gndy/dyzz/list_23_2.html";
const DETAIL_1: &str = "/html/gndy/dyzz/20230401/1.html";
const DETAIL_2: &str = "/html/gndy/dyzz/20230402/2.html";
const REMOVED: &str = "/html/gndy/dyzz/20230403/3.html";
const DETAIL_4: &str = "/html/gndy/dyzz/20230404/4.html";

/// Collects events for later inspection
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<CrawlEvent>>>);

impl SharedSink {
    fn count(&self, kind: EventKind) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event == kind)
            .count()
    }
}

impl EventSink for SharedSink {
    fn emit(&mut self, event: &CrawlEvent) {
        self.0.lock().unwrap().push(event.clone());
    }
}

/// Records events and stops the crawl at the first list page
#[derive(Clone, Default)]
struct StopOnFirstPage {
    events: SharedSink,
    stop: Arc<Mutex<Option<StopHandle>>>,
}

impl EventSink for StopOnFirstPage {
    fn emit(&mut self, event: &CrawlEvent) {
        self.events.emit(event);
        if event.event == EventKind::Page {
            if let Some(stop) = self.stop.lock().unwrap().as_ref() {
                stop.stop();
            }
        }
    }
}

/// Creates a test configuration crawling nothing but the mock server
fn create_test_config(db_path: &Path, session_id: Option<&str>) -> Config {
    let mut config = Config::default();
    config.site.mirrors.clear();
    config.site.alternate_hosts.clear();
    config.fetch.retry = 0;
    config.fetch.sleep_min_ms = 0;
    config.fetch.sleep_max_ms = 0;
    config.crawl.max_pages = 10;
    config.crawl.max_items = 10;
    config.crawl.session_id = session_id.map(str::to_string);
    config.output.database_path = db_path.display().to_string();
    config
}

fn coordinator(config: Config, sink: &SharedSink) -> Coordinator {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    Coordinator::new(config, storage, Box::new(sink.clone())).unwrap()
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn detail_page(title: &str, original: &str, year: i32, hash: &str) -> String {
    format!(
        r#"<html><head><title>{year}年剧情《{title}》HD国语中字</title></head><body>
<div id="Zoom">
◎译　　名　{title}<br />
◎片　　名　{original}<br />
◎年　　代　{year}<br />
◎产　　地　中国大陆<br />
◎类　　别　剧情<br />
◎豆瓣评分　7.9/10 from 1000 users<br />
<a href="magnet:?xt=urn:btih:{hash}&dn={original}.mkv">磁力链下载</a>
</div></body></html>"#
    )
}

/// Mounts a two-page listing with three detail pages and one removed page
///
/// Listings must be fetched once, detail pages `details_expected` times each.
async fn mount_catalogue(server: &MockServer, details_expected: u64) {
    let index = format!(
        r#"<html><body><div class="co_content8"><ul>
<a href="{DETAIL_1}">流浪地球2</a>
<a href="{DETAIL_2}">满江红</a>
<a href="{REMOVED}">已删除</a>
</ul><a href="list_23_2.html">下一页</a></div></body></html>"#
    );
    let second = format!(
        r#"<html><body><div class="co_content8"><ul>
<a href="{DETAIL_4}">深海</a>
</ul><a href="index.html">上一页</a></div></body></html>"#
    );

    Mock::given(method("GET"))
        .and(path(INDEX))
        .respond_with(html(index))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(SECOND_PAGE))
        .respond_with(html(second))
        .expect(1)
        .mount(server)
        .await;

    for (route, page) in [
        (DETAIL_1, detail_page("流浪地球2", "The Wandering Earth II", 2023, "aaa")),
        (DETAIL_2, detail_page("满江红", "Full River Red", 2023, "bbb")),
        (DETAIL_4, detail_page("深海", "Deep Sea", 2023, "ddd")),
        (
            REMOVED,
            "<html><body><div id=\"Zoom\"><p>该资源已删除</p></div></body></html>".to_string(),
        ),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(page))
            .expect(details_expected)
            .mount(server)
            .await;
    }
}

fn start_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), INDEX)
}

#[tokio::test]
async fn test_full_crawl_saves_items() {
    let server = MockServer::start().await;
    mount_catalogue(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir.path().join("movies.db"), Some("full"));
    let sink = SharedSink::default();
    let mut coordinator = coordinator(config, &sink);

    let summary = coordinator.run(Some(&start_url(&server))).await.unwrap();
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.items, 3);
    assert_eq!(summary.not_detail, 1);
    assert_eq!(summary.errors, 0);

    let storage = coordinator.storage();
    assert_eq!(storage.count_total_items().unwrap(), 3);

    let url = format!("{}{}", server.uri(), DETAIL_1);
    let item = storage.get_item_by_url(&url).unwrap().unwrap();
    assert_eq!(item.title, "流浪地球2");
    assert_eq!(item.original_title.as_deref(), Some("The Wandering Earth II"));
    assert_eq!(item.year, Some(2023));
    assert_eq!(item.kind.as_deref(), Some("movie_cn"));
    assert_eq!(item.rating_source.as_deref(), Some("Douban"));
    assert_eq!(item.rating_votes, Some(1000));
    assert_eq!(storage.get_download_links(item.id).unwrap().len(), 1);

    assert_eq!(sink.count(EventKind::Item), 3);
    assert_eq!(sink.count(EventKind::DetailSaved), 3);
    assert_eq!(sink.count(EventKind::NotDetail), 1);
    assert_eq!(sink.count(EventKind::Page), 2);

    let logged: Vec<(String, u64)> = storage.count_events(Some("full")).unwrap();
    let count = |name: &str| {
        logged
            .iter()
            .find(|(event, _)| event == name)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    };
    assert_eq!(count("item"), 3);
    assert_eq!(count("not_detail"), 1);
    assert_eq!(count("site_start"), 1);
    assert_eq!(count("site_done"), 1);
}

#[tokio::test]
async fn test_repeated_crawl_is_idempotent() {
    let server = MockServer::start().await;
    mount_catalogue(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    let first = coordinator(create_test_config(&db_path, Some("nightly")), &SharedSink::default())
        .run(Some(&start_url(&server)))
        .await
        .unwrap();
    assert_eq!(first.items, 3);

    // Everything is visited in this session, so nothing is fetched again
    let mut again = coordinator(create_test_config(&db_path, Some("nightly")), &SharedSink::default());
    let second = again.run(Some(&start_url(&server))).await.unwrap();
    assert_eq!(second.pages, 0);
    assert_eq!(second.items, 0);
    assert_eq!(again.storage().count_total_items().unwrap(), 3);
}

#[tokio::test]
async fn test_new_session_upserts_same_items() {
    let server = MockServer::start().await;
    mount_listing_any(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    for session in ["first", "second"] {
        let mut crawl = coordinator(create_test_config(&db_path, Some(session)), &SharedSink::default());
        let summary = crawl.run(Some(&start_url(&server))).await.unwrap();
        assert_eq!(summary.items, 3);
        assert_eq!(crawl.storage().count_total_items().unwrap(), 3);
    }
}

/// Same catalogue without call-count expectations
async fn mount_listing_any(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(INDEX))
        .respond_with(html(format!(
            r#"<html><body><a href="{DETAIL_1}">1</a><a href="{DETAIL_2}">2</a>
<a href="{REMOVED}">3</a><a href="list_23_2.html">下一页</a></body></html>"#
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(SECOND_PAGE))
        .respond_with(html(format!(r#"<html><body><a href="{DETAIL_4}">4</a></body></html>"#)))
        .mount(server)
        .await;
    for (route, page) in [
        (DETAIL_1, detail_page("流浪地球2", "The Wandering Earth II", 2023, "aaa")),
        (DETAIL_2, detail_page("满江红", "Full River Red", 2023, "bbb")),
        (DETAIL_4, detail_page("深海", "Deep Sea", 2023, "ddd")),
        (REMOVED, "<html><body><p>该资源已删除</p></body></html>".to_string()),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(html(page))
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_interrupted_session_resumes() {
    let server = MockServer::start().await;
    mount_catalogue(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    let mut config = create_test_config(&db_path, Some("resume"));
    config.crawl.max_items = 1;
    let first = coordinator(config, &SharedSink::default())
        .run(Some(&start_url(&server)))
        .await
        .unwrap();
    assert_eq!(first.items, 1);
    assert_eq!(first.pages, 1);

    // Pending URLs come back from the session queue; the index is not refetched
    let sink = SharedSink::default();
    let mut resumed = coordinator(create_test_config(&db_path, Some("resume")), &sink);
    let second = resumed.run(Some(&start_url(&server))).await.unwrap();
    assert_eq!(second.pages, 1);
    assert_eq!(second.items, 2);
    assert_eq!(second.not_detail, 1);
    assert_eq!(resumed.storage().count_total_items().unwrap(), 3);
}

#[tokio::test]
async fn test_probe_mode_fetches_no_details() {
    let server = MockServer::start().await;
    mount_catalogue(&server, 0).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir.path().join("movies.db"), None);
    config.crawl.max_items = 0;

    let sink = SharedSink::default();
    let mut probe = coordinator(config, &sink);
    let summary = probe.run(Some(&start_url(&server))).await.unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(summary.items, 0);
    assert_eq!(probe.storage().count_total_items().unwrap(), 0);
    // Ephemeral crawls keep no event log
    assert!(probe.storage().count_events(None).unwrap().is_empty());
    assert_eq!(sink.count(EventKind::Page), 2);
}

#[tokio::test]
async fn test_page_ceiling_stops_listing() {
    let server = MockServer::start().await;
    mount_listing_any(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir.path().join("movies.db"), None);
    config.crawl.max_pages = 1;

    let summary = coordinator(config, &SharedSink::default())
        .run(Some(&start_url(&server)))
        .await
        .unwrap();
    assert_eq!(summary.pages, 1);
    assert_eq!(summary.items, 2);
    assert_eq!(summary.not_detail, 1);
}

#[tokio::test]
async fn test_item_ceiling_stops_crawl() {
    let server = MockServer::start().await;
    mount_listing_any(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir.path().join("movies.db"), None);
    config.crawl.max_items = 1;

    let summary = coordinator(config, &SharedSink::default())
        .run(Some(&start_url(&server)))
        .await
        .unwrap();
    assert_eq!(summary.items, 1);
    assert_eq!(summary.pages, 1);

    let second_page = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == SECOND_PAGE)
        .count();
    assert_eq!(second_page, 0);
}

#[tokio::test]
async fn test_failed_fetch_is_reported_and_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INDEX))
        .respond_with(html(format!(
            r#"<html><body><a href="{DETAIL_1}">1</a><a href="{DETAIL_2}">2</a></body></html>"#
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DETAIL_1))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DETAIL_2))
        .respond_with(html(detail_page("满江红", "Full River Red", 2023, "bbb")))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir.path().join("movies.db"), None);
    let sink = SharedSink::default();
    let summary = coordinator(config, &sink)
        .run(Some(&start_url(&server)))
        .await
        .unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.items, 1);
    let events = sink.0.lock().unwrap();
    let error = events
        .iter()
        .find(|e| e.event == EventKind::Error)
        .expect("an error event");
    assert_eq!(error.message.as_deref(), Some("HTTP 404"));
}

#[tokio::test]
async fn test_section_crawl_uses_section_sessions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body>首页</body></html>".to_string()))
        .mount(&server)
        .await;
    mount_listing_any(&server).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&dir.path().join("movies.db"), Some("nightly"));
    config.site.mirrors = vec![server.uri()];
    config.crawl.sections = vec![SectionConfig {
        name: "最新电影".to_string(),
        path: INDEX.to_string(),
    }];

    let sink = SharedSink::default();
    let mut crawl = coordinator(config, &sink);
    let summary = crawl.run_sections().await.unwrap();
    assert_eq!(summary.items, 3);

    assert_eq!(sink.count(EventKind::CategoryStart), 1);
    assert_eq!(sink.count(EventKind::CategoryDone), 1);
    let events = sink.0.lock().unwrap();
    assert!(events
        .iter()
        .all(|e| e.section.as_deref() == Some("最新电影")));

    let storage = crawl.storage();
    assert!(storage.get_session("nightly/最新电影").unwrap().is_some());
    assert!(storage.get_session("nightly").unwrap().is_none());
}

#[tokio::test]
async fn test_stop_mid_crawl_keeps_queue_for_resume() {
    let server = MockServer::start().await;
    mount_catalogue(&server, 1).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("movies.db");

    let sink = StopOnFirstPage::default();
    let config = create_test_config(&db_path, Some("stopped"));
    let storage = SqliteStorage::new(&db_path).unwrap();
    let mut crawl = Coordinator::new(config, storage, Box::new(sink.clone())).unwrap();
    *sink.stop.lock().unwrap() = Some(crawl.stop_handle());

    let first = crawl.run(Some(&start_url(&server))).await.unwrap();
    assert_eq!(first.pages, 1);
    assert_eq!(first.items, 0);
    assert_eq!(sink.events.count(EventKind::Page), 1);
    assert_eq!(sink.events.count(EventKind::SiteDone), 1);

    // The index finished; its three details and the next page wait in the queue
    let session = SessionHandle::Persistent("stopped".to_string());
    let storage = crawl.into_storage();
    assert_eq!(storage.count_queue(&session, QueueStatus::Done).unwrap(), 1);
    assert_eq!(storage.count_queue(&session, QueueStatus::Queued).unwrap(), 4);
    drop(storage);

    let mut resumed = coordinator(create_test_config(&db_path, Some("stopped")), &SharedSink::default());
    let second = resumed.run(Some(&start_url(&server))).await.unwrap();
    assert_eq!(second.pages, 1);
    assert_eq!(second.items, 3);
    assert_eq!(second.not_detail, 1);
    assert_eq!(resumed.storage().count_total_items().unwrap(), 3);
}

#[tokio::test]
async fn test_garbled_detail_is_redecoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(INDEX))
        .respond_with(html(format!(
            r#"<html><body><a href="{DETAIL_1}">流浪地球2</a></body></html>"#
        )))
        .mount(&server)
        .await;

    // GB18030 bytes behind a Latin-1 header decode cleanly but come out as mojibake
    let page = detail_page("流浪地球2", "The Wandering Earth II", 2023, "aaa");
    let (bytes, _, _) = encoding_rs::GB18030.encode(&page);
    Mock::given(method("GET"))
        .and(path(DETAIL_1))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(bytes.into_owned(), "text/html; charset=iso-8859-1"),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir.path().join("movies.db"), Some("garbled"));
    let sink = SharedSink::default();
    let mut crawl = coordinator(config, &sink);

    let summary = crawl.run(Some(&start_url(&server))).await.unwrap();
    assert_eq!(summary.items, 1);

    let url = format!("{}{}", server.uri(), DETAIL_1);
    let item = crawl.storage().get_item_by_url(&url).unwrap().unwrap();
    assert_eq!(item.title, "流浪地球2");
    assert_eq!(item.country.as_deref(), Some("中国大陆"));

    assert_eq!(sink.count(EventKind::Warn), 1);
    let events = sink.0.lock().unwrap();
    let warning = events
        .iter()
        .find(|e| e.event == EventKind::Warn)
        .expect("a warn event");
    assert_eq!(warning.url.as_deref(), Some(url.as_str()));
    assert_eq!(
        warning.message.as_deref(),
        Some("garbled text re-decoded as gb18030")
    );
}
