// tests/metrics_pipeline.rs
use admission_monitor::classify::{CategoryConfig, CategoryTable, ClassifierHandle};
use admission_monitor::dedup::MemorySeenStore;
use admission_monitor::ingest::providers::fixture::FixtureAdapter;
use admission_monitor::ingest::providers::rss::RssAdapter;
use admission_monitor::normalize::ContentNormalizer;
use admission_monitor::notify::{ConsoleSink, MessageFormatter, NotificationDispatcher};
use admission_monitor::pipeline::Monitor;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const FEED: &str = include_str!("fixtures/admission_feed.xml");

fn line_value(rendered: &str, series: &str) -> Option<f64> {
    rendered
        .lines()
        .find(|l| l.starts_with(series) && l[series.len()..].starts_with(' '))
        .and_then(|l| l.rsplit(' ').next())
        .and_then(|v| v.parse().ok())
}

#[test]
fn run_records_pipeline_counters() {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    let monitor = Monitor::new(
        vec![
            Box::new(RssAdapter::from_fixture_str(
                "univ",
                "https://admission.univ.example/rss",
                FEED,
            )),
            Box::new(FixtureAdapter::failing("down", "https://down.example/list")),
        ],
        ContentNormalizer::default(),
        ClassifierHandle::new(CategoryTable::new(vec![CategoryConfig::new(
            "music",
            &["음악"],
            0.1,
            1,
        )])),
        Arc::new(MemorySeenStore::new()),
        NotificationDispatcher::new(Box::new(ConsoleSink::new()), Duration::ZERO),
        MessageFormatter::new(HashMap::new()),
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    metrics::with_local_recorder(&recorder, || {
        rt.block_on(async {
            let first = monitor.run_once().await.unwrap();
            assert_eq!(first.notified, 3);
            let second = monitor.run_once().await.unwrap();
            assert_eq!(second.deduplicated, 3);
        })
    });

    let out = handle.render();
    assert_eq!(
        line_value(&out, r#"monitor_articles_fetched_total{source="univ"}"#),
        Some(6.0)
    );
    assert_eq!(line_value(&out, "monitor_notifications_sent_total"), Some(3.0));
    assert_eq!(line_value(&out, "monitor_articles_deduplicated_total"), Some(3.0));
    assert_eq!(line_value(&out, "monitor_articles_dropped_total"), Some(2.0));
    assert_eq!(
        line_value(&out, r#"monitor_source_errors_total{source="down"}"#),
        Some(2.0)
    );
    assert!(line_value(&out, "monitor_last_run_ts").is_some_and(|ts| ts > 0.0));
    assert!(line_value(&out, "monitor_notifications_failed_total").is_none());
}
