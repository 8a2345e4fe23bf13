// ==========================================
// 波动指标批量拉取集成测试
// ==========================================
// 测试目标: 有界并发、进度上报、单商品失败隔离、不可达整批回退、取消
// ==========================================


use replenish_engine::engine::{CancellationFlag, ProgressEvent, ProgressReporter};
use replenish_engine::stats::VariabilityBatchFetcher;
use replenish_engine::VelocitySnapshot;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use test_helpers::{external_metrics, snapshot, MockProvider};

fn snapshots(n: usize) -> Vec<VelocitySnapshot> {
    (0..n)
        .map(|i| snapshot(&format!("P{:03}", i), 10.0, 100.0, 50.0))
        .collect()
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressReporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// 取消后继续上报的上报者：第 n 条完成时触发取消
struct CancelAfter {
    n: usize,
    flag: CancellationFlag,
}

impl ProgressReporter for CancelAfter {
    fn report(&self, event: ProgressEvent) {
        if event.completed >= self.n {
            self.flag.cancel();
        }
    }
}

#[tokio::test]
async fn test_concurrency_never_exceeds_limit() {
    let provider = Arc::new(
        MockProvider::new(external_metrics("", 10.0, 0.3, 0.0, 1.0)).with_delay(20),
    );
    let fetcher = VariabilityBatchFetcher::new(provider.clone(), 3);

    let outcome = fetcher
        .fetch_all(&snapshots(12), &CancellationFlag::new())
        .await;

    assert_eq!(outcome.metrics.len(), 12);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 12);
    let peak = provider.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in flight = {}", peak);
    assert!(peak >= 2, "requests should overlap, peak = {}", peak);
}

#[tokio::test]
async fn test_progress_reported_per_product() {
    let provider = Arc::new(MockProvider::new(external_metrics("", 10.0, 0.3, 0.0, 1.0)));
    let reporter = Arc::new(RecordingReporter::default());
    let fetcher = VariabilityBatchFetcher::new(provider, 4).with_progress(reporter.clone());

    fetcher
        .fetch_all(&snapshots(5), &CancellationFlag::new())
        .await;

    let events = reporter.events.lock().unwrap();
    assert_eq!(events.len(), 5);
    let completed: Vec<usize> = events.iter().map(|e| e.completed).collect();
    assert_eq!(completed, vec![1, 2, 3, 4, 5]);
    assert!(events.iter().all(|e| e.total == 5));
    assert!(events.last().unwrap().is_finished());
}

#[tokio::test]
async fn test_individual_failures_are_skipped() {
    let provider = Arc::new(
        MockProvider::new(external_metrics("", 10.0, 0.3, 0.0, 1.0)).failing(&["P001", "P003"]),
    );
    let fetcher = VariabilityBatchFetcher::new(provider, 2);

    let outcome = fetcher
        .fetch_all(&snapshots(5), &CancellationFlag::new())
        .await;

    assert_eq!(outcome.metrics.len(), 3);
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.completed, 5);
    assert!(outcome.is_partial());
    assert!(!outcome.service_unreachable);
    assert!(!outcome.metrics.contains_key("P001"));
}

#[tokio::test]
async fn test_unreachable_service_falls_back_for_whole_batch() {
    let provider =
        Arc::new(MockProvider::new(external_metrics("", 10.0, 0.3, 0.0, 1.0)).unreachable());
    let fetcher = VariabilityBatchFetcher::new(provider.clone(), 2);

    let outcome = fetcher
        .fetch_all(&snapshots(4), &CancellationFlag::new())
        .await;

    assert!(outcome.service_unreachable);
    assert!(outcome.metrics.is_empty());
    assert_eq!(outcome.failures.len(), 4);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancellation_stops_remaining_requests() {
    let provider = Arc::new(MockProvider::new(external_metrics("", 10.0, 0.3, 0.0, 1.0)));
    let cancel = CancellationFlag::new();
    let reporter = Arc::new(CancelAfter {
        n: 2,
        flag: cancel.clone(),
    });
    // 并发 1 保证取消点确定
    let fetcher = VariabilityBatchFetcher::new(provider.clone(), 1).with_progress(reporter);

    let outcome = fetcher.fetch_all(&snapshots(10), &cancel).await;

    assert!(outcome.cancelled);
    assert_eq!(outcome.completed, 2);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}
