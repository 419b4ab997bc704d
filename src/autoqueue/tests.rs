//! Tests for the auto-queue installer

use super::*;
use crate::datalayer::{registry, DataLayer, DataLayerEntry};
use crate::testing::RecordingConsumer;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recorder() -> (Arc<Mutex<Vec<usize>>>, impl Fn(usize) + Send + Sync + 'static) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    (calls, move |count: usize| sink.lock().unwrap().push(count))
}

fn events(range: std::ops::Range<usize>) -> Vec<serde_json::Value> {
    range.map(|n| json!({"event": "early", "n": n})).collect()
}

mod manual_polling {
    use super::*;

    #[test]
    fn test_replays_buffer_once_then_bypasses() {
        let (replays, on_replay) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-replay")
                .on_replay(on_replay),
        )
        .unwrap();
        let layer = Arc::clone(handle.layer());

        for entry in events(0..5) {
            layer.append(entry);
        }
        assert_eq!(handle.buffered_len(), 5);
        assert_eq!(handle.poll_once(), AutoQueueStatus::Buffering);

        let consumer = Arc::new(RecordingConsumer::new());
        layer.attach_consumer(consumer.clone());
        assert!(consumer_detected(&layer));

        assert_eq!(handle.poll_once(), AutoQueueStatus::Replayed);
        assert_eq!(consumer.entries(), events(0..5));
        assert_eq!(handle.buffered_len(), 0);
        assert!(!layer.has_hook());

        layer.append(json!({"event": "sixth"}));
        assert_eq!(consumer.len(), 6);
        assert_eq!(consumer.entries()[5], json!({"event": "sixth"}));
        assert_eq!(handle.buffered_len(), 0);

        assert_eq!(handle.poll_once(), AutoQueueStatus::Replayed);
        assert_eq!(consumer.len(), 6);
        assert_eq!(*replays.lock().unwrap(), vec![5]);
        assert_eq!(layer.len(), 6);

        registry::remove("aq-replay");
    }

    #[test]
    fn test_append_after_attach_waits_for_backlog() {
        let (replays, on_replay) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-attach-order")
                .on_replay(on_replay),
        )
        .unwrap();
        let layer = Arc::clone(handle.layer());

        for entry in events(0..5) {
            layer.append(entry);
        }
        let consumer = Arc::new(RecordingConsumer::new());
        layer.attach_consumer(consumer.clone());
        layer.append(json!({"event": "sixth"}));

        assert_eq!(handle.poll_once(), AutoQueueStatus::Replayed);

        let mut expected = events(0..5);
        expected.push(json!({"event": "sixth"}));
        assert_eq!(consumer.entries(), expected);
        assert_eq!(*replays.lock().unwrap(), vec![5]);
        assert!(!layer.has_hook());

        registry::remove("aq-attach-order");
    }

    #[test]
    fn test_consumer_append_during_replay_is_queued_behind_backlog() {
        let handle = install(AutoQueueOptions::new().with_data_layer_name("aq-reentrant")).unwrap();
        let layer = Arc::clone(handle.layer());
        for entry in events(0..2) {
            layer.append(entry);
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let inner = Arc::clone(&layer);
        layer.attach_consumer(Arc::new(move |entry: &DataLayerEntry| {
            sink.lock().unwrap().push(entry.clone());
            if entry == &json!({"event": "early", "n": 0}) {
                inner.append(json!({"event": "reply"}));
            }
        }));

        assert_eq!(handle.poll_once(), AutoQueueStatus::Replayed);

        let mut expected = events(0..2);
        expected.push(json!({"event": "reply"}));
        assert_eq!(*seen.lock().unwrap(), expected);
        assert_eq!(layer.len(), 3);

        layer.detach_consumer();
        registry::remove("aq-reentrant");
    }

    #[test]
    fn test_overflow_keeps_oldest_and_reports_running_total() {
        let (overflows, on_overflow) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-overflow")
                .with_max_buffer_size(3)
                .on_overflow(on_overflow),
        )
        .unwrap();
        let layer = Arc::clone(handle.layer());

        for entry in events(0..5) {
            layer.append(entry);
        }

        assert_eq!(handle.buffered_len(), 3);
        assert_eq!(handle.dropped_count(), 2);
        assert_eq!(*overflows.lock().unwrap(), vec![1, 2]);
        assert_eq!(layer.len(), 5);

        let consumer = Arc::new(RecordingConsumer::new());
        layer.attach_consumer(consumer.clone());
        handle.poll_once();
        assert_eq!(consumer.entries(), events(0..3));

        registry::remove("aq-overflow");
    }

    #[test]
    fn test_existing_consumer_needs_no_guard() {
        let layer = Arc::new(DataLayer::new("aq-drained"));
        layer.attach_consumer(Arc::new(RecordingConsumer::new()));
        registry::install(Arc::clone(&layer));

        let (replays, on_replay) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-drained")
                .on_replay(on_replay),
        )
        .unwrap();

        assert_eq!(handle.status(), AutoQueueStatus::Replayed);
        assert!(!layer.has_hook());
        assert_eq!(*replays.lock().unwrap(), vec![0]);

        registry::remove("aq-drained");
    }

    #[test]
    fn test_second_install_on_same_layer_is_rejected() {
        let first = install(AutoQueueOptions::new().with_data_layer_name("aq-double")).unwrap();

        let err = install(AutoQueueOptions::new().with_data_layer_name("aq-double")).unwrap_err();
        assert_eq!(
            err,
            AutoQueueError::AlreadyInstalled {
                data_layer_name: "aq-double".to_string()
            }
        );

        first.uninstall();
        let again = install(AutoQueueOptions::new().with_data_layer_name("aq-double"));
        assert!(again.is_ok());

        registry::remove("aq-double");
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let zero_poll = AutoQueueOptions::new()
            .with_data_layer_name("aq-invalid")
            .with_poll_interval(Duration::ZERO);
        assert!(matches!(
            install(zero_poll).unwrap_err(),
            AutoQueueError::InvalidOptions { .. }
        ));

        let zero_buffer = AutoQueueOptions::new()
            .with_data_layer_name("aq-invalid")
            .with_max_buffer_size(0);
        assert!(matches!(
            install(zero_buffer).unwrap_err(),
            AutoQueueError::InvalidOptions { .. }
        ));
        assert!(!registry::contains("aq-invalid"));
    }

    #[test]
    fn test_uninstall_discards_without_replay() {
        let (replays, on_replay) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-uninstall")
                .on_replay(on_replay),
        )
        .unwrap();
        let layer = Arc::clone(handle.layer());
        layer.append(json!({"event": "kept-in-layer"}));

        assert_eq!(handle.uninstall(), 1);

        assert!(!layer.has_hook());
        assert_eq!(layer.len(), 1);
        assert!(replays.lock().unwrap().is_empty());

        registry::remove("aq-uninstall");
    }

    #[test]
    fn test_defaults() {
        let options = AutoQueueOptions::default();
        assert_eq!(options.data_layer_name, "dataLayer");
        assert_eq!(options.poll_interval, Duration::from_millis(50));
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.max_buffer_size, 1000);
        assert!(format!("{:?}", options).contains("on_replay: false"));
    }
}

mod background_polling {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_background_task_replays_when_consumer_attaches() {
        let (replays, on_replay) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-bg-replay")
                .on_replay(on_replay),
        )
        .unwrap();
        let layer = Arc::clone(handle.layer());
        for entry in events(0..5) {
            layer.append(entry);
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(handle.status(), AutoQueueStatus::Buffering);

        let consumer = Arc::new(RecordingConsumer::new());
        layer.attach_consumer(consumer.clone());

        assert_eq!(handle.settled().await, AutoQueueStatus::Replayed);
        assert_eq!(consumer.entries(), events(0..5));
        assert_eq!(*replays.lock().unwrap(), vec![5]);

        layer.append(json!({"event": "sixth"}));
        assert_eq!(consumer.len(), 6);

        registry::remove("aq-bg-replay");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_pending_and_leaves_layer_intact() {
        let (timeouts, on_timeout) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-timeout")
                .with_timeout(Duration::from_millis(300))
                .on_timeout(on_timeout),
        )
        .unwrap();
        let layer = Arc::clone(handle.layer());
        layer.append(json!({"event": "a"}));
        layer.append(json!({"event": "b"}));

        assert_eq!(handle.settled().await, AutoQueueStatus::TimedOut);

        assert_eq!(*timeouts.lock().unwrap(), vec![2]);
        assert_eq!(handle.buffered_len(), 0);
        assert!(!layer.has_hook());
        assert_eq!(layer.entries(), vec![json!({"event": "a"}), json!({"event": "b"})]);

        registry::remove("aq-timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_with_empty_buffer_is_silent() {
        let (timeouts, on_timeout) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-timeout-empty")
                .with_timeout(Duration::from_millis(100))
                .on_timeout(on_timeout),
        )
        .unwrap();

        assert_eq!(handle.settled().await, AutoQueueStatus::TimedOut);
        assert!(timeouts.lock().unwrap().is_empty());

        registry::remove("aq-timeout-empty");
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_survives_dropped_handle() {
        let (replays, on_replay) = recorder();
        let handle = install(
            AutoQueueOptions::new()
                .with_data_layer_name("aq-detached")
                .on_replay(on_replay),
        )
        .unwrap();
        let layer = Arc::clone(handle.layer());
        drop(handle);

        layer.append(json!({"event": "orphan"}));
        let consumer = Arc::new(RecordingConsumer::new());
        layer.attach_consumer(consumer.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(consumer.entries(), vec![json!({"event": "orphan"})]);
        assert_eq!(*replays.lock().unwrap(), vec![1]);

        registry::remove("aq-detached");
    }
}
