//! Tests for client configuration and the orchestrator lifecycle

use super::*;
use crate::consent::{ConsentCategory, ConsentPreset, ConsentState, ConsentValue, RegionOptions};
use crate::core::time::MockTimeProvider;
use crate::datalayer::{registry, DataLayer, DataLayerEntry};
use crate::loader::LoadStatus;
use crate::testing::{RecordingConsumer, RecordingScriptHost};
use serde_json::json;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::time::{Duration, SystemTime};

const START_MILLIS: u64 = 1_700_000_000_000;

fn mock_clock() -> Arc<MockTimeProvider> {
    Arc::new(MockTimeProvider::at(
        SystemTime::UNIX_EPOCH + Duration::from_millis(START_MILLIS),
    ))
}

fn client_on(layer: &str, containers: impl Into<Containers>) -> (GtmClient, Arc<RecordingScriptHost>) {
    let host = Arc::new(RecordingScriptHost::new());
    let config = ClientConfig::new(containers).with_data_layer_name(layer);
    let client = GtmClient::with_time_provider(config, host.clone(), mock_clock())
        .expect("valid config");
    (client, host)
}

fn gtm_start() -> DataLayerEntry {
    json!({"gtm.start": START_MILLIS, "event": "gtm.js"})
}

mod config {
    use super::*;

    #[test]
    fn test_string_shorthand_normalizes_to_descriptor() {
        let config = ClientConfig::from_toml_str(r#"containers = "GTM-ONE""#).unwrap();
        let resolved = config.resolve().unwrap();

        assert_eq!(resolved.containers.len(), 1);
        assert_eq!(resolved.containers[0].id, "GTM-ONE");
        assert_eq!(resolved.settings.data_layer_name, "dataLayer");
        assert_eq!(
            resolved.settings.host.as_str(),
            "https://www.googletagmanager.com"
        );
    }

    #[test]
    fn test_mixed_container_list_from_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
            data_layer_name = "appLayer"
            containers = [
                "GTM-ONE",
                { id = "GTM-TWO", host = "tags.example.com", query_params = { gtm_auth = "x" } },
            ]

            [script_attributes]
            nonce = "abc"
            "#,
        )
        .unwrap();
        let resolved = config.resolve().unwrap();

        let ids: Vec<_> = resolved.containers.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["GTM-ONE", "GTM-TWO"]);
        assert_eq!(resolved.containers[1].host.as_deref(), Some("tags.example.com"));
        assert_eq!(resolved.settings.data_layer_name, "appLayer");
        assert_eq!(
            resolved.settings.script_attributes.get("nonce").map(String::as_str),
            Some("abc")
        );
    }

    #[test]
    fn test_camel_case_json_keys() {
        let config = ClientConfig::from_json_str(
            r#"{
                "containers": [{"id": "GTM-J", "queryParams": {"gtm_preview": "env-2", "gtm_debug": true}}],
                "dataLayerName": "jsonLayer",
                "scriptAttributes": {"nonce": "n0"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.data_layer_name, "jsonLayer");
        assert_eq!(config.script_attributes.len(), 1);
        let containers = config.containers.normalize();
        assert_eq!(containers[0].query_params.len(), 2);
    }

    #[test]
    fn test_unknown_option_is_a_parse_error() {
        let err = ClientConfig::from_toml_str("containers = \"GTM-A\"\nlayer = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_container_list_is_rejected() {
        let config = ClientConfig::new(Vec::<String>::new());
        assert_eq!(config.resolve().unwrap_err(), ConfigError::NoContainers);

        let host = Arc::new(RecordingScriptHost::new());
        let err = GtmClient::new(ClientConfig::from_toml_str("").unwrap(), host).unwrap_err();
        assert_eq!(err, ConfigError::NoContainers);
    }

    #[test]
    fn test_blank_container_id_is_rejected() {
        let config = ClientConfig::new(["GTM-A", "  "]);
        assert_eq!(
            config.resolve().unwrap_err(),
            ConfigError::EmptyContainerId { index: 1 }
        );
    }

    #[test]
    fn test_duplicate_container_is_rejected() {
        let config = ClientConfig::new(["GTM-A", "GTM-B", "GTM-A"]);
        assert_eq!(
            config.resolve().unwrap_err(),
            ConfigError::DuplicateContainer {
                id: "GTM-A".to_string()
            }
        );
    }

    #[test]
    fn test_blank_data_layer_name_is_rejected() {
        let config = ClientConfig::new("GTM-A").with_data_layer_name(" ");
        assert_eq!(config.resolve().unwrap_err(), ConfigError::EmptyDataLayerName);
    }

    #[test]
    fn test_invalid_hosts_are_rejected() {
        let config = ClientConfig::new("GTM-A").with_host("ftp://tags.example.com");
        assert!(matches!(config.resolve().unwrap_err(), ConfigError::Host(_)));

        let config = ClientConfig::new(crate::loader::ContainerDescriptor::new("GTM-B").with_host("ftp://x.example"));
        assert!(matches!(
            config.resolve().unwrap_err(),
            ConfigError::ContainerHost { ref container_id, .. } if container_id == "GTM-B"
        ));
    }

    #[test]
    fn test_reserved_attributes_are_dropped_with_warning() {
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&warnings);
        let config = ClientConfig::new("GTM-A")
            .with_nonce("n1")
            .with_script_attribute("src", "https://evil.example/x.js")
            .with_script_attribute("ASYNC", "false")
            .with_logger(Arc::new(move |level: log::Level, message: &str| {
                if level == log::Level::Warn {
                    sink.lock().unwrap().push(message.to_string());
                }
            }));

        let resolved = config.resolve().unwrap();

        let names: Vec<_> = resolved.settings.script_attributes.keys().cloned().collect();
        assert_eq!(names, vec!["nonce".to_string()]);
        assert_eq!(warnings.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_attribute_names_are_rejected() {
        for name in ["data-x\" onload=\"alert(1)", "a b", "x>", "", "on/load", "k=v"] {
            let config = ClientConfig::new("GTM-A").with_script_attribute(name, "v");
            assert_eq!(
                config.resolve().unwrap_err(),
                ConfigError::InvalidScriptAttribute {
                    name: name.to_string()
                }
            );
        }

        let config = ClientConfig::new("GTM-A").with_script_attribute("data-consent-mode", "v2");
        assert!(config.resolve().is_ok());
    }

    #[test]
    fn test_debug_hides_logger() {
        let config = ClientConfig::new("GTM-A").with_logger(Arc::new(|_: log::Level, _: &str| {}));
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("logger: true"));
    }
}

mod lifecycle {
    use super::*;

    #[test]
    fn test_pre_init_pushes_flush_in_call_order() {
        let (client, host) = client_on("client-fifo", "GTM-FIFO");

        for i in 0..5 {
            client.push(json!({"event": "queued", "n": i}));
        }
        assert_eq!(client.queued_len(), 5);
        assert!(registry::lookup("client-fifo").is_none());

        client.init();

        let mut expected: Vec<_> = (0..5).map(|i| json!({"event": "queued", "n": i})).collect();
        expected.push(gtm_start());
        let layer = client.data_layer().unwrap();
        assert_eq!(layer.entries(), expected);
        assert_eq!(client.queued_len(), 0);
        assert_eq!(client.phase(), ClientPhase::Ready);
        assert_eq!(host.injected_count(), 1);

        client.teardown();
    }

    #[test]
    fn test_push_after_ready_appends_directly() {
        let (client, _host) = client_on("client-direct", "GTM-DIRECT");
        client.init();

        client.push(json!({"event": "after"}));

        assert_eq!(client.queued_len(), 0);
        let entries = registry::lookup("client-direct").unwrap().entries();
        assert_eq!(entries.last(), Some(&json!({"event": "after"})));

        client.teardown();
    }

    #[test]
    fn test_redundant_init_injects_once_and_needs_balanced_teardown() {
        let (client, host) = client_on("client-reentrant", ["GTM-R1", "GTM-R2"]);

        client.init();
        client.init();
        client.init();
        assert_eq!(host.injected_count(), 2);
        assert_eq!(client.mount_count(), 3);

        client.teardown();
        client.teardown();
        assert!(client.is_initialized());
        assert!(host.removed().is_empty());
        assert!(registry::contains("client-reentrant"));

        client.teardown();
        assert_eq!(client.phase(), ClientPhase::TornDown);
        assert_eq!(client.mount_count(), 0);
        assert_eq!(host.removed().len(), 2);
        assert!(host.live_elements().is_empty());
        assert!(client.load_states().is_empty());
    }

    #[test]
    fn test_teardown_without_init_is_noop() {
        let (client, host) = client_on("client-noop", "GTM-NOOP");
        client.push(json!({"event": "kept"}));

        client.teardown();

        assert_eq!(client.phase(), ClientPhase::Uninitialized);
        assert_eq!(client.queued_len(), 1);
        assert!(host.removed().is_empty());
    }

    #[test]
    fn test_teardown_restores_pre_existing_entries() {
        registry::install(Arc::new(DataLayer::with_entries(
            "client-restore",
            vec![json!("a"), json!("b")],
        )));
        let (client, _host) = client_on("client-restore", "GTM-RESTORE");

        client.init();
        client.push(json!({"event": "during"}));
        let live = registry::lookup("client-restore").unwrap().entries();
        assert_eq!(&live[..2], &[json!("a"), json!("b")]);
        assert_eq!(live.len(), 4);

        client.teardown();

        let restored = registry::lookup("client-restore").unwrap();
        assert_eq!(restored.entries(), vec![json!("a"), json!("b")]);
        registry::remove("client-restore");
    }

    #[test]
    fn test_teardown_removes_layer_it_created() {
        let (client, _host) = client_on("client-created", "GTM-CREATED");
        client.init();
        assert!(registry::contains("client-created"));

        client.teardown();

        assert!(!registry::contains("client-created"));
        assert!(client.data_layer().is_none());
    }

    #[test]
    fn test_push_after_teardown_is_rebuffered_for_next_init() {
        let (client, host) = client_on("client-rebuffer", "GTM-AGAIN");
        client.init();
        client.teardown();

        client.push(json!({"event": "late"}));
        assert_eq!(client.queued_len(), 1);
        assert!(!registry::contains("client-rebuffer"));

        client.init();
        assert_eq!(host.injected_count(), 2);
        assert_eq!(
            client.data_layer().unwrap().entries(),
            vec![json!({"event": "late"}), gtm_start()]
        );
        client.teardown();
    }

    #[test]
    fn test_entries_pushed_during_flush_keep_fifo_order() {
        registry::install(Arc::new(DataLayer::new("client-reentrant-push")));
        let (client, _host) = client_on("client-reentrant-push", "GTM-FLUSH");
        let client = Arc::new(client);

        let slot: Arc<OnceLock<Weak<GtmClient>>> = Arc::new(OnceLock::new());
        slot.set(Arc::downgrade(&client)).unwrap();
        let consumer_slot = Arc::clone(&slot);
        registry::lookup("client-reentrant-push")
            .unwrap()
            .attach_consumer(Arc::new(move |entry: &DataLayerEntry| {
                if entry == &json!({"event": "a"}) {
                    if let Some(client) = consumer_slot.get().and_then(Weak::upgrade) {
                        client.push(json!({"event": "a-reply"}));
                    }
                }
            }));

        client.push(json!({"event": "a"}));
        client.push(json!({"event": "b"}));
        client.init();

        assert_eq!(
            client.data_layer().unwrap().entries(),
            vec![
                json!({"event": "a"}),
                json!({"event": "b"}),
                json!({"event": "a-reply"}),
                gtm_start(),
            ]
        );
        client.teardown();
    }

    #[test]
    fn test_custom_layer_name_and_attributes_reach_every_script() {
        let host = Arc::new(RecordingScriptHost::new());
        let config = ClientConfig::new(["GTM-X1", "GTM-X2"])
            .with_data_layer_name("client-attrs")
            .with_nonce("abc123");
        let client = GtmClient::new(config, host.clone()).unwrap();

        client.init();

        let injected = host.injected();
        assert_eq!(injected.len(), 2);
        for element in &injected {
            assert!(element.src.ends_with("&l=client-attrs"));
            assert_eq!(element.attributes.get("nonce").map(String::as_str), Some("abc123"));
            assert!(element.is_async);
        }
        assert_eq!(injected[0].id, "gtm-script-GTM-X1");
        client.teardown();
    }
}

mod consent {
    use super::*;

    #[test]
    fn test_consent_defaults_land_before_queued_events() {
        let (client, _host) = client_on("client-consent", "GTM-CONSENT");

        client.set_consent_defaults(&ConsentPreset::EeaDefault.state(), None);
        client.push(json!({"event": "page_view"}));
        client.init();

        let entries = client.data_layer().unwrap().entries();
        assert_eq!(
            entries[0],
            json!(["consent", "default", {
                "ad_storage": "denied",
                "analytics_storage": "denied",
                "ad_user_data": "denied",
                "ad_personalization": "denied"
            }])
        );
        assert_eq!(entries[1], json!({"event": "page_view"}));
        assert_eq!(entries[2], gtm_start());
        client.teardown();
    }

    #[test]
    fn test_updates_are_independent_partial_commands() {
        let (client, _host) = client_on("client-updates", "GTM-UPD");
        client.init();

        client.update_consent(
            &ConsentState::new().with(ConsentCategory::AnalyticsStorage, ConsentValue::Granted),
            None,
        );
        client.update_consent(
            &ConsentState::new().with(ConsentCategory::AdStorage, ConsentValue::Granted),
            None,
        );

        let entries = client.data_layer().unwrap().entries();
        let tail = &entries[entries.len() - 2..];
        assert_eq!(
            tail,
            &[
                json!(["consent", "update", {"analytics_storage": "granted"}]),
                json!(["consent", "update", {"ad_storage": "granted"}]),
            ]
        );
        client.teardown();
    }

    #[test]
    fn test_region_scoped_defaults() {
        let (client, _host) = client_on("client-region", "GTM-REGION");

        client.set_consent_defaults(
            &ConsentPreset::AllGranted.state(),
            Some(&RegionOptions::for_regions(["US-CA"]).with_wait_for_update(500)),
        );
        client.init();

        let first = &client.data_layer().unwrap().entries()[0];
        assert_eq!(first[3], json!({"region": ["US-CA"], "wait_for_update": 500}));
        client.teardown();
    }

    #[test]
    fn test_empty_consent_state_is_ignored() {
        let (client, _host) = client_on("client-empty-consent", "GTM-EMPTY");

        client.set_consent_defaults(&ConsentState::new(), None);
        client.update_consent(&ConsentState::new(), None);

        assert_eq!(client.queued_len(), 0);
    }
}

mod readiness {
    use super::*;

    #[tokio::test]
    async fn test_when_ready_reports_isolated_failure() {
        let (client, host) = client_on("client-ready", ["GTM-1", "GTM-2", "GTM-3"]);
        let client = Arc::new(client);
        client.init();

        let waiter = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.when_ready().await })
        };
        tokio::task::yield_now().await;

        assert!(host.signal_loaded("GTM-1"));
        assert!(host.signal_error("GTM-2", "network"));
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        assert!(host.signal_loaded("GTM-3"));

        let states = waiter.await.unwrap();
        let statuses: Vec<_> = states.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![LoadStatus::Loaded, LoadStatus::Error, LoadStatus::Loaded]
        );
        assert_eq!(states[1].error.as_deref(), Some("network"));
        client.teardown();
    }

    #[tokio::test]
    async fn test_when_ready_waits_for_init() {
        let host = Arc::new(RecordingScriptHost::immediate());
        let config = ClientConfig::new("GTM-WAIT").with_data_layer_name("client-wait");
        let client = Arc::new(GtmClient::new(config, host.clone()).unwrap());

        let waiter = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.when_ready().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        assert_eq!(host.injected_count(), 0);

        client.init();

        let states = waiter.await.unwrap();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].status, LoadStatus::Loaded);
        client.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_when_ready_within_expires_for_silent_container() {
        let (client, _host) = client_on("client-silent", "GTM-SILENT");
        client.init();

        let outcome = client.when_ready_within(Duration::from_secs(5)).await;

        assert!(outcome.is_none());
        assert_eq!(client.load_states()[0].status, LoadStatus::Loading);
        client.teardown();
    }

    #[tokio::test]
    async fn test_when_ready_within_returns_states() {
        let host = Arc::new(RecordingScriptHost::immediate());
        let config = ClientConfig::new("GTM-FAST").with_data_layer_name("client-fast");
        let client = GtmClient::new(config, host).unwrap();
        client.init();

        let states = client
            .when_ready_within(Duration::from_secs(1))
            .await
            .expect("immediate host settles synchronously");

        assert_eq!(states[0].status, LoadStatus::Loaded);
        client.teardown();
    }

    #[test]
    fn test_rejected_injection_is_an_error_state() {
        let (client, host) = client_on("client-rejected", ["GTM-OK", "GTM-BAD"]);
        host.reject_container("GTM-BAD");

        client.init();

        let states = client.load_states();
        assert_eq!(states[0].status, LoadStatus::Loading);
        assert_eq!(states[1].status, LoadStatus::Error);
        assert_eq!(client.phase(), ClientPhase::Ready);
        client.teardown();
    }

    #[test]
    fn test_consumer_sees_flushed_entries() {
        registry::install(Arc::new(DataLayer::new("client-consumer")));
        let consumer = Arc::new(RecordingConsumer::new());
        registry::lookup("client-consumer")
            .unwrap()
            .attach_consumer(consumer.clone());
        let (client, _host) = client_on("client-consumer", "GTM-CONSUMED");

        client.push(json!({"event": "early"}));
        client.init();
        client.push(json!({"event": "late"}));

        assert_eq!(
            consumer.entries(),
            vec![json!({"event": "early"}), gtm_start(), json!({"event": "late"})]
        );
        client.teardown();
    }
}
