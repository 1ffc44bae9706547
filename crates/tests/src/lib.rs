//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> Registry -> MultiBroadcaster 的端到端流程

#[cfg(test)]
mod contract_tests {
    use contracts::{AggregateError, BroadcastError, DeliveryId};

    #[test]
    fn test_composite_json_snapshot() {
        let id = DeliveryId::composite([
            DeliveryId::text("1700000000000-0"),
            DeliveryId::int(1700000000),
            DeliveryId::Null,
        ]);
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            r#"["1700000000000-0",1700000000,null]"#
        );
        assert_eq!(id.to_string(), "1700000000000-0,1700000000,");
    }

    #[test]
    fn test_aggregate_display_snapshot() {
        let aggregate: AggregateError = [BroadcastError::UnknownScheme {
            scheme: "twitter".into(),
        }]
        .into_iter()
        .collect();
        let text = BroadcastError::from(aggregate).to_string();
        assert!(text.starts_with("one or more errors occurred, 1 failed:"));
        assert!(text.contains("\n\t* "));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        BroadcastError, Broadcaster, CancelToken, DeliveryId, DispatchMode, Logger, Message,
    };
    use dispatcher::{MultiBroadcaster, Registry};
    use url::Url;

    /// Target that never finishes on its own
    struct StalledBroadcaster;

    #[async_trait]
    impl Broadcaster for StalledBroadcaster {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn broadcast_message(
            &self,
            cancel: &CancelToken,
            _message: &Message,
        ) -> Result<DeliveryId, BroadcastError> {
            cancel.cancelled().await;
            Err(BroadcastError::Other("broadcast cancelled".into()))
        }

        async fn set_logger(&self, _cancel: &CancelToken, _logger: Logger) -> Result<(), BroadcastError> {
            Ok(())
        }
    }

    async fn stalled(_uri: Url) -> Result<Arc<dyn Broadcaster>, BroadcastError> {
        Ok(Arc::new(StalledBroadcaster))
    }

    /// End-to-end test: config -> Registry -> MultiBroadcaster -> targets
    #[tokio::test]
    async fn test_e2e_config_to_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!(
            r#"
broadcasters = ["null://", "log://?name=audit", "file://{}"]
mode = "concurrent"
max_concurrency = 2
"#,
            dir.path().display()
        );
        let config = ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap();

        let registry = Registry::with_defaults().unwrap();
        let multi = MultiBroadcaster::builder()
            .config(&config)
            .resolve_uris(&registry, &config.broadcasters)
            .await
            .unwrap()
            .build();
        assert_eq!(multi.target_names(), vec!["null", "audit", "file"]);

        let id = multi
            .broadcast_message(&CancelToken::new(), &Message::new("title", "hello world"))
            .await
            .unwrap();

        let children = id.children();
        assert_eq!(children.len(), 3);
        assert_eq!(children.iter().filter(|child| child.is_null()).count(), 1);

        let content = std::fs::read_to_string(dir.path().join("messages.jsonl")).unwrap();
        assert!(content.contains("hello world"));

        let snapshot = multi.metrics();
        assert_eq!(snapshot.delivered, 3);
        assert_eq!(snapshot.failed, 0);
    }

    #[tokio::test]
    async fn test_unknown_scheme_aborts_construction() {
        let registry = Registry::with_defaults().unwrap();
        let result = MultiBroadcaster::from_uris(&registry, ["null://", "twitter://"]).await;

        let Err(err) = result else {
            panic!("construction should fail");
        };
        assert!(matches!(err, BroadcastError::UnknownScheme { ref scheme } if scheme == "twitter"));
    }

    #[tokio::test]
    async fn test_construction_error_is_returned_unchanged() {
        let registry = Registry::with_defaults().unwrap();
        let result = MultiBroadcaster::from_uris(&registry, ["udp://127.0.0.1"]).await;

        assert!(matches!(result, Err(BroadcastError::Construction { .. })));
    }

    #[tokio::test]
    async fn test_failure_in_one_target_fails_the_call() {
        let registry = Registry::with_defaults().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let spool = Url::from_directory_path(dir.path()).unwrap();
        let multi = MultiBroadcaster::from_uris(&registry, ["null://", spool.as_str()])
            .await
            .unwrap();

        // Make the spool unwritable by replacing it with a file
        std::fs::remove_dir_all(dir.path()).unwrap();
        std::fs::write(dir.path(), b"not a directory").unwrap();

        let err = multi
            .broadcast_message(&CancelToken::new(), &Message::new("t", "b"))
            .await
            .unwrap_err();
        let BroadcastError::Aggregate(aggregate) = err else {
            panic!("expected aggregate, got {err:?}");
        };
        assert_eq!(aggregate.len(), 1);
        assert_eq!(aggregate.targets(), vec!["file"]);

        std::fs::remove_file(dir.path()).unwrap();
    }

    #[tokio::test]
    async fn test_timeout_cancels_stalled_target() {
        let registry = Registry::with_defaults().unwrap();
        registry.register("stalled", stalled).unwrap();

        let multi = MultiBroadcaster::builder()
            .mode(DispatchMode::Sequential)
            .resolve_uris(&registry, ["null://", "stalled://"])
            .await
            .unwrap()
            .build();

        let cancel = CancelToken::new();
        cancel.cancel_after(Duration::from_millis(50));

        let id = multi
            .broadcast_message(&cancel, &Message::new("t", "b"))
            .await
            .unwrap();
        assert_eq!(id, DeliveryId::Null);
    }
}
