//! Macro-generated `ResourceStore<Widget>` contract suite.
//!
//! The `resource_store_tests!` macro validates any `StorageClient` through the
//! typed resource store: round-trips, partial updates, idempotent deletes,
//! ordered queries, filtered scans and pagination.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod common;
//!
//! use common::*;
//!
//! resource_store_tests!(in_memory());
//! ```

/// Generate a `ResourceStore<Widget>` conformance suite.
///
/// `$factory` must evaluate to something that coerces into
/// `Arc<dyn StorageClient>`. It is re-evaluated for each test, so every test
/// starts from an empty store.
#[macro_export]
macro_rules! resource_store_tests {
    ($factory:expr) => {
        mod resource_store_contract_tests {
            use super::*;
            use futures::TryStreamExt;
            use notegate::core::error::{NoteError, ValidationError};
            use notegate::core::item::{PrimaryKey, Record};
            use notegate::core::query::{Filter, KeyCondition, PageRequest, SortCondition};
            use notegate::core::store::ResourceStore;
            use serde_json::json;

            fn widgets() -> ResourceStore<Widget> {
                store($factory)
            }

            fn key(shelf: &str, id: &str) -> PrimaryKey {
                PrimaryKey::composite(shelf, id)
            }

            fn as_map(value: serde_json::Value) -> notegate::core::item::Item {
                match value {
                    serde_json::Value::Object(map) => map,
                    other => panic!("expected object, got {}", other),
                }
            }

            // ==================================================================
            // Round trip
            // ==================================================================

            #[tokio::test]
            async fn test_put_then_get_round_trip() {
                let store = widgets();
                let original = widget("s1", "w1", "bolt");

                let written = store.put(original.clone()).await.unwrap();
                assert_eq!(written.key, key("s1", "w1"));
                assert_eq!(written.table, "myapp-testing-widgets");
                assert_eq!(written.item, original);

                assert_eq!(store.get(&key("s1", "w1")).await.unwrap(), original);
            }

            #[tokio::test]
            async fn test_get_missing_is_not_found() {
                let err = widgets().get(&key("s1", "nope")).await.unwrap_err();
                assert!(matches!(err, NoteError::NotFound { .. }), "got {:?}", err);
            }

            #[tokio::test]
            async fn test_put_replaces_whole_item() {
                let store = widgets();
                store.put(widget("s1", "w1", "bolt")).await.unwrap();

                let mut replacement = widget("s1", "w1", "nut");
                replacement.tags.clear();
                store.put(replacement.clone()).await.unwrap();

                assert_eq!(store.get(&key("s1", "w1")).await.unwrap(), replacement);
            }

            #[tokio::test]
            async fn test_put_rejects_empty_sort_key() {
                let err = widgets().put(widget("s1", "", "bolt")).await.unwrap_err();
                assert!(matches!(
                    err,
                    NoteError::Validation(ValidationError::InvalidKey { .. })
                ));
            }

            #[tokio::test]
            async fn test_get_rejects_partial_key() {
                let err = widgets()
                    .get(&PrimaryKey::partition("s1"))
                    .await
                    .unwrap_err();
                assert!(matches!(err, NoteError::Validation(_)));
            }

            // ==================================================================
            // Delete
            // ==================================================================

            #[tokio::test]
            async fn test_delete_is_idempotent() {
                let store = widgets();
                store.put(widget("s1", "w1", "bolt")).await.unwrap();

                store.delete(&key("s1", "w1")).await.unwrap();
                store.delete(&key("s1", "w1")).await.unwrap();

                assert!(matches!(
                    store.get(&key("s1", "w1")).await,
                    Err(NoteError::NotFound { .. })
                ));
            }

            #[tokio::test]
            async fn test_delete_missing_on_empty_store() {
                let store = widgets();
                store.delete(&key("s1", "missing")).await.unwrap();
                assert!(store.scan_all(None).await.unwrap().is_empty());
            }

            // ==================================================================
            // Update
            // ==================================================================

            #[tokio::test]
            async fn test_update_missing_is_not_found() {
                let err = widgets()
                    .update(&key("s1", "missing"), as_map(json!({"label": "x"})))
                    .await
                    .unwrap_err();
                assert!(matches!(err, NoteError::NotFound { .. }));
            }

            #[tokio::test]
            async fn test_update_merges_top_level_fields() {
                let store = widgets();
                store.put(widget("s1", "w1", "bolt")).await.unwrap();

                let written = store
                    .update(&key("s1", "w1"), as_map(json!({"label": "nut", "count": 7})))
                    .await
                    .unwrap();
                assert_eq!(written.item.label, "nut");
                assert_eq!(written.item.count, 7);
                assert_eq!(written.item.tags, vec!["new".to_string()]);

                assert_eq!(store.get(&key("s1", "w1")).await.unwrap(), written.item);
            }

            #[tokio::test]
            async fn test_update_accepts_unchanged_key_attributes() {
                let store = widgets();
                store.put(widget("s1", "w1", "bolt")).await.unwrap();

                let written = store
                    .update(
                        &key("s1", "w1"),
                        as_map(json!({"shelf": "s1", "widgetID": "w1", "label": "nut"})),
                    )
                    .await
                    .unwrap();
                assert_eq!(written.item.label, "nut");
            }

            #[tokio::test]
            async fn test_update_rejects_key_change() {
                let store = widgets();
                store.put(widget("s1", "w1", "bolt")).await.unwrap();

                let err = store
                    .update(&key("s1", "w1"), as_map(json!({"widgetID": "w2"})))
                    .await
                    .unwrap_err();
                assert!(matches!(err, NoteError::Validation(_)));
                assert_eq!(store.get(&key("s1", "w1")).await.unwrap().label, "bolt");
            }

            #[tokio::test]
            async fn test_update_with_skips_null_fields() {
                #[derive(serde::Serialize)]
                struct LabelPatch {
                    label: Option<String>,
                    count: Option<i64>,
                }

                let store = widgets();
                store.put(widget("s1", "w1", "bolt")).await.unwrap();

                let patch = LabelPatch {
                    label: None,
                    count: Some(3),
                };
                let written = store.update_with(&key("s1", "w1"), &patch).await.unwrap();
                assert_eq!(written.item.label, "bolt");
                assert_eq!(written.item.count, 3);
            }

            #[tokio::test]
            async fn test_rejected_update_leaves_record_intact() {
                let store = widgets();
                let original = widget("s1", "w1", "bolt");
                store.put(original.clone()).await.unwrap();

                let err = store
                    .update(
                        &key("s1", "w1"),
                        as_map(json!({"label": "nut", "count": "not-a-number"})),
                    )
                    .await
                    .unwrap_err();
                assert!(matches!(err, NoteError::Validation(_)), "got {:?}", err);

                assert_eq!(store.get(&key("s1", "w1")).await.unwrap(), original);
            }

            // ==================================================================
            // Query
            // ==================================================================

            async fn shelf_of_five(store: &ResourceStore<Widget>) {
                for id in ["w3", "w1", "w5", "w2", "w4"] {
                    store.put(widget("s1", id, id)).await.unwrap();
                }
                store.put(widget("s2", "w9", "other")).await.unwrap();
            }

            fn ids(widgets: &[Widget]) -> Vec<&str> {
                widgets.iter().map(|w| w.widget_id.as_str()).collect()
            }

            #[tokio::test]
            async fn test_query_orders_by_sort_key() {
                let store = widgets();
                shelf_of_five(&store).await;

                let forward = store.query_all(KeyCondition::partition("s1")).await.unwrap();
                assert_eq!(ids(&forward), vec!["w1", "w2", "w3", "w4", "w5"]);

                let backward = store
                    .query_all(KeyCondition::partition("s1").reverse())
                    .await
                    .unwrap();
                assert_eq!(ids(&backward), vec!["w5", "w4", "w3", "w2", "w1"]);
            }

            #[tokio::test]
            async fn test_query_sort_conditions() {
                let store = widgets();
                shelf_of_five(&store).await;

                let between = store
                    .query_all(
                        KeyCondition::partition("s1")
                            .with_sort(SortCondition::Between("w2".into(), "w4".into())),
                    )
                    .await
                    .unwrap();
                assert_eq!(ids(&between), vec!["w2", "w3", "w4"]);

                let greater = store
                    .query_all(
                        KeyCondition::partition("s1").with_sort(SortCondition::Gt("w3".into())),
                    )
                    .await
                    .unwrap();
                assert_eq!(ids(&greater), vec!["w4", "w5"]);

                let prefixed = store
                    .query_all(
                        KeyCondition::partition("s1")
                            .with_sort(SortCondition::BeginsWith("w".into())),
                    )
                    .await
                    .unwrap();
                assert_eq!(prefixed.len(), 5);
            }

            #[tokio::test]
            async fn test_query_page_resumes_from_token() {
                let store = widgets();
                shelf_of_five(&store).await;
                let condition = KeyCondition::partition("s1");

                let first = store
                    .query_page(&condition, PageRequest::first().with_limit(2))
                    .await
                    .unwrap();
                assert_eq!(ids(&first.items), vec!["w1", "w2"]);
                assert!(!first.is_last());

                let second = store
                    .query_page(
                        &condition,
                        PageRequest::resume(first.continuation.clone()).with_limit(2),
                    )
                    .await
                    .unwrap();
                assert_eq!(ids(&second.items), vec!["w3", "w4"]);

                let rest = store
                    .query_page(&condition, PageRequest::resume(second.continuation))
                    .await
                    .unwrap();
                assert_eq!(ids(&rest.items), vec!["w5"]);
                assert!(rest.is_last());
            }

            #[tokio::test]
            async fn test_query_stream_is_lazy() {
                let store = widgets();
                shelf_of_five(&store).await;

                let mut stream = store.query(KeyCondition::partition("s1"));
                let first = stream.try_next().await.unwrap().unwrap();
                assert_eq!(first.widget_id, "w1");
            }

            #[tokio::test]
            async fn test_query_empty_partition() {
                let store = widgets();
                shelf_of_five(&store).await;
                assert!(store
                    .query_all(KeyCondition::partition("empty"))
                    .await
                    .unwrap()
                    .is_empty());
            }

            // ==================================================================
            // Scan
            // ==================================================================

            #[tokio::test]
            async fn test_scan_returns_every_item() {
                let store = widgets();
                shelf_of_five(&store).await;
                assert_eq!(store.scan_all(None).await.unwrap().len(), 6);
                assert_eq!(store.scan_all(Some(Filter::new())).await.unwrap().len(), 6);
            }

            #[tokio::test]
            async fn test_scan_with_filter() {
                let store = widgets();
                shelf_of_five(&store).await;

                let found = store
                    .scan_all(Some(Filter::new().eq("label", "w3")))
                    .await
                    .unwrap();
                assert_eq!(ids(&found), vec!["w3"]);

                let none = store
                    .scan_all(Some(Filter::new().eq("label", "missing")))
                    .await
                    .unwrap();
                assert!(none.is_empty());
            }

            #[tokio::test]
            async fn test_scan_pages_with_limit() {
                let store = widgets();
                shelf_of_five(&store).await;

                let mut seen = Vec::new();
                let mut page = PageRequest::first().with_limit(4);
                loop {
                    let result = store.scan_page(None, page.clone()).await.unwrap();
                    assert!(result.items.len() <= 4);
                    seen.extend(result.items.into_iter().map(|w| w.primary_key()));
                    match result.continuation {
                        Some(token) => page = PageRequest::resume(Some(token)).with_limit(4),
                        None => break,
                    }
                }
                seen.sort();
                seen.dedup();
                assert_eq!(seen.len(), 6);
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_puts() {
                let store = widgets();
                let handles: Vec<_> = (0..10)
                    .map(|i| {
                        let store = store.clone();
                        tokio::spawn(async move {
                            store
                                .put(widget("s1", &format!("w{:02}", i), "bolt"))
                                .await
                                .unwrap();
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.await.unwrap();
                }

                let all = store.query_all(KeyCondition::partition("s1")).await.unwrap();
                assert_eq!(all.len(), 10);
            }
        }
    };
}
