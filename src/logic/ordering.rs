use crate::error::{DomainError, DomainResult};
use crate::model::{Id, OrderAssignment};
use crate::store::traits::Store;
use itertools::Itertools;

/// Assigns and repairs the 1-based display order of topics within a version
/// and resources within a topic. Reordering prefers the store's atomic
/// multi-row path and degrades to sequential per-item updates when that
/// path is unavailable; there is no optimistic-concurrency token, the last
/// writer wins.
pub struct OrderingService;

impl OrderingService {
    /// Next free position in a version: max(order_index) + 1, or 1 when empty
    pub async fn next_topic_order<S: Store>(store: &S, version_id: &Id) -> DomainResult<i32> {
        let topics = store.list_topics_for_version(version_id).await?;
        Ok(topics.iter().map(|t| t.order_index).max().unwrap_or(0) + 1)
    }

    /// Next free position in a topic: max(order_index) + 1, or 1 when empty
    pub async fn next_resource_order<S: Store>(store: &S, topic_id: &Id) -> DomainResult<i32> {
        let resources = store.list_resources_for_topic(topic_id).await?;
        Ok(resources.iter().map(|r| r.order_index).max().unwrap_or(0) + 1)
    }

    pub async fn reorder_topics<S: Store>(
        store: &S,
        version_id: &Id,
        assignments: &[OrderAssignment],
    ) -> DomainResult<()> {
        if assignments.is_empty() {
            return Ok(());
        }
        Self::validate_batch(assignments)?;

        let existing: Vec<Id> = store
            .list_topics_for_version(version_id)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        if let Some(missing) = assignments.iter().find(|a| !existing.contains(&a.id)) {
            return Err(DomainError::ConcurrentModification(format!(
                "topic '{}' is no longer part of version '{}'",
                missing.id, version_id
            )));
        }

        let ids: Vec<Id> = assignments.iter().map(|a| a.id.clone()).collect();
        let indices: Vec<i32> = assignments.iter().map(|a| a.order_index).collect();

        match store.reorder_topics_batch(version_id, &ids, &indices).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!(
                    "atomic topic reorder failed for version {}, falling back to sequential updates: {}",
                    version_id,
                    e
                );
                for assignment in assignments {
                    store
                        .set_topic_order(&assignment.id, assignment.order_index)
                        .await
                        .map_err(|e| {
                            DomainError::partial("reorder_topics", "sequential_update", e)
                        })?;
                }
                Ok(())
            }
        }
    }

    pub async fn reorder_resources<S: Store>(
        store: &S,
        topic_id: &Id,
        assignments: &[OrderAssignment],
    ) -> DomainResult<()> {
        if assignments.is_empty() {
            return Ok(());
        }
        Self::validate_batch(assignments)?;

        let existing: Vec<Id> = store
            .list_resources_for_topic(topic_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if let Some(missing) = assignments.iter().find(|a| !existing.contains(&a.id)) {
            return Err(DomainError::ConcurrentModification(format!(
                "resource '{}' is no longer part of topic '{}'",
                missing.id, topic_id
            )));
        }

        let ids: Vec<Id> = assignments.iter().map(|a| a.id.clone()).collect();
        let indices: Vec<i32> = assignments.iter().map(|a| a.order_index).collect();

        match store.reorder_resources_batch(topic_id, &ids, &indices).await {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!(
                    "atomic resource reorder failed for topic {}, falling back to sequential updates: {}",
                    topic_id,
                    e
                );
                for assignment in assignments {
                    store
                        .set_resource_order(&assignment.id, assignment.order_index)
                        .await
                        .map_err(|e| {
                            DomainError::partial("reorder_resources", "sequential_update", e)
                        })?;
                }
                Ok(())
            }
        }
    }

    /// Collapse a version's topics to a dense 1..n sequence, keeping the
    /// current (order_index, created_at) ordering. Invoked after deletions
    /// so callers never depend on gap-free input.
    pub async fn normalize_topic_order<S: Store>(store: &S, version_id: &Id) -> DomainResult<()> {
        let topics = store.list_topics_for_version(version_id).await?;
        let assignments: Vec<OrderAssignment> = topics
            .iter()
            .enumerate()
            .filter(|(i, t)| t.order_index != (*i as i32 + 1))
            .map(|(i, t)| OrderAssignment {
                id: t.id.clone(),
                order_index: i as i32 + 1,
            })
            .collect();
        Self::reorder_topics(store, version_id, &assignments).await
    }

    /// Counterpart of `normalize_topic_order` for a topic's resources
    pub async fn normalize_resource_order<S: Store>(store: &S, topic_id: &Id) -> DomainResult<()> {
        let resources = store.list_resources_for_topic(topic_id).await?;
        let assignments: Vec<OrderAssignment> = resources
            .iter()
            .enumerate()
            .filter(|(i, r)| r.order_index != (*i as i32 + 1))
            .map(|(i, r)| OrderAssignment {
                id: r.id.clone(),
                order_index: i as i32 + 1,
            })
            .collect();
        Self::reorder_resources(store, topic_id, &assignments).await
    }

    fn validate_batch(assignments: &[OrderAssignment]) -> DomainResult<()> {
        let duplicate_ids: Vec<&Id> = assignments.iter().map(|a| &a.id).duplicates().collect();
        if !duplicate_ids.is_empty() {
            return Err(DomainError::ConstraintViolation(format!(
                "reorder batch repeats item ids: {:?}",
                duplicate_ids
            )));
        }
        let duplicate_indices: Vec<i32> = assignments
            .iter()
            .map(|a| a.order_index)
            .duplicates()
            .collect();
        if !duplicate_indices.is_empty() {
            return Err(DomainError::ConstraintViolation(format!(
                "reorder batch repeats positions: {:?}",
                duplicate_indices
            )));
        }
        if let Some(bad) = assignments.iter().find(|a| a.order_index < 1) {
            return Err(DomainError::ConstraintViolation(format!(
                "order_index must be 1-based, got {} for '{}'",
                bad.order_index, bad.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CourseTopic;
    use crate::store::memory::MemoryStore;
    use crate::store::traits::TopicStore;

    async fn seed_topics(store: &MemoryStore, version_id: &str, titles: &[&str]) -> Vec<Id> {
        let mut ids = Vec::new();
        for (i, title) in titles.iter().enumerate() {
            let topic = CourseTopic::new(
                version_id.to_string(),
                title.to_string(),
                None,
                i as i32 + 1,
            );
            ids.push(topic.id.clone());
            store.upsert_topic(topic).await.unwrap();
        }
        ids
    }

    #[tokio::test]
    async fn next_order_starts_at_one() {
        let store = MemoryStore::new();
        let next = OrderingService::next_topic_order(&store, &"version-1".to_string())
            .await
            .unwrap();
        assert_eq!(next, 1);
    }

    #[tokio::test]
    async fn next_order_is_max_plus_one() {
        let store = MemoryStore::new();
        seed_topics(&store, "version-1", &["A", "B", "C"]).await;
        let next = OrderingService::next_topic_order(&store, &"version-1".to_string())
            .await
            .unwrap();
        assert_eq!(next, 4);
    }

    #[tokio::test]
    async fn reorder_applies_requested_permutation() {
        let store = MemoryStore::new();
        let ids = seed_topics(&store, "version-1", &["A", "B", "C"]).await;

        // [A,B,C] -> [C,A,B]
        let assignments = vec![
            OrderAssignment {
                id: ids[2].clone(),
                order_index: 1,
            },
            OrderAssignment {
                id: ids[0].clone(),
                order_index: 2,
            },
            OrderAssignment {
                id: ids[1].clone(),
                order_index: 3,
            },
        ];
        OrderingService::reorder_topics(&store, &"version-1".to_string(), &assignments)
            .await
            .unwrap();

        let topics = store
            .list_topics_for_version(&"version-1".to_string())
            .await
            .unwrap();
        let titles: Vec<&str> = topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        let indices: Vec<i32> = topics.iter().map(|t| t.order_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reorder_rejects_duplicate_positions() {
        let store = MemoryStore::new();
        let ids = seed_topics(&store, "version-1", &["A", "B"]).await;
        let assignments = vec![
            OrderAssignment {
                id: ids[0].clone(),
                order_index: 1,
            },
            OrderAssignment {
                id: ids[1].clone(),
                order_index: 1,
            },
        ];
        let err = OrderingService::reorder_topics(&store, &"version-1".to_string(), &assignments)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConstraintViolation(_)));
    }

    #[tokio::test]
    async fn reorder_flags_vanished_topic_as_concurrent_modification() {
        let store = MemoryStore::new();
        let ids = seed_topics(&store, "version-1", &["A"]).await;
        let assignments = vec![
            OrderAssignment {
                id: ids[0].clone(),
                order_index: 2,
            },
            OrderAssignment {
                id: "deleted-elsewhere".to_string(),
                order_index: 1,
            },
        ];
        let err = OrderingService::reorder_topics(&store, &"version-1".to_string(), &assignments)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConcurrentModification(_)));
    }

    #[tokio::test]
    async fn normalize_collapses_gaps() {
        let store = MemoryStore::new();
        let ids = seed_topics(&store, "version-1", &["A", "B", "C"]).await;
        store.delete_topic(&ids[1]).await.unwrap();

        OrderingService::normalize_topic_order(&store, &"version-1".to_string())
            .await
            .unwrap();

        let topics = store
            .list_topics_for_version(&"version-1".to_string())
            .await
            .unwrap();
        let indices: Vec<i32> = topics.iter().map(|t| t.order_index).collect();
        assert_eq!(indices, vec![1, 2]);
        let titles: Vec<&str> = topics.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
    }
}
