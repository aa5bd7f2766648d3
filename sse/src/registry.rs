use crate::connection::{SubscriberConnection, TopicId};
use dashmap::DashMap;
use log::*;
use std::sync::Arc;

/// Process-wide map from conversation to its live subscriber connections.
///
/// Every operation goes through the map's shard lock for the topic, so
/// register, unregister and snapshot are serialized per topic. Snapshots are
/// copies: callers iterate them without holding any lock.
pub struct TopicRegistry {
    topics: DashMap<TopicId, Vec<Arc<SubscriberConnection>>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
        }
    }

    /// Adds a connection under its own topic. Inserting the same connection
    /// twice is a no-op.
    pub fn register(&self, connection: Arc<SubscriberConnection>) {
        let mut members = self.topics.entry(connection.topic().clone()).or_default();
        if members.iter().any(|member| member.id() == connection.id()) {
            trace!(
                "Connection {} already registered for topic {}",
                connection.id().as_str(),
                connection.topic()
            );
            return;
        }
        members.push(connection);
    }

    /// Removes a connection from its topic, pruning the topic when it
    /// empties.
    pub fn unregister(&self, connection: &SubscriberConnection) {
        let topic = connection.topic();
        if let Some(mut members) = self.topics.get_mut(topic.as_str()) {
            members.retain(|member| member.id() != connection.id());
            if !members.is_empty() {
                return;
            }
        } else {
            return;
        }

        // Release the entry lock before removal; a register may have slipped
        // in between, so only drop the topic if it is still empty.
        self.topics
            .remove_if(topic.as_str(), |_, members| members.is_empty());
    }

    /// Point-in-time copy of a topic's members, in registration order.
    /// Unknown and empty topics both yield an empty list.
    pub fn snapshot(&self, topic: &str) -> Vec<Arc<SubscriberConnection>> {
        self.topics
            .get(topic)
            .map(|members| members.value().clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|members| members.len())
            .unwrap_or(0)
    }

    /// Number of topics with at least one registered connection.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Frame;
    use auth::Identity;
    use tokio::sync::mpsc;

    fn connection(topic: &str) -> (Arc<SubscriberConnection>, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(8);
        let conn = SubscriberConnection::new(
            TopicId::new(topic).unwrap(),
            Identity::new("user-1"),
            tx,
        );
        (Arc::new(conn), rx)
    }

    fn ids(members: &[Arc<SubscriberConnection>]) -> Vec<String> {
        members.iter().map(|m| m.id().as_str().to_string()).collect()
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = TopicRegistry::new();
        assert_eq!(registry.topic_count(), 0);
        assert!(registry.snapshot("conv-1").is_empty());
    }

    #[test]
    fn test_register_adds_connection_under_its_topic() {
        let registry = TopicRegistry::new();
        let (a, _rx_a) = connection("conv-1");
        let (b, _rx_b) = connection("conv-2");

        registry.register(a.clone());
        registry.register(b.clone());

        assert_eq!(ids(&registry.snapshot("conv-1")), ids(&[a]));
        assert_eq!(ids(&registry.snapshot("conv-2")), ids(&[b]));
        assert_eq!(registry.topic_count(), 2);
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = TopicRegistry::new();
        let (a, _rx) = connection("conv-1");

        registry.register(a.clone());
        registry.register(a.clone());

        assert_eq!(registry.subscriber_count("conv-1"), 1);
    }

    #[test]
    fn test_snapshot_preserves_registration_order() {
        let registry = TopicRegistry::new();
        let (a, _rx_a) = connection("conv-1");
        let (b, _rx_b) = connection("conv-1");
        let (c, _rx_c) = connection("conv-1");

        registry.register(a.clone());
        registry.register(b.clone());
        registry.register(c.clone());

        assert_eq!(ids(&registry.snapshot("conv-1")), ids(&[a, b, c]));
    }

    #[test]
    fn test_unregister_removes_only_that_connection() {
        let registry = TopicRegistry::new();
        let (a, _rx_a) = connection("conv-1");
        let (b, _rx_b) = connection("conv-1");
        registry.register(a.clone());
        registry.register(b.clone());

        registry.unregister(&a);

        assert_eq!(ids(&registry.snapshot("conv-1")), ids(&[b]));
    }

    #[test]
    fn test_unregister_last_connection_prunes_topic() {
        let registry = TopicRegistry::new();
        let (a, _rx) = connection("conv-1");
        registry.register(a.clone());

        registry.unregister(&a);

        assert_eq!(registry.topic_count(), 0);
        assert!(registry.snapshot("conv-1").is_empty());
    }

    #[test]
    fn test_unregister_unknown_connection_is_a_no_op() {
        let registry = TopicRegistry::new();
        let (a, _rx_a) = connection("conv-1");
        let (stranger, _rx_s) = connection("conv-1");
        registry.register(a.clone());

        registry.unregister(&stranger);
        let (elsewhere, _rx_e) = connection("conv-9");
        registry.unregister(&elsewhere);

        assert_eq!(registry.subscriber_count("conv-1"), 1);
        assert_eq!(registry.topic_count(), 1);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_mutation() {
        let registry = TopicRegistry::new();
        let (a, _rx_a) = connection("conv-1");
        let (b, _rx_b) = connection("conv-1");
        registry.register(a.clone());

        let snapshot = registry.snapshot("conv-1");
        registry.register(b);
        registry.unregister(&a);

        assert_eq!(ids(&snapshot), ids(&[a]));
    }

    #[test]
    fn test_concurrent_register_and_unregister_leave_consistent_state() {
        let registry = Arc::new(TopicRegistry::new());
        let mut receivers = Vec::new();
        let mut keep = Vec::new();
        let mut drop_later = Vec::new();
        for i in 0..64 {
            let (conn, rx) = connection("conv-1");
            receivers.push(rx);
            if i % 2 == 0 {
                keep.push(conn);
            } else {
                drop_later.push(conn);
            }
        }

        let threads: Vec<_> = keep
            .iter()
            .chain(drop_later.iter())
            .cloned()
            .map(|conn| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.register(conn))
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let threads: Vec<_> = drop_later
            .iter()
            .cloned()
            .map(|conn| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.unregister(&conn);
                    registry.snapshot("conv-1").len()
                })
            })
            .collect();
        for t in threads {
            assert!(t.join().unwrap() >= keep.len());
        }

        let mut remaining = ids(&registry.snapshot("conv-1"));
        let mut expected = ids(&keep);
        remaining.sort();
        expected.sort();
        assert_eq!(remaining, expected);
    }
}
