//! Tests for queue, partition, and transport basics

#[cfg(test)]
mod tests {
    use crate::core::cancel::CancelToken;
    use crate::transport::api::{InMemoryTransport, MessageId, ReceiveLoopState, TransportError};
    use crate::transport::internal::MessageQueue;
    use crate::transport::message::TransportMessage;
    use bytes::Bytes;
    use std::collections::HashSet;

    fn test_message(label: &str) -> TransportMessage {
        TransportMessage::new(
            MessageId::new(),
            Bytes::from(label.to_string()),
            "text/plain".to_string(),
        )
    }

    #[tokio::test]
    async fn test_single_partition_preserves_fifo_order() {
        let queue = MessageQueue::new(None);
        let cancel = CancelToken::new();

        for i in 0..5 {
            queue
                .enqueue(test_message(&format!("message-{i}")), &cancel)
                .await
                .unwrap();
        }
        queue.complete();

        let partition = queue.partitions(1).unwrap().remove(0);
        for i in 0..5 {
            let message = partition.next().await.expect("message should be available");
            assert_eq!(message.body().as_ref(), format!("message-{i}").as_bytes());
        }

        // Complete and empty ends the iteration
        assert!(partition.next().await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_after_complete_fails() {
        let queue = MessageQueue::new(None);
        let cancel = CancelToken::new();

        queue.enqueue(test_message("before"), &cancel).await.unwrap();
        queue.complete();

        let result = queue.enqueue(test_message("after"), &cancel).await;
        assert!(matches!(result, Err(TransportError::QueueCompleted)));

        // The message admitted before completion is still drained
        let partition = queue.partitions(1).unwrap().remove(0);
        let message = partition.next().await.unwrap();
        assert_eq!(message.body().as_ref(), b"before");
        assert!(partition.next().await.is_none());
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let queue = MessageQueue::new(None);

        assert!(!queue.is_completed());
        queue.complete();
        queue.complete();
        assert!(queue.is_completed());
    }

    #[tokio::test]
    async fn test_partition_count_must_be_at_least_one() {
        let queue = MessageQueue::new(None);

        let error = queue
            .partitions(0)
            .err()
            .expect("partition count 0 must be rejected");
        match error {
            TransportError::InvalidPartitionCount { count } => assert_eq!(count, 0),
            other => panic!("expected InvalidPartitionCount, got {other:?}"),
        }

        assert_eq!(queue.partitions(1).unwrap().len(), 1);
        assert_eq!(queue.partitions(8).unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_partitions_share_messages_without_duplication() {
        let queue = MessageQueue::new(None);
        let cancel = CancelToken::new();

        let mut sent_ids = HashSet::new();
        for i in 0..10 {
            let message = test_message(&format!("shared-{i}"));
            sent_ids.insert(message.id());
            queue.enqueue(message, &cancel).await.unwrap();
        }
        queue.complete();

        let mut partitions = queue.partitions(2).unwrap();
        let second = partitions.remove(1);
        let first = partitions.remove(0);

        let mut received_ids = HashSet::new();
        let mut first_count = 0;
        let mut second_count = 0;

        // Alternate between the two views; each message must surface once
        loop {
            match first.next().await {
                Some(message) => {
                    assert!(received_ids.insert(message.id()), "duplicate delivery");
                    first_count += 1;
                }
                None => break,
            }
            if let Some(message) = second.next().await {
                assert!(received_ids.insert(message.id()), "duplicate delivery");
                second_count += 1;
            }
        }

        assert_eq!(first_count + second_count, 10);
        assert_eq!(received_ids, sent_ids);
    }

    #[tokio::test]
    async fn test_queue_len_and_drain() {
        let queue = MessageQueue::new(None);
        let cancel = CancelToken::new();

        assert!(queue.is_empty());

        for i in 0..3 {
            queue
                .enqueue(test_message(&format!("drain-{i}")), &cancel)
                .await
                .unwrap();
        }
        assert_eq!(queue.len(), 3);

        queue.complete();
        assert_eq!(queue.drain(), 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_bounded_queue_reports_capacity() {
        let bounded = MessageQueue::new(Some(16));
        let unbounded = MessageQueue::new(None);

        assert_eq!(bounded.capacity(), Some(16));
        assert_eq!(unbounded.capacity(), None);
    }

    #[tokio::test]
    async fn test_transport_initial_state() {
        let transport = InMemoryTransport::new("loopback");

        assert_eq!(transport.input_address(), "loopback");
        assert_eq!(transport.pending_message_count(), 0);
        assert_eq!(transport.receive_state(), ReceiveLoopState::NotStarted);
        assert_eq!(transport.observer_count(), 0);
        assert!(!transport.is_disposed());
    }
}
