//! End-to-end runs of the coordinator with mock outputs.

use fanout::{
    app::Coordinator, config::Config, Category, DeliveryChannel, DispatchError, Recipient,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::mock_output::{ChannelOutput, CountingOutput, FailingOutput, RecordingOutput};
use helpers::recipients;

const RUN_TIMEOUT: Duration = Duration::from_secs(10);

fn coordinator_with(output: Arc<dyn fanout::Output>, workers: usize) -> Coordinator {
    Coordinator::builder()
        .worker_count(workers)
        .delivery_delay(Duration::ZERO)
        .output_override(output)
        .build()
}

#[tokio::test]
async fn test_three_recipients_two_workers_emit_three_lines() {
    let output = Arc::new(RecordingOutput::new());
    let coordinator = coordinator_with(output.clone(), 2);
    let batch = recipients(&[
        (1, "A", Category::DeliveryAgent),
        (2, "B", Category::Staff),
        (3, "C", Category::DeliveryAgent),
    ]);

    let report = timeout(RUN_TIMEOUT, coordinator.run(batch, "Your order is on the way!"))
        .await
        .expect("run should terminate")
        .unwrap();

    assert_eq!(
        output.lines(),
        vec![
            "Sending notification to User 1 - Delivery Agent: Your order is on the way!",
            "Sending notification to User 2 - Staff: Your order is on the way!",
            "Sending notification to User 3 - Delivery Agent: Your order is on the way!",
        ]
    );
    assert_eq!(report.total_delivered(), 3);
    assert_eq!(report.delivered(DeliveryChannel::Sms), 2);
    assert_eq!(report.delivered(DeliveryChannel::Email), 1);
    assert_eq!(report.delivered(DeliveryChannel::Push), 0);
    assert_eq!(report.total_failed(), 0);
}

#[tokio::test]
async fn test_every_notification_is_consumed_exactly_once() {
    let output = Arc::new(RecordingOutput::new());
    let coordinator = Coordinator::builder()
        .worker_count(3)
        .queue_capacity(Some(2))
        .delivery_delay(Duration::from_millis(1))
        .output_override(output.clone())
        .build();
    let batch: Vec<_> = (0..90u64)
        .map(|id| Recipient::new(id, format!("user-{id}"), Category::ALL[(id % 3) as usize]))
        .collect();

    let report = timeout(RUN_TIMEOUT, coordinator.run(batch, "bulk"))
        .await
        .expect("run should terminate")
        .unwrap();

    let mut per_id: HashMap<u64, usize> = HashMap::new();
    for notification in output.notifications() {
        *per_id.entry(notification.recipient_id).or_default() += 1;
    }
    assert_eq!(per_id.len(), 90);
    assert!(per_id.values().all(|&count| count == 1));
    assert_eq!(report.dispatch.total_enqueued(), 90);
    assert_eq!(report.total_delivered(), 90);
    for channel in DeliveryChannel::ALL {
        assert_eq!(report.delivered(channel), 30);
    }
}

#[tokio::test]
async fn test_channel_without_recipients_does_not_block_shutdown() {
    let output = Arc::new(CountingOutput::new());
    let coordinator = coordinator_with(output.clone(), 3);
    // Nobody is routed to Push, yet its workers must still exit.
    let batch = recipients(&[(1, "A", Category::DeliveryAgent), (2, "B", Category::Staff)]);

    let report = timeout(RUN_TIMEOUT, coordinator.run(batch, "hi"))
        .await
        .expect("an empty channel must not deadlock the coordinator")
        .unwrap();

    assert_eq!(output.count(), 2);
    assert_eq!(report.delivered(DeliveryChannel::Push), 0);
}

#[tokio::test]
async fn test_zero_recipients_terminates() {
    let output = Arc::new(CountingOutput::new());
    let coordinator = coordinator_with(output.clone(), 2);

    let report = timeout(RUN_TIMEOUT, coordinator.run(Vec::new(), "nobody"))
        .await
        .expect("run should terminate")
        .unwrap();

    assert_eq!(report.total_delivered(), 0);
    assert_eq!(output.count(), 0);
}

#[tokio::test]
async fn test_empty_message_is_delivered_verbatim() {
    let (tx, mut rx) = mpsc::channel(8);
    let coordinator = coordinator_with(Arc::new(ChannelOutput::new(tx)), 1);

    coordinator
        .run(recipients(&[(5, "E", Category::EndUser)]), "")
        .await
        .unwrap();

    let notification = rx.recv().await.expect("one notification");
    assert_eq!(notification.recipient_id, 5);
    assert_eq!(&*notification.message, "");
    assert_eq!(notification.channel, DeliveryChannel::Push);
}

#[tokio::test]
async fn test_repeated_runs_are_independent() {
    let output = Arc::new(RecordingOutput::new());
    let coordinator = coordinator_with(output.clone(), 2);
    let batch = recipients(&[(1, "A", Category::Staff), (2, "B", Category::EndUser)]);

    let first = coordinator.run(batch.clone(), "first").await.unwrap();
    let second = coordinator.run(batch, "second").await.unwrap();

    assert_eq!(first.total_delivered(), 2);
    assert_eq!(second.total_delivered(), 2);
    // Reports only carry counts, so identical batches give identical reports.
    assert_eq!(first, second);

    let messages: Vec<String> = output
        .notifications()
        .iter()
        .map(|n| format!("{}:{}", n.recipient_id, n.message))
        .collect();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages.iter().filter(|m| m.ends_with(":first")).count(), 2);
    assert_eq!(messages.iter().filter(|m| m.ends_with(":second")).count(), 2);
}

#[tokio::test]
async fn test_failed_deliveries_are_reported_without_retry() {
    let output = Arc::new(FailingOutput::default());
    let coordinator = coordinator_with(output.clone(), 2);
    let batch = recipients(&[(1, "A", Category::Staff), (2, "B", Category::Staff)]);

    let report = coordinator.run(batch, "x").await.unwrap();

    assert_eq!(report.total_delivered(), 0);
    assert_eq!(report.failed(DeliveryChannel::Email), 2);
    assert_eq!(output.attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_per_channel_outputs() {
    let sms = Arc::new(CountingOutput::new());
    let rest = Arc::new(CountingOutput::new());
    let coordinator = Coordinator::builder()
        .worker_count(1)
        .delivery_delay(Duration::ZERO)
        .output_override(rest.clone())
        .channel_output(DeliveryChannel::Sms, sms.clone())
        .build();
    let batch = recipients(&[
        (1, "A", Category::DeliveryAgent),
        (2, "B", Category::Staff),
        (3, "C", Category::EndUser),
    ]);

    coordinator.run(batch, "x").await.unwrap();

    assert_eq!(sms.count(), 1);
    assert_eq!(rest.count(), 2);
}

#[test]
fn test_unknown_category_is_rejected_before_dispatch() {
    // Unlike a silent drop, registration fails and nothing is delivered.
    let mut config = Config::default();
    config.recipients[2].category = "Courier Pigeon".to_string();

    let err = config.recipients().unwrap_err();
    assert!(matches!(err, DispatchError::UnknownCategory(ref raw) if raw == "Courier Pigeon"));
}

#[tokio::test]
async fn test_duplicate_ids_fail_the_run() {
    let output = Arc::new(CountingOutput::new());
    let coordinator = coordinator_with(output.clone(), 1);
    let batch = recipients(&[(1, "A", Category::Staff), (1, "B", Category::EndUser)]);

    let err = timeout(RUN_TIMEOUT, coordinator.run(batch, "x"))
        .await
        .expect("workers must still be joined")
        .unwrap_err();

    assert!(matches!(err, DispatchError::DuplicateRecipient(1)));
    assert_eq!(output.count(), 0);
}

#[tokio::test]
async fn test_zero_workers_is_rejected() {
    let coordinator = coordinator_with(Arc::new(CountingOutput::new()), 0);
    let err = coordinator
        .run(recipients(&[(1, "A", Category::Staff)]), "x")
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidWorkerCount));
}

#[tokio::test]
async fn test_routing_override_changes_destination() {
    let email = Arc::new(CountingOutput::new());
    let rest = Arc::new(CountingOutput::new());
    let mut config = Config::default();
    config.delivery_delay_ms = 0;
    config
        .routing
        .insert("end user".to_string(), "email".to_string());

    let coordinator = Coordinator::from_config(&config)
        .unwrap()
        .output_override(rest.clone())
        .channel_output(DeliveryChannel::Email, email.clone())
        .build();
    let report = coordinator
        .run(config.recipients().unwrap(), config.message.as_str())
        .await
        .unwrap();

    // Staff and End User both go to Email now.
    assert_eq!(email.count(), 2);
    assert_eq!(rest.count(), 1);
    assert_eq!(report.delivered(DeliveryChannel::Push), 0);
}
