//! Queue declaration replay, server-assigned renames, and queue bindings.

use crate::common::{self, ChannelOp};
use broker_resilience_core::BrokerError;
use broker_resilience_recovery::{Binding, BindingList, QueueDeclaration, QueueDeclareOk};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn declare_ok(queue: &str) -> QueueDeclareOk {
    QueueDeclareOk {
        queue: queue.to_string(),
        message_count: 0,
        consumer_count: 0,
    }
}

#[tokio::test]
async fn server_assigned_names_propagate_to_later_bindings() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);

    let declaration = QueueDeclaration::new("", |_channel| async {
        Ok(declare_ok("amq.gen-XYZ"))
    });

    let name = resource.recover_queue("", &declaration).await.unwrap();
    assert_eq!(name, "amq.gen-XYZ");
    assert_eq!(declaration.name(), "amq.gen-XYZ");

    let bindings = BindingList::new();
    bindings.add(Binding::new("events", declaration.name(), "user.*"));
    resource.recover_queue_bindings(&bindings).await.unwrap();

    assert_eq!(
        channel.operations(),
        vec![ChannelOp::QueueBind {
            queue: "amq.gen-XYZ".into(),
            exchange: "events".into(),
            routing_key: "user.*".into(),
        }]
    );
}

#[tokio::test]
async fn stable_names_are_left_alone() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);

    let declaration = QueueDeclaration::new("jobs", |_channel| async { Ok(declare_ok("jobs")) });

    let name = resource.recover_queue("jobs", &declaration).await.unwrap();
    assert_eq!(name, "jobs");
    assert_eq!(declaration.name(), "jobs");
}

#[tokio::test]
async fn swallowed_failure_returns_the_original_name_unchanged() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);

    let declaration = QueueDeclaration::new("jobs", |_channel| async {
        Err::<QueueDeclareOk, _>(common::channel_shutdown(406))
    });

    let name = resource.recover_queue("jobs", &declaration).await.unwrap();
    assert_eq!(name, "jobs");
    assert_eq!(declaration.name(), "jobs");
}

#[tokio::test]
async fn channel_resources_escalate_queue_recovery_failures() {
    let channel = common::FakeChannel::new();
    let resource = common::channel_resource(&channel);

    let declaration = QueueDeclaration::new("jobs", |_channel| async {
        Err::<QueueDeclareOk, _>(common::channel_shutdown(406))
    });

    let result = resource.recover_queue("jobs", &declaration).await;
    assert_eq!(result.unwrap_err(), common::channel_shutdown(406));
    assert_eq!(declaration.name(), "jobs");
}

#[tokio::test]
async fn connection_closure_during_queue_recovery_escalates() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);

    let declaration = QueueDeclaration::new("jobs", |_channel| async {
        Err::<QueueDeclareOk, BrokerError>(common::connection_shutdown())
    });

    let result = resource.recover_queue("jobs", &declaration).await;
    assert_eq!(result.unwrap_err(), common::connection_shutdown());
}

#[tokio::test]
async fn failed_queue_bindings_are_skipped_not_removed() {
    let channel = common::FakeChannel::new();
    channel.fail_destination("q2", common::channel_shutdown(406));
    let resource = common::connection_resource(&channel);

    let bindings = BindingList::new();
    bindings.add(Binding::new("events", "q1", "a"));
    bindings.add(Binding::new("events", "q2", "b"));
    bindings.add(Binding::new("events", "q3", "c"));

    resource.recover_queue_bindings(&bindings).await.unwrap();

    let queues: Vec<String> = channel
        .operations()
        .into_iter()
        .map(|op| match op {
            ChannelOp::QueueBind { queue, .. } => queue,
            ChannelOp::ExchangeBind { destination, .. } => destination,
        })
        .collect();
    assert_eq!(queues, vec!["q1", "q3"]);
    assert_eq!(bindings.len(), 3);
}

#[tokio::test]
async fn recovery_is_idempotent_over_a_quiescent_topology() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);

    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let declaration = QueueDeclaration::new("jobs", move |_channel| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(declare_ok("jobs"))
        }
    });

    let bindings = BindingList::new();
    bindings.add(Binding::new("events", "jobs", "job.*"));

    resource.recover_queue("jobs", &declaration).await.unwrap();
    resource.recover_queue_bindings(&bindings).await.unwrap();
    let first_pass = channel.operations();

    resource.recover_queue("jobs", &declaration).await.unwrap();
    resource.recover_queue_bindings(&bindings).await.unwrap();
    let second_pass = channel.operations();

    assert_eq!(invocations.load(Ordering::SeqCst), 2);
    assert_eq!(declaration.name(), "jobs");
    assert_eq!(second_pass.len(), first_pass.len() * 2);
    assert_eq!(&second_pass[first_pass.len()..], first_pass.as_slice());
}
