//! Exchange declaration and exchange-binding replay.

use crate::common::{self, ChannelOp};
use broker_resilience_recovery::{Binding, BindingList, ExchangeDeclaration};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn counted_declaration(name: &str) -> (ExchangeDeclaration, Arc<AtomicUsize>) {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let declaration = ExchangeDeclaration::new(name, move |_channel| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });
    (declaration, invocations)
}

#[tokio::test]
async fn recover_exchange_replays_the_declaration() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);
    let (declaration, invocations) = counted_declaration("logs");

    resource.recover_exchange("logs", &declaration).await.unwrap();
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connection_resources_swallow_exchange_recovery_failures() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);
    let declaration =
        ExchangeDeclaration::new("logs", |_channel| async { Err(common::channel_shutdown(406)) });

    assert!(resource.recover_exchange("logs", &declaration).await.is_ok());
}

#[tokio::test]
async fn channel_resources_escalate_exchange_recovery_failures() {
    let channel = common::FakeChannel::new();
    let resource = common::channel_resource(&channel);
    let declaration =
        ExchangeDeclaration::new("logs", |_channel| async { Err(common::channel_shutdown(406)) });

    let result = resource.recover_exchange("logs", &declaration).await;
    assert_eq!(result.unwrap_err(), common::channel_shutdown(406));
}

#[tokio::test]
async fn connection_closure_during_exchange_recovery_escalates() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);
    let declaration =
        ExchangeDeclaration::new("logs", |_channel| async { Err(common::connection_shutdown()) });

    let result = resource.recover_exchange("logs", &declaration).await;
    assert_eq!(result.unwrap_err(), common::connection_shutdown());
}

#[tokio::test]
async fn exchange_bindings_replay_in_insertion_order() {
    let channel = common::FakeChannel::new();
    let resource = common::connection_resource(&channel);

    let bindings = BindingList::new();
    bindings.add(Binding::new("upstream", "fanout-a", "metrics.*"));
    bindings.add(Binding::new("upstream", "fanout-b", "logs.*"));
    bindings.add(Binding::new("fanout-a", "fanout-c", "#"));

    resource.recover_exchange_bindings(&bindings).await.unwrap();

    assert_eq!(
        channel.operations(),
        vec![
            ChannelOp::ExchangeBind {
                destination: "fanout-a".into(),
                source: "upstream".into(),
                routing_key: "metrics.*".into(),
            },
            ChannelOp::ExchangeBind {
                destination: "fanout-b".into(),
                source: "upstream".into(),
                routing_key: "logs.*".into(),
            },
            ChannelOp::ExchangeBind {
                destination: "fanout-c".into(),
                source: "fanout-a".into(),
                routing_key: "#".into(),
            },
        ]
    );
}

#[tokio::test]
async fn failed_bindings_are_skipped_not_removed() {
    let channel = common::FakeChannel::new();
    channel.fail_destination("fanout-b", common::channel_shutdown(406));
    let resource = common::connection_resource(&channel);

    let bindings = BindingList::new();
    bindings.add(Binding::new("upstream", "fanout-a", "a"));
    bindings.add(Binding::new("upstream", "fanout-b", "b"));
    bindings.add(Binding::new("upstream", "fanout-c", "c"));

    resource.recover_exchange_bindings(&bindings).await.unwrap();

    let destinations: Vec<String> = channel
        .operations()
        .into_iter()
        .map(|op| match op {
            ChannelOp::ExchangeBind { destination, .. } => destination,
            ChannelOp::QueueBind { queue, .. } => queue,
        })
        .collect();
    assert_eq!(destinations, vec!["fanout-a", "fanout-c"]);
    assert_eq!(bindings.len(), 3);
}

#[tokio::test]
async fn binding_recovery_stops_on_connection_closure() {
    let channel = common::FakeChannel::new();
    channel.fail_destination("fanout-b", common::connection_shutdown());
    let resource = common::connection_resource(&channel);

    let bindings = BindingList::new();
    bindings.add(Binding::new("upstream", "fanout-a", "a"));
    bindings.add(Binding::new("upstream", "fanout-b", "b"));
    bindings.add(Binding::new("upstream", "fanout-c", "c"));

    let result = resource.recover_exchange_bindings(&bindings).await;
    assert_eq!(result.unwrap_err(), common::connection_shutdown());
    assert_eq!(channel.operations().len(), 1);
}
