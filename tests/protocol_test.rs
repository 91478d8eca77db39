/*!
 * Protocol Tests
 * End-to-end sessions for streaming, request/response, and fifo handoff
 */

use handoff_ipc::ipc::{Channel, Fifo, Waitable, WireFormat};
use handoff_ipc::patterns::{
    accept_fifo, default_requests, fibonacci, offer_fifo, AddClient, AddRequest, AddResponse,
    AddServer, ClosePolicy, RecordConsumer, RecordProducer, ServeSummary, StreamConsumer,
    StreamProducer,
};
use handoff_ipc::{Deadline, SessionConfig, SessionError, Signals};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::thread;
use std::time::Duration;

fn serve_in_background(channel: Channel, config: &SessionConfig) -> thread::JoinHandle<ServeSummary> {
    let config = config.clone();
    thread::spawn(move || AddServer::new(channel, &config).serve().unwrap())
}

#[test]
fn test_scenario_a_single_requests() {
    let config = SessionConfig::fast();
    let (server_end, client_end) = Channel::create();
    let server = serve_in_background(server_end, &config);

    let client = AddClient::new(client_end, &config);
    assert_eq!(client.call(AddRequest::new(0, 1)).unwrap(), AddResponse { result: 1 });
    assert_eq!(client.call(AddRequest::new(9, 10)).unwrap(), AddResponse { result: 19 });
    drop(client);

    assert_eq!(server.join().unwrap().served, 2);
}

#[test]
fn test_scenario_b_fibonacci_through_fifo() {
    let config = SessionConfig {
        consumer_throttle: Duration::from_millis(1),
        ..SessionConfig::fast()
    };
    let (parent, child) = Channel::create();

    let producer = thread::spawn({
        let config = config.clone();
        move || {
            let fifo = accept_fifo(&child, Deadline::Infinite).unwrap();
            RecordProducer::new(fifo, fibonacci(32), &config).run().unwrap()
        }
    });

    let (mine, theirs) = Fifo::create(8, 8).unwrap();
    offer_fifo(&parent, theirs, Deadline::Infinite).unwrap();
    let received = RecordConsumer::new(mine, &config).run().unwrap();
    let summary = producer.join().unwrap();

    assert_eq!(received, fibonacci(32));
    assert_eq!(summary.written, 32);
    // Throttled consumer forces the producer into several partial writes
    assert!(summary.batches > 4);
}

#[test]
fn test_scenario_c_server_closes_with_request_pending() {
    let (server_end, client_end) = Channel::create();
    let client = thread::spawn(move || {
        AddClient::new(client_end, &SessionConfig::fast()).call(AddRequest::new(2, 2))
    });

    server_end
        .wait_one(Signals::READABLE, Deadline::after(Duration::from_secs(5)))
        .unwrap();
    drop(server_end);

    let result = client.join().unwrap();
    let err = result.unwrap_err();
    assert_eq!(err, SessionError::PeerClosed { stage: "awaiting reply" });
}

#[test]
fn test_abandon_after_client_disconnect_mid_stream() {
    let (server_end, client_end) = Channel::create();
    for request in default_requests(5) {
        client_end.write(&request.to_wire(), vec![]).unwrap();
    }
    drop(client_end);

    let summary = AddServer::new(server_end, &SessionConfig::fast()).serve().unwrap();
    assert_eq!(summary.abandoned, 5);
    assert_eq!(summary.served, 0);
}

#[test]
fn test_drain_policy_discards_replies() {
    let (server_end, client_end) = Channel::create();
    for request in default_requests(5) {
        client_end.write(&request.to_wire(), vec![]).unwrap();
    }
    drop(client_end);

    let config = SessionConfig {
        close_policy: ClosePolicy::Drain,
        ..SessionConfig::fast()
    };
    let summary = AddServer::new(server_end, &config).serve().unwrap();
    assert_eq!(summary, ServeSummary { served: 0, drained: 5, abandoned: 0 });
}

#[test]
fn test_streaming_session() {
    let config = SessionConfig {
        message_count: 3,
        message_interval: Duration::from_millis(1),
        ..SessionConfig::fast()
    };
    let (producer_end, consumer_end) = Channel::create();
    let consumer = thread::spawn({
        let config = config.clone();
        move || StreamConsumer::new(consumer_end, &config).run().unwrap()
    });

    assert_eq!(StreamProducer::new(producer_end, &config).run().unwrap(), 3);
    assert_eq!(
        consumer.join().unwrap(),
        vec!["Hello World 1 of 3!", "Hello World 2 of 3!", "Hello World 3 of 3!"]
    );
}

#[test]
fn test_wait_timeout_surfaces_as_wait_failed() {
    let config = SessionConfig {
        wait_timeout: Some(Duration::from_millis(20)),
        ..SessionConfig::fast()
    };
    let (_server_end, client_end) = Channel::create();
    // Nobody ever serves, so the reply wait times out
    let err = AddClient::new(client_end, &config)
        .call(AddRequest::new(1, 1))
        .unwrap_err();
    assert!(matches!(err, SessionError::WaitFailed { stage: "awaiting reply", .. }));
    assert_eq!(err.status(), -21);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn every_request_gets_its_sum_in_order(pairs in prop::collection::vec((any::<u32>(), any::<u32>()), 0..20)) {
        let config = SessionConfig::fast();
        let (server_end, client_end) = Channel::create();
        let server = serve_in_background(server_end, &config);

        let requests: Vec<AddRequest> = pairs.iter().map(|&(a, b)| AddRequest::new(a, b)).collect();
        let exchanges = AddClient::new(client_end, &config).run(requests.clone()).unwrap();
        let summary = server.join().unwrap();

        prop_assert_eq!(exchanges.len(), requests.len());
        prop_assert_eq!(summary.served, requests.len());
        for (exchange, request) in exchanges.iter().zip(&requests) {
            prop_assert_eq!(exchange.request, *request);
            prop_assert_eq!(exchange.response.result, request.a.wrapping_add(request.b));
        }
    }
}
