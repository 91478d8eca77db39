/*!
 * Channel Tests
 * Tests for message channels: signals, ordering, handle transfer, closure
 */

use handoff_ipc::core::guard::Guard;
use handoff_ipc::core::limits::CHANNEL_MAX_MSG_HANDLES;
use handoff_ipc::ipc::{Channel, Fifo, Handle, HandleKind, Waitable};
use handoff_ipc::{Deadline, Signals, TransportError};
use pretty_assertions::assert_eq;
use std::thread;
use std::time::Duration;

#[test]
fn test_pair_koids_are_related() {
    let (a, b) = Channel::create();
    assert_ne!(a.koid(), b.koid());
    assert_eq!(a.related_koid(), b.koid());
    assert_eq!(b.info().unwrap().related_koid, a.koid());
}

#[test]
fn test_messages_arrive_in_write_order() {
    let (a, b) = Channel::create();
    for i in 0u8..50 {
        a.write(&[i; 3], vec![]).unwrap();
    }

    let mut buf = [0u8; 3];
    for i in 0u8..50 {
        let incoming = b.read(&mut buf, 0).unwrap();
        assert_eq!(incoming.actual_bytes, 3);
        assert_eq!(buf, [i; 3]);
    }
    assert_eq!(b.read(&mut buf, 0).unwrap_err(), TransportError::ShouldWait);
}

#[test]
fn test_both_directions_are_independent() {
    let (a, b) = Channel::create();
    a.write(b"ping", vec![]).unwrap();
    b.write(b"pong", vec![]).unwrap();

    let mut buf = [0u8; 4];
    a.read(&mut buf, 0).unwrap();
    assert_eq!(&buf, b"pong");
    b.read(&mut buf, 0).unwrap();
    assert_eq!(&buf, b"ping");
}

#[test]
fn test_handle_capacity_too_small() {
    let (a, b) = Channel::create();
    let (fifo, _peer) = Fifo::create(8, 8).unwrap();
    a.write(&[], vec![Handle::from(fifo)]).unwrap();

    let mut buf = [0u8; 0];
    assert_eq!(
        b.read(&mut buf, 0).unwrap_err(),
        TransportError::BufferTooSmall {
            needed_bytes: 0,
            needed_handles: 1
        }
    );
    let incoming = b.read(&mut buf, 1).unwrap();
    assert_eq!(incoming.handles.len(), 1);
    assert_eq!(incoming.handles[0].kind(), HandleKind::Fifo);
}

#[test]
fn test_transferred_channel_still_works() {
    let (a, b) = Channel::create();
    let (inner_a, inner_b) = Channel::create();
    a.write(b"here", vec![Handle::from(inner_b)]).unwrap();

    let mut buf = [0u8; 4];
    let incoming = b.read(&mut buf, 1).unwrap();
    let inner_b = incoming
        .handles
        .into_iter()
        .next()
        .unwrap()
        .into_channel()
        .unwrap();

    inner_a.write(b"through", vec![]).unwrap();
    let mut inner_buf = [0u8; 7];
    inner_b.read(&mut inner_buf, 0).unwrap();
    assert_eq!(&inner_buf, b"through");
}

#[test]
fn test_failed_write_releases_handles() {
    let (a, b) = Channel::create();
    drop(b);
    let (fifo, peer) = Fifo::create(8, 8).unwrap();

    assert_eq!(
        a.write(&[], vec![Handle::from(fifo)]).unwrap_err(),
        TransportError::PeerClosed
    );
    assert!(peer.signals().unwrap().contains(Signals::PEER_CLOSED));
}

#[test]
fn test_closing_discards_queued_handles() {
    let (a, b) = Channel::create();
    let (fifo, peer) = Fifo::create(8, 8).unwrap();
    a.write(&[], vec![Handle::from(fifo)]).unwrap();
    assert!(!peer.info().unwrap().peer_closed);

    drop(b);
    assert!(peer.info().unwrap().peer_closed);
}

#[test]
fn test_oversized_message_rejected() {
    let (a, _b) = Channel::create();
    let big = vec![0u8; 64 * 1024 + 1];
    assert!(matches!(
        a.write(&big, vec![]),
        Err(TransportError::OutOfRange(_))
    ));
}

#[test]
fn test_too_many_handles_rejected_and_released() {
    let (a, b) = Channel::create();
    let mut kept = Vec::new();
    let mut sent = Vec::new();
    for _ in 0..=CHANNEL_MAX_MSG_HANDLES {
        let (mine, theirs) = Fifo::create(8, 8).unwrap();
        kept.push(mine);
        sent.push(Handle::from(theirs));
    }

    let err = a.write(&[], sent).unwrap_err();
    assert!(matches!(err, TransportError::OutOfRange(_)));
    for fifo in &kept {
        assert!(fifo.signals().unwrap().contains(Signals::PEER_CLOSED));
    }
    assert_eq!(b.info().unwrap().pending_messages, 0);
}

#[test]
fn test_cannot_send_peer_endpoint_of_same_channel() {
    let (a, b) = Channel::create();
    let err = b.write(&[], vec![Handle::from(a)]).unwrap_err();
    assert!(matches!(err, TransportError::NotSupported(_)));
}

#[test]
fn test_double_close_does_not_affect_peer() {
    let (mut a, b) = Channel::create();
    b.write(b"queued", vec![]).unwrap();
    a.close();
    a.close();
    assert_eq!(b.signals().unwrap(), Signals::PEER_CLOSED);
    assert!(b.info().unwrap().peer_closed);
    assert!(!a.is_active());
}

#[test]
fn test_wait_returns_all_asserted_signals() {
    let (a, b) = Channel::create();
    a.write(b"x", vec![]).unwrap();
    let signals = b.wait_one(Signals::READABLE, Deadline::Infinite).unwrap();
    assert_eq!(signals, Signals::READABLE | Signals::WRITABLE);
}

#[test]
fn test_wait_on_closed_endpoint_is_bad_handle() {
    let (mut a, _b) = Channel::create();
    a.close();
    assert_eq!(
        a.wait_one(Signals::READABLE, Deadline::Infinite).unwrap_err(),
        TransportError::BadHandle
    );
}

#[test]
fn test_peer_exit_wakes_waiter() {
    let (a, b) = Channel::create();
    let waiter = thread::spawn(move || a.wait_one(Signals::READABLE | Signals::PEER_CLOSED, Deadline::Infinite));

    thread::sleep(Duration::from_millis(30));
    drop(b);

    assert_eq!(waiter.join().unwrap().unwrap(), Signals::PEER_CLOSED);
}

#[test]
fn test_bounded_writer_unblocks_after_read() {
    let (a, b) = Channel::create_bounded(2).unwrap();
    a.write(b"1", vec![]).unwrap();
    a.write(b"2", vec![]).unwrap();
    assert_eq!(a.write(b"3", vec![]).unwrap_err(), TransportError::ShouldWait);

    let writer = thread::spawn(move || {
        a.wait_one(Signals::WRITABLE, Deadline::after(Duration::from_secs(5)))
            .unwrap();
        a.write(b"3", vec![]).unwrap();
        a
    });

    thread::sleep(Duration::from_millis(20));
    let mut buf = [0u8; 1];
    b.read(&mut buf, 0).unwrap();
    let _a = writer.join().unwrap();
    assert_eq!(b.info().unwrap().pending_messages, 2);
    assert_eq!(Channel::create_bounded(0).unwrap_err().status(), -10);
}
