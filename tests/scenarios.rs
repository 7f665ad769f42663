// End-to-end scenarios driven over real loopback UDP sockets: spawn each
// endpoint's event loop on its own thread, observe behaviour through
// channels fed by the application callbacks, and join once the handshake
// under test completes.
//
// Lost-ACK recovery and persistent-loss timeout need a lossy transport to
// exercise honestly; that behaviour is covered at the unit level in
// receiver.rs/sender.rs instead, where the effect lists can be asserted
// directly without waiting on real wall-clock timeouts.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use rudp::{Config, Endpoint, RudpEvent};

fn fast_config() -> Config {
    Config {
        timeout: Duration::from_millis(150),
        ..Config::default()
    }
}

// Endpoint::open binds 0.0.0.0, so local_addr() isn't a valid send target.
fn loopback(endpoint: &Endpoint) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), endpoint.local_addr().port())
}

fn spawn_running(
    mut endpoint: Endpoint,
) -> (
    thread::JoinHandle<()>,
    Receiver<(SocketAddr, Vec<u8>)>,
    Receiver<(RudpEvent, SocketAddr)>,
) {
    let (data_tx, data_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();
    endpoint.register_data_callback(move |peer, bytes| {
        let _ = data_tx.send((peer, bytes.to_vec()));
    });
    endpoint.register_event_callback(move |event, peer| {
        let _ = event_tx.send((event, peer));
    });
    let handle = thread::spawn(move || {
        endpoint.run().expect("event loop");
    });
    (handle, data_rx, event_rx)
}

fn recv_data(rx: &Receiver<(SocketAddr, Vec<u8>)>) -> (SocketAddr, Vec<u8>) {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("expected a data delivery before the timeout")
}

fn recv_event(rx: &Receiver<(RudpEvent, SocketAddr)>) -> (RudpEvent, SocketAddr) {
    rx.recv_timeout(Duration::from_secs(5))
        .expect("expected an event before the timeout")
}

#[test]
fn handshake_and_single_packet() {
    let b = Endpoint::open(fast_config(), 0).unwrap();
    let b_addr = loopback(&b);
    let (_b_handle, b_data, _b_events) = spawn_running(b);

    let mut a = Endpoint::open(fast_config(), 0).unwrap();
    a.send(b"hi", b_addr).unwrap();
    let (a_handle, _a_data, a_events) = spawn_running(a);

    let (from, payload) = recv_data(&b_data);
    assert_eq!(payload, b"hi");
    assert_eq!(from.port(), b_addr.port());

    // A's close/join path is exercised by `graceful_close_completes`
    // below; here we only need A's loop alive long enough to deliver
    // the one packet, so let its thread run out with the process.
    drop(a_handle);
    drop(a_events);
}

#[test]
fn window_fill_drain_delivers_in_order() {
    let b = Endpoint::open(fast_config(), 0).unwrap();
    let b_addr = loopback(&b);
    let (_b_handle, b_data, _b_events) = spawn_running(b);

    let mut a = Endpoint::open(fast_config(), 0).unwrap();
    a.send(b"p1", b_addr).unwrap();
    a.send(b"p2", b_addr).unwrap();
    a.send(b"p3", b_addr).unwrap();
    let (_a_handle, _a_data, _a_events) = spawn_running(a);

    let (_, p1) = recv_data(&b_data);
    let (_, p2) = recv_data(&b_data);
    let (_, p3) = recv_data(&b_data);
    assert_eq!(vec![p1, p2, p3], vec![b"p1".to_vec(), b"p2".to_vec(), b"p3".to_vec()]);
}

#[test]
fn graceful_close_completes() {
    let b = Endpoint::open(fast_config(), 0).unwrap();
    let b_addr = loopback(&b);
    let (_b_handle, b_data, _b_events) = spawn_running(b);

    let mut a = Endpoint::open(fast_config(), 0).unwrap();
    a.send(b"bye soon", b_addr).unwrap();
    a.close();
    let (a_handle, _a_data, a_events) = spawn_running(a);

    let (_, payload) = recv_data(&b_data);
    assert_eq!(payload, b"bye soon");

    let (event, _) = recv_event(&a_events);
    assert_eq!(event, RudpEvent::Closed);
    a_handle.join().expect("A's event loop exits after CLOSED");
}

#[test]
fn bidirectional_close() {
    let mut a = Endpoint::open(fast_config(), 0).unwrap();
    let mut b = Endpoint::open(fast_config(), 0).unwrap();
    let a_addr = loopback(&a);
    let b_addr = loopback(&b);

    a.send(b"from a", b_addr).unwrap();
    b.send(b"from b", a_addr).unwrap();
    a.close();
    b.close();

    let (a_handle, a_data, a_events) = spawn_running(a);
    let (b_handle, b_data, b_events) = spawn_running(b);

    let (_, a_got) = recv_data(&b_data);
    let (_, b_got) = recv_data(&a_data);
    assert_eq!(a_got, b"from a");
    assert_eq!(b_got, b"from b");

    let (a_event, _) = recv_event(&a_events);
    let (b_event, _) = recv_event(&b_events);
    assert_eq!(a_event, RudpEvent::Closed);
    assert_eq!(b_event, RudpEvent::Closed);

    a_handle.join().expect("A's event loop exits after CLOSED");
    b_handle.join().expect("B's event loop exits after CLOSED");
}

// Endpoint::open_with_rng lets the SYN sequence number be seeded instead
// of pulled from the system entropy source; two endpoints seeded alike
// must pick the same opening sequence number and so emit byte-identical
// first packets.
#[test]
fn seeded_rng_produces_identical_opening_packet() {
    use rand::{rngs::StdRng, SeedableRng};

    let sink = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    sink.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
    let sink_addr = sink.local_addr().unwrap();

    let seed = [9u8; 32];
    let mut buf = [0u8; 1100];

    let mut a = Endpoint::open_with_rng(fast_config(), 0, StdRng::from_seed(seed)).unwrap();
    a.send(b"x", sink_addr).unwrap();
    let (n_a, _) = sink.recv_from(&mut buf).unwrap();
    let packet_a = buf[..n_a].to_vec();

    let mut b = Endpoint::open_with_rng(fast_config(), 0, StdRng::from_seed(seed)).unwrap();
    b.send(b"x", sink_addr).unwrap();
    let (n_b, _) = sink.recv_from(&mut buf).unwrap();
    let packet_b = buf[..n_b].to_vec();

    assert_eq!(packet_a, packet_b);
}
