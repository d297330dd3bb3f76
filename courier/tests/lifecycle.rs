//! Socket and context lifecycle: idempotent close, fast failure on closed
//! handles, drop-based collection, termination, and duplication.

use std::future::Future;

use courier::{
    Context, Direction, Message, OptionId, SocketError, SocketKind, OptionValue,
};

fn run_local<F: Future<Output = ()>>(future: F) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::ERROR)
        .try_init();
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build runtime");
    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, future);
}

#[test]
fn close_is_idempotent() {
    run_local(async {
        let ctx = Context::new(1);
        let socket = ctx.socket(SocketKind::Pair).expect("socket");
        socket.bind("inproc://idempotent").expect("bind");

        socket.close();
        assert!(!socket.is_open());
        // A second close changes nothing and reports no error.
        socket.close();
        assert!(!socket.is_open());
        assert_eq!(socket.waiting(Direction::Send), 0);
        assert_eq!(socket.waiting(Direction::Recv), 0);
    });
}

#[test]
fn closed_socket_fails_fast_without_suspending() {
    run_local(async {
        let ctx = Context::new(1);
        let a = ctx.socket(SocketKind::Pair).expect("socket");
        let b = ctx.socket(SocketKind::Pair).expect("socket");
        a.bind("inproc://fast-fail").expect("bind");
        b.connect("inproc://fast-fail").expect("connect");

        b.close();
        assert_eq!(b.recv().await, Err(SocketError::Closed));
        assert_eq!(b.send(Message::from("x")).await, Err(SocketError::Closed));
        assert_eq!(b.waiting(Direction::Recv), 0);
        assert_eq!(b.waiting(Direction::Send), 0);
        assert_eq!(ctx.reactor().registered_count(), 0);

        // Lifecycle operations on a closed socket fail the same way.
        assert_eq!(b.bind("inproc://elsewhere"), Err(SocketError::Closed));
        assert_eq!(
            b.get_option(OptionId::SndHwm),
            Err(SocketError::Closed)
        );
    });
}

#[test]
fn close_releases_the_bound_endpoint() {
    run_local(async {
        let ctx = Context::new(1);
        let first = ctx.socket(SocketKind::Pair).expect("socket");
        first.bind("inproc://reusable").expect("bind");
        first.close();

        let second = ctx.socket(SocketKind::Pair).expect("socket");
        second.bind("inproc://reusable").expect("rebind after close");
    });
}

#[test]
fn dropping_the_last_handle_closes_the_socket() {
    run_local(async {
        let ctx = Context::new(1);
        let a = ctx.socket(SocketKind::Pair).expect("socket");
        {
            let b = ctx.socket(SocketKind::Pair).expect("socket");
            a.bind("inproc://collected").expect("bind");
            b.connect("inproc://collected").expect("connect");

            // Peer attached: the writable bit is set.
            let events = a.get_option(OptionId::Events).expect("events");
            assert_eq!(events, OptionValue::Int(0b10));
            let extra_handle = b.clone();
            drop(extra_handle);
            // Clones keep the socket alive.
            let events = a.get_option(OptionId::Events).expect("events");
            assert_eq!(events, OptionValue::Int(0b10));
        }
        // Collection converges on the same close logic as explicit close:
        // the peer is detached and the endpoint released.
        let events = a.get_option(OptionId::Events).expect("events");
        assert_eq!(events, OptionValue::Int(0));
        let second = ctx.socket(SocketKind::Pair).expect("socket");
        second.bind("inproc://collected").expect("rebind after collection");
    });
}

#[test]
fn terminate_closes_sockets_and_blocks_creation() {
    run_local(async {
        let ctx = Context::new(1);
        let a = ctx.socket(SocketKind::Pair).expect("socket");
        let b = ctx.socket(SocketKind::Pair).expect("socket");
        a.bind("inproc://terminate").expect("bind");
        b.connect("inproc://terminate").expect("connect");

        let receiver = b.clone();
        let pending = tokio::task::spawn_local(async move { receiver.recv().await });
        tokio::task::yield_now().await;
        assert_eq!(b.waiting(Direction::Recv), 1);

        ctx.terminate();
        assert!(ctx.is_terminated());
        assert!(!a.is_open());
        assert!(!b.is_open());
        // Suspended callers are resumed, not stranded.
        assert_eq!(pending.await.expect("join"), Err(SocketError::Closed));

        assert!(matches!(
            ctx.socket(SocketKind::Pair),
            Err(SocketError::Terminated)
        ));
        // Termination is idempotent.
        ctx.terminate();
    });
}

#[test]
fn duplicate_shares_the_transport_with_its_own_reactor() {
    run_local(async {
        let ctx = Context::new(2);
        let dup = ctx.duplicate();
        assert_eq!(ctx.io_threads(), 2);
        assert_eq!(dup.io_threads(), 2);

        // Endpoints bound through one context are visible to the other:
        // the native resource is shared.
        let a = ctx.socket(SocketKind::Pair).expect("socket");
        let b = dup.socket(SocketKind::Pair).expect("socket");
        a.bind("inproc://shared").expect("bind");
        b.connect("inproc://shared").expect("connect");

        // Registrations are not shared: b's suspension arms only the
        // duplicate's reactor.
        let receiver = b.clone();
        let pending = tokio::task::spawn_local(async move { receiver.recv().await });
        tokio::task::yield_now().await;
        assert_eq!(ctx.reactor().registered_count(), 0);
        assert_eq!(dup.reactor().registered_count(), 1);

        a.send(Message::from("across")).await.expect("send");
        assert_eq!(ctx.reactor().turn(), 0);
        assert_eq!(dup.reactor().turn(), 1);
        let msg = pending.await.expect("join").expect("recv");
        assert_eq!(msg.as_slice(), b"across");

        // Terminating one side leaves the other side's sockets open.
        ctx.terminate();
        assert!(b.is_open());
        assert!(!dup.is_terminated());
    });
}

#[test]
fn dropping_a_context_closes_its_sockets() {
    run_local(async {
        let ctx = Context::new(1);
        let socket = ctx.socket(SocketKind::Pair).expect("socket");
        socket.bind("inproc://ctx-drop").expect("bind");
        drop(ctx);
        assert!(!socket.is_open());
        assert_eq!(socket.recv().await, Err(SocketError::Closed));
    });
}
