//! Socket-option marshaling through the static registry.

use std::future::Future;

use bytes::Bytes;
use courier::{Context, Message, OptionId, OptionValue, SocketError, SocketKind};

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
fn registry_rejects_invalid_access_and_kinds() {
    run_local(async {
        let ctx = Context::new(1);
        let socket = ctx.socket(SocketKind::Sub).expect("socket");

        assert_eq!(
            socket.set_option(OptionId::Events, OptionValue::Int(0)),
            Err(SocketError::ReadOnlyOption {
                option: OptionId::Events
            })
        );
        assert_eq!(
            socket.get_option(OptionId::Subscribe),
            Err(SocketError::WriteOnlyOption {
                option: OptionId::Subscribe
            })
        );
        assert_eq!(
            socket.set_option(OptionId::SndHwm, OptionValue::Bool(true)),
            Err(SocketError::OptionType {
                option: OptionId::SndHwm,
                expected: "i32",
            })
        );
        // Write-only options accept well-typed writes.
        socket
            .set_option(OptionId::Subscribe, OptionValue::Bytes(Bytes::from_static(b"topic")))
            .expect("subscribe");
    });
}

#[test]
fn watermarks_and_identity_round_trip() {
    run_local(async {
        let ctx = Context::new(1);
        let socket = ctx.socket(SocketKind::Dealer).expect("socket");

        socket
            .set_option(OptionId::SndHwm, OptionValue::Int(42))
            .expect("set sndhwm");
        assert_eq!(
            socket.get_option(OptionId::SndHwm),
            Ok(OptionValue::Int(42))
        );

        socket
            .set_option(OptionId::Identity, OptionValue::Bytes(Bytes::from_static(b"worker-7")))
            .expect("set identity");
        assert_eq!(
            socket.get_option(OptionId::Identity),
            Ok(OptionValue::Bytes(Bytes::from_static(b"worker-7")))
        );

        socket
            .set_option(OptionId::MaxMsgSize, OptionValue::Long(1024))
            .expect("set maxmsgsize");
        assert_eq!(
            socket.get_option(OptionId::MaxMsgSize),
            Ok(OptionValue::Long(1024))
        );

        // Mechanical pass-through options retain what was written.
        socket
            .set_option(OptionId::Linger, OptionValue::Int(250))
            .expect("set linger");
        assert_eq!(
            socket.get_option(OptionId::Linger),
            Ok(OptionValue::Int(250))
        );
        socket
            .set_option(OptionId::Affinity, OptionValue::Ulong(3))
            .expect("set affinity");
        assert_eq!(
            socket.get_option(OptionId::Affinity),
            Ok(OptionValue::Ulong(3))
        );
    });
}

#[test]
fn read_only_views_reflect_socket_state() {
    run_local(async {
        let ctx = Context::new(1);
        let a = ctx.socket(SocketKind::Push).expect("socket");
        let b = ctx.socket(SocketKind::Pull).expect("socket");

        assert_eq!(
            a.get_option(OptionId::Type),
            Ok(OptionValue::Int(SocketKind::Push.code()))
        );
        assert_eq!(
            b.get_option(OptionId::Type),
            Ok(OptionValue::Int(SocketKind::Pull.code()))
        );
        assert_eq!(
            a.get_option(OptionId::ReceiveMore),
            Ok(OptionValue::Bool(false))
        );

        // Unbound and unconnected: nothing is ready.
        assert_eq!(a.get_option(OptionId::Events), Ok(OptionValue::Int(0)));
        assert_eq!(
            a.get_option(OptionId::LastEndpoint),
            Ok(OptionValue::Bytes(Bytes::new()))
        );

        a.bind("inproc://options").expect("bind");
        b.connect("inproc://options").expect("connect");
        assert_eq!(
            a.get_option(OptionId::LastEndpoint),
            Ok(OptionValue::Bytes(Bytes::from_static(b"inproc://options")))
        );
        assert_eq!(
            b.get_option(OptionId::LastEndpoint),
            Ok(OptionValue::Bytes(Bytes::from_static(b"inproc://options")))
        );

        // Bit 0 is readable, bit 1 writable.
        assert_eq!(a.get_option(OptionId::Events), Ok(OptionValue::Int(0b10)));
        a.send(Message::from("x")).await.expect("send");
        assert_eq!(b.get_option(OptionId::Events), Ok(OptionValue::Int(0b01)));
    });
}

#[test]
fn oversized_sends_fail_with_a_transport_error() {
    run_local(async {
        let ctx = Context::new(1);
        let a = ctx.socket(SocketKind::Pair).expect("socket");
        let b = ctx.socket(SocketKind::Pair).expect("socket");
        a.bind("inproc://max-size").expect("bind");
        b.connect("inproc://max-size").expect("connect");

        a.set_option(OptionId::MaxMsgSize, OptionValue::Long(8))
            .expect("set maxmsgsize");
        a.send(Message::from("fits")).await.expect("send");
        let err = a
            .send(Message::from("definitely does not fit"))
            .await
            .expect_err("oversized send must fail");
        assert!(matches!(err, SocketError::Transport { .. }));
        assert!(err.is_retryable());
    });
}
