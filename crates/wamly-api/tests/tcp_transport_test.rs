#![allow(clippy::unwrap_used)]

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use wamly_api::frame::methods;
use wamly_api::{
    ApiCall, Error, Frame, FrameKind, PropertyValue, TcpTransport, Transport, TransportConfig,
};

#[tokio::test]
async fn frames_cross_a_real_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let speaker = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();

        let request = lines.next_line().await.unwrap().unwrap();
        write
            .write_all(b"{\"kind\":\"response\",\"method\":\"N2X.Speaker.SetVolume\",\"payload\":{\"volume\":7},\"group\":\"G1\"}\n")
            .await
            .unwrap();
        write.write_all(b"this is not json\n").await.unwrap();
        request
    });

    let transport = TcpTransport::default();
    let mut conn = transport.open("127.0.0.1", port).await.unwrap();

    let call = ApiCall::uic(methods::SET_VOLUME).with_arg("nVolume", 7);
    conn.sink.send(Frame::request(&call)).await.unwrap();

    let reply = conn.stream.next().await.unwrap().unwrap();
    assert_eq!(reply.kind, FrameKind::Response);
    assert_eq!(reply.payload["volume"], PropertyValue::Integer(7));
    assert_eq!(reply.group.as_deref(), Some("G1"));

    let garbage = conn.stream.next().await.unwrap().unwrap_err();
    assert!(garbage.is_frame_local());

    let seen = speaker.await.unwrap();
    let decoded = Frame::decode(&seen).unwrap();
    assert_eq!(decoded, Frame::request(&call));

    // Speaker task dropped its socket.
    assert!(conn.stream.next().await.is_none());
    let _ = conn.sink.close().await;
}

#[tokio::test]
async fn refused_port_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = TcpTransport::default().open("127.0.0.1", port).await.unwrap_err();
    assert!(matches!(err, Error::Connect { .. }), "got {err:?}");
    assert!(err.is_transient());
}

#[tokio::test]
async fn bad_lines_do_not_end_the_stream() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut junk = vec![b'x'; 300];
        junk.push(b'\n');
        socket.write_all(&junk).await.unwrap();
        socket.write_all(b"\xff\xfe\xfd\n").await.unwrap();
        socket
            .write_all(b"{\"kind\":\"event\",\"method\":\"VolumeLevel\"}\n")
            .await
            .unwrap();
    });

    let transport = TcpTransport::new(TransportConfig {
        max_frame_len: 128,
        ..TransportConfig::default()
    });
    let mut conn = transport.open("127.0.0.1", port).await.unwrap();

    let oversized = conn.stream.next().await.unwrap().unwrap_err();
    assert!(matches!(oversized, Error::Framing(_)), "got {oversized:?}");
    let not_utf8 = conn.stream.next().await.unwrap().unwrap_err();
    assert!(not_utf8.is_frame_local(), "got {not_utf8:?}");

    let event = conn.stream.next().await.unwrap().unwrap();
    assert_eq!(event.kind, FrameKind::Event);
    assert_eq!(event.method, "VolumeLevel");

    assert!(conn.stream.next().await.is_none());
}
