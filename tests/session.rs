use sftp_session::*;
use sftp_test_common::{frames, mock, MockServer, MockTransport};

use bytes::{BufMut, Bytes, BytesMut};
use tracing::Level;

use pretty_assertions::assert_eq;

async fn connect(version: u32) -> (Session<MockTransport>, MockServer) {
    let (transport, server) = mock();
    server.accept_version(version, &[]);

    let session = Session::connect(transport, SessionOptions::new())
        .await
        .unwrap();

    assert_eq!(server.next_sent().unwrap().packet_type, frames::SSH_FXP_INIT);

    (session, server)
}

fn string(bytes: &[u8]) -> Vec<u8> {
    let mut buffer = BytesMut::new();
    frames::put_string(&mut buffer, bytes);
    buffer.to_vec()
}

#[tokio::test]
async fn session_open_end_to_end() {
    let (transport, server) = mock();
    server.accept_version(3, &[("posix-rename@openssh.com", "1")]);

    let mut session = Session::connect(transport, SessionOptions::new())
        .await
        .unwrap();

    assert_eq!(server.subsystems(), ["sftp"]);

    let init = server.next_sent().unwrap();
    assert_eq!(init.packet_type, frames::SSH_FXP_INIT);
    assert_eq!(init.id, None);
    assert_eq!(&init.body[..], &6_u32.to_be_bytes());

    assert_eq!(session.state(), SessionState::Open);
    assert_eq!(session.version(), Some(3));
    assert_eq!(session.server_version(), Some(3));

    let extensions = session.extensions().unwrap();
    assert_eq!(extensions.len(), 1);
    assert_eq!(extensions.get("posix-rename@openssh.com"), Some(&b"1"[..]));

    let mut attrs = FileAttrs::new();
    attrs.set_permissions(Permissions::from_bits_truncate(0o640));

    let awaitable = session
        .open("/tmp/x", OpenOptions::new().read(true), &attrs)
        .unwrap();

    let open = server.next_sent().unwrap();
    assert_eq!(open.packet_type, frames::SSH_FXP_OPEN);
    assert_eq!(open.id, Some(awaitable.id()));

    let mut expected = string(b"/tmp/x");
    expected.put_u32(0x00000001); // SSH_FXF_READ
    expected.put_u32(0x00000004); // SSH_FILEXFER_ATTR_PERMISSIONS
    expected.put_u32(0o640);
    assert_eq!(&open.body[..], &expected[..]);

    server.push_data(frames::handle(awaitable.id(), b"\x00\x00\x00\x01"));

    let response = session.wait(awaitable).await.unwrap();
    assert!(response.is_success());
    assert_eq!(response.into_handle().unwrap().as_bytes(), b"\x00\x00\x00\x01");
    assert_eq!(session.pending_requests(), 0);
}

#[tokio::test]
async fn session_negotiates_lowest_version() {
    let (transport, server) = mock();
    server.accept_version(6, &[]);

    let options = SessionOptions::new().max_version(3);
    let session = Session::connect(transport, options).await.unwrap();

    let init = server.next_sent().unwrap();
    assert_eq!(&init.body[..], &3_u32.to_be_bytes());

    assert_eq!(session.version(), Some(3));
    assert_eq!(session.server_version(), Some(6));
}

#[test]
fn session_rejects_invalid_max_version() {
    for version in [0, 7] {
        let (transport, server) = mock();

        let err = Session::new(transport, SessionOptions::new().max_version(version)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSftpProtocol { version: v } if v == version));
        assert_eq!(server.opened_channels(), 0);
    }
}

#[tokio::test]
async fn session_scrambled_responses() {
    let (mut session, server) = connect(3).await;

    let awaitables: Vec<_> = (0..4)
        .map(|i| session.stat(format!("/file{i}")).unwrap())
        .collect();
    assert_eq!(session.pending_requests(), 4);

    let sent = server.take_sent();
    assert_eq!(sent.len(), 4);

    // All responses in one stream, split at arbitrary points.
    let mut stream = Vec::new();
    for i in [2, 0, 3, 1] {
        stream.extend_from_slice(&frames::attrs_with_size(sent[i].id(), 100 + i as u64));
    }
    for chunk in stream.chunks(7) {
        server.push_data(chunk.to_vec());
    }

    session.run().await.unwrap();
    assert_eq!(session.pending_requests(), 0);

    for (i, awaitable) in awaitables.into_iter().enumerate() {
        let attrs = awaitable.await.unwrap().into_attrs().unwrap();
        assert_eq!(attrs.get_size(), Some(100 + i as u64));
    }
}

#[tokio::test]
async fn session_unknown_response_id_is_fatal() {
    let (mut session, server) = connect(3).await;

    let awaitable = session.stat("/tmp").unwrap();
    let id = awaitable.id();

    server.push_data(frames::status(id.wrapping_add(100), frames::SSH_FX_OK, ""));

    let err = session.run().await.unwrap_err();
    assert!(
        matches!(err, Error::InvalidResponseId { response_id } if response_id == id.wrapping_add(100))
    );

    assert!(session.is_poisoned());
    assert_eq!(session.pending_requests(), 0);
    assert!(matches!(awaitable.await, Err(Error::ChannelClosed)));

    assert!(matches!(session.run().await, Err(Error::SessionPoisoned)));
    assert!(matches!(session.stat("/tmp"), Err(Error::SessionPoisoned)));
    assert!(matches!(session.reconnect(), Err(Error::SessionPoisoned)));
}

#[tokio::test]
async fn session_failure_status_is_a_response() {
    let (mut session, server) = connect(3).await;

    let awaitable = session.lstat("/no/such/file").unwrap();
    server.push_data(frames::status(
        awaitable.id(),
        frames::SSH_FX_NO_SUCH_FILE,
        "No such file",
    ));

    let response = session.wait(awaitable).await.unwrap();
    assert!(!response.is_success());
    assert_eq!(response.failure(), Some(SftpErrorKind::NoSuchFile));

    match response.into_attrs().unwrap_err() {
        Error::SftpError(kind, msg) => {
            assert_eq!(kind, SftpErrorKind::NoSuchFile);
            assert_eq!(&*msg.message, "No such file");
            assert_eq!(&*msg.language_tag, "en");
        }
        err => panic!("Unexpected error {err}"),
    }

    assert!(!session.is_poisoned());
    assert!(session.is_open());
}

#[tokio::test]
async fn session_read_write() {
    let (mut session, server) = connect(3).await;
    let handle = Handle::new(Bytes::from_static(b"h1")).unwrap();

    let write = session.write(&handle, 4, b"hello").unwrap();
    let read = session.read(&handle, 0, 1024).unwrap();
    let eof = session.read(&handle, 9, 1024).unwrap();

    let sent = server.take_sent();
    assert_eq!(sent[0].packet_type, frames::SSH_FXP_WRITE);
    let mut expected = string(b"h1");
    expected.put_u64(4);
    expected.extend_from_slice(&string(b"hello"));
    assert_eq!(&sent[0].body[..], &expected[..]);

    assert_eq!(sent[1].packet_type, frames::SSH_FXP_READ);
    let mut expected = string(b"h1");
    expected.put_u64(0);
    expected.put_u32(1024);
    assert_eq!(&sent[1].body[..], &expected[..]);

    server.push_data(frames::status(write.id(), frames::SSH_FX_OK, ""));
    server.push_data(frames::data(read.id(), b"....hello"));
    server.push_data(frames::status(eof.id(), frames::SSH_FX_EOF, "EOF"));

    session.wait(write).await.unwrap().into_status().unwrap();
    assert_eq!(
        session.wait(read).await.unwrap().into_data().unwrap(),
        Some(Bytes::from_static(b"....hello"))
    );
    assert_eq!(session.wait(eof).await.unwrap().into_data().unwrap(), None);
}

#[tokio::test]
async fn session_dropped_request() {
    let (mut session, server) = connect(3).await;

    let id = session.remove("/tmp/file").unwrap().id();
    server.push_data(frames::status(id, frames::SSH_FX_OK, ""));

    session.run().await.unwrap();
    assert_eq!(session.pending_requests(), 0);
    assert!(!session.is_poisoned());
}

#[tokio::test]
async fn session_subsystem_failure() {
    let (transport, server) = mock();
    server.push(ChannelEvent::OpenConfirmed);
    server.push(ChannelEvent::SubsystemResult { success: false });

    let mut session = Session::new(transport, SessionOptions::new()).unwrap();
    assert_eq!(session.state(), SessionState::Opening);

    let err = session.wait_ready().await.unwrap_err();
    assert!(matches!(err, Error::SubsystemFailure { subsystem: "sftp" }));
    assert!(session.is_poisoned());

    // INIT is never sent.
    assert_eq!(server.next_sent(), None);
}

#[tokio::test]
async fn session_request_before_open() {
    let (transport, _server) = mock();
    let mut session = Session::new(transport, SessionOptions::new()).unwrap();

    assert!(matches!(session.stat("/"), Err(Error::SessionNotOpen)));
    assert_eq!(session.version(), None);
    assert!(!session.is_poisoned());
}

#[tokio::test]
async fn session_second_version_is_fatal() {
    let (mut session, server) = connect(3).await;

    let _awaitable = session.stat("/").unwrap();
    server.push_data(frames::version(3, &[]));

    assert!(matches!(
        session.run().await,
        Err(Error::InvalidResponse(_))
    ));
    assert!(session.is_poisoned());
}

#[tokio::test]
async fn session_unsupported_operation_is_not_fatal() {
    let (mut session, _server) = connect(1).await;

    let err = session
        .rename("/a", "/b", RenameFlags::empty())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedOperation { version: 1, .. }
    ));

    assert!(!session.is_poisoned());
    assert_eq!(session.pending_requests(), 0);
}

#[tokio::test]
async fn session_send_failure_is_fatal() {
    let (mut session, server) = connect(3).await;

    server.fail_sends(true);

    assert!(matches!(session.stat("/"), Err(Error::IOError(_))));
    assert!(session.is_poisoned());
    assert_eq!(session.pending_requests(), 0);
}

#[tokio::test]
async fn session_close_drops_pending_requests() {
    let (mut session, server) = connect(3).await;

    let awaitable = session.opendir("/tmp").unwrap();
    session.close_channel().unwrap();

    // Refused before reaching the transport, without poisoning the session.
    assert!(matches!(session.stat("/late"), Err(Error::ChannelClosed)));
    assert_eq!(session.pending_requests(), 1);
    assert_eq!(server.take_sent().len(), 1);

    assert!(matches!(
        session.wait(awaitable).await,
        Err(Error::ChannelClosed)
    ));
    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(server.closed_channels(), [1]);
    assert!(!session.is_poisoned());

    assert!(matches!(session.stat("/"), Err(Error::ChannelClosed)));
    assert!(matches!(session.wait_ready().await, Err(Error::ChannelClosed)));

    // Nothing is pending anymore.
    session.run().await.unwrap();
}

#[tokio::test]
async fn session_reconnect() {
    let (mut session, server) = connect(3).await;

    assert!(!session.reconnect().unwrap());
    assert_eq!(server.opened_channels(), 1);

    server.push(ChannelEvent::Closed);
    session
        .run_until(|session| session.state() == SessionState::Closed)
        .await
        .unwrap();
    assert_eq!(session.version(), None);

    assert!(session.reconnect().unwrap());
    assert_eq!(server.opened_channels(), 2);
    assert_eq!(session.state(), SessionState::Opening);

    server.accept_version(6, &[]);
    session.wait_ready().await.unwrap();

    assert_eq!(session.version(), Some(6));
    assert_eq!(server.subsystems(), ["sftp", "sftp"]);
}

#[tokio::test]
async fn session_extended_data_is_diagnostic_only() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (transport, server) = mock();
    server.accept_version(3, &[]);

    let options = SessionOptions::new().span(tracing::debug_span!("sftp", host = "mock"));
    let mut session = Session::connect(transport, options).await.unwrap();
    assert!(!session.span().is_none());

    let awaitable = session.realpath(".").unwrap();

    server.push(ChannelEvent::ExtendedData(Bytes::from_static(
        b"sftp-server: debug1: request: realpath\n",
    )));
    server.push_data(frames::name(awaitable.id(), &["/home/user"]));

    let entry = session.wait(awaitable).await.unwrap().into_name().unwrap();
    assert_eq!(&entry.filename[..], b"/home/user");
    assert_eq!(entry.longname.as_deref(), Some(&b"/home/user"[..]));
    assert!(!session.is_poisoned());
}

#[tokio::test]
async fn session_extended_request() {
    let (mut session, server) = connect(3).await;

    let mut data = string(b"/a");
    data.extend_from_slice(&string(b"/b"));

    let awaitable = session.extended("posix-rename@openssh.com", &data).unwrap();

    let sent = server.next_sent().unwrap();
    let mut expected = string(b"posix-rename@openssh.com");
    expected.extend_from_slice(&data);
    assert_eq!(&sent.body[..], &expected[..]);

    server.push_data(frames::extended_reply(awaitable.id(), b"reply"));
    assert_eq!(
        session.wait(awaitable).await.unwrap().into_extended_reply().unwrap(),
        Bytes::from_static(b"reply")
    );
}

#[tokio::test]
async fn session_full_size_read() {
    let (mut session, server) = connect(3).await;
    let handle = Handle::new(Bytes::from_static(b"h1")).unwrap();

    let read = session
        .read(&handle, 0, OPENSSH_PORTABLE_MAX_MSG_LENGTH)
        .unwrap();
    let data = vec![0; OPENSSH_PORTABLE_MAX_MSG_LENGTH as usize];
    server.push_data(frames::data(read.id(), &data));

    let read = session.wait(read).await.unwrap().into_data().unwrap().unwrap();
    assert_eq!(read.len(), data.len());
    assert!(!session.is_poisoned());

    // Anything longer than the default limit is still rejected.
    let _pending = session.stat("/tmp").unwrap();
    let mut header = BytesMut::new();
    header.put_u32(DEFAULT_MAX_PACKET_LEN + 1);
    server.push_data(header.freeze());

    let err = session.run().await.unwrap_err();
    assert!(matches!(
        err,
        Error::PacketTooLong { len, max } if len == DEFAULT_MAX_PACKET_LEN + 1 && max == DEFAULT_MAX_PACKET_LEN
    ));
    assert!(session.is_poisoned());
}

#[tokio::test]
async fn session_unhandled_packet_type_is_fatal() {
    // A request type sent back by the server, then a tag that does not exist.
    for packet_type in [frames::SSH_FXP_OPEN, 99] {
        let (mut session, server) = connect(3).await;
        let awaitable = session.stat("/tmp").unwrap();

        server.push_data(frames::frame(&[packet_type, 0, 0, 0, 1]));

        let err = session.run().await.unwrap_err();
        assert!(
            matches!(err, Error::UnhandledPacketType { packet_type: tag } if tag == packet_type),
            "{err:?}"
        );
        assert!(session.is_poisoned());
        assert!(matches!(awaitable.await, Err(Error::ChannelClosed)));
        assert!(matches!(session.stat("/tmp"), Err(Error::SessionPoisoned)));
    }
}

#[tokio::test]
async fn session_unexpected_response_kind_is_not_fatal() {
    let (mut session, server) = connect(3).await;

    let awaitable = session.stat("/tmp").unwrap();
    server.push_data(frames::handle(awaitable.id(), b"h1"));

    let err = session.wait(awaitable).await.unwrap().into_attrs().unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));

    assert!(!session.is_poisoned());
    assert!(session.is_open());
    session.stat("/tmp").unwrap();
}
