use lowlevel::{constants::*, protocol, *};
use sftp_session_lowlevel as lowlevel;

use bytes::{BufMut, Bytes, BytesMut};
use pretty_assertions::assert_eq;

/// Build a frame the way a server would.
fn frame(packet_type: u8, id: u32, body: &[u8]) -> Bytes {
    let mut frame = BytesMut::new();
    frame.put_u32((body.len() + 5) as u32);
    frame.put_u8(packet_type);
    frame.put_u32(id);
    frame.put_slice(body);
    frame.freeze()
}

fn string(bytes: &[u8]) -> Vec<u8> {
    let mut out = (bytes.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(bytes);
    out
}

/// Strip the length prefix, the type and the id off an encoded request.
fn request_body(frame: &[u8], packet_type: u8, id: u32) -> &[u8] {
    let len = u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize;
    assert_eq!(len, frame.len() - 4);
    assert_eq!(frame[4], packet_type);
    assert_eq!(u32::from_be_bytes(frame[5..9].try_into().unwrap()), id);
    &frame[9..]
}

fn parse(protocol: &dyn Protocol, frame: Bytes) -> Response {
    let mut reader = ReaderBuffered::new(64, OPENSSH_PORTABLE_MAX_MSG_LENGTH);
    reader.extend_from_slice(&frame);

    let mut packet = reader.next_packet().unwrap().unwrap();
    let id = packet.payload().read_u32().unwrap();
    let response = protocol
        .parse_response(packet.packet_type(), id, packet.payload())
        .unwrap();

    assert!(packet.payload().is_empty());
    assert!(reader.next_packet().unwrap().is_none());

    response
}

#[test]
fn test_v1_attrs_round_trip_every_subset() {
    let extended = vec![
        (Bytes::from_static(b"name@example.com"), Bytes::from_static(b"v")),
        (Bytes::from_static(b"empty"), Bytes::new()),
    ];

    for subset in 0..32_u32 {
        let mut attrs = FileAttrs::new();
        if subset & 1 != 0 {
            attrs.set_size(u64::MAX - 7);
        }
        if subset & 2 != 0 {
            attrs.set_id((1000, 0));
        }
        if subset & 4 != 0 {
            attrs.set_mode(0o100640);
        }
        if subset & 8 != 0 {
            attrs.set_time(FileTime::new(0), FileTime::new(u32::MAX.into()));
        }
        if subset & 16 != 0 {
            for (name, value) in &extended {
                attrs.push_extended(name.clone(), value.clone());
            }
        }

        let mut writer = WireWriter::new();
        AttrsLayout::V1.encode(&attrs, &mut writer).unwrap();

        let mut reader = WireReader::new(writer.into_bytes());
        let decoded = AttrsLayout::V1.decode(&mut reader).unwrap();

        assert!(reader.is_empty());
        assert_eq!(decoded, attrs, "subset = {subset:#b}");
        assert_eq!(decoded.get_size().is_some(), subset & 1 != 0);
        assert_eq!(decoded.get_id().is_some(), subset & 2 != 0);
        assert_eq!(decoded.get_mode().is_some(), subset & 4 != 0);
        assert_eq!(decoded.get_atime().is_some(), subset & 8 != 0);
        assert_eq!(decoded.get_mtime().is_some(), subset & 8 != 0);
        assert_eq!(decoded.get_extended().is_some(), subset & 16 != 0);
    }
}

#[test]
fn test_zero_is_not_absent() {
    let mut attrs = FileAttrs::new();
    attrs.set_size(0);

    let mut writer = WireWriter::new();
    AttrsLayout::V1.encode(&attrs, &mut writer).unwrap();
    let decoded = AttrsLayout::V1
        .decode(&mut WireReader::new(writer.into_bytes()))
        .unwrap();

    assert_eq!(decoded.get_size(), Some(0));
    assert_eq!(decoded.get_mode(), None);
}

#[test]
fn test_protocol_for_version() {
    for version in 1..=6 {
        let protocol = protocol::for_version(version).unwrap();
        assert_eq!(protocol.version(), version);
    }

    assert!(matches!(
        protocol::for_version(7),
        Err(Error::UnsupportedSftpProtocol { version: 7 })
    ));
    assert_eq!(
        protocol::for_version(3).unwrap().attrs_layout(),
        AttrsLayout::V1
    );
    assert_eq!(
        protocol::for_version(6).unwrap().attrs_layout(),
        AttrsLayout::V6
    );
}

#[test]
fn test_v3_open_encoding() {
    let protocol = protocol::ProtocolV3;
    let mut attrs = FileAttrs::new();
    attrs.set_mode(0o640);

    let frame = protocol
        .encode_open(7, b"/tmp/x", OpenOptions::new().read(true).text(true), &attrs)
        .unwrap();

    let mut expected = string(b"/tmp/x");
    expected.extend_from_slice(&SSH_FXF_READ.to_be_bytes());
    expected.extend_from_slice(&SSH_FILEXFER_ATTR_PERMISSIONS.to_be_bytes());
    expected.extend_from_slice(&0o640_u32.to_be_bytes());

    assert_eq!(request_body(&frame, SSH_FXP_OPEN, 7), &expected[..]);
}

#[test]
fn test_v5_open_encoding() {
    let protocol = protocol::ProtocolV5;
    let options = OpenOptions::new().write(true).create(true).truncate(true);

    let frame = protocol
        .encode_open(1, b"f", options, &FileAttrs::new())
        .unwrap();

    let mut expected = string(b"f");
    expected.extend_from_slice(&(ACE4_WRITE_DATA | ACE4_WRITE_ATTRIBUTES).to_be_bytes());
    expected.extend_from_slice(&SSH_FXF_CREATE_TRUNCATE.to_be_bytes());
    // flags, then the type byte that protocol 4 and later always send
    expected.extend_from_slice(&[0, 0, 0, 0, SSH_FILEXFER_TYPE_UNKNOWN]);

    assert_eq!(request_body(&frame, SSH_FXP_OPEN, 1), &expected[..]);
}

#[test]
fn test_stat_carries_flags_from_v4() {
    let v3 = protocol::ProtocolV3.encode_stat(2, b"/").unwrap();
    assert_eq!(request_body(&v3, SSH_FXP_STAT, 2), &string(b"/")[..]);

    let v4 = protocol::ProtocolV4.encode_lstat(2, b"/").unwrap();
    let mut expected = string(b"/");
    expected.extend_from_slice(&AttrsLayout::V4.supported_flags().to_be_bytes());
    assert_eq!(request_body(&v4, SSH_FXP_LSTAT, 2), &expected[..]);
}

#[test]
fn test_rename_per_version() {
    let flags = RenameFlags::OVERWRITE;

    assert!(matches!(
        protocol::ProtocolV1.encode_rename(1, b"a", b"b", flags),
        Err(Error::UnsupportedOperation {
            operation: "rename",
            version: 1
        })
    ));

    let v2 = protocol::ProtocolV2.encode_rename(1, b"a", b"b", flags).unwrap();
    let mut expected = string(b"a");
    expected.extend(string(b"b"));
    assert_eq!(request_body(&v2, SSH_FXP_RENAME, 1), &expected[..]);

    let v5 = protocol::ProtocolV5.encode_rename(1, b"a", b"b", flags).unwrap();
    expected.extend_from_slice(&SSH_FXF_RENAME_OVERWRITE.to_be_bytes());
    assert_eq!(request_body(&v5, SSH_FXP_RENAME, 1), &expected[..]);
}

#[test]
fn test_symlink_per_version() {
    assert!(matches!(
        protocol::ProtocolV2.encode_symlink(1, b"link", b"target"),
        Err(Error::UnsupportedOperation { .. })
    ));

    let mut expected = string(b"link");
    expected.extend(string(b"target"));

    let v3 = protocol::ProtocolV3
        .encode_symlink(3, b"link", b"target")
        .unwrap();
    assert_eq!(request_body(&v3, SSH_FXP_SYMLINK, 3), &expected[..]);

    let v6 = protocol::ProtocolV6
        .encode_symlink(3, b"link", b"target")
        .unwrap();
    expected.push(1);
    assert_eq!(request_body(&v6, SSH_FXP_LINK, 3), &expected[..]);
}

#[test]
fn test_extended_request() {
    let frame = protocol::ProtocolV3
        .encode_extended(9, "fsync@openssh.com", &string(b"handle"))
        .unwrap();

    let mut expected = string(b"fsync@openssh.com");
    expected.extend(string(b"handle"));
    assert_eq!(request_body(&frame, SSH_FXP_EXTENDED, 9), &expected[..]);
}

#[test]
fn test_status_per_version() {
    let mut body = SSH_FX_EOF.to_be_bytes().to_vec();

    // code only
    let response = parse(&protocol::ProtocolV1, frame(SSH_FXP_STATUS, 4, &body));
    assert_eq!(response.id, 4);
    assert_eq!(response.status, StatusCode::Failure(SftpErrorKind::Eof));
    assert_eq!(response.message, None);

    body.extend(string(b"End of file"));
    body.extend(string(b"en"));
    let response = parse(&protocol::ProtocolV3, frame(SSH_FXP_STATUS, 4, &body));
    assert_eq!(response.message.as_deref(), Some("End of file"));
    assert_eq!(response.language_tag.as_deref(), Some("en"));
    assert_eq!(response.payload, ResponsePayload::None);
}

#[test]
fn test_name_longname_per_version() {
    let mut v3_body = 1_u32.to_be_bytes().to_vec();
    v3_body.extend(string(b"file"));
    v3_body.extend(string(b"-rw-r--r-- 1 alice staff 0 Jan 1 file"));
    v3_body.extend_from_slice(&[0, 0, 0, 0]);

    let entry = parse(&protocol::ProtocolV3, frame(SSH_FXP_NAME, 1, &v3_body))
        .into_name()
        .unwrap();
    assert_eq!(&*entry.filename, b"file");
    assert!(entry.longname.is_some());

    let mut v4_body = 1_u32.to_be_bytes().to_vec();
    v4_body.extend(string(b"file"));
    v4_body.extend_from_slice(&[0, 0, 0, 0, SSH_FILEXFER_TYPE_REGULAR]);

    let entry = parse(&protocol::ProtocolV4, frame(SSH_FXP_NAME, 1, &v4_body))
        .into_name()
        .unwrap();
    assert_eq!(entry.longname, None);
    assert_eq!(entry.attrs.get_filetype(), Some(FileType::Regular));

    v4_body.push(1);
    match parse(&protocol::ProtocolV6, frame(SSH_FXP_NAME, 1, &v4_body)).payload {
        ResponsePayload::Name { entries, end_of_list } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(end_of_list, Some(true));
        }
        payload => panic!("Unexpected payload {payload:#?}"),
    }
}

#[test]
fn test_data_end_of_file() {
    let body = string(b"abc");

    match parse(&protocol::ProtocolV6, frame(SSH_FXP_DATA, 2, &body)).payload {
        ResponsePayload::Data { data, end_of_file } => {
            assert_eq!(&*data, b"abc");
            assert_eq!(end_of_file, None);
        }
        payload => panic!("Unexpected payload {payload:#?}"),
    }

    let mut body = body;
    body.push(1);
    match parse(&protocol::ProtocolV6, frame(SSH_FXP_DATA, 2, &body)).payload {
        ResponsePayload::Data { end_of_file, .. } => assert_eq!(end_of_file, Some(true)),
        payload => panic!("Unexpected payload {payload:#?}"),
    }
}

#[test]
fn test_handle_and_attrs() {
    let response = parse(
        &protocol::ProtocolV3,
        frame(SSH_FXP_HANDLE, 5, &string(&[0, 0, 0, 1])),
    );
    assert_eq!(
        response.into_handle().unwrap().as_bytes(),
        &[0, 0, 0, 1][..]
    );

    let mut body = SSH_FILEXFER_ATTR_SIZE.to_be_bytes().to_vec();
    body.extend_from_slice(&42_u64.to_be_bytes());
    let attrs = parse(&protocol::ProtocolV3, frame(SSH_FXP_ATTRS, 6, &body))
        .into_attrs()
        .unwrap();
    assert_eq!(attrs.get_size(), Some(42));
    assert_eq!(attrs.get_id(), None);
}

#[test]
fn test_request_is_not_a_response() {
    let frame = frame(SSH_FXP_OPEN, 1, &[]);
    let mut reader = ReaderBuffered::new(64, OPENSSH_PORTABLE_MAX_MSG_LENGTH);
    reader.extend_from_slice(&frame);

    let mut packet = reader.next_packet().unwrap().unwrap();
    let id = packet.payload().read_u32().unwrap();

    assert!(matches!(
        protocol::ProtocolV3.parse_response(packet.packet_type(), id, packet.payload()),
        Err(Error::UnhandledPacketType {
            packet_type: SSH_FXP_OPEN
        })
    ));
}
