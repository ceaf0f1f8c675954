// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

use routeros_api::protocol::{
    MAX_WORD_LENGTH, decode_length, encode_length, parse_reply, read_word, write_word,
};
use routeros_api::{Error, ProtocolError, Reply};
use tokio::io::{AsyncWriteExt, duplex};

#[test]
fn test_length_tier_edges() {
    let cases: [(u64, &[u8]); 14] = [
        (0, &[0x00]),
        (0x7F, &[0x7F]),
        (0x80, &[0x80, 0x80]),
        (0x100, &[0x81, 0x00]),
        (0x3FFF, &[0xBF, 0xFF]),
        (0x4000, &[0xC0, 0x40, 0x00]),
        (0x1F_FFFF, &[0xDF, 0xFF, 0xFF]),
        (0x0020_0000, &[0xE0, 0x20, 0x00, 0x00]),
        (0x0FFF_FFFF, &[0xEF, 0xFF, 0xFF, 0xFF]),
        (0x1000_0000, &[0xF0, 0x10, 0x00, 0x00, 0x00]),
        (0xFFFF_FFFF, &[0xF0, 0xFF, 0xFF, 0xFF, 0xFF]),
        (0x1_0000_0000, &[0xF1, 0x00, 0x00, 0x00, 0x00]),
        (0x7_0000_0001, &[0xF7, 0x00, 0x00, 0x00, 0x01]),
        (MAX_WORD_LENGTH, &[0xF7, 0xFF, 0xFF, 0xFF, 0xFF]),
    ];

    for (value, expected) in cases {
        let encoded = encode_length(value).unwrap();
        assert_eq!(encoded, expected, "encoding of {value:#X}");
        assert_eq!(
            decode_length(&encoded).unwrap(),
            (value, expected.len()),
            "decoding of {encoded:02X?}"
        );
    }

    // one more bit would spill into the control-byte range
    for too_long in [MAX_WORD_LENGTH + 1, 0x7F_FFFF_FFFF] {
        assert_eq!(
            encode_length(too_long),
            Err(ProtocolError::LengthOutOfRange(too_long))
        );
    }
}

#[tokio::test]
async fn test_word_round_trip_over_stream() {
    let lengths = [0usize, 1, 127, 128, 254, 255, 10_000];
    let (mut writer, mut reader) = duplex(64 * 1024);

    for len in lengths {
        let word = vec![b'x'; len];
        let written = write_word(&mut writer, &word).await.unwrap();
        assert_eq!(written, encode_length(len as u64).unwrap().len() + len);
        assert_eq!(read_word(&mut reader).await.unwrap(), word);
    }
}

#[tokio::test]
async fn test_read_word_control_byte_is_protocol_error() {
    let (mut writer, mut reader) = duplex(64);
    writer.write_all(&[0xF8]).await.unwrap();

    let err = read_word(&mut reader).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::ControlWord(0xF8))
    ));
}

#[tokio::test]
async fn test_read_word_truncated_stream() {
    let (mut writer, mut reader) = duplex(64);
    writer.write_all(&[0x05, b'a', b'b']).await.unwrap();
    drop(writer);

    assert!(matches!(
        read_word(&mut reader).await,
        Err(Error::Stream(_))
    ));
}

#[test]
fn test_parse_reply_rows_and_after() {
    let reply = parse_reply(&[
        "!re",
        "=.id=*1",
        "=name=ether1",
        "!re",
        "=.id=*2",
        "=name=ether2",
        "!done",
        "=ret=ok",
    ]);
    let Reply::Data(response) = reply else {
        panic!("expected parsed rows");
    };
    assert_eq!(response.rows.len(), 2);
    assert_eq!(response.rows[1]["name"], "ether2");
    assert_eq!(response.after_value("ret"), Some("ok"));
}

#[test]
fn test_parse_reply_value_keeps_equals() {
    let reply = parse_reply(&["!re", "=comment=a=b=c", "!done"]);
    assert_eq!(reply.rows()[0]["comment"], "a=b=c");
}

#[test]
fn test_parse_reply_fatal_is_raw() {
    let reply = parse_reply(&["!fatal", "session terminated"]);
    assert!(reply.is_fatal());
    assert_eq!(
        reply.into_words().unwrap(),
        vec!["!fatal", "session terminated"]
    );
}
