//! Property tests: the parsed request must not depend on how the bytes
//! were split across reads.

use h1wire_core::testing::ChunkReader;
use h1wire_core::{request_from_reader, Error, Method, ParseError, RequestParser, RequestReader};
use proptest::prelude::*;

fn arbitrary_method() -> impl Strategy<Value = Method> {
    prop::sample::select(Method::ALL.to_vec())
}

fn valid_target() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9_-]{0,12}".prop_map(|s| format!("/{s}")),
        ("[a-z]{1,8}", 1u32..1000).prop_map(|(a, id)| format!("/{a}/{id}")),
        Just("*".to_string()),
    ]
}

fn valid_headers() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("x-[a-z]{1,6}", "[a-zA-Z0-9/*;=.]{1,16}"), 0..6)
}

fn wire(method: Method, target: &str, headers: &[(String, String)], body: &[u8]) -> Vec<u8> {
    let mut out = format!("{method} {target} HTTP/1.1\r\n").into_bytes();
    for (name, value) in headers {
        out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    if !body.is_empty() {
        out.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    }
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);
    out
}

proptest! {
    #[test]
    fn chunk_size_does_not_change_result(
        method in arbitrary_method(),
        target in valid_target(),
        headers in valid_headers(),
        body in prop::collection::vec(any::<u8>(), 0..64),
        per_read in 1usize..32,
        buffer_size in 1usize..16,
    ) {
        let data = wire(method, &target, &headers, &body);
        let whole = request_from_reader(ChunkReader::new(&data, data.len())).unwrap();
        let chunked = RequestReader::with_buffer_size(buffer_size)
            .read_from(ChunkReader::new(&data, per_read))
            .unwrap();

        prop_assert_eq!(&chunked, &whole);
        prop_assert_eq!(chunked.method(), method);
        prop_assert_eq!(chunked.target(), target.as_str());
        prop_assert_eq!(chunked.body().as_ref(), body.as_slice());
        for (name, _) in &headers {
            prop_assert!(chunked.headers().contains(name));
        }
    }

    #[test]
    fn done_ignores_further_input(
        trailing in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut parser = RequestParser::new();
        parser.parse(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nok").unwrap();
        prop_assert!(parser.is_done());
        prop_assert_eq!(parser.parse(&trailing).unwrap(), 0);
        prop_assert!(parser.is_done());
    }

    #[test]
    fn space_before_colon_rejected_at_every_split(per_read in 1usize..40) {
        let data = "GET / HTTP/1.1\r\nHost: ok\r\nAccept : */*\r\n\r\n";
        let err = request_from_reader(ChunkReader::new(data, per_read)).unwrap_err();
        prop_assert!(matches!(err, Error::Parse(ParseError::SpaceBeforeColon)));
    }

    #[test]
    fn missing_colon_rejected_at_every_split(per_read in 1usize..40) {
        let data = "GET / HTTP/1.1\r\nHost: ok\r\nHost localhost\r\n\r\n";
        let err = request_from_reader(ChunkReader::new(data, per_read)).unwrap_err();
        prop_assert!(matches!(err, Error::Parse(ParseError::MissingColon)));
    }

    #[test]
    fn never_consumes_more_than_offered(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut parser = RequestParser::new();
        if let Ok(n) = parser.parse(&data) {
            prop_assert!(n <= data.len());
        }
    }
}
