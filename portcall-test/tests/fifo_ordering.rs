//! FIFO-per-connection ordering (spec.md §5, §8 property 2): Queries
//! enqueued by a single connection in order A, B, C reach handlers in
//! that same order, regardless of worker count.

use std::{
    io::{Read, Write},
    net::TcpStream,
    sync::{Arc, Mutex},
    time::Duration,
};

use portcall_core::{decode_response, encode_query, payload::PayloadCodec, BincodeCodec, Query};
use portcall_server::ServerBuilder;

#[test]
fn queries_from_one_connection_are_handled_in_wire_order() {
    let seen = Arc::new(Mutex::new(Vec::<i32>::new()));
    let seen_handler = seen.clone();

    let server = ServerBuilder::new("127.0.0.1:0")
        .unwrap()
        .worker_threads(1)
        .register("record", move |x: i32| {
            seen_handler.lock().unwrap().push(x);
            Ok::<_, String>(x)
        })
        .unwrap()
        .build()
        .unwrap();

    let mut sock = TcpStream::connect(server.local_addr()).unwrap();
    let codec = BincodeCodec;

    for (dispatch, value) in [(1, 10), (2, 20), (3, 30)] {
        let query = Query {
            dispatch,
            handler: "record".to_owned(),
            message_data: codec.encode(&value).unwrap(),
        };
        let body = encode_query(&query);
        sock.write_all(&(body.len() as u32).to_be_bytes()).unwrap();
        sock.write_all(&body).unwrap();
    }

    for expected_dispatch in [1, 2, 3] {
        let mut len_buf = [0u8; 4];
        sock.read_exact(&mut len_buf).unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut resp_buf = vec![0u8; len];
        sock.read_exact(&mut resp_buf).unwrap();
        let response = decode_response(&resp_buf).unwrap();
        assert!(response.ok);
        assert_eq!(response.dispatch, expected_dispatch);
    }

    assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30]);

    drop(sock);
    server.handle().stop();
}
