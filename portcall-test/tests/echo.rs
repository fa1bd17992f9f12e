//! Echo scenario (spec.md §8): register `"echo"` as `int -> int` returning
//! `x + 1`; a client call with `7` decodes to `8`.

use portcall_test::TestServer;

#[test]
fn echo_returns_incremented_value() {
    portcall_test::init_tracing();
    let server = TestServer::start(
        TestServer::builder()
            .register("echo", |x: i32| Ok::<_, String>(x + 1))
            .unwrap(),
    );
    let client = server.client();

    let result: i32 = client.call("echo", 7i32).unwrap();
    assert_eq!(result, 8);
}

#[test]
fn echo_handles_many_sequential_calls_on_one_connection() {
    let server = TestServer::start(
        TestServer::builder()
            .register("echo", |x: i32| Ok::<_, String>(x + 1))
            .unwrap(),
    );
    let client = server.client();

    for i in 0..50 {
        let result: i32 = client.call("echo", i).unwrap();
        assert_eq!(result, i + 1);
    }
}
