//! Unknown-handler and handler-failure scenarios (spec.md §7, §8).

use portcall_client::CallError;
use portcall_test::TestServer;

#[test]
fn unknown_handler_reports_the_handler_name() {
    let server = TestServer::start(TestServer::builder());
    let client = server.client();

    let err = client.call::<i32, i32>("nope", 1).unwrap_err();
    match err {
        CallError::Remote(msg) => assert!(msg.contains("nope"), "message was: {msg}"),
        other => panic!("expected CallError::Remote, got {other:?}"),
    }
}

#[test]
fn handler_error_is_returned_verbatim() {
    let server = TestServer::start(
        TestServer::builder()
            .register("boom", |_: i32| Err::<i32, _>("x"))
            .unwrap(),
    );
    let client = server.client();

    let err = client.call::<i32, i32>("boom", 0).unwrap_err();
    match err {
        CallError::Remote(msg) => assert_eq!(msg, "x"),
        other => panic!("expected CallError::Remote(\"x\"), got {other:?}"),
    }
}

#[test]
fn handler_panic_is_converted_to_a_failure_response() {
    let server = TestServer::start(
        TestServer::builder()
            .register("boom", |_: i32| -> Result<i32, String> { panic!("kaboom") })
            .unwrap(),
    );
    let client = server.client();

    let err = client.call::<i32, i32>("boom", 0).unwrap_err();
    match err {
        CallError::Remote(msg) => assert_eq!(msg, "kaboom"),
        other => panic!("expected CallError::Remote(\"kaboom\"), got {other:?}"),
    }

    // the worker that caught the panic must still serve later calls (§7:
    // "any failure is converted to a failure Response"; no worker exits).
    let ok: i32 = client.call("_ping", 5).unwrap();
    assert_eq!(ok, 5);
}

#[test]
fn registering_the_same_name_twice_fails() {
    let builder = TestServer::builder().register("dup", |x: i32| Ok::<_, String>(x)).unwrap();
    assert!(builder.register("dup", |x: i32| Ok::<_, String>(x)).is_err());
}

#[test]
fn registering_a_reserved_name_fails() {
    let builder = TestServer::builder();
    assert!(builder.register("_custom", |x: i32| Ok::<_, String>(x)).is_err());
}
