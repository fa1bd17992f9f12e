//! Timeout scenario (spec.md §8): a handler that never responds yields a
//! Timeout response within `HardQueryTimeout + ε`.

use std::time::{Duration, Instant};

use portcall_client::CallError;
use portcall_test::TestServer;

#[test]
fn blocked_handler_times_out_within_the_hard_deadline() {
    let server = TestServer::start(
        TestServer::builder()
            .register("sleep", |_: i32| {
                std::thread::sleep(Duration::from_secs(10));
                Ok::<i32, String>(0)
            })
            .unwrap(),
    );
    let client = server.connect_with(Duration::from_millis(100));

    let start = Instant::now();
    let err = client.call::<i32, i32>("sleep", 1).unwrap_err();
    let elapsed = start.elapsed();

    assert!(matches!(err, CallError::Timeout));
    assert!(elapsed < Duration::from_millis(250), "took {elapsed:?}");
}
