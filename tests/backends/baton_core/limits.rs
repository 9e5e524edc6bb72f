use std::env;

use baton_core::errors::{ArgumentError, BatonError};
use baton_core::limits::{get_max_workers, MAX_WORKERS_ENV, WORKERS_MAX};
use baton_core::relay::{Budget, Coordinator, RelayConfig};
use serial_test::serial;
use tracing_test::traced_test;

#[test]
#[traced_test]
fn coordinator_rejects_more_workers_than_allowed() {
    let err = Coordinator::new(RelayConfig::new(4, Budget::Units(1)))
        .with_max_workers(3)
        .run()
        .expect_err("over the limit");
    assert!(matches!(
        err,
        BatonError::Argument(ArgumentError::TooManyWorkers {
            requested: 4,
            max: 3
        })
    ));
    assert_eq!(err.to_string(), "bad input: 4 workers exceeds maximum of 3");
}

#[test]
#[serial]
#[traced_test]
fn env_limit_never_exceeds_the_hard_cap() {
    // only ever raises the limit, other relays in this process are unaffected
    env::set_var(MAX_WORKERS_ENV, (WORKERS_MAX * 4).to_string());
    assert_eq!(get_max_workers(), WORKERS_MAX);
    env::remove_var(MAX_WORKERS_ENV);
}
