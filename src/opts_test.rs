use crate::Opts;
use crate::constant::{DEFAULT_BLOCK_CAPACITY, DEFAULT_RECORD_SIZE};
use crate::error::Error;

#[test]
fn default_opts() {
    let opts = Opts::default();
    assert!(opts.tcp_nodelay);
    assert!(opts.host.is_none());
    assert_eq!(opts.port, 5432);
    assert!(opts.socket.is_none());
    assert_eq!(opts.record_size, DEFAULT_RECORD_SIZE);
    assert_eq!(opts.block_capacity, DEFAULT_BLOCK_CAPACITY);
}

#[test]
fn parse_basic_url() {
    let opts = Opts::try_from("postgres://localhost").unwrap();
    assert_eq!(opts.host.as_deref(), Some("localhost"));
    assert_eq!(opts.port, 5432);
}

#[test]
fn parse_postgresql_scheme_with_port() {
    let opts = Opts::try_from("postgresql://db.example.com:6543").unwrap();
    assert_eq!(opts.host.as_deref(), Some("db.example.com"));
    assert_eq!(opts.port, 6543);
}

#[test]
fn parse_block_params() {
    let opts =
        Opts::try_from("postgres://localhost?record_size=128&block_capacity=65536").unwrap();
    assert_eq!(opts.record_size, 128);
    assert_eq!(opts.block_capacity, 65536);
    let size = opts.block_size();
    assert_eq!(size.record_size, 128);
    assert_eq!(size.capacity, 65536);
}

#[test]
fn parse_socket_param() {
    let opts = Opts::try_from("postgres://localhost?socket=/var/run/postgresql/.s.PGSQL.5432")
        .unwrap();
    assert_eq!(
        opts.socket.as_deref(),
        Some("/var/run/postgresql/.s.PGSQL.5432")
    );
}

#[test]
fn parse_tcp_nodelay_param() {
    let opts = Opts::try_from("postgres://localhost?tcp_nodelay=false").unwrap();
    assert!(!opts.tcp_nodelay);
}

#[test]
fn reject_wrong_scheme() {
    let err = Opts::try_from("mysql://localhost").unwrap_err();
    assert!(matches!(err, Error::BadConfigError(_)));
}

#[test]
fn reject_bad_number() {
    let err = Opts::try_from("postgres://localhost?block_capacity=lots").unwrap_err();
    assert!(matches!(err, Error::BadConfigError(_)));
}

#[test]
fn reject_zero_record_size() {
    let err = Opts::try_from("postgres://localhost?record_size=0").unwrap_err();
    assert!(matches!(err, Error::BadConfigError(_)));
}

#[test]
fn reject_unknown_param() {
    let err = Opts::try_from("postgres://localhost?compress=true").unwrap_err();
    assert!(matches!(err, Error::BadConfigError(_)));
}
