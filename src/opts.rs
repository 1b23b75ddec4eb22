use std::sync::Arc;

use crate::buffer_pool::{ArenaPool, GLOBAL_ARENA_POOL};
use crate::constant::{DEFAULT_BLOCK_CAPACITY, DEFAULT_RECORD_SIZE};
use crate::error::Error;
use crate::record_block::BlockSize;

/// A configuration for the transport and for sizing record blocks
///
/// ```rs
/// let mut opts1 = Opts::default();
/// opts1.block_capacity = 1 << 20;
///
/// let opts2 = Opts::try_from("postgres://localhost:5432?record_size=128")?;
/// ```
#[derive(Debug, Clone)]
pub struct Opts {
    /// Enable TCP_NODELAY socket option to disable Nagle's algorithm
    /// Unix socket is not affected
    pub tcp_nodelay: bool,

    /// Hostname or IP address
    pub host: Option<String>,

    /// Port number for the PostgreSQL server
    pub port: u16,

    /// Unix socket path. Takes precedence over `host`.
    pub socket: Option<String>,

    /// Expected mean DataRow body size, used to presize field lists
    pub record_size: usize,

    /// Arena capacity of each record block in bytes
    pub block_capacity: usize,

    pub arena_pool: Arc<ArenaPool>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            host: None,
            port: 5432,
            socket: None,
            record_size: DEFAULT_RECORD_SIZE,
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            arena_pool: Arc::clone(&GLOBAL_ARENA_POOL),
        }
    }
}

impl Opts {
    pub fn block_size(&self) -> BlockSize {
        BlockSize {
            record_size: self.record_size,
            capacity: self.block_capacity,
        }
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        // Parse URL
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::BadConfigError(format!("Failed to parse PostgreSQL URL: {}", e)))?;

        // Verify scheme
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(Error::BadConfigError(format!(
                "Invalid URL scheme '{}', expected 'postgres'",
                parsed.scheme()
            )));
        }

        let mut opts = Self {
            host: parsed.host_str().map(ToString::to_string),
            port: parsed.port().unwrap_or(5432),
            ..Default::default()
        };

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "socket" => opts.socket = Some(value.into_owned()),
                "tcp_nodelay" => opts.tcp_nodelay = parse_param(&key, &value)?,
                "record_size" => opts.record_size = parse_param(&key, &value)?,
                "block_capacity" => opts.block_capacity = parse_param(&key, &value)?,
                _ => {
                    return Err(Error::BadConfigError(format!(
                        "Unknown connection parameter '{}'",
                        key
                    )));
                }
            }
        }

        if opts.record_size == 0 {
            return Err(Error::BadConfigError(
                "record_size must be positive".to_string(),
            ));
        }

        Ok(opts)
    }
}

impl TryFrom<String> for Opts {
    type Error = Error;

    fn try_from(url: String) -> Result<Self, Self::Error> {
        Self::try_from(url.as_str())
    }
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| Error::BadConfigError(format!("Invalid value '{}' for '{}'", value, key)))
}
