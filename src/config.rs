use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Number of leading digest bits inspected by the proof-of-work check.
pub const POW_WINDOW_BITS: u32 = 24;

/// Minimum number of zero bits required at the front of that window.
pub const POW_DIFFICULTY: u32 = 20;

const _: () = assert!(POW_DIFFICULTY <= POW_WINDOW_BITS && POW_WINDOW_BITS <= 64);

/// Default port when none is given on the command line.
pub const DEFAULT_PORT: u16 = 3000;

/// Send/receive timeout applied to every worker connection.
pub const DEFAULT_IO_TIMEOUT_SECS: u64 = 300;

/// Proof-of-work parameters for the admission filter.
///
/// Production code always uses [`AdmissionConfig::default`], which is fixed
/// at build time by [`POW_WINDOW_BITS`] and [`POW_DIFFICULTY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Width of the digest prefix, in bits (at most 64)
    pub window_bits: u32,
    /// Required leading zero bits inside the window
    pub difficulty: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            window_bits: POW_WINDOW_BITS,
            difficulty: POW_DIFFICULTY,
        }
    }
}

impl AdmissionConfig {
    pub fn new(window_bits: u32, difficulty: u32) -> Self {
        Self {
            window_bits: window_bits.min(64),
            difficulty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Job list, one prompt per line, read once at startup
    pub jobs_path: PathBuf,
    /// Append-only `job<TAB>response` output
    pub responses_path: PathBuf,
    pub listen_addr: SocketAddr,
    /// Applies to each receive and each send on a worker connection
    pub io_timeout: Duration,
    pub admission: AdmissionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            jobs_path: PathBuf::from("jobs.txt"),
            responses_path: PathBuf::from("responses.tsv"),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            io_timeout: Duration::from_secs(DEFAULT_IO_TIMEOUT_SECS),
            admission: AdmissionConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(jobs_path: impl Into<PathBuf>, responses_path: impl Into<PathBuf>) -> Self {
        Self {
            jobs_path: jobs_path.into(),
            responses_path: responses_path.into(),
            ..Default::default()
        }
    }

    pub fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = addr;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Keep-alive ping interval: half the I/O timeout, at least one second.
    pub fn ping_interval(&self) -> Duration {
        (self.io_timeout / 2).max(Duration::from_secs(1))
    }
}
