//! Small injected capabilities: randomness, hashing and time.
//!
//! [`MusicSession`](crate::music::MusicSession) never reaches for an ambient
//! RNG, digest or clock; it receives these through [`Capabilities`] so tests
//! can pin every input.

use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};

use crate::http::HttpClient;
use crate::storage::KeyValueStore;

/// Source of cryptographically secure random bytes.
pub trait RandomBytesSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}

/// Thread-local CSPRNG from `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomBytesSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) {
        rand::rng().fill_bytes(buf);
    }
}

/// SHA-256 digest.
pub trait DigestFunction: Send + Sync {
    fn sha256(&self, data: &[u8]) -> [u8; 32];
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Digest;

impl DigestFunction for Sha256Digest {
    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Used by tests and by the session
/// tests to step across token expiry.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Everything a session needs from its environment.
#[derive(Clone)]
pub struct Capabilities {
    pub store: Arc<dyn KeyValueStore>,
    pub http: Arc<dyn HttpClient>,
    pub random: Arc<dyn RandomBytesSource>,
    pub digest: Arc<dyn DigestFunction>,
    pub clock: Arc<dyn Clock>,
}

impl Capabilities {
    /// Production wiring: OS randomness, SHA-256 and the system clock.
    pub fn new(store: Arc<dyn KeyValueStore>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            store,
            http,
            random: Arc::new(OsRandom),
            digest: Arc::new(Sha256Digest),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_random(mut self, random: Arc<dyn RandomBytesSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
