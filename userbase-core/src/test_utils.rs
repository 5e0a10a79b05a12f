//! Test utilities shared by the userbase crates

use crate::config::{EncryptionConfig, SigningSecret, TokenConfig};
use crate::{AuthConfig, MemoryUserStore, NewUser, UserService};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Secret used by fixtures; never use it outside tests
pub const TEST_SECRET: &str = "userbase-test-signing-secret-32b";

/// Auth configuration with a low iteration count so tests stay fast
pub fn fast_auth_config() -> AuthConfig {
    AuthConfig {
        encryption: EncryptionConfig {
            iterations: 10,
            ..Default::default()
        },
        token: TokenConfig::with_secret(SigningSecret::new(TEST_SECRET)),
    }
}

/// A service over an empty in-memory store
pub fn memory_service() -> UserService {
    UserService::new(Arc::new(MemoryUserStore::new()), &fast_auth_config())
}

/// A registration request that passes validation
pub fn new_user(username: &str, password: &str) -> NewUser {
    NewUser {
        username: Some(username.to_string()),
        password: Some(password.to_string()),
        first_name: Some("Alice".to_string()),
        last_name: Some("Liddell".to_string()),
    }
}

/// Latency samples with percentile helpers
#[derive(Default)]
pub struct PerfAssert {
    samples: Vec<Duration>,
}

impl PerfAssert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sample(&mut self, duration: Duration) {
        self.samples.push(duration);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn percentile(&mut self, p: f64) -> Duration {
        assert!((0.0..=100.0).contains(&p), "Percentile must be between 0 and 100");
        assert!(!self.samples.is_empty(), "No samples recorded");

        self.samples.sort();
        let index = ((p / 100.0) * (self.samples.len() - 1) as f64).round() as usize;
        self.samples[index]
    }

    pub fn p50(&mut self) -> Duration {
        self.percentile(50.0)
    }
}

/// Runs a closure with warmup and collects per-call timings
pub struct PerfTestHarness {
    warmup_iterations: usize,
    test_iterations: usize,
}

impl Default for PerfTestHarness {
    fn default() -> Self {
        PerfTestHarness {
            warmup_iterations: 100,
            test_iterations: 1000,
        }
    }
}

impl PerfTestHarness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warmup(mut self, iterations: usize) -> Self {
        self.warmup_iterations = iterations;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.test_iterations = iterations;
        self
    }

    pub fn run<F>(&self, mut f: F) -> PerfAssert
    where
        F: FnMut(),
    {
        for _ in 0..self.warmup_iterations {
            f();
        }

        let mut perf = PerfAssert::new();
        for _ in 0..self.test_iterations {
            let start = Instant::now();
            f();
            perf.record_sample(start.elapsed());
        }

        perf
    }
}

/// Random byte strings for comparator and secret tests
pub fn random_bytes(size: usize) -> Vec<u8> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}
