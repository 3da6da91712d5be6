use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Failure-threshold circuit breaker shared across every LLM Gateway
/// operation. Closed → Open after `failure_threshold` consecutive
/// failures; Open → HalfOpen after `timeout` elapses; one successful
/// HalfOpen probe closes it again, one failure reopens it.
pub struct CircuitBreaker {
    failure_threshold: u32,
    timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            failure_threshold,
            timeout,
            inner: Mutex::new(Inner {
                state: State::Closed,
                failure_count: 0,
                opened_at: None,
            }),
        }
    }

    /// Returns `Err` if the breaker is open and the timeout has not yet
    /// elapsed. Otherwise transitions Open → HalfOpen when due and allows
    /// the call through.
    pub fn check(&self) -> Result<(), crate::errors::PipelineError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::Closed | State::HalfOpen => Ok(()),
            State::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.timeout {
                    inner.state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(crate::errors::PipelineError::CircuitOpen(
                        "llm gateway".to_string(),
                    ))
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = State::Closed;
        inner.failure_count = 0;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            State::HalfOpen => {
                inner.state = State::Open;
                inner.opened_at = Some(Instant::now());
            }
            State::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.failure_threshold {
                    inner.state = State::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        for _ in 0..2 {
            breaker.record_failure();
            assert!(breaker.check().is_ok());
        }
        breaker.record_failure();
        assert!(breaker.check().is_err());
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        assert!(breaker.check().is_err()); // just opened, timeout not elapsed
        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.check().is_ok()); // transitions to half-open
        breaker.record_failure();
        assert!(breaker.check().is_err()); // reopened, timeout not elapsed again
    }

    #[test]
    fn success_fully_resets_breaker() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        assert!(breaker.check().is_ok());
    }
}
