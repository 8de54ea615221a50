//! Application-level configuration resolved from the environment.

use std::{env, time::Duration};

use tracing::{info, warn};

/// Environment variable overriding the countdown tick interval, in
/// milliseconds. Mainly useful for demos and local testing.
const TIMER_TICK_ENV: &str = "POLLWAVE_TIMER_TICK_MS";
/// Canonical one-second tick broadcast to clients as `timerUpdate`.
const DEFAULT_TIMER_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    timer_tick: Duration,
}

impl AppConfig {
    /// Resolve the configuration, falling back to defaults on absent or
    /// unparseable overrides.
    pub fn load() -> Self {
        let timer_tick = match env::var(TIMER_TICK_ENV) {
            Ok(raw) => match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => {
                    info!(ms, "using timer tick override from {TIMER_TICK_ENV}");
                    Duration::from_millis(ms)
                }
                _ => {
                    warn!(
                        value = %raw,
                        "invalid {TIMER_TICK_ENV}; falling back to 1s tick"
                    );
                    DEFAULT_TIMER_TICK
                }
            },
            Err(_) => DEFAULT_TIMER_TICK,
        };

        Self { timer_tick }
    }

    /// Interval between countdown ticks for timed questions.
    pub fn timer_tick(&self) -> Duration {
        self.timer_tick
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timer_tick: DEFAULT_TIMER_TICK,
        }
    }
}

#[cfg(test)]
impl AppConfig {
    /// Build a configuration with a custom tick, for timer-driven tests.
    pub fn with_timer_tick(timer_tick: Duration) -> Self {
        Self { timer_tick }
    }
}
