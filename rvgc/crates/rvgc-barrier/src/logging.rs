//! Barrier Event Logging
//!
//! Structured events for the parts of the barrier layer that leave the fast
//! path: configuration, slow-path transfers, shared pool exhaustion, batched
//! card dirtying, forwarded-slot healing and TLAB refills.
//!
//! Fast paths never log. Diagnostics that are not events go through the
//! `log` facade.
//!
//! Log Levels:
//! - ERROR: Rejected collector input
//! - WARN: Shared pool exhausted or CAS retries used up
//! - INFO: Barrier set configured
//! - DEBUG: Slow-path transfers, TLAB refills
//! - TRACE: Per-access bookkeeping

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Log level for barrier events
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

/// Barrier event types
#[derive(Debug, Clone, PartialEq)]
pub enum BarrierEvent {
    /// Barrier set built
    Configured {
        kind: String,
        heap_size: usize,
        card_shift: u32,
    },

    /// Allocation fast path gave up
    SlowPathTaken { size: usize, shared_attempts: u32 },

    /// Shared pool could not satisfy a claim
    SharedPoolExhausted { requested: usize, available: usize },

    /// Cards dirtied by one batched post-copy hook
    CardsDirtied { first_card: usize, count: usize },

    /// Load barrier replaced a forwarded reference in place
    ReferenceHealed { from: u32, to: u32 },

    /// Thread-local pool replaced from the shared pool
    TlabRefilled { size: usize, retired_waste: usize },
}

/// Barrier logger configuration
#[derive(Debug, Clone)]
pub struct BarrierLoggerConfig {
    /// Minimum log level
    pub level: LogLevel,

    /// Enable console output
    pub console: bool,

    /// Enable JSON format
    pub json: bool,

    /// Enable timestamps
    pub timestamps: bool,
}

impl Default for BarrierLoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            console: false,
            json: false,
            timestamps: true,
        }
    }
}

/// Barrier logger - in-memory event buffer with optional console output
pub struct BarrierLogger {
    config: BarrierLoggerConfig,
    events: Mutex<Vec<(Instant, BarrierEvent)>>,
    enabled: AtomicBool,
}

impl BarrierLogger {
    /// Create new barrier logger
    pub fn new(config: BarrierLoggerConfig) -> Self {
        Self {
            config,
            events: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable logging
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Disable logging
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Check if logging is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Log a barrier event
    pub fn log(&self, event: BarrierEvent) {
        if !self.is_enabled() {
            return;
        }

        if Self::event_level(&event) > self.config.level {
            return;
        }

        if self.config.console {
            println!("{}", self.render(&event));
        }

        self.events.lock().push((Instant::now(), event));
    }

    /// Get log level for event
    pub fn event_level(event: &BarrierEvent) -> LogLevel {
        match event {
            BarrierEvent::SharedPoolExhausted { .. } => LogLevel::Warn,
            BarrierEvent::Configured { .. } => LogLevel::Info,
            BarrierEvent::SlowPathTaken { .. } | BarrierEvent::TlabRefilled { .. } => {
                LogLevel::Debug
            },
            BarrierEvent::CardsDirtied { .. } | BarrierEvent::ReferenceHealed { .. } => {
                LogLevel::Trace
            },
        }
    }

    /// Render one event as a console line
    pub fn render(&self, event: &BarrierEvent) -> String {
        let body = if self.config.json {
            Self::render_json(event)
        } else {
            Self::render_human(event)
        };

        if self.config.timestamps {
            let now = chrono::Local::now();
            format!("[{}] {}", now.format("%Y-%m-%d %H:%M:%S%.3f"), body)
        } else {
            body
        }
    }

    fn render_human(event: &BarrierEvent) -> String {
        match event {
            BarrierEvent::Configured {
                kind,
                heap_size,
                card_shift,
            } => format!(
                "[BARRIER] Configured {} barrier set (heap {} bytes, card shift {})",
                kind, heap_size, card_shift
            ),
            BarrierEvent::SlowPathTaken {
                size,
                shared_attempts,
            } => format!(
                "[BARRIER] Slow path for {} bytes after {} shared attempts",
                size, shared_attempts
            ),
            BarrierEvent::SharedPoolExhausted {
                requested,
                available,
            } => format!(
                "[BARRIER] Shared pool exhausted: requested {}, available {}",
                requested, available
            ),
            BarrierEvent::CardsDirtied { first_card, count } => {
                format!("[BARRIER] Dirtied {} cards from card {}", count, first_card)
            },
            BarrierEvent::ReferenceHealed { from, to } => {
                format!("[BARRIER] Healed reference {:#x} -> {:#x}", from, to)
            },
            BarrierEvent::TlabRefilled {
                size,
                retired_waste,
            } => format!(
                "[BARRIER] TLAB refilled with {} bytes ({} bytes retired)",
                size, retired_waste
            ),
        }
    }

    fn render_json(event: &BarrierEvent) -> String {
        let json = match event {
            BarrierEvent::Configured {
                kind,
                heap_size,
                card_shift,
            } => serde_json::json!({
                "type": "configured",
                "kind": kind,
                "heap_size": heap_size,
                "card_shift": card_shift
            }),
            BarrierEvent::SlowPathTaken {
                size,
                shared_attempts,
            } => serde_json::json!({
                "type": "slow_path_taken",
                "size": size,
                "shared_attempts": shared_attempts
            }),
            BarrierEvent::SharedPoolExhausted {
                requested,
                available,
            } => serde_json::json!({
                "type": "shared_pool_exhausted",
                "requested": requested,
                "available": available
            }),
            BarrierEvent::CardsDirtied { first_card, count } => serde_json::json!({
                "type": "cards_dirtied",
                "first_card": first_card,
                "count": count
            }),
            BarrierEvent::ReferenceHealed { from, to } => serde_json::json!({
                "type": "reference_healed",
                "from": from,
                "to": to
            }),
            BarrierEvent::TlabRefilled {
                size,
                retired_waste,
            } => serde_json::json!({
                "type": "tlab_refilled",
                "size": size,
                "retired_waste": retired_waste
            }),
        };

        json.to_string()
    }

    /// Get all events
    pub fn events(&self) -> Vec<(Instant, BarrierEvent)> {
        self.events.lock().clone()
    }

    /// Clear all events
    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        self.events.lock().len()
    }
}

impl Default for BarrierLogger {
    fn default() -> Self {
        Self::new(BarrierLoggerConfig::default())
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_LOGGER: Mutex<BarrierLogger> = Mutex::new(BarrierLogger::default());
}

/// Log a barrier event to the global logger
pub fn log_event(event: BarrierEvent) {
    GLOBAL_LOGGER.lock().log(event);
}

/// Replace the global logger
pub fn configure_logger(config: BarrierLoggerConfig) {
    *GLOBAL_LOGGER.lock() = BarrierLogger::new(config);
}

/// Global logger event count
pub fn event_count() -> usize {
    GLOBAL_LOGGER.lock().event_count()
}
