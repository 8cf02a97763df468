//! Periodic scan scheduler
//!
//! A monitor owns one background thread that runs a scan cycle over every
//! registered observer at a fixed interval. Intervals are measured from the
//! start of one cycle to the start of the next; a cycle that overruns the
//! interval is followed immediately by the next one. Monitors share no
//! state with each other.

use crate::error::{panic_message, Result, WatchError};
use crate::observer::Observer;
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Shared handle to an observer registered with a monitor
pub type SharedObserver = Arc<Mutex<Observer>>;

/// Capacity of the error channel; errors beyond it are only logged
const ERROR_CHANNEL_CAPACITY: usize = 256;

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Time between the starts of two cycles (default: 5 seconds)
    #[serde(default = "default_interval")]
    pub interval: Duration,

    /// Name of the background thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl MonitorConfig {
    /// Default configuration with the given interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Set the background thread name
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            thread_name: default_thread_name(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_thread_name() -> String {
    "fsmon-monitor".to_string()
}

/// Lifecycle state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Accepting observers, not yet scanning
    Created,
    /// Background thread is scanning
    Running,
    /// Stopped for good
    Stopped,
}

enum Lifecycle {
    Created,
    Running {
        stop_tx: Sender<()>,
        handle: JoinHandle<()>,
    },
    Stopped,
}

/// State shared with the background thread
struct Shared {
    observers: RwLock<Vec<SharedObserver>>,
    error_tx: Sender<WatchError>,
}

impl Shared {
    /// Scan every observer once, in registration order
    fn run_cycle(&self) {
        // Registration changes during the cycle apply from the next one
        let observers = self.observers.read().clone();

        for observer in observers {
            let mut guard = observer.lock();
            let root = guard.root().to_path_buf();

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                if guard.is_initialized() {
                    guard.check_and_notify().errors
                } else {
                    guard.initialize();
                    Vec::new()
                }
            }));

            match outcome {
                Ok(errors) => errors.into_iter().for_each(|e| self.report(e)),
                Err(payload) => self.report(WatchError::ObserverPanic {
                    root,
                    message: panic_message(payload.as_ref()),
                }),
            }
        }
    }

    fn report(&self, error: WatchError) {
        warn!("{error}");
        if let Err(TrySendError::Full(_)) = self.error_tx.try_send(error) {
            debug!("Error channel full, dropping error");
        }
    }
}

/// Scheduler driving periodic scan cycles over its observers
///
/// Lifecycle is `Created -> Running -> Stopped`; a monitor runs at most once.
pub struct Monitor {
    config: MonitorConfig,
    shared: Arc<Shared>,
    error_rx: Receiver<WatchError>,
    lifecycle: Mutex<Lifecycle>,
}

impl Monitor {
    /// Create a monitor scanning every `interval`
    pub fn new(interval: Duration) -> Self {
        Self::with_config(MonitorConfig::new(interval))
    }

    /// Create a monitor from a full configuration
    pub fn with_config(config: MonitorConfig) -> Self {
        let (error_tx, error_rx) = bounded(ERROR_CHANNEL_CAPACITY);

        Self {
            config,
            shared: Arc::new(Shared {
                observers: RwLock::new(Vec::new()),
                error_tx,
            }),
            error_rx,
            lifecycle: Mutex::new(Lifecycle::Created),
        }
    }

    /// Time between the starts of two cycles
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Configuration this monitor was built with
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> MonitorState {
        match *self.lifecycle.lock() {
            Lifecycle::Created => MonitorState::Created,
            Lifecycle::Running { .. } => MonitorState::Running,
            Lifecycle::Stopped => MonitorState::Stopped,
        }
    }

    /// Register an observer and return the handle used to reach it later
    pub fn add_observer(&self, observer: Observer) -> SharedObserver {
        let handle = Arc::new(Mutex::new(observer));
        self.add_shared(handle.clone());
        handle
    }

    /// Register an observer that is also referenced elsewhere
    pub fn add_shared(&self, observer: SharedObserver) {
        debug!(root = %observer.lock().root().display(), "Observer added");
        self.shared.observers.write().push(observer);
    }

    /// Unregister an observer. Returns whether it was registered.
    pub fn remove_observer(&self, observer: &SharedObserver) -> bool {
        let mut observers = self.shared.observers.write();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != before
    }

    /// Registered observers, in registration order
    pub fn observers(&self) -> Vec<SharedObserver> {
        self.shared.observers.read().clone()
    }

    /// Receiver for errors contained during cycles
    ///
    /// Every contained error is also logged. The channel is bounded; when
    /// nobody drains it, further errors are only logged.
    pub fn errors(&self) -> Receiver<WatchError> {
        self.error_rx.clone()
    }

    /// Take baselines and begin periodic scanning on a background thread
    ///
    /// Observers registered so far are initialized before this returns, so
    /// any change made afterwards is reported by a later cycle.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match &*lifecycle {
            Lifecycle::Running { .. } => return Err(WatchError::AlreadyRunning),
            Lifecycle::Stopped => return Err(WatchError::AlreadyStopped),
            Lifecycle::Created => {}
        }

        for observer in self.observers() {
            let mut guard = observer.lock();
            if !guard.is_initialized() {
                guard.initialize();
            }
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let shared = self.shared.clone();
        let interval = self.config.interval;

        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run(shared, interval, stop_rx));

        match spawned {
            Ok(handle) => {
                info!(
                    "Monitor started (interval: {:?}, observers: {})",
                    interval,
                    self.shared.observers.read().len()
                );
                *lifecycle = Lifecycle::Running { stop_tx, handle };
                Ok(())
            }
            Err(err) => {
                *lifecycle = Lifecycle::Stopped;
                Err(WatchError::Spawn(err))
            }
        }
    }

    /// Stop scanning after the in-flight cycle, if any, completes
    ///
    /// No-op unless running. When called from a listener on the monitor's
    /// own thread, the stop is requested but not waited for.
    pub fn stop(&self) {
        let previous = {
            let mut lifecycle = self.lifecycle.lock();
            if !matches!(&*lifecycle, Lifecycle::Running { .. }) {
                return;
            }
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        };

        if let Lifecycle::Running { stop_tx, handle } = previous {
            drop(stop_tx);
            if handle.thread().id() == thread::current().id() {
                debug!("Stop requested from the monitor thread");
                return;
            }
            if handle.join().is_err() {
                warn!("Monitor thread panicked");
            }
            info!("Monitor stopped");
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background loop: wait out the interval, scan, repeat until stopped
fn run(shared: Arc<Shared>, interval: Duration, stop_rx: Receiver<()>) {
    let mut next_cycle = Instant::now() + interval;

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(crossbeam_channel::at(next_cycle)) -> _ => {}
        }

        let started = Instant::now();
        shared.run_cycle();
        debug!("Cycle finished in {:?}", started.elapsed());

        // Overrunning cycles are followed immediately by the next one
        next_cycle = started + interval;
    }

    debug!("Monitor loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.thread_name, "fsmon-monitor");

        let config = MonitorConfig::new(Duration::from_millis(10)).with_thread_name("t");
        let monitor = Monitor::with_config(config);
        assert_eq!(monitor.interval(), Duration::from_millis(10));
        assert_eq!(monitor.config().thread_name, "t");
    }

    #[test]
    fn test_lifecycle_transitions() {
        let monitor = Monitor::new(Duration::from_millis(20));
        assert_eq!(monitor.state(), MonitorState::Created);

        // Stopping before start is a no-op
        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Created);

        monitor.start().unwrap();
        assert_eq!(monitor.state(), MonitorState::Running);
        assert!(matches!(monitor.start(), Err(WatchError::AlreadyRunning)));

        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Stopped);
        monitor.stop();
        assert!(matches!(monitor.start(), Err(WatchError::AlreadyStopped)));
    }

    #[test]
    fn test_start_initializes_registered_observers() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();

        let monitor = Monitor::new(Duration::from_secs(3600));
        let observer = monitor.add_observer(Observer::new(temp_dir.path()));
        assert!(!observer.lock().is_initialized());

        monitor.start().unwrap();
        assert!(observer.lock().is_initialized());
        monitor.stop();
    }

    #[test]
    fn test_add_and_remove_observers() {
        let temp_dir = TempDir::new().unwrap();
        let monitor = Monitor::new(Duration::from_secs(1));

        let first = monitor.add_observer(Observer::new(temp_dir.path().join("one")));
        let second = monitor.add_observer(Observer::new(temp_dir.path().join("two")));
        assert_eq!(monitor.observers().len(), 2);

        assert!(monitor.remove_observer(&first));
        assert!(!monitor.remove_observer(&first));

        let remaining = monitor.observers();
        assert_eq!(remaining.len(), 1);
        assert!(Arc::ptr_eq(&remaining[0], &second));
    }

    #[test]
    fn test_run_cycle_initializes_late_observers() {
        let temp_dir = TempDir::new().unwrap();
        let monitor = Monitor::new(Duration::from_secs(1));
        let observer = monitor.add_observer(Observer::new(temp_dir.path()));

        monitor.shared.run_cycle();
        assert!(observer.lock().is_initialized());
    }
}
