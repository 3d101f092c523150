// Transport clock - tick-relative callback scheduling over wall time
// The playback scheduler talks to this capability only; production
// playback uses TickTransport, tests inject an instrumented double

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use tracing::warn;

use super::timeline::{DEFAULT_PPQ, Tempo};

/// Opaque handle identifying one scheduled callback.
pub type ClockHandle = u64;

/// When a scheduled callback fired: the tick it was registered for and
/// the instant that tick was due. Downstream audio triggering uses `due`
/// rather than "now" so callback dispatch latency does not shift the
/// audible onset.
#[derive(Debug, Clone, Copy)]
pub struct FireTime {
    pub tick: u64,
    pub due: Instant,
}

/// Callback scheduled on the transport. Fired at most once.
pub type ClockCallback = Box<dyn FnOnce(FireTime) + Send>;

/// Tick-relative transport the playback scheduler rides on.
///
/// Scheduling against a stopped transport is legal: callbacks are held
/// and only become due once `start` runs the transport, so a full event
/// list can be registered up front without clock jitter distorting the
/// first notes. Cancellation is synchronous: after `cancel` or
/// `cancel_all` return, the cancelled callback will not fire. Firing
/// order is monotonic in tick position; ties fire in registration order.
///
/// Changing the resolution mid-session is a caller error: tick positions
/// are relative to the most recently set resolution.
pub trait TransportClock: Send + Sync {
    fn set_tempo(&self, tempo: Tempo);

    /// Set the tick resolution in pulses per quarter note
    fn set_resolution(&self, ppq: u32);

    fn schedule_at(&self, tick: u64, callback: ClockCallback) -> ClockHandle;

    /// Like `schedule_at`; kept separate for one-shot terminators:
    /// transports with looping support re-fire `schedule_at` entries on
    /// every pass but never `schedule_once` ones
    fn schedule_once(&self, tick: u64, callback: ClockCallback) -> ClockHandle;

    /// No-op for a handle that already fired or was already cancelled
    fn cancel(&self, handle: ClockHandle);

    fn cancel_all(&self);

    /// Run the transport; `lead` delays tick zero so the first callbacks
    /// are not distorted by engine spin-up
    fn start(&self, lead: Duration);

    fn stop(&self);

    fn reset_position(&self);

    /// Current position in ticks
    fn position(&self) -> u64;
}

struct TransportState {
    /// Pending callbacks keyed by (tick, handle); BTreeMap iteration
    /// yields due entries in tick order with registration-order ties
    /// because handles are allocated monotonically.
    entries: BTreeMap<(u64, ClockHandle), ClockCallback>,

    /// handle -> tick, for cancellation
    index: HashMap<ClockHandle, u64>,

    running: bool,
    tempo: Tempo,
    ppq: u32,

    /// Tick position reached at `anchor_at` while running
    anchor_tick: f64,
    anchor_at: Instant,

    /// Position while stopped
    parked_tick: f64,

    /// Handle currently being invoked by the worker, if any
    firing: Option<ClockHandle>,
    worker: Option<ThreadId>,
    shutdown: bool,
}

impl TransportState {
    fn ticks_per_second(&self) -> f64 {
        self.tempo.bpm() / 60.0 * self.ppq as f64
    }

    fn due_instant(&self, tick: u64) -> Instant {
        let delta = (tick as f64 - self.anchor_tick) / self.ticks_per_second();
        if delta <= 0.0 {
            self.anchor_at
        } else {
            self.anchor_at + Duration::from_secs_f64(delta)
        }
    }

    fn position_now(&self, now: Instant) -> f64 {
        if self.running {
            let elapsed = now.saturating_duration_since(self.anchor_at);
            self.anchor_tick + elapsed.as_secs_f64() * self.ticks_per_second()
        } else {
            self.parked_tick
        }
    }

    /// Fold elapsed wall time into the anchor so a tempo or resolution
    /// change only affects ticks from this point on. Already-scheduled
    /// ticks then fire at their new effective wall time without being
    /// rescheduled.
    fn rebase(&mut self, now: Instant) {
        if self.running && now > self.anchor_at {
            self.anchor_tick = self.position_now(now);
            self.anchor_at = now;
        }
    }
}

type SharedTransportState = (Mutex<TransportState>, Condvar);

/// Wall-clock transport: a worker thread turns tick-relative schedules
/// into timed callback dispatch.
pub struct TickTransport {
    shared: Arc<SharedTransportState>,
    next_handle: AtomicU64,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl TickTransport {
    pub fn new() -> Self {
        let shared = Arc::new((
            Mutex::new(TransportState {
                entries: BTreeMap::new(),
                index: HashMap::new(),
                running: false,
                tempo: Tempo::default(),
                ppq: DEFAULT_PPQ,
                anchor_tick: 0.0,
                anchor_at: Instant::now(),
                parked_tick: 0.0,
                firing: None,
                worker: None,
                shutdown: false,
            }),
            Condvar::new(),
        ));

        let worker_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || Self::run(worker_shared));

        Self {
            shared,
            next_handle: AtomicU64::new(1),
            worker: Mutex::new(Some(handle)),
        }
    }

    fn run(shared: Arc<SharedTransportState>) {
        let (lock, cvar) = &*shared;
        let mut state = lock.lock().unwrap();
        state.worker = Some(thread::current().id());

        loop {
            if state.shutdown {
                return;
            }
            if !state.running {
                state = cvar.wait(state).unwrap();
                continue;
            }

            let head = state.entries.first_key_value().map(|(&key, _)| key);
            let Some((tick, handle)) = head else {
                state = cvar.wait(state).unwrap();
                continue;
            };

            let due = state.due_instant(tick);
            let now = Instant::now();
            if due <= now {
                let callback = state.entries.remove(&(tick, handle));
                state.index.remove(&handle);
                state.firing = Some(handle);
                drop(state);

                // Dispatch without holding the lock: callbacks are free
                // to schedule, cancel, or stop the transport.
                if let Some(callback) = callback {
                    callback(FireTime { tick, due });
                }

                state = lock.lock().unwrap();
                state.firing = None;
                cvar.notify_all();
            } else {
                let (next, _) = cvar.wait_timeout(state, due - now).unwrap();
                state = next;
            }
        }
    }

    fn insert(&self, tick: u64, callback: ClockCallback) -> ClockHandle {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.entries.insert((tick, handle), callback);
        state.index.insert(handle, tick);
        cvar.notify_all();
        handle
    }
}

impl Default for TickTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClock for TickTransport {
    fn set_tempo(&self, tempo: Tempo) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.rebase(Instant::now());
        state.tempo = tempo;
        cvar.notify_all();
    }

    fn set_resolution(&self, ppq: u32) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.rebase(Instant::now());
        state.ppq = ppq.max(1);
        cvar.notify_all();
    }

    fn schedule_at(&self, tick: u64, callback: ClockCallback) -> ClockHandle {
        self.insert(tick, callback)
    }

    fn schedule_once(&self, tick: u64, callback: ClockCallback) -> ClockHandle {
        self.insert(tick, callback)
    }

    fn cancel(&self, handle: ClockHandle) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        if let Some(tick) = state.index.remove(&handle) {
            state.entries.remove(&(tick, handle));
            cvar.notify_all();
            return;
        }

        // Already fired, already cancelled, or mid-dispatch on the
        // worker. Wait out an in-flight dispatch so cancellation stays
        // synchronous; the worker itself (a callback tearing down its
        // own session) must not wait on itself.
        while state.firing == Some(handle) && state.worker != Some(thread::current().id()) {
            state = cvar.wait(state).unwrap();
        }
    }

    fn cancel_all(&self) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.entries.clear();
        state.index.clear();
        cvar.notify_all();
        while state.firing.is_some() && state.worker != Some(thread::current().id()) {
            state = cvar.wait(state).unwrap();
        }
    }

    fn start(&self, lead: Duration) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.running = true;
        state.anchor_tick = state.parked_tick;
        state.anchor_at = Instant::now() + lead;
        cvar.notify_all();
    }

    fn stop(&self) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        if state.running {
            state.parked_tick = state.position_now(Instant::now());
            state.running = false;
        }
        cvar.notify_all();
    }

    fn reset_position(&self) {
        let (lock, cvar) = &*self.shared;
        let mut state = lock.lock().unwrap();
        state.parked_tick = 0.0;
        state.anchor_tick = 0.0;
        state.anchor_at = Instant::now();
        cvar.notify_all();
    }

    fn position(&self) -> u64 {
        let (lock, _) = &*self.shared;
        let state = lock.lock().unwrap();
        state.position_now(Instant::now()).max(0.0) as u64
    }
}

impl Drop for TickTransport {
    fn drop(&mut self) {
        let (lock, cvar) = &*self.shared;
        {
            let mut state = lock.lock().unwrap();
            state.shutdown = true;
        }
        cvar.notify_all();

        if let Some(handle) = self.worker.lock().unwrap().take() {
            if handle.join().is_err() {
                warn!("transport worker exited with a panic");
            }
        }
    }
}
