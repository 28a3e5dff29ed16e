//! Master/consumer election and the consumer polling loop.
//!
//! ```text
//! Uninitialized --start--> Master   (no live master; drives the hardware)
//!               \--------> Consumer (live master; polls the segment)
//! Consumer --10 stale reads, master dead--> Master
//! any --dispose--> Disposed
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use openstride_bridge::{HardwareBridge, NativeBridge, SampleProcessor, SampleSink};
use openstride_errors::SharedMemoryError;
use openstride_filters::RawSample;
use openstride_state::{MotionCounters, unix_time_ms};
use parking_lot::Mutex;

use crate::probe::ProcessProbe;
use crate::record::{DEFAULT_READ_ATTEMPTS, MotionUpdate, SharedMotionRecord};
use crate::segment::{DEFAULT_SEGMENT_NAME, MotionSegment};
use crate::stale::{STALE_COUNT_THRESHOLD, StaleTracker};

/// Age after which a record no longer counts as live data.
pub const STALE_THRESHOLD_MS: i64 = 500;

/// Consumer polling period (about 120 Hz).
pub const POLL_INTERVAL: Duration = Duration::from_millis(8);

/// Bound on waiting for the consumer thread at shutdown.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Builds the hardware bridge when this process becomes master.
pub type BridgeFactory = Arc<dyn Fn() -> Box<dyn NativeBridge> + Send + Sync>;

/// Transport tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// OS segment name
    pub segment_name: String,
    /// Id written to the master slot
    pub process_id: u32,
    /// Consumer polling period
    pub poll_interval: Duration,
    /// Record age that counts as stale
    pub stale_threshold_ms: i64,
    /// Consecutive stale reads before a master liveness check
    pub stale_count_threshold: u32,
    /// Bound on joining the consumer thread
    pub join_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            segment_name: DEFAULT_SEGMENT_NAME.to_string(),
            process_id: std::process::id(),
            poll_interval: POLL_INTERVAL,
            stale_threshold_ms: STALE_THRESHOLD_MS,
            stale_count_threshold: STALE_COUNT_THRESHOLD,
            join_timeout: JOIN_TIMEOUT,
        }
    }
}

/// Current role of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRole {
    /// `start` not called yet
    Uninitialized,
    /// Owns the hardware and writes the segment
    Master,
    /// Reads another process's samples
    Consumer,
    /// Shut down
    Disposed,
}

/// Result of one consumer poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Fresh sample forwarded
    Fresh,
    /// Stale, disconnected or unreadable record
    Stale,
    /// Stale run reached the threshold; check the master
    CheckMaster,
}

struct MasterRole {
    hardware: HardwareBridge<Box<dyn NativeBridge>>,
    segment: Option<Arc<MotionSegment>>,
}

struct ConsumerRole {
    segment: Arc<MotionSegment>,
}

enum RoleState {
    Uninitialized,
    Master(MasterRole),
    Consumer(ConsumerRole),
    Disposed,
}

impl RoleState {
    fn kind(&self) -> TransportRole {
        match self {
            RoleState::Uninitialized => TransportRole::Uninitialized,
            RoleState::Master(_) => TransportRole::Master,
            RoleState::Consumer(_) => TransportRole::Consumer,
            RoleState::Disposed => TransportRole::Disposed,
        }
    }
}

enum Failover {
    BecameMaster,
    StillConsumer(Arc<MotionSegment>),
    Stopped,
}

/// Master-side sink: conditions locally, then mirrors into the segment.
struct PublishingSink {
    processor: Arc<SampleProcessor>,
    segment: Option<Arc<MotionSegment>>,
}

impl SampleSink for PublishingSink {
    fn on_sample(&self, raw: RawSample) {
        let sample = self.processor.process(raw);
        if let Some(segment) = &self.segment {
            let update = MotionUpdate {
                sample,
                raw_x: raw.gamepad_x,
                raw_y: raw.gamepad_y,
            };
            segment.record().write_sample(&update, unix_time_ms());
        }
    }
}

struct Shared {
    options: TransportOptions,
    processor: Arc<SampleProcessor>,
    counters: Arc<MotionCounters>,
    probe: Arc<dyn ProcessProbe>,
    bridge_factory: BridgeFactory,
    role: Mutex<RoleState>,
    connected: AtomicBool,
}

impl Shared {
    /// Decide this process's role. Never fails: without shared memory the
    /// process drives the hardware directly.
    fn elect(&self) -> RoleState {
        let name = self.options.segment_name.as_str();
        let pid = self.options.process_id;

        for _ in 0..2 {
            match MotionSegment::open(name) {
                Ok(segment) => return self.join_existing(segment),
                Err(err) => tracing::debug!(error = %err, "No existing motion segment"),
            }

            match MotionSegment::create(name) {
                Ok(segment) => {
                    segment.record().initialize(pid);
                    tracing::info!(segment = name, pid, "Created motion segment");
                    return self.become_master(Some(Arc::new(segment)));
                }
                // Another process may have created it between our open and create.
                Err(err) => tracing::debug!(error = %err, "Could not create motion segment"),
            }
        }

        tracing::warn!(
            segment = name,
            "Shared memory unavailable; driving hardware directly"
        );
        self.become_master(None)
    }

    fn join_existing(&self, segment: MotionSegment) -> RoleState {
        let pid = self.options.process_id;
        let record = segment.record();

        if let Err(err) = record.validate() {
            tracing::warn!(error = %err, "Replacing incompatible motion record");
            record.initialize(pid);
            return self.become_master(Some(Arc::new(segment)));
        }

        // A live master may be this very process: another shim loaded
        // into the same host already owns the hardware.
        let master = record.master_pid();
        if master != 0 && self.probe.is_alive(master) {
            tracing::info!(master_pid = master, "Live master found; running as consumer");
            return RoleState::Consumer(ConsumerRole {
                segment: Arc::new(segment),
            });
        }

        match record.claim_master(master, pid) {
            Ok(()) => {
                record.initialize(pid);
                tracing::info!(previous_master = master, pid, "Took over motion segment");
                self.become_master(Some(Arc::new(segment)))
            }
            Err(SharedMemoryError::MasterTaken { pid: winner }) => {
                tracing::info!(master_pid = winner, "Lost master race; running as consumer");
                RoleState::Consumer(ConsumerRole {
                    segment: Arc::new(segment),
                })
            }
            Err(err) => {
                tracing::warn!(error = %err, "Unexpected claim failure; running as consumer");
                RoleState::Consumer(ConsumerRole {
                    segment: Arc::new(segment),
                })
            }
        }
    }

    fn become_master(&self, segment: Option<Arc<MotionSegment>>) -> RoleState {
        let sink = Arc::new(PublishingSink {
            processor: Arc::clone(&self.processor),
            segment: segment.clone(),
        });
        let mut hardware = HardwareBridge::new((self.bridge_factory)());
        let connected = hardware.initialize(sink);
        self.connected.store(connected, Ordering::Release);
        tracing::info!(connected, shared = segment.is_some(), "Running as master");
        RoleState::Master(MasterRole { hardware, segment })
    }

    fn poll_once(
        &self,
        record: &SharedMotionRecord,
        tracker: &mut StaleTracker,
        now_unix_ms: i64,
    ) -> PollOutcome {
        let fresh = record
            .read_stable(DEFAULT_READ_ATTEMPTS)
            .ok()
            .filter(|snapshot| {
                snapshot.connected
                    && snapshot.is_fresh(now_unix_ms, self.options.stale_threshold_ms)
            });

        match fresh {
            Some(snapshot) => {
                tracker.record_fresh();
                self.processor
                    .ingest_remote(snapshot.raw_x, snapshot.raw_y, snapshot.yaw);
                self.connected.store(true, Ordering::Release);
                PollOutcome::Fresh
            }
            None => {
                self.counters.inc_stale_read();
                self.connected.store(false, Ordering::Release);
                if tracker.record_stale() {
                    PollOutcome::CheckMaster
                } else {
                    PollOutcome::Stale
                }
            }
        }
    }

    fn try_failover(&self, segment: &Arc<MotionSegment>, tracker: &mut StaleTracker) -> Failover {
        let master = segment.record().master_pid();
        if master != 0 && self.probe.is_alive(master) {
            tracing::debug!(master_pid = master, "Master alive but not publishing");
            tracker.reset();
            return Failover::StillConsumer(Arc::clone(segment));
        }

        tracing::warn!(master_pid = master, "Master gone; attempting takeover");
        self.counters.inc_failover();

        let mut role = self.role.lock();
        if !matches!(*role, RoleState::Consumer(_)) {
            return Failover::Stopped;
        }

        let next = self.elect();
        let outcome = match &next {
            RoleState::Consumer(consumer) => {
                tracker.reset();
                Failover::StillConsumer(Arc::clone(&consumer.segment))
            }
            _ => Failover::BecameMaster,
        };
        *role = next;
        outcome
    }
}

fn run_consumer(shared: Arc<Shared>, mut segment: Arc<MotionSegment>, stop: Arc<AtomicBool>) {
    let mut tracker = StaleTracker::new(shared.options.stale_count_threshold);
    tracing::debug!(segment = segment.name(), "Consumer polling started");

    while !stop.load(Ordering::Acquire) {
        let outcome = shared.poll_once(segment.record(), &mut tracker, unix_time_ms());
        if outcome == PollOutcome::CheckMaster {
            match shared.try_failover(&segment, &mut tracker) {
                Failover::BecameMaster | Failover::Stopped => break,
                Failover::StillConsumer(current) => segment = current,
            }
        }
        thread::sleep(shared.options.poll_interval);
    }

    tracing::debug!("Consumer polling stopped");
}

struct Poller {
    stop: Arc<AtomicBool>,
    // Receives `()` when the poll loop returns; disconnects without it on panic.
    finished: Receiver<()>,
    // Never joined: dispose may run inside a module-unload callback where
    // waiting for thread exit cannot complete.
    _thread: JoinHandle<()>,
}

/// One process's end of the shared treadmill.
///
/// Samples land in the [`SampleProcessor`]'s state whichever role is
/// elected; callers only read that state and [`MotionTransport::is_connected`].
pub struct MotionTransport {
    shared: Arc<Shared>,
    poller: Mutex<Option<Poller>>,
}

impl fmt::Debug for MotionTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionTransport")
            .field("options", &self.shared.options)
            .field("role", &self.role())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl MotionTransport {
    /// Create an uninitialized transport.
    pub fn new(
        options: TransportOptions,
        processor: Arc<SampleProcessor>,
        counters: Arc<MotionCounters>,
        probe: Arc<dyn ProcessProbe>,
        bridge_factory: BridgeFactory,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                options,
                processor,
                counters,
                probe,
                bridge_factory,
                role: Mutex::new(RoleState::Uninitialized),
                connected: AtomicBool::new(false),
            }),
            poller: Mutex::new(None),
        }
    }

    /// Elect a role and start it. Later calls return the current role.
    pub fn start(&self) -> TransportRole {
        let mut role = self.shared.role.lock();
        if !matches!(*role, RoleState::Uninitialized) {
            return role.kind();
        }

        let mut next = self.shared.elect();
        if let RoleState::Consumer(consumer) = &next {
            if let Err(err) = self.spawn_poller(Arc::clone(&consumer.segment)) {
                tracing::error!(error = %err, "Consumer thread failed to start; driving hardware directly");
                next = self.shared.become_master(None);
            }
        }

        *role = next;
        role.kind()
    }

    fn spawn_poller(&self, segment: Arc<MotionSegment>) -> std::io::Result<()> {
        let stop = Arc::new(AtomicBool::new(false));
        let (done, finished) = channel::bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("openstride-shm-consumer".into())
            .spawn(move || {
                run_consumer(shared, segment, thread_stop);
                done.try_send(()).unwrap_or_default();
            })?;

        *self.poller.lock() = Some(Poller {
            stop,
            finished,
            _thread: thread,
        });
        Ok(())
    }

    /// Current role.
    pub fn role(&self) -> TransportRole {
        self.shared.role.lock().kind()
    }

    /// Whether motion data is live: the master's hardware is connected, or
    /// the consumer's last read was fresh. Lock-free.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Stop polling, release the hardware and the segment. Idempotent.
    pub fn dispose(&self) {
        let poller = self.poller.lock().take();
        if let Some(poller) = poller {
            poller.stop.store(true, Ordering::Release);
            match poller.finished.recv_timeout(self.shared.options.join_timeout) {
                Ok(()) => {}
                Err(RecvTimeoutError::Disconnected) => tracing::error!("Consumer thread panicked"),
                Err(RecvTimeoutError::Timeout) => {
                    tracing::warn!(
                        timeout_ms = self.shared.options.join_timeout.as_millis() as u64,
                        "Consumer thread did not stop in time; detaching"
                    );
                }
            }
        }

        let previous = std::mem::replace(&mut *self.shared.role.lock(), RoleState::Disposed);
        self.shared.connected.store(false, Ordering::Release);

        match previous {
            RoleState::Master(mut master) => {
                master.hardware.shutdown();
                if let Some(segment) = master.segment {
                    segment.record().release_master(self.shared.options.process_id);
                }
                tracing::info!("Master transport disposed");
            }
            RoleState::Consumer(_) => tracing::info!("Consumer transport disposed"),
            RoleState::Uninitialized | RoleState::Disposed => {}
        }
    }
}

impl Drop for MotionTransport {
    fn drop(&mut self) {
        self.dispose();
    }
}
