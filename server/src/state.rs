//! Shared server state: the world behind one mutex, per-user SSE queues,
//! pending active-ping echoes, and performance counters. Mirrors the
//! Design Notes' "module-globals -> fields on a single World context
//! object": the source keeps `WORLD_RING`, `USER_QUEUES`, `PENDING_PINGS`,
//! etc. as Python module globals guarded by ad hoc locks; here they are all
//! fields on one `AppState` passed to every handler via axum's `State`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::mpsc;

use subsim_shared::config::Config;
use subsim_shared::events::ServerEvent;
use subsim_shared::ids::{SubId, UserId};
use subsim_shared::sonar::EchoContact;
use subsim_shared::world::World;

/// Capacity of each user's SSE queue. A slow consumer drops new events
/// rather than applying backpressure to the tick loop (`try_send` semantics,
/// matching the source's bounded `asyncio.Queue` + "put_nowait, drop on
/// full" behavior).
pub const SSE_QUEUE_CAPACITY: usize = 1000;

pub struct PendingPing {
    pub observer_sub: SubId,
    pub eta: f64,
    pub contacts: Vec<EchoContact>,
}

#[derive(Default)]
pub struct PerfCounters {
    pub tick_count: u64,
    pub last_tick_ms: f64,
    pub max_tick_ms: f64,
    pub avg_tick_ms: f64,
}

pub struct AppState {
    pub world: Mutex<World>,
    pub config: Config,
    pub queues: Mutex<HashMap<UserId, mpsc::Sender<ServerEvent>>>,
    pub pending_pings: Mutex<Vec<PendingPing>>,
    pub perf: Mutex<PerfCounters>,
    pub data_dir: PathBuf,
    pub boot_instant: Instant,
}

impl AppState {
    pub fn new(config: Config, world: World, data_dir: PathBuf) -> Self {
        Self {
            world: Mutex::new(world),
            config,
            queues: Mutex::new(HashMap::new()),
            pending_pings: Mutex::new(Vec::new()),
            perf: Mutex::new(PerfCounters::default()),
            data_dir,
            boot_instant: Instant::now(),
        }
    }

    pub fn sim_now(&self) -> f64 {
        self.boot_instant.elapsed().as_secs_f64()
    }

    /// Best-effort delivery to one user's SSE connection. Silently drops the
    /// event if the user has no live connection or their queue is full.
    pub fn send_private(&self, user: UserId, event: ServerEvent) {
        let queues = self.queues.lock().unwrap();
        if let Some(tx) = queues.get(&user) {
            let _ = tx.try_send(event);
        }
    }

    pub fn broadcast(&self, event: ServerEvent) {
        let queues = self.queues.lock().unwrap();
        for tx in queues.values() {
            let _ = tx.try_send(event.clone());
        }
    }
}
