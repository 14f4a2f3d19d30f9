//! Top-level orchestrator: owns every shared resource, spawns the tailer
//! thread, and exposes the snapshot API the output sink polls.
//!
//! Grounded on `gossip-lib/src/overlord.rs`/`manager.rs`'s role as the thing
//! that wires channels, workers, and shared state together and is the one
//! type the binary crate talks to; adapted here from async job dispatch to
//! the OS-thread model spec mandates.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::assembler::Assembler;
use crate::auto_denick::autodenick_teammate;
use crate::error::Error;
use crate::fetch::http::HttpStatsBackend;
use crate::fetch::StatsBackend;
use crate::nick_database::NickDatabase;
use crate::parser::parse_line;
use crate::player::{Column, Player};
use crate::player_cache::PlayerCache;
use crate::rate_limiter::RateLimiter;
use crate::redraw::RedrawAggregator;
use crate::settings::Settings;
use crate::state::{process_event, OverlayState};
use crate::tailer::{StartPosition, Tailer};
use crate::worker_pool::{CompletedWork, WorkRequest, WorkerPool};

/// A condvar-backed flag the tailer thread sets whenever the displayed
/// player list might have changed, and the output sink waits on instead of
/// polling in a tight loop. Grounded on the `threading.Event` the original
/// implementation signals redraws with.
pub struct RedrawEvent {
    flag: Mutex<bool>,
    condvar: Condvar,
}

impl RedrawEvent {
    fn new() -> Self {
        RedrawEvent {
            flag: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub fn set(&self) {
        let mut guard = self.flag.lock();
        *guard = true;
        self.condvar.notify_all();
    }

    /// Wait up to `timeout` for a redraw signal, clearing it on return.
    /// Returns whether a redraw was actually signaled (vs. just timing out).
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut guard = self.flag.lock();
        if !*guard {
            self.condvar.wait_for(&mut guard, timeout);
        }
        let was_set = *guard;
        *guard = false;
        was_set
    }
}

pub struct Overlord {
    state: Arc<Mutex<OverlayState>>,
    settings: Arc<Mutex<Settings>>,
    settings_path: PathBuf,
    nick_database: Arc<Mutex<NickDatabase>>,
    player_cache: Arc<Mutex<PlayerCache>>,
    request_tx: flume::Sender<WorkRequest>,
    redraw_aggregator: RedrawAggregator,
    redraw_event: Arc<RedrawEvent>,
    worker_pool: Option<WorkerPool>,
    tailer_handle: Option<JoinHandle<()>>,
    tailer_shutdown: Arc<AtomicBool>,
}

impl Overlord {
    pub fn new(
        settings: Settings,
        settings_path: PathBuf,
        nick_database: NickDatabase,
    ) -> Result<Self, Error> {
        let rate_limiter = Arc::new(RateLimiter::new(
            settings.rate_limit_count,
            Duration::from_secs(settings.rate_limit_window_seconds),
        ));
        let backend = HttpStatsBackend::new(
            rate_limiter,
            settings.hypixel_api_key.clone(),
            settings.antisniper_api_key.clone(),
            Duration::from_secs(settings.fetch_timeout_seconds),
            settings.fetch_retry_limit,
        )
        .map_err(|e| (e, file!(), line!()))?;
        let assembler = Arc::new(Assembler::new(Arc::new(backend) as Arc<dyn StatsBackend>));

        let (request_tx, request_rx) = flume::unbounded();
        let (completed_tx, completed_rx) = flume::unbounded();

        let player_cache = Arc::new(Mutex::new(PlayerCache::new(
            Duration::from_secs(600),
            Duration::from_secs(3600),
        )));
        let nick_database = Arc::new(Mutex::new(nick_database));

        let worker_pool = WorkerPool::spawn(
            settings.worker_threads.clamp(2, 16),
            request_rx,
            completed_tx,
            assembler,
            player_cache.clone(),
            nick_database.clone(),
        );

        Ok(Overlord {
            state: Arc::new(Mutex::new(OverlayState::default())),
            settings: Arc::new(Mutex::new(settings)),
            settings_path,
            nick_database,
            player_cache,
            request_tx,
            redraw_aggregator: RedrawAggregator::new(completed_rx),
            redraw_event: Arc::new(RedrawEvent::new()),
            worker_pool: Some(worker_pool),
            tailer_handle: None,
            tailer_shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn redraw_event(&self) -> Arc<RedrawEvent> {
        self.redraw_event.clone()
    }

    /// Spawn the thread that tails `logfile`, parses each line, and drives
    /// the event processor. Fatal per spec: if this thread's loop exits on
    /// an IO error, the whole process should treat that as unrecoverable
    /// (mirrors `threading.py`'s `UpdateStateThread` calling `sys.exit(1)`).
    pub fn start_tailer(&mut self, logfile: PathBuf, start_at: StartPosition) {
        let state = self.state.clone();
        let settings = self.settings.clone();
        let nick_database = self.nick_database.clone();
        let player_cache = self.player_cache.clone();
        let request_tx = self.request_tx.clone();
        let redraw_event = self.redraw_event.clone();
        let shutdown = self.tailer_shutdown.clone();

        let handle = std::thread::Builder::new()
            .name("log-tailer".to_string())
            .spawn(move || {
                let mut tailer = Tailer::new(logfile, start_at);
                loop {
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    let line = match tailer.blocking_next_line() {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::error!("tailer failed fatally: {e}");
                            std::process::exit(1);
                        }
                    };
                    let Some(event) = parse_line(&line) else {
                        continue;
                    };

                    let mut state = state.lock();
                    let mut settings = settings.lock();
                    let mut nick_db = nick_database.lock();
                    let mut cache = player_cache.lock();

                    let outcome =
                        process_event(&mut state, &mut settings, &mut nick_db, &mut cache, event);

                    if outcome.clear_short_term_cache {
                        cache.clear_cache(true);
                    }

                    for username in state.lobby_players.clone() {
                        if cache.get_cached_player_or_set_pending(&username).is_none() {
                            let _ = request_tx.send(WorkRequest { username });
                        }
                    }

                    let denicked = if settings.autodenick_teammates {
                        autodenick_teammate(&state, &mut cache, &mut nick_db, &mut settings)
                    } else {
                        false
                    };
                    if denicked {
                        // The newly-denicked username was just uncached; enqueue
                        // a fresh fetch under its real name.
                        for username in state.lobby_players.clone() {
                            if cache.get_cached_player_or_set_pending(&username).is_none() {
                                let _ = request_tx.send(WorkRequest { username });
                            }
                        }
                    }

                    drop(cache);
                    drop(nick_db);
                    drop(settings);
                    drop(state);

                    if outcome.redraw || denicked {
                        redraw_event.set();
                    }
                }
            })
            .expect("failed to spawn log tailer thread");
        self.tailer_handle = Some(handle);
    }

    /// Drain completed fetches and, if anything currently visible changed,
    /// signal a redraw. Call this from the output sink's own loop alongside
    /// waiting on `redraw_event()`.
    pub fn poll_completed(&self) {
        let state = self.state.lock();
        if self.redraw_aggregator.drain_completed(&state) {
            drop(state);
            self.redraw_event.set();
        }
    }

    pub fn state_snapshot(&self) -> OverlayState {
        self.state.lock().clone()
    }

    pub fn player_list(&self, column: Column) -> Vec<Player> {
        let state = self.state.lock();
        let mut cache = self.player_cache.lock();
        self.redraw_aggregator.build_player_list(&state, &mut cache, column)
    }

    pub fn save_settings(&self) -> Result<(), Error> {
        self.settings.lock().save(&self.settings_path)
    }

    pub fn settings_snapshot(&self) -> Settings {
        self.settings.lock().clone()
    }

    pub fn shutdown(self) {
        self.tailer_shutdown.store(true, Ordering::Relaxed);
        drop(self.request_tx);
        if let Some(pool) = self.worker_pool {
            pool.shutdown();
        }
        if let Some(handle) = self.tailer_handle {
            let _ = handle.join();
        }
    }
}
