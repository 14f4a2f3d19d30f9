//! Fixed-size pool of OS threads that drain stats-fetch requests, resolve
//! them through the `Assembler`, and publish results to a completed-work
//! channel the redraw aggregator drains.
//!
//! Grounded on `original_source/src/prism/overlay/threading.py`'s
//! `GetStatsThread` loop shape and `behaviour.py`'s `get_and_cache_player`
//! (cache the primary stats fetch, then opportunistically fill in a
//! winstreak estimate). Unlike that reference, each worker here is watched by
//! a small supervisor thread that respawns it if it panics, per this crate's
//! requirement that one bad response can't permanently shrink the pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::assembler::Assembler;
use crate::nick_database::NickDatabase;
use crate::player::Player;
use crate::player_cache::PlayerCache;

/// A username the redraw aggregator is waiting on stats for.
#[derive(Debug, Clone)]
pub struct WorkRequest {
    pub username: String,
}

/// The outcome of resolving one `WorkRequest`.
#[derive(Debug, Clone)]
pub struct CompletedWork {
    pub username: String,
    pub player: Player,
}

pub struct WorkerPool {
    shutdown: Arc<AtomicBool>,
    supervisors: Vec<std::thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `thread_count` supervised workers pulling from `request_rx`.
    pub fn spawn(
        thread_count: usize,
        request_rx: flume::Receiver<WorkRequest>,
        completed_tx: flume::Sender<CompletedWork>,
        assembler: Arc<Assembler>,
        player_cache: Arc<Mutex<PlayerCache>>,
        nick_database: Arc<Mutex<NickDatabase>>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let supervisors = (0..thread_count)
            .map(|id| {
                spawn_supervised_worker(
                    id,
                    request_rx.clone(),
                    completed_tx.clone(),
                    assembler.clone(),
                    player_cache.clone(),
                    nick_database.clone(),
                    shutdown.clone(),
                )
            })
            .collect();
        WorkerPool { shutdown, supervisors }
    }

    /// Signal every worker to stop after its current request and wait for
    /// the supervisors to confirm. The request channel's sender must also be
    /// dropped by the caller so blocked `recv()` calls wake up.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for supervisor in self.supervisors {
            let _ = supervisor.join();
        }
    }
}

fn spawn_supervised_worker(
    id: usize,
    request_rx: flume::Receiver<WorkRequest>,
    completed_tx: flume::Sender<CompletedWork>,
    assembler: Arc<Assembler>,
    player_cache: Arc<Mutex<PlayerCache>>,
    nick_database: Arc<Mutex<NickDatabase>>,
    shutdown: Arc<AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !shutdown.load(Ordering::Relaxed) {
            let rx = request_rx.clone();
            let tx = completed_tx.clone();
            let asm = assembler.clone();
            let cache = player_cache.clone();
            let nick_db = nick_database.clone();
            let sd = shutdown.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("stats-worker-{id}"))
                .spawn(move || worker_loop(&rx, &tx, &asm, &cache, &nick_db, &sd));
            let handle = match spawned {
                Ok(h) => h,
                Err(e) => {
                    tracing::error!(worker = id, error = %e, "failed to spawn stats worker thread");
                    std::thread::sleep(std::time::Duration::from_millis(500));
                    continue;
                }
            };

            match handle.join() {
                Ok(()) => break, // returned because the channel closed or shutdown was set
                Err(panic) => {
                    tracing::error!(worker = id, "stats worker panicked, respawning: {panic:?}");
                }
            }
        }
    })
}

fn worker_loop(
    request_rx: &flume::Receiver<WorkRequest>,
    completed_tx: &flume::Sender<CompletedWork>,
    assembler: &Arc<Assembler>,
    player_cache: &Arc<Mutex<PlayerCache>>,
    nick_database: &Arc<Mutex<NickDatabase>>,
    shutdown: &Arc<AtomicBool>,
) {
    while let Ok(request) = request_rx.recv() {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        let genus = player_cache.lock().genus();
        let fetched = {
            let nick_db = nick_database.lock();
            assembler.fetch_player(&request.username, &nick_db)
        };

        let player = match fetched {
            Ok(player) => fill_in_winstreak(player, assembler),
            Err(e) => {
                tracing::warn!(username = %request.username, error = %e, "stats fetch failed");
                crate::globals::GLOBALS.record(&e);
                Player::UnknownPlayer {
                    username: request.username.clone(),
                }
            }
        };

        player_cache
            .lock()
            .set_cached_player(&request.username, player.clone(), genus);
        let _ = completed_tx.send(CompletedWork {
            username: request.username,
            player,
        });
    }
}

/// If Hypixel didn't report an authoritative winstreak, ask the configured
/// estimator backend for one and attach it. A failed estimate lookup just
/// leaves the winstreak unset; it's not worth failing the whole fetch over.
fn fill_in_winstreak(mut player: Player, assembler: &Assembler) -> Player {
    if let Player::KnownPlayer { uuid, ref mut stats, .. } = player {
        if !stats.winstreak_accurate {
            if let Ok(estimate) = assembler.fetch_winstreaks(&uuid) {
                stats.update_winstreak(estimate.overall, false);
            }
        }
    }
    player
}
