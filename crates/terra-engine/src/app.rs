//! Headless tick loop.
//!
//! Flies the observer in a straight line, ticking the chunk store once per
//! step, then keeps ticking until outstanding jobs land or the settle
//! timeout expires.

use anyhow::{Context, Result};
use glam::Vec2;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use terra_world::{
    ChunkEvent, ChunkStore, TerrainConfig, TerrainGenerator, TickReport, WorkerPool,
};

use crate::config::EngineConfig;
use crate::timing::FrameTiming;

/// Totals collected over a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Ticks executed, settle ticks included
    pub ticks: u32,
    /// Ticks that recomputed the visible set
    pub visibility_passes: u32,
    /// Chunks created
    pub created: usize,
    /// Map data results applied
    pub data_ready: usize,
    /// Show events
    pub shown: usize,
    /// Hide events
    pub hidden: usize,
    /// Mesh swaps
    pub mesh_swaps: usize,
    /// Failed jobs
    pub failures: usize,
    /// Chunks in the store at exit
    pub chunks: usize,
    /// Visible chunks at exit
    pub visible: usize,
    /// Jobs submitted (map, mesh)
    pub jobs: (u64, u64),
    /// Final observer position
    pub observer: Vec2,
    /// Average tick time in milliseconds
    pub average_tick_ms: f32,
    /// Longest tick in milliseconds
    pub longest_tick_ms: f32,
    /// Tick rate averaged over recent ticks
    pub tick_rate: f32,
}

impl RunSummary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        if report.visibility_pass {
            self.visibility_passes += 1;
        }
        for event in &report.events {
            match event {
                ChunkEvent::Created(_) => self.created += 1,
                ChunkEvent::DataReady(_) => self.data_ready += 1,
                ChunkEvent::Shown(_) => self.shown += 1,
                ChunkEvent::Hidden(_) => self.hidden += 1,
                ChunkEvent::MeshSwapped { .. } => self.mesh_swaps += 1,
                ChunkEvent::GenerationFailed { .. } => self.failures += 1,
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ticks ({} passes), {} chunks ({} visible), {} created, {} shown, {} hidden, \
             {} mesh swaps, {} failures, jobs map={} mesh={}, observer ({:.1}, {:.1}), \
             tick avg {:.2}ms max {:.2}ms ({:.1} tps)",
            self.ticks,
            self.visibility_passes,
            self.chunks,
            self.visible,
            self.created,
            self.shown,
            self.hidden,
            self.mesh_swaps,
            self.failures,
            self.jobs.0,
            self.jobs.1,
            self.observer.x,
            self.observer.y,
            self.average_tick_ms,
            self.longest_tick_ms,
            self.tick_rate,
        )
    }
}

/// Runs the streamer with the given configuration.
pub fn run(config: &EngineConfig) -> Result<RunSummary> {
    let terrain = TerrainConfig::load_from(&config.terrain_config)
        .validate()
        .with_context(|| format!("invalid terrain config {}", config.terrain_config.display()))?;

    let pool = WorkerPool::new(terrain.worker_threads())?;
    let generator = Arc::new(TerrainGenerator::new(&terrain));
    let mut store = ChunkStore::new(&terrain, generator, &pool);
    info!(
        "Streaming {}x{} chunks, view distance {}",
        terrain.chunk_dimension(),
        terrain.chunk_dimension(),
        terrain.max_view_distance()
    );

    let step = config.step_per_tick();
    let mut timing = FrameTiming::new(config.target_tps).with_pacing(config.pace_ticks);
    let mut summary = RunSummary::default();
    let mut observer = Vec2::ZERO;
    timing.reset();

    for tick in 0..config.ticks {
        timing.delta_time();
        let report = store.tick(observer);
        if report.visibility_pass {
            debug!(
                "Tick {tick}: pass at ({:.1}, {:.1}), {} chunks, {} visible",
                observer.x, observer.y, report.chunk_count, report.visible_count
            );
        }
        summary.record(&report);
        observer += step;
        timing.sleep_remainder();
    }
    debug!("Tick rate {:.1}/{} tps", timing.current_tps(), timing.target_tps());

    // Settle at the last ticked position
    let observer = store.observer();
    let deadline = Instant::now() + Duration::from_secs_f32(config.settle_timeout_secs);
    while !store.is_idle() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
        timing.delta_time();
        summary.record(&store.tick(observer));
    }
    if !store.is_idle() {
        warn!("{} jobs still running at exit", store.jobs_in_flight());
    }

    summary.chunks = store.chunk_count();
    summary.visible = store.visible_chunks().len();
    summary.jobs = store.jobs_submitted();
    summary.observer = store.observer();
    summary.average_tick_ms = timing.average_tick_time_ms();
    summary.longest_tick_ms = timing.longest_tick_ms();
    summary.tick_rate = timing.current_tps();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use terra_world::LodLevel;

    fn engine_config(dir: &TempDir, terrain: &TerrainConfig) -> EngineConfig {
        let path = dir.path().join("terrain.toml");
        terrain.save_to(&path).expect("save terrain config");
        EngineConfig {
            terrain_config: path,
            ticks: 30,
            target_tps: 30,
            pace_ticks: false,
            settle_timeout_secs: 30.0,
            observer_speed: 120.0,
            observer_heading_deg: 0.0,
        }
    }

    fn small_terrain() -> TerrainConfig {
        let mut terrain = TerrainConfig::default();
        terrain.streaming.chunk_dimension = 9;
        terrain.streaming.worker_threads = Some(2);
        terrain.detail_levels = vec![LodLevel::new(0, 8.0), LodLevel::new(1, 16.0)];
        terrain
    }

    #[test]
    fn test_run_streams_and_settles() {
        let dir = TempDir::new().expect("temp dir");
        let config = engine_config(&dir, &small_terrain());

        let summary = run(&config).expect("run");
        assert!(summary.ticks >= 30);
        assert!(summary.visibility_passes >= 2);
        assert_eq!(summary.created, summary.chunks);
        assert_eq!(summary.data_ready, summary.created);
        assert_eq!(summary.jobs.0 as usize, summary.created);
        assert_eq!(summary.failures, 0);
        assert!(summary.visible > 0);
        assert!(summary.tick_rate > 0.0);
        // 29 steps of 4 units along +X
        assert!((summary.observer.x - 116.0).abs() < 1e-3);
    }

    #[test]
    fn test_run_rejects_invalid_terrain() {
        let dir = TempDir::new().expect("temp dir");
        let mut terrain = small_terrain();
        terrain.detail_levels.clear();
        let config = engine_config(&dir, &terrain);

        assert!(run(&config).is_err());
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            ticks: 3,
            created: 9,
            ..RunSummary::default()
        };
        let text = summary.to_string();
        assert!(text.starts_with("3 ticks"));
        assert!(text.contains("9 created"));
    }
}
