//! Chunk streaming around a moving observer.
//!
//! The [`ChunkStore`] owns every chunk ever created, keyed by grid
//! coordinate. Each [`tick`](ChunkStore::tick) it decides whether the
//! observer moved far enough to recompute the visible set, then drains both
//! background queues and applies their results. Chunks are never evicted.

use std::sync::Arc;

use ahash::AHashMap;
use glam::Vec2;
use terra_common::{ChunkCoord, JobError};
use tracing::{debug, error, trace};

use crate::chunk::{TerrainChunk, ViewContext};
use crate::config::ValidatedConfig;
use crate::generator::{MapData, TerrainGenerator};
use crate::lod::LodLevel;
use crate::mesh::MeshData;
use crate::queue::{WorkQueue, WorkerPool};

/// Something that happened to a chunk during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent {
    /// Chunk created and its map data job submitted
    Created(ChunkCoord),
    /// Map data arrived
    DataReady(ChunkCoord),
    /// Chunk became visible this tick
    Shown(ChunkCoord),
    /// Chunk became hidden this tick
    Hidden(ChunkCoord),
    /// A different mesh is now displayed
    MeshSwapped {
        /// Chunk
        coord: ChunkCoord,
        /// LOD of the displayed mesh
        lod: u32,
    },
    /// A map data or mesh job failed
    GenerationFailed {
        /// Chunk
        coord: ChunkCoord,
        /// LOD of the failed mesh, `None` for map data
        lod: Option<u32>,
        /// Failure reason
        error: JobError,
    },
}

/// Everything a tick did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Chunk events, in the order they occurred. Visibility changes are
    /// reported last, once per chunk, and only if the net state changed.
    pub events: Vec<ChunkEvent>,
    /// Whether the visible set was recomputed
    pub visibility_pass: bool,
    /// Map data results applied
    pub map_results: usize,
    /// Mesh results applied
    pub mesh_results: usize,
    /// Chunks in the store after the tick
    pub chunk_count: usize,
    /// Visible chunks after the tick
    pub visible_count: usize,
}

impl TickReport {
    /// Number of events matching a predicate.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&ChunkEvent) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }
}

#[derive(Debug, Clone)]
struct StreamSettings {
    detail_levels: Vec<LodLevel>,
    max_view_distance: f32,
    stride: f32,
    visible_radius: i32,
    move_threshold_sq: f32,
}

/// Events collected while a tick runs, plus each chunk's visibility at the
/// start of the tick.
#[derive(Default)]
struct TickState {
    events: Vec<ChunkEvent>,
    visible_before: AHashMap<ChunkCoord, bool>,
}

/// Grid-indexed chunk collection streaming terrain around an observer.
pub struct ChunkStore {
    settings: StreamSettings,
    generator: Arc<TerrainGenerator>,
    chunks: AHashMap<ChunkCoord, TerrainChunk>,
    /// Chunks made visible since the last pass
    visible: Vec<ChunkCoord>,
    observer: Vec2,
    observer_at_last_pass: Option<Vec2>,
    map_queue: WorkQueue<ChunkCoord, Arc<MapData>>,
    mesh_queue: WorkQueue<(ChunkCoord, usize), Arc<MeshData>>,
}

impl std::fmt::Debug for ChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("chunks", &self.chunks.len())
            .field("visible", &self.visible.len())
            .field("observer", &self.observer)
            .field("map_queue", &self.map_queue)
            .field("mesh_queue", &self.mesh_queue)
            .finish()
    }
}

impl ChunkStore {
    /// Creates an empty store. Jobs run `generator` on `pool`.
    #[must_use]
    pub fn new(
        config: &ValidatedConfig,
        generator: Arc<TerrainGenerator>,
        pool: &WorkerPool,
    ) -> Self {
        let stride = config.chunk_stride();
        let max_view_distance = config.max_view_distance();
        let threshold = config.move_update_threshold();
        let settings = StreamSettings {
            detail_levels: config.detail_levels().to_vec(),
            max_view_distance,
            stride,
            // Bounded by MAX_VIEW_RADIUS_CHUNKS at validation
            visible_radius: (max_view_distance / stride).round() as i32,
            move_threshold_sq: threshold * threshold,
        };
        debug!(
            "Chunk store: stride {stride}, view distance {max_view_distance}, radius {} chunks",
            settings.visible_radius
        );

        Self {
            settings,
            generator,
            chunks: AHashMap::new(),
            visible: Vec::new(),
            observer: Vec2::ZERO,
            observer_at_last_pass: None,
            map_queue: WorkQueue::new("map", pool),
            mesh_queue: WorkQueue::new("mesh", pool),
        }
    }

    /// Advances streaming by one tick with the observer at `observer`.
    pub fn tick(&mut self, observer: Vec2) -> TickReport {
        self.observer = observer;
        let mut state = TickState::default();

        let visibility_pass = match self.observer_at_last_pass {
            None => true,
            Some(last) => last.distance_squared(observer) > self.settings.move_threshold_sq,
        };
        if visibility_pass {
            self.observer_at_last_pass = Some(observer);
            self.update_visible_chunks(&mut state);
        }

        let map_results = self.drain_map_queue(&mut state);
        let mesh_results = self.drain_mesh_queue(&mut state);

        let mut changed: Vec<(ChunkCoord, bool)> = state
            .visible_before
            .iter()
            .filter_map(|(coord, &was)| {
                let now = self.chunks.get(coord)?.is_visible();
                (now != was).then_some((*coord, now))
            })
            .collect();
        changed.sort_unstable_by_key(|(coord, _)| *coord);
        state.events.extend(changed.into_iter().map(|(coord, now)| {
            if now {
                ChunkEvent::Shown(coord)
            } else {
                ChunkEvent::Hidden(coord)
            }
        }));

        TickReport {
            events: state.events,
            visibility_pass,
            map_results,
            mesh_results,
            chunk_count: self.chunks.len(),
            visible_count: self.visible.len(),
        }
    }

    /// Hides the previous visible set and re-evaluates every coordinate in
    /// view, creating chunks that do not exist yet.
    fn update_visible_chunks(&mut self, state: &mut TickState) {
        for coord in self.visible.drain(..) {
            if let Some(chunk) = self.chunks.get_mut(&coord) {
                if chunk.set_visible(false) {
                    state.visible_before.entry(coord).or_insert(true);
                }
            }
        }

        let centre = ChunkCoord::nearest(self.observer, self.settings.stride);
        let radius = self.settings.visible_radius;
        trace!("Visibility pass around {centre}, radius {radius}");

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let coord = centre.offset(dx, dy);
                if self.chunks.contains_key(&coord) {
                    self.evaluate(coord, state);
                } else {
                    self.create_chunk(coord, state);
                }
            }
        }
    }

    fn create_chunk(&mut self, coord: ChunkCoord, state: &mut TickState) {
        let levels = self.settings.detail_levels.len();
        let chunk = TerrainChunk::new(coord, self.settings.stride, levels);
        let centre = chunk.position();
        self.chunks.insert(coord, chunk);

        let generator = Arc::clone(&self.generator);
        self.map_queue
            .submit(coord, move || Ok(Arc::new(generator.generate_map_data(centre))));
        debug!("Created chunk {coord}");
        state.events.push(ChunkEvent::Created(coord));
    }

    /// Re-evaluates one chunk against the current observer and acts on the
    /// outcome.
    fn evaluate(&mut self, coord: ChunkCoord, state: &mut TickState) {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return;
        };
        let view = ViewContext {
            observer: self.observer,
            detail_levels: &self.settings.detail_levels,
            max_view_distance: self.settings.max_view_distance,
        };
        let update = chunk.update(&view);

        if let Some(level) = update.swapped {
            let lod = self.settings.detail_levels[level].lod;
            state.events.push(ChunkEvent::MeshSwapped { coord, lod });
        }

        if let Some(request) = update.mesh_request {
            if let Some(data) = chunk.map_data().cloned() {
                let generator = Arc::clone(&self.generator);
                self.mesh_queue.submit((coord, request.level), move || {
                    generator
                        .generate_mesh(&data, request.lod)
                        .map(Arc::new)
                        .map_err(|e| JobError::Failed(e.to_string()))
                });
            }
        }

        if update.was_visible != update.visible {
            state.visible_before.entry(coord).or_insert(update.was_visible);
            if update.visible {
                self.visible.push(coord);
            } else {
                self.visible.retain(|c| *c != coord);
            }
        }
    }

    fn drain_map_queue(&mut self, state: &mut TickState) -> usize {
        let outputs = self.map_queue.drain();
        let applied = outputs.len();

        for output in outputs {
            let coord = output.key;
            let Some(chunk) = self.chunks.get_mut(&coord) else {
                continue;
            };
            match output.result {
                Ok(data) => {
                    chunk.on_map_data(Ok(data));
                    state.events.push(ChunkEvent::DataReady(coord));
                    self.evaluate(coord, state);
                },
                Err(error) => {
                    error!("Map data for chunk {coord} failed: {error}");
                    chunk.on_map_data(Err(error.clone()));
                    state.events.push(ChunkEvent::GenerationFailed {
                        coord,
                        lod: None,
                        error,
                    });
                },
            }
        }

        applied
    }

    fn drain_mesh_queue(&mut self, state: &mut TickState) -> usize {
        let outputs = self.mesh_queue.drain();
        let applied = outputs.len();

        for output in outputs {
            let (coord, level) = output.key;
            let Some(chunk) = self.chunks.get_mut(&coord) else {
                continue;
            };
            match output.result {
                Ok(mesh) => {
                    chunk.on_mesh_data(level, Ok(mesh));
                    self.evaluate(coord, state);
                },
                Err(error) => {
                    let lod = self.settings.detail_levels.get(level).map(|l| l.lod);
                    error!("Mesh for chunk {coord} at level {level} failed: {error}");
                    chunk.on_mesh_data(level, Err(error.clone()));
                    state.events.push(ChunkEvent::GenerationFailed { coord, lod, error });
                },
            }
        }

        applied
    }

    /// Chunk at a coordinate.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&TerrainChunk> {
        self.chunks.get(&coord)
    }

    /// Iterates over every chunk.
    pub fn chunks(&self) -> impl Iterator<Item = &TerrainChunk> {
        self.chunks.values()
    }

    /// Number of chunks created so far.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunks currently visible.
    #[must_use]
    pub fn visible_chunks(&self) -> &[ChunkCoord] {
        &self.visible
    }

    /// Observer position from the last tick.
    #[must_use]
    pub const fn observer(&self) -> Vec2 {
        self.observer
    }

    /// Shared generator.
    #[must_use]
    pub fn generator(&self) -> &Arc<TerrainGenerator> {
        &self.generator
    }

    /// Background jobs still running.
    #[must_use]
    pub fn jobs_in_flight(&self) -> usize {
        self.map_queue.in_flight() + self.mesh_queue.in_flight()
    }

    /// Jobs submitted over the store's lifetime, as (map, mesh).
    #[must_use]
    pub const fn jobs_submitted(&self) -> (u64, u64) {
        (self.map_queue.submitted(), self.mesh_queue.submitted())
    }

    /// True when no job is running or waiting to be applied.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.map_queue.is_idle() && self.mesh_queue.is_idle()
    }
}
