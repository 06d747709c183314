//! Terrain chunk state.
//!
//! A chunk moves through `DataPending -> DataReady` once, and each of its LOD
//! slots independently through `NotRequested -> Requested -> Ready`. The
//! chunk never talks to the queues itself; [`TerrainChunk::update`] reports
//! what it needs and the store acts on it.

use std::sync::Arc;

use glam::Vec2;
use terra_common::{ChunkCoord, GroundBounds, JobError};

use crate::generator::MapData;
use crate::lod::{select_lod, LodLevel};
use crate::mesh::MeshData;

/// Generation state of a chunk's map data.
#[derive(Debug, Clone)]
pub enum DataState {
    /// Job submitted, result not yet drained
    Pending,
    /// Heights and classification available
    Ready(Arc<MapData>),
    /// The generation job failed
    Failed(JobError),
}

/// State of one LOD slot.
#[derive(Debug, Clone)]
pub enum LodMeshState {
    /// No mesh job submitted yet
    NotRequested,
    /// Mesh job submitted
    Requested,
    /// Mesh built
    Ready(Arc<MeshData>),
    /// Mesh job failed; never requested again
    Failed(JobError),
}

impl LodMeshState {
    /// True once a mesh job has been submitted for this slot.
    #[must_use]
    pub const fn was_requested(&self) -> bool {
        !matches!(self, Self::NotRequested)
    }
}

/// A mesh job the chunk wants submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRequest {
    /// Index into the LOD table
    pub level: usize,
    /// LOD passed to the mesh builder
    pub lod: u32,
}

/// Outcome of a re-evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkUpdate {
    /// Visibility before the update
    pub was_visible: bool,
    /// Visibility after the update
    pub visible: bool,
    /// A ready mesh was swapped in at this table index
    pub swapped: Option<usize>,
    /// A mesh job must be submitted
    pub mesh_request: Option<MeshRequest>,
}

/// Observer state used to re-evaluate chunks.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    /// Observer position on the ground plane
    pub observer: Vec2,
    /// LOD table
    pub detail_levels: &'a [LodLevel],
    /// Beyond this distance chunks are hidden
    pub max_view_distance: f32,
}

/// One streamed terrain chunk.
#[derive(Debug)]
pub struct TerrainChunk {
    coord: ChunkCoord,
    position: Vec2,
    bounds: GroundBounds,
    data: DataState,
    lod_meshes: Vec<LodMeshState>,
    current_level: Option<usize>,
    visible: bool,
}

impl TerrainChunk {
    /// Creates a hidden chunk awaiting its map data.
    #[must_use]
    pub fn new(coord: ChunkCoord, stride: f32, level_count: usize) -> Self {
        let position = coord.world_centre(stride);
        Self {
            coord,
            position,
            bounds: GroundBounds::from_centre_size(position, stride),
            data: DataState::Pending,
            lod_meshes: vec![LodMeshState::NotRequested; level_count],
            current_level: None,
            visible: false,
        }
    }

    /// Grid coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// World-space centre.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Ground-plane bounds.
    #[must_use]
    pub const fn bounds(&self) -> &GroundBounds {
        &self.bounds
    }

    /// Whether the chunk is currently shown.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Map data state.
    #[must_use]
    pub const fn data(&self) -> &DataState {
        &self.data
    }

    /// Map data, once generated.
    #[must_use]
    pub fn map_data(&self) -> Option<&Arc<MapData>> {
        match &self.data {
            DataState::Ready(data) => Some(data),
            _ => None,
        }
    }

    /// State of a LOD slot.
    #[must_use]
    pub fn lod_state(&self, level: usize) -> Option<&LodMeshState> {
        self.lod_meshes.get(level)
    }

    /// Table index of the displayed mesh.
    #[must_use]
    pub const fn current_level(&self) -> Option<usize> {
        self.current_level
    }

    /// The displayed mesh.
    #[must_use]
    pub fn active_mesh(&self) -> Option<&Arc<MeshData>> {
        match self.lod_meshes.get(self.current_level?)? {
            LodMeshState::Ready(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Shows or hides the chunk. Returns true if visibility changed.
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let changed = self.visible != visible;
        self.visible = visible;
        changed
    }

    /// Stores the result of the map data job.
    pub fn on_map_data(&mut self, result: Result<Arc<MapData>, JobError>) {
        self.data = match result {
            Ok(data) => DataState::Ready(data),
            Err(e) => DataState::Failed(e),
        };
    }

    /// Stores the result of a mesh job for table index `level`.
    pub fn on_mesh_data(&mut self, level: usize, result: Result<Arc<MeshData>, JobError>) {
        if let Some(slot) = self.lod_meshes.get_mut(level) {
            *slot = match result {
                Ok(mesh) => LodMeshState::Ready(mesh),
                Err(e) => LodMeshState::Failed(e),
            };
        }
    }

    /// Re-evaluates visibility and detail level against the observer.
    ///
    /// Does nothing until map data is ready. A chunk may become visible
    /// before any mesh for it exists.
    pub fn update(&mut self, view: &ViewContext<'_>) -> ChunkUpdate {
        let mut update = ChunkUpdate {
            was_visible: self.visible,
            visible: self.visible,
            ..ChunkUpdate::default()
        };
        if !matches!(self.data, DataState::Ready(_)) {
            return update;
        }

        let distance = self.bounds.distance(view.observer);
        let visible = distance <= view.max_view_distance;

        if visible && !view.detail_levels.is_empty() {
            let level = select_lod(distance, view.detail_levels);
            if self.current_level != Some(level) {
                if let Some(slot) = self.lod_meshes.get_mut(level) {
                    match slot {
                        LodMeshState::Ready(_) => {
                            self.current_level = Some(level);
                            update.swapped = Some(level);
                        },
                        LodMeshState::NotRequested => {
                            *slot = LodMeshState::Requested;
                            update.mesh_request = Some(MeshRequest {
                                level,
                                lod: view.detail_levels[level].lod,
                            });
                        },
                        LodMeshState::Requested | LodMeshState::Failed(_) => {},
                    }
                }
            }
        }

        self.set_visible(visible);
        update.visible = visible;
        update
    }
}
