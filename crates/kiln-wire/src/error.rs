use thiserror::Error;

use crate::math::Float3;

pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Hard decode failures. The snapshot is unusable and no collections are
/// returned.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(
        "snapshot holds {declared} bytes but its counts require at least {required} \
         (lights={lights}, meshes={meshes}, textures={textures}, materials={materials}, \
         objects={objects})"
    )]
    SizeMismatch {
        declared: u64,
        required: u64,
        lights: u32,
        meshes: u32,
        textures: u32,
        materials: u32,
        objects: u32,
    },

    #[error("snapshot truncated in {section}: need {needed} bytes, {remaining} left")]
    Truncated {
        section: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("snapshot does not carry split vertex data (flags={flags:#x})")]
    MissingSplitVertexData { flags: u32 },

    #[error("bad trailing sentinel {found:#010x}, expected {expected:#010x}")]
    BadSentinel { found: u32, expected: u32 },

    #[error("invalid {field} count {value}")]
    InvalidCount { field: &'static str, value: i64 },

    #[error(
        "mesh records claim {vertices} vertices and {indices} indices but the shared pools \
         hold {pool_vertices} and {pool_indices}"
    )]
    MeshPoolOverflow {
        vertices: u64,
        indices: u64,
        pool_vertices: usize,
        pool_indices: usize,
    },
}

/// Soft findings: the snapshot decoded and is usable, with caveats.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SnapshotWarning {
    #[error("terrain data is present but the terrain footprint {size:?} is degenerate")]
    DegenerateTerrain { size: Float3 },
}
