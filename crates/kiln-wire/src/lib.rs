//! `kiln-wire` defines the binary formats exchanged between the host
//! application and the baking worker.
//!
//! This crate provides:
//! - Fixed-layout records for scene entities and global settings (see
//!   [`types`]).
//! - The snapshot codec that reconstructs a typed scene from one untrusted
//!   flat buffer (see [`SceneSnapshot`]).
//! - The consumer contract the decoded data must satisfy: pool slicing,
//!   per-kind parameter views and the [`scene::SceneSink`] factory.
//!
//! The wire format is little-endian and versioned by the trailing
//! [`SNAPSHOT_SENTINEL`]; a buffer that fails any structural check is
//! rejected whole, never partially applied.

mod error;
mod flags;
mod io;
mod math;
mod snapshot;
mod types;

pub mod scene;

pub use crate::error::{Result, SnapshotError, SnapshotWarning};
pub use crate::flags::{LightFlags, MeshStreams, ObjectFlags, SettingFlags, TextureFlags};
pub use crate::io::ByteReader;
pub use crate::math::{Float2, Float3, Float4};
pub use crate::snapshot::SceneSnapshot;
pub use crate::types::{
    GlobalSetting, HostId, Light, LightKind, Material, MaterialKind, Mesh, Object, Texture,
    Transform, WireRecord, IMMEDIATE_TEXTURE_SLOTS, INVALID_ID, SCENE_PATH_BYTES,
    SNAPSHOT_SENTINEL,
};
