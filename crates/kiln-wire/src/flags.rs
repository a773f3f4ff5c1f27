//! Wire-level flag words.
//!
//! Unknown bits are preserved on decode (`from_bits_retain`) so a snapshot
//! written by a newer host round-trips byte-for-byte.

use bitflags::bitflags;

bitflags! {
    /// `GlobalSetting.flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SettingFlags: u32 {
        const EXPORT_TEX_TO_DISK = 0x1;
        const EXPORT_BUF_TO_SCENE = 0x2;
        const EXPORT_SCENE_TO_DISK = 0x4;
        const INDICES_32BIT = 0x8;
        const INDICES_16BIT = 0x10;
        const HAS_TERRAIN = 0x20;
        /// The snapshot stores one globally packed array per vertex stream.
        /// The decoder supports no other layout.
        const SPLIT_VERTEX_DATA = 0x40;
        const NATIVE_GPU_HANDLE = 0x80;
        /// The baker is the texture source: it creates exportable textures
        /// and sends the handles back to the host.
        const SEND_SHARED_HANDLES_TO_HOST = 0x100;
    }

    /// `Light.flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LightFlags: u32 {
        const ACTIVE = 0x1;
        const CAST_SHADOW = 0x2;
        const OVERRIDE_TEMPERATURE = 0x4;
        const OVERRIDE_INDIRECT_MULTIPLIER = 0x8;
        const BAKE_DIRECT_LIGHTING = 0x10;
        const USE_COOKIE = 0x20;
    }

    /// `Mesh.streams`: which vertex streams this mesh uses and the index
    /// width it was authored with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MeshStreams: u32 {
        const INDICES_16BIT = 0x1;
        const POSITION = 0x2;
        const NORMAL = 0x4;
        const TANGENT = 0x8;
        const UV0 = 0x10;
        const UV1 = 0x20;
    }

    /// `Texture.flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextureFlags: u32 {
        const SRGB = 0x1;
        /// The texture carries a live shared-handle value; otherwise it is a
        /// material texture identified by id.
        const IMMEDIATE = 0x2;
    }

    /// `Object.flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u32 {
        const MESH = 0x1;
        const LIGHT = 0x2;
        const TERRAIN = 0x4;
    }
}
