//! Fixed-layout records shared with the host.
//!
//! Every record has a byte size known at compile time and encodes/decodes
//! field by field in little-endian order, matching the host's packed layout.
//! Enum-tagged fields keep their raw value so unknown tags survive a
//! round-trip; typed accessors return `Option`.

use crate::error::Result;
use crate::flags::{LightFlags, MeshStreams, ObjectFlags, SettingFlags, TextureFlags};
use crate::io::ByteReader;
use crate::math::{Float3, Float4};

/// Object/entity identifier assigned by the host. Zero is never a valid id.
pub type HostId = i32;

pub const INVALID_ID: HostId = 0;

/// Trailing magic closing every snapshot.
pub const SNAPSHOT_SENTINEL: u32 = 0x2024_0716;

/// Fixed length of the scene-path field in [`GlobalSetting`].
pub const SCENE_PATH_BYTES: usize = 512;

/// Leading snapshot textures that carry live shared handles for the baker's
/// output targets rather than material data.
pub const IMMEDIATE_TEXTURE_SLOTS: usize = 5;

/// A record with a fixed wire footprint.
pub trait WireRecord: Sized {
    const SIZE: usize;

    fn decode(r: &mut ByteReader<'_>) -> Result<Self>;
    fn encode(&self, out: &mut Vec<u8>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LightKind {
    Spot = 0,
    Directional = 1,
    Point = 2,
    /// The host encodes its rectangle and area lights with the same tag;
    /// they are one kind on the wire.
    Rectangle = 3,
    Disc = 4,
}

impl LightKind {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Spot,
            1 => Self::Directional,
            2 => Self::Point,
            3 => Self::Rectangle,
            4 => Self::Disc,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MaterialKind {
    Unknown = 0,
    Pbr = 1,
    TreeLeaf = 2,
    Terrain = 3,
    MeshTiling = 4,
}

impl MaterialKind {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => Self::Unknown,
            1 => Self::Pbr,
            2 => Self::TreeLeaf,
            3 => Self::Terrain,
            4 => Self::MeshTiling,
            _ => return None,
        })
    }
}

/// One object transform delta.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub id: HostId,
    pub position: Float3,
    pub rotation: Float4,
    pub scale: Float3,
}

impl WireRecord for Transform {
    // id + position + rotation + scale + 4 reserved bytes.
    const SIZE: usize = 48;

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let out = Self {
            id: r.read_i32_le()?,
            position: Float3::decode(r)?,
            rotation: Float4::decode(r)?,
            scale: Float3::decode(r)?,
        };
        r.skip(4)?;
        Ok(out)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        self.position.encode(out);
        self.rotation.encode(out);
        self.scale.encode(out);
        out.extend_from_slice(&0i32.to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Light {
    pub id: HostId,
    /// Raw [`LightKind`] tag.
    pub kind: i32,
    pub flags: LightFlags,
    pub attenuation_radius: f32,
    pub color: Float3,
    pub intensity: f32,
    /// Reused per kind: spot inner/outer angle in x/y, rectangle width/height
    /// in x/y, disc radius in x.
    pub extra: Float4,
    pub indirect_multiplier: f32,
    pub color_temperature: f32,
}

impl Light {
    pub fn kind(&self) -> Option<LightKind> {
        LightKind::from_raw(self.kind)
    }

    pub fn is_active(&self) -> bool {
        self.flags.contains(LightFlags::ACTIVE)
    }

    pub fn casts_shadow(&self) -> bool {
        self.flags.contains(LightFlags::CAST_SHADOW)
    }
}

impl WireRecord for Light {
    const SIZE: usize = 56;

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            id: r.read_i32_le()?,
            kind: r.read_i32_le()?,
            flags: LightFlags::from_bits_retain(r.read_u32_le()?),
            attenuation_radius: r.read_f32_le()?,
            color: Float3::decode(r)?,
            intensity: r.read_f32_le()?,
            extra: Float4::decode(r)?,
            indirect_multiplier: r.read_f32_le()?,
            color_temperature: r.read_f32_le()?,
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.kind.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&self.attenuation_radius.to_le_bytes());
        self.color.encode(out);
        out.extend_from_slice(&self.intensity.to_le_bytes());
        self.extra.encode(out);
        out.extend_from_slice(&self.indirect_multiplier.to_le_bytes());
        out.extend_from_slice(&self.color_temperature.to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mesh {
    pub id: HostId,
    pub vertex_count: u32,
    pub index_count: u32,
    pub streams: MeshStreams,
}

impl WireRecord for Mesh {
    const SIZE: usize = 16;

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            id: r.read_i32_le()?,
            vertex_count: r.read_u32_le()?,
            index_count: r.read_u32_le()?,
            streams: MeshStreams::from_bits_retain(r.read_u32_le()?),
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.vertex_count.to_le_bytes());
        out.extend_from_slice(&self.index_count.to_le_bytes());
        out.extend_from_slice(&self.streams.bits().to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Texture {
    pub id: HostId,
    pub width: i32,
    pub height: i32,
    pub mip_count: i32,
    /// Raw host texture-format code; translated per graphics API by the
    /// resource broker.
    pub format: i32,
    pub flags: TextureFlags,
    /// Live OS shared-handle value when [`TextureFlags::IMMEDIATE`] is set.
    pub handle: i64,
}

impl Texture {
    pub fn is_immediate(&self) -> bool {
        self.flags.contains(TextureFlags::IMMEDIATE)
    }

    pub fn is_material_texture(&self) -> bool {
        !self.is_immediate()
    }

    pub fn is_srgb(&self) -> bool {
        self.flags.contains(TextureFlags::SRGB)
    }
}

impl WireRecord for Texture {
    const SIZE: usize = 32;

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            id: r.read_i32_le()?,
            width: r.read_i32_le()?,
            height: r.read_i32_le()?,
            mip_count: r.read_i32_le()?,
            format: r.read_i32_le()?,
            flags: TextureFlags::from_bits_retain(r.read_u32_le()?),
            handle: r.read_i64_le()?,
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes());
        out.extend_from_slice(&self.mip_count.to_le_bytes());
        out.extend_from_slice(&self.format.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        out.extend_from_slice(&self.handle.to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub id: HostId,
    /// Raw [`MaterialKind`] tag.
    pub kind: i32,
    pub texture_ids: [HostId; 6],
    /// Meaning keyed by [`MaterialKind`]; see `scene::MaterialParams`.
    pub params: [f32; 16],
}

impl Material {
    pub fn kind(&self) -> Option<MaterialKind> {
        MaterialKind::from_raw(self.kind)
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            id: INVALID_ID,
            kind: MaterialKind::Unknown as i32,
            texture_ids: [INVALID_ID; 6],
            params: [0.0; 16],
        }
    }
}

impl WireRecord for Material {
    const SIZE: usize = 96;

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let id = r.read_i32_le()?;
        let kind = r.read_i32_le()?;
        let mut texture_ids = [INVALID_ID; 6];
        for slot in &mut texture_ids {
            *slot = r.read_i32_le()?;
        }
        let mut params = [0.0f32; 16];
        for p in &mut params {
            *p = r.read_f32_le()?;
        }
        Ok(Self {
            id,
            kind,
            texture_ids,
            params,
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.kind.to_le_bytes());
        for id in &self.texture_ids {
            out.extend_from_slice(&id.to_le_bytes());
        }
        for p in &self.params {
            out.extend_from_slice(&p.to_le_bytes());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Object {
    pub id: HostId,
    pub parent_id: HostId,
    pub mesh_id: HostId,
    pub material_id: HostId,
    pub rotation: Float4,
    pub position: Float3,
    pub lightmap_resolution: i32,
    pub scale: Float3,
    pub emission_boost: f32,
    pub flags: ObjectFlags,
}

impl Object {
    pub fn has_mesh(&self) -> bool {
        self.flags.contains(ObjectFlags::MESH)
    }

    pub fn has_light(&self) -> bool {
        self.flags.contains(ObjectFlags::LIGHT)
    }

    pub fn has_terrain(&self) -> bool {
        self.flags.contains(ObjectFlags::TERRAIN)
    }
}

impl WireRecord for Object {
    const SIZE: usize = 68;

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            id: r.read_i32_le()?,
            parent_id: r.read_i32_le()?,
            mesh_id: r.read_i32_le()?,
            material_id: r.read_i32_le()?,
            rotation: Float4::decode(r)?,
            position: Float3::decode(r)?,
            lightmap_resolution: r.read_i32_le()?,
            scale: Float3::decode(r)?,
            emission_boost: r.read_f32_le()?,
            flags: ObjectFlags::from_bits_retain(r.read_u32_le()?),
        })
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.parent_id.to_le_bytes());
        out.extend_from_slice(&self.mesh_id.to_le_bytes());
        out.extend_from_slice(&self.material_id.to_le_bytes());
        self.rotation.encode(out);
        self.position.encode(out);
        out.extend_from_slice(&self.lightmap_resolution.to_le_bytes());
        self.scale.encode(out);
        out.extend_from_slice(&self.emission_boost.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
    }
}

/// The snapshot header: camera/environment parameters, baking options,
/// section counts and the single-change scratch fields reused by coalesced
/// setting deltas.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSetting {
    pub env_tint_intensity: Float4,
    pub camera_rotation: Float4,
    pub camera_position: Float3,
    pub near_plane: f32,

    pub far_plane: f32,
    pub aspect_ratio: f32,
    pub fov: f32,
    pub frame_width: i32,

    pub frame_height: i32,
    pub denoiser_scale: f32,
    pub full_bake_sample_count: i32,
    pub camera_distance_ht: i32,

    pub bounce_count: i32,
    pub min_bounds: Float3,
    pub max_bounds: Float3,

    pub light_count: u32,
    pub mesh_count: u32,
    pub texture_count: u32,
    pub material_count: u32,
    pub object_count: u32,

    /// Peer process id recorded by the host; used for shared-handle
    /// duplication when the baker runs out of process.
    pub host_pid: i32,
    pub vertex_count: i32,
    pub index_count: i32,
    pub flags: SettingFlags,

    pub terrain_min_point: Float3,
    /// Scratch id for single-delete deltas.
    pub pending_delete_id: HostId,
    pub terrain_size: Float3,
    pub terrain_mesh_count: u32,

    pub material_emission: Float4,
    pub material_id: HostId,
    pub object_id: HostId,
    pub lightmap_resolution: u32,
    pub emission_boost: f32,

    /// Scratch transform for single-transform deltas.
    pub transform: Transform,
    /// Scratch light for single-light deltas.
    pub light: Light,

    /// NUL-padded folder path for immediate-mode exchange files.
    pub scene_path: [u8; SCENE_PATH_BYTES],
}

impl Default for GlobalSetting {
    fn default() -> Self {
        Self {
            env_tint_intensity: Float4::default(),
            camera_rotation: Float4::default(),
            camera_position: Float3::default(),
            near_plane: 0.0,
            far_plane: 0.0,
            aspect_ratio: 0.0,
            fov: 0.0,
            frame_width: 0,
            frame_height: 0,
            denoiser_scale: 0.0,
            full_bake_sample_count: 0,
            camera_distance_ht: 0,
            bounce_count: 0,
            min_bounds: Float3::default(),
            max_bounds: Float3::default(),
            light_count: 0,
            mesh_count: 0,
            texture_count: 0,
            material_count: 0,
            object_count: 0,
            host_pid: 0,
            vertex_count: 0,
            index_count: 0,
            flags: SettingFlags::empty(),
            terrain_min_point: Float3::default(),
            pending_delete_id: INVALID_ID,
            terrain_size: Float3::default(),
            terrain_mesh_count: 0,
            material_emission: Float4::default(),
            material_id: INVALID_ID,
            object_id: INVALID_ID,
            lightmap_resolution: 0,
            emission_boost: 1.0,
            transform: Transform::default(),
            light: Light::default(),
            scene_path: [0; SCENE_PATH_BYTES],
        }
    }
}

impl GlobalSetting {
    pub fn has_split_vertex_data(&self) -> bool {
        self.flags.contains(SettingFlags::SPLIT_VERTEX_DATA)
    }

    pub fn has_terrain_data(&self) -> bool {
        self.flags.contains(SettingFlags::HAS_TERRAIN)
    }

    pub fn use_16bit_indices(&self) -> bool {
        self.flags.contains(SettingFlags::INDICES_16BIT)
    }

    pub fn use_32bit_indices(&self) -> bool {
        self.flags.contains(SettingFlags::INDICES_32BIT)
    }

    pub fn export_tex_to_disk(&self) -> bool {
        self.flags.contains(SettingFlags::EXPORT_TEX_TO_DISK)
    }

    pub fn export_scene_to_disk(&self) -> bool {
        self.flags.contains(SettingFlags::EXPORT_SCENE_TO_DISK)
    }

    pub fn sends_shared_handles_to_host(&self) -> bool {
        self.flags.contains(SettingFlags::SEND_SHARED_HANDLES_TO_HOST)
    }

    /// The scene path up to its first NUL.
    pub fn scene_path_str(&self) -> &str {
        let end = self
            .scene_path
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SCENE_PATH_BYTES);
        std::str::from_utf8(&self.scene_path[..end]).unwrap_or("")
    }

    pub fn set_scene_path(&mut self, path: &str) {
        self.scene_path = [0; SCENE_PATH_BYTES];
        let bytes = path.as_bytes();
        let len = bytes.len().min(SCENE_PATH_BYTES - 1);
        self.scene_path[..len].copy_from_slice(&bytes[..len]);
    }
}

impl WireRecord for GlobalSetting {
    const SIZE: usize = 312 + SCENE_PATH_BYTES;

    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let mut out = Self {
            env_tint_intensity: Float4::decode(r)?,
            camera_rotation: Float4::decode(r)?,
            camera_position: Float3::decode(r)?,
            near_plane: r.read_f32_le()?,
            far_plane: r.read_f32_le()?,
            aspect_ratio: r.read_f32_le()?,
            fov: r.read_f32_le()?,
            frame_width: r.read_i32_le()?,
            frame_height: r.read_i32_le()?,
            denoiser_scale: r.read_f32_le()?,
            full_bake_sample_count: r.read_i32_le()?,
            camera_distance_ht: r.read_i32_le()?,
            bounce_count: r.read_i32_le()?,
            min_bounds: Float3::decode(r)?,
            max_bounds: Float3::decode(r)?,
            light_count: r.read_u32_le()?,
            mesh_count: r.read_u32_le()?,
            texture_count: r.read_u32_le()?,
            material_count: r.read_u32_le()?,
            object_count: r.read_u32_le()?,
            host_pid: r.read_i32_le()?,
            vertex_count: r.read_i32_le()?,
            index_count: r.read_i32_le()?,
            flags: SettingFlags::from_bits_retain(r.read_u32_le()?),
            terrain_min_point: Float3::decode(r)?,
            pending_delete_id: r.read_i32_le()?,
            terrain_size: Float3::decode(r)?,
            terrain_mesh_count: r.read_u32_le()?,
            material_emission: Float4::decode(r)?,
            material_id: r.read_i32_le()?,
            object_id: r.read_i32_le()?,
            lightmap_resolution: r.read_u32_le()?,
            emission_boost: r.read_f32_le()?,
            transform: Transform::decode(r)?,
            light: Light::decode(r)?,
            scene_path: [0; SCENE_PATH_BYTES],
        };
        out.scene_path.copy_from_slice(r.take(SCENE_PATH_BYTES)?);
        Ok(out)
    }

    fn encode(&self, out: &mut Vec<u8>) {
        self.env_tint_intensity.encode(out);
        self.camera_rotation.encode(out);
        self.camera_position.encode(out);
        out.extend_from_slice(&self.near_plane.to_le_bytes());
        out.extend_from_slice(&self.far_plane.to_le_bytes());
        out.extend_from_slice(&self.aspect_ratio.to_le_bytes());
        out.extend_from_slice(&self.fov.to_le_bytes());
        out.extend_from_slice(&self.frame_width.to_le_bytes());
        out.extend_from_slice(&self.frame_height.to_le_bytes());
        out.extend_from_slice(&self.denoiser_scale.to_le_bytes());
        out.extend_from_slice(&self.full_bake_sample_count.to_le_bytes());
        out.extend_from_slice(&self.camera_distance_ht.to_le_bytes());
        out.extend_from_slice(&self.bounce_count.to_le_bytes());
        self.min_bounds.encode(out);
        self.max_bounds.encode(out);
        out.extend_from_slice(&self.light_count.to_le_bytes());
        out.extend_from_slice(&self.mesh_count.to_le_bytes());
        out.extend_from_slice(&self.texture_count.to_le_bytes());
        out.extend_from_slice(&self.material_count.to_le_bytes());
        out.extend_from_slice(&self.object_count.to_le_bytes());
        out.extend_from_slice(&self.host_pid.to_le_bytes());
        out.extend_from_slice(&self.vertex_count.to_le_bytes());
        out.extend_from_slice(&self.index_count.to_le_bytes());
        out.extend_from_slice(&self.flags.bits().to_le_bytes());
        self.terrain_min_point.encode(out);
        out.extend_from_slice(&self.pending_delete_id.to_le_bytes());
        self.terrain_size.encode(out);
        out.extend_from_slice(&self.terrain_mesh_count.to_le_bytes());
        self.material_emission.encode(out);
        out.extend_from_slice(&self.material_id.to_le_bytes());
        out.extend_from_slice(&self.object_id.to_le_bytes());
        out.extend_from_slice(&self.lightmap_resolution.to_le_bytes());
        out.extend_from_slice(&self.emission_boost.to_le_bytes());
        self.transform.encode(out);
        self.light.encode(out);
        out.extend_from_slice(&self.scene_path);
    }
}
