//! Snapshot decode/encode.
//!
//! The host hands the baker one flat buffer:
//!
//! ```text
//! [GlobalSetting][Light x n][Mesh x n][Texture x n][Material x n][Object x n]
//! [Position x v][Normal x v][Tangent x v][UV0 x v][UV1 x v][Index x i]
//! [u32 sentinel]
//! ```
//!
//! The buffer is untrusted: section sizes are derived from header counts and
//! validated against the declared length before anything is read, and the
//! trailing sentinel must match [`SNAPSHOT_SENTINEL`] for the data to be used
//! at all. Hard failures return `Err` and no collections; soft findings land
//! in [`SceneSnapshot::warnings`].

use tracing::{debug, error, warn};

use crate::error::{Result, SnapshotError, SnapshotWarning};
use crate::io::ByteReader;
use crate::math::{Float2, Float3};
use crate::scene::mesh_slices;
use crate::types::{
    GlobalSetting, Light, LightKind, Material, Mesh, Object, Texture, WireRecord,
    SNAPSHOT_SENTINEL,
};

/// Extents at or below this are a degenerate terrain footprint.
const TERRAIN_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneSnapshot {
    pub setting: GlobalSetting,
    pub lights: Vec<Light>,
    pub meshes: Vec<Mesh>,
    pub textures: Vec<Texture>,
    pub materials: Vec<Material>,
    pub objects: Vec<Object>,

    /// Globally packed vertex pools; meshes slice them by running offset.
    pub positions: Vec<Float3>,
    pub normals: Vec<u32>,
    pub tangents: Vec<u32>,
    pub uv0: Vec<Float2>,
    pub uv1: Vec<Float2>,
    pub indices: Vec<u32>,

    pub warnings: Vec<SnapshotWarning>,
}

impl SceneSnapshot {
    /// Bytes required by the header plus the five entity arrays. The vertex
    /// streams are validated while reading; this is the up-front check.
    fn min_encoded_len(setting: &GlobalSetting) -> u64 {
        GlobalSetting::SIZE as u64
            + setting.light_count as u64 * Light::SIZE as u64
            + setting.mesh_count as u64 * Mesh::SIZE as u64
            + setting.texture_count as u64 * Texture::SIZE as u64
            + setting.material_count as u64 * Material::SIZE as u64
            + setting.object_count as u64 * Object::SIZE as u64
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(data);
        let setting = GlobalSetting::decode(&mut r)?;

        let required = Self::min_encoded_len(&setting);
        if (data.len() as u64) < required {
            error!(
                declared = data.len(),
                required,
                lights = setting.light_count,
                meshes = setting.mesh_count,
                textures = setting.texture_count,
                materials = setting.material_count,
                objects = setting.object_count,
                "snapshot smaller than its declared sections"
            );
            return Err(SnapshotError::SizeMismatch {
                declared: data.len() as u64,
                required,
                lights: setting.light_count,
                meshes: setting.mesh_count,
                textures: setting.texture_count,
                materials: setting.material_count,
                objects: setting.object_count,
            });
        }

        if !setting.has_split_vertex_data() {
            error!(
                flags = setting.flags.bits(),
                "snapshot layout without split vertex data is not supported"
            );
            return Err(SnapshotError::MissingSplitVertexData {
                flags: setting.flags.bits(),
            });
        }

        let vertex_count = checked_count("vertex", setting.vertex_count)?;
        let index_count = checked_count("index", setting.index_count)?;

        r.enter("lights");
        let lights = decode_records::<Light>(&mut r, setting.light_count)?;
        r.enter("meshes");
        let meshes = decode_records::<Mesh>(&mut r, setting.mesh_count)?;
        r.enter("textures");
        let textures = decode_records::<Texture>(&mut r, setting.texture_count)?;
        r.enter("materials");
        let materials = decode_records::<Material>(&mut r, setting.material_count)?;
        r.enter("objects");
        let objects = decode_records::<Object>(&mut r, setting.object_count)?;

        r.enter("positions");
        let positions = decode_pod::<Float3>(&mut r, vertex_count, Float3::SIZE)?;
        r.enter("normals");
        let normals = decode_pod::<u32>(&mut r, vertex_count, 4)?;
        r.enter("tangents");
        let tangents = decode_pod::<u32>(&mut r, vertex_count, 4)?;
        r.enter("uv0");
        let uv0 = decode_pod::<Float2>(&mut r, vertex_count, Float2::SIZE)?;
        r.enter("uv1");
        let uv1 = decode_pod::<Float2>(&mut r, vertex_count, Float2::SIZE)?;
        r.enter("indices");
        let indices = decode_pod::<u32>(&mut r, index_count, 4)?;

        r.enter("sentinel");
        let sentinel = r.read_u32_le()?;
        if sentinel != SNAPSHOT_SENTINEL {
            error!(
                found = sentinel,
                expected = SNAPSHOT_SENTINEL,
                "snapshot sentinel mismatch, data considered corrupt"
            );
            return Err(SnapshotError::BadSentinel {
                found: sentinel,
                expected: SNAPSHOT_SENTINEL,
            });
        }
        if r.remaining() != 0 {
            debug!(trailing = r.remaining(), "snapshot has trailing bytes");
        }

        // The assembler slices the shared pools by running offset; reject
        // records that would walk past them.
        mesh_slices(&meshes, positions.len(), indices.len())?;

        // Directional lights lead the output. This is a stable partition, not
        // a sort: relative order among the rest is preserved as received.
        let (directional, other): (Vec<Light>, Vec<Light>) = lights
            .into_iter()
            .partition(|l| l.kind() == Some(LightKind::Directional));
        let mut lights = directional;
        lights.extend(other);

        let mut warnings = Vec::new();
        if setting.has_terrain_data() && setting.terrain_size.min_element() <= TERRAIN_EPSILON {
            warn!(
                scene = setting.scene_path_str(),
                size = ?setting.terrain_size,
                "terrain data present but the footprint is degenerate"
            );
            warnings.push(SnapshotWarning::DegenerateTerrain {
                size: setting.terrain_size,
            });
        }

        debug!(
            bytes = data.len(),
            lights = lights.len(),
            meshes = meshes.len(),
            textures = textures.len(),
            materials = materials.len(),
            objects = objects.len(),
            vertices = positions.len(),
            indices = indices.len(),
            "snapshot decoded"
        );

        Ok(Self {
            setting,
            lights,
            meshes,
            textures,
            materials,
            objects,
            positions,
            normals,
            tangents,
            uv0,
            uv1,
            indices,
            warnings,
        })
    }

    /// Produce the wire image of this snapshot. Section counts are taken from
    /// the collections, not from `setting`. All five vertex streams must have
    /// the same length.
    pub fn encode(&self) -> Vec<u8> {
        debug_assert_eq!(self.positions.len(), self.normals.len());
        debug_assert_eq!(self.positions.len(), self.tangents.len());
        debug_assert_eq!(self.positions.len(), self.uv0.len());
        debug_assert_eq!(self.positions.len(), self.uv1.len());

        let mut setting = self.setting.clone();
        setting.light_count = self.lights.len() as u32;
        setting.mesh_count = self.meshes.len() as u32;
        setting.texture_count = self.textures.len() as u32;
        setting.material_count = self.materials.len() as u32;
        setting.object_count = self.objects.len() as u32;
        setting.vertex_count = self.positions.len() as i32;
        setting.index_count = self.indices.len() as i32;

        let mut out = Vec::with_capacity(
            Self::min_encoded_len(&setting) as usize
                + self.positions.len() * (Float3::SIZE + 4 + 4 + 2 * Float2::SIZE)
                + self.indices.len() * 4
                + 4,
        );
        setting.encode(&mut out);
        for l in &self.lights {
            l.encode(&mut out);
        }
        for m in &self.meshes {
            m.encode(&mut out);
        }
        for t in &self.textures {
            t.encode(&mut out);
        }
        for m in &self.materials {
            m.encode(&mut out);
        }
        for o in &self.objects {
            o.encode(&mut out);
        }
        out.extend_from_slice(bytemuck::cast_slice(&self.positions));
        out.extend_from_slice(bytemuck::cast_slice(&self.normals));
        out.extend_from_slice(bytemuck::cast_slice(&self.tangents));
        out.extend_from_slice(bytemuck::cast_slice(&self.uv0));
        out.extend_from_slice(bytemuck::cast_slice(&self.uv1));
        out.extend_from_slice(bytemuck::cast_slice(&self.indices));
        out.extend_from_slice(&SNAPSHOT_SENTINEL.to_le_bytes());
        out
    }
}

fn checked_count(field: &'static str, value: i32) -> Result<usize> {
    usize::try_from(value).map_err(|_| SnapshotError::InvalidCount {
        field,
        value: value as i64,
    })
}

fn decode_records<T: WireRecord>(r: &mut ByteReader<'_>, count: u32) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        out.push(T::decode(r)?);
    }
    Ok(out)
}

/// Bulk-read `count` packed elements. The byte length is validated by the
/// reader; the copy goes through a `u8` view of the destination, so source
/// alignment does not matter.
fn decode_pod<T: bytemuck::Pod>(
    r: &mut ByteReader<'_>,
    count: usize,
    elem_size: usize,
) -> Result<Vec<T>> {
    let len = count
        .checked_mul(elem_size)
        .ok_or(SnapshotError::InvalidCount {
            field: "stream",
            value: count as i64,
        })?;
    let bytes = r.take(len)?;
    let mut out = vec![T::zeroed(); count];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
    Ok(out)
}
