//! Consumer contract for decoded snapshots.
//!
//! The baker's actual scene-graph, material and mesh types live outside this
//! crate; what is fixed here is the shape the decoder's output must satisfy:
//! meshes slice one globally packed vertex/index pool by running offset, the
//! per-kind reuse of `Light::extra` and `Material::params`, and the order in
//! which a supplied factory is driven.

use std::collections::HashSet;

use tracing::warn;

use crate::error::{Result, SnapshotError};
use crate::math::Float3;
use crate::snapshot::SceneSnapshot;
use crate::types::{
    HostId, Light, LightKind, Material, MaterialKind, Mesh, Object, Texture, INVALID_ID,
    IMMEDIATE_TEXTURE_SLOTS,
};

/// A mesh's window into the shared vertex/index pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshSlice {
    pub vertex_offset: usize,
    pub index_offset: usize,
    pub vertex_count: usize,
    pub index_count: usize,
}

/// Assign running offsets in mesh order, rejecting records that would walk
/// past the pools.
pub fn mesh_slices(
    meshes: &[Mesh],
    pool_vertices: usize,
    pool_indices: usize,
) -> Result<Vec<MeshSlice>> {
    let mut slices = Vec::with_capacity(meshes.len());
    let mut vertices: u64 = 0;
    let mut indices: u64 = 0;
    for mesh in meshes {
        slices.push(MeshSlice {
            vertex_offset: vertices as usize,
            index_offset: indices as usize,
            vertex_count: mesh.vertex_count as usize,
            index_count: mesh.index_count as usize,
        });
        vertices += mesh.vertex_count as u64;
        indices += mesh.index_count as u64;
        if vertices > pool_vertices as u64 || indices > pool_indices as u64 {
            return Err(SnapshotError::MeshPoolOverflow {
                vertices,
                indices,
                pool_vertices,
                pool_indices,
            });
        }
    }
    Ok(slices)
}

/// Typed view of the per-kind reuse of [`Light::extra`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightParams {
    Spot { inner_angle: f32, outer_angle: f32 },
    Directional,
    Point,
    Rectangle { width: f32, height: f32 },
    Disc { radius: f32 },
}

impl LightParams {
    pub fn from_wire(light: &Light) -> Option<Self> {
        Some(match light.kind()? {
            LightKind::Spot => Self::Spot {
                inner_angle: light.extra.x,
                outer_angle: light.extra.y,
            },
            LightKind::Directional => Self::Directional,
            LightKind::Point => Self::Point,
            LightKind::Rectangle => Self::Rectangle {
                width: light.extra.x,
                height: light.extra.y,
            },
            LightKind::Disc => Self::Disc {
                radius: light.extra.x,
            },
        })
    }
}

/// Typed view of [`Material::params`] and the texture-slot conventions,
/// keyed by [`MaterialKind`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialParams {
    Pbr {
        base_color: HostId,
        normal: HostId,
        emissive: HostId,
        emissive_color: Float3,
        emissive_intensity: f32,
    },
    TreeLeaf {
        base_color: HostId,
        normal: HostId,
        alpha_cutoff: f32,
    },
    Terrain {
        base_color: HostId,
        normal: HostId,
    },
    MeshTiling {
        base_color: HostId,
        normal: HostId,
    },
}

impl MaterialParams {
    pub fn from_wire(mat: &Material) -> Option<Self> {
        Some(match mat.kind()? {
            MaterialKind::Unknown => return None,
            MaterialKind::Pbr => Self::Pbr {
                base_color: mat.texture_ids[0],
                normal: mat.texture_ids[1],
                emissive: mat.texture_ids[2],
                // No emissive texture means no emission, whatever the params
                // say.
                emissive_color: if mat.texture_ids[2] == INVALID_ID {
                    Float3::default()
                } else {
                    Float3::new(mat.params[0], mat.params[1], mat.params[2])
                },
                emissive_intensity: mat.params[3],
            },
            MaterialKind::TreeLeaf => Self::TreeLeaf {
                base_color: mat.texture_ids[0],
                normal: mat.texture_ids[1],
                alpha_cutoff: mat.params[0],
            },
            MaterialKind::Terrain => Self::Terrain {
                base_color: mat.texture_ids[0],
                normal: mat.texture_ids[1],
            },
            MaterialKind::MeshTiling => Self::MeshTiling {
                base_color: mat.texture_ids[0],
                normal: mat.texture_ids[3],
            },
        })
    }
}

/// The factory the host supplies. Implementations own the concrete scene
/// types; `assemble` drives the calls in dependency order (textures,
/// materials, meshes, lights, objects).
pub trait SceneSink {
    fn add_texture(&mut self, texture: &Texture);
    fn add_material(&mut self, material: &Material, params: &MaterialParams);
    fn add_mesh(&mut self, mesh: &Mesh, slice: &MeshSlice);
    fn add_light(&mut self, light: &Light, params: &LightParams);
    fn add_object(&mut self, object: &Object);
}

/// Shared-handle values of the leading immediate-texture slots, in slot
/// order. These are the baker's output targets, not scene content.
pub fn immediate_texture_handles(snapshot: &SceneSnapshot) -> Vec<i64> {
    snapshot
        .textures
        .iter()
        .take(IMMEDIATE_TEXTURE_SLOTS)
        .map(|t| t.handle)
        .collect()
}

/// Walk a decoded snapshot into `sink`. Unknown-kind lights and materials
/// and invalid texture records are skipped with a warning; an object
/// referencing a material the snapshot never declared is reported but still
/// added (the baker substitutes an empty material).
pub fn assemble(snapshot: &SceneSnapshot, sink: &mut impl SceneSink) -> Result<()> {
    for texture in snapshot.textures.iter().skip(IMMEDIATE_TEXTURE_SLOTS) {
        if !texture.is_material_texture() || texture.id == INVALID_ID {
            warn!(id = texture.id, "skipping invalid material texture record");
            continue;
        }
        sink.add_texture(texture);
    }

    let mut known_materials: HashSet<HostId> = HashSet::new();
    for material in &snapshot.materials {
        match MaterialParams::from_wire(material) {
            Some(params) => {
                known_materials.insert(material.id);
                sink.add_material(material, &params);
            }
            None => warn!(
                id = material.id,
                kind = material.kind,
                "skipping material of unsupported kind"
            ),
        }
    }

    let slices = mesh_slices(
        &snapshot.meshes,
        snapshot.positions.len(),
        snapshot.indices.len(),
    )?;
    for (mesh, slice) in snapshot.meshes.iter().zip(&slices) {
        sink.add_mesh(mesh, slice);
    }

    for light in &snapshot.lights {
        match LightParams::from_wire(light) {
            Some(params) => sink.add_light(light, &params),
            None => warn!(
                id = light.id,
                kind = light.kind,
                "skipping light of unsupported kind"
            ),
        }
    }

    for object in &snapshot.objects {
        if object.material_id != INVALID_ID && !known_materials.contains(&object.material_id) {
            warn!(
                object = object.id,
                material = object.material_id,
                "object references a material the snapshot does not declare"
            );
        }
        sink.add_object(object);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::TextureFlags;
    use crate::math::Float4;

    #[test]
    fn slices_accumulate_running_offsets() {
        let meshes = [
            Mesh {
                id: 1,
                vertex_count: 4,
                index_count: 6,
                ..Mesh::default()
            },
            Mesh {
                id: 2,
                vertex_count: 2,
                index_count: 3,
                ..Mesh::default()
            },
        ];
        let slices = mesh_slices(&meshes, 6, 9).unwrap();
        assert_eq!(slices[1].vertex_offset, 4);
        assert_eq!(slices[1].index_offset, 6);
    }

    #[test]
    fn slices_reject_pool_overflow() {
        let meshes = [Mesh {
            id: 1,
            vertex_count: 10,
            index_count: 1,
            ..Mesh::default()
        }];
        assert!(matches!(
            mesh_slices(&meshes, 9, 3),
            Err(SnapshotError::MeshPoolOverflow { .. })
        ));
    }

    #[test]
    fn light_extra_maps_per_kind() {
        let mut light = Light {
            kind: LightKind::Spot as i32,
            extra: Float4::new(0.3, 0.6, 0.0, 0.0),
            ..Light::default()
        };
        assert_eq!(
            LightParams::from_wire(&light),
            Some(LightParams::Spot {
                inner_angle: 0.3,
                outer_angle: 0.6
            })
        );

        light.kind = LightKind::Disc as i32;
        assert_eq!(
            LightParams::from_wire(&light),
            Some(LightParams::Disc { radius: 0.3 })
        );

        light.kind = 99;
        assert_eq!(LightParams::from_wire(&light), None);
    }

    #[test]
    fn pbr_emission_requires_an_emissive_texture() {
        let mut mat = Material {
            kind: MaterialKind::Pbr as i32,
            ..Material::default()
        };
        mat.params[0] = 1.0;
        mat.params[3] = 5.0;
        match MaterialParams::from_wire(&mat).unwrap() {
            MaterialParams::Pbr { emissive_color, .. } => {
                assert_eq!(emissive_color, Float3::default());
            }
            other => panic!("unexpected params: {other:?}"),
        }

        mat.texture_ids[2] = 77;
        match MaterialParams::from_wire(&mat).unwrap() {
            MaterialParams::Pbr {
                emissive_color,
                emissive_intensity,
                ..
            } => {
                assert_eq!(emissive_color, Float3::new(1.0, 0.0, 0.0));
                assert_eq!(emissive_intensity, 5.0);
            }
            other => panic!("unexpected params: {other:?}"),
        }
    }

    #[test]
    fn mesh_tiling_normal_comes_from_slot_three() {
        let mut mat = Material {
            kind: MaterialKind::MeshTiling as i32,
            ..Material::default()
        };
        mat.texture_ids[3] = 9;
        match MaterialParams::from_wire(&mat).unwrap() {
            MaterialParams::MeshTiling { normal, .. } => assert_eq!(normal, 9),
            other => panic!("unexpected params: {other:?}"),
        }
    }

    #[test]
    fn immediate_slots_are_split_from_material_textures() {
        let mut snapshot = SceneSnapshot::default();
        for i in 0..IMMEDIATE_TEXTURE_SLOTS as i64 {
            snapshot.textures.push(Texture {
                id: INVALID_ID,
                handle: 100 + i,
                flags: TextureFlags::IMMEDIATE,
                ..Texture::default()
            });
        }
        snapshot.textures.push(Texture {
            id: 1,
            ..Texture::default()
        });

        assert_eq!(immediate_texture_handles(&snapshot), vec![100, 101, 102, 103, 104]);

        #[derive(Default)]
        struct Counter {
            textures: Vec<HostId>,
        }
        impl SceneSink for Counter {
            fn add_texture(&mut self, texture: &Texture) {
                self.textures.push(texture.id);
            }
            fn add_material(&mut self, _: &Material, _: &MaterialParams) {}
            fn add_mesh(&mut self, _: &Mesh, _: &MeshSlice) {}
            fn add_light(&mut self, _: &Light, _: &LightParams) {}
            fn add_object(&mut self, _: &Object) {}
        }

        let mut sink = Counter::default();
        assemble(&snapshot, &mut sink).unwrap();
        assert_eq!(sink.textures, vec![1]);
    }
}
