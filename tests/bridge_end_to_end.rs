//! Full producer/consumer pass: snapshot handoff, delta streaming, flush and
//! cooperative shutdown.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use kiln_bridge::{BakeBridge, SetupData, TaskKind};
use pretty_assertions::assert_eq;
use kiln_wire::scene::{assemble, LightParams, MaterialParams, MeshSlice, SceneSink};
use kiln_wire::{
    Float2, Float3, Float4, Light, LightKind, Material, MaterialKind, Mesh, MeshStreams, Object,
    SceneSnapshot, SettingFlags, Texture, Transform, WireRecord,
};

/// The baker's live scene state, mutated by popped tasks.
#[derive(Default)]
struct BakerScene {
    materials: Vec<i32>,
    meshes: Vec<(i32, MeshSlice)>,
    lights: Vec<Light>,
    objects: Vec<i32>,
    transforms: Vec<Transform>,
    deleted_lights: Vec<i32>,
    camera_updates: usize,
    bounce_count: i32,
}

impl SceneSink for BakerScene {
    fn add_texture(&mut self, _texture: &Texture) {}

    fn add_material(&mut self, material: &Material, params: &MaterialParams) {
        assert!(matches!(params, MaterialParams::Pbr { .. }));
        self.materials.push(material.id);
    }

    fn add_mesh(&mut self, mesh: &Mesh, slice: &MeshSlice) {
        self.meshes.push((mesh.id, *slice));
    }

    fn add_light(&mut self, light: &Light, params: &LightParams) {
        if light.kind() == Some(LightKind::Directional) {
            assert!(matches!(params, LightParams::Directional));
        }
        self.lights.push(*light);
    }

    fn add_object(&mut self, object: &Object) {
        self.objects.push(object.id);
    }
}

fn host_snapshot() -> Vec<u8> {
    let mut snapshot = SceneSnapshot::default();
    snapshot.setting.flags = SettingFlags::SPLIT_VERTEX_DATA | SettingFlags::INDICES_32BIT;
    snapshot.setting.bounce_count = 2;
    snapshot.setting.host_pid = std::process::id() as i32;
    snapshot.setting.set_scene_path("/tmp/kiln-e2e");

    snapshot.lights = vec![
        Light {
            id: 1,
            kind: LightKind::Point as i32,
            intensity: 2.0,
            ..Light::default()
        },
        Light {
            id: 2,
            kind: LightKind::Directional as i32,
            intensity: 4.0,
            ..Light::default()
        },
    ];
    snapshot.meshes = vec![Mesh {
        id: 5,
        vertex_count: 3,
        index_count: 3,
        streams: MeshStreams::POSITION | MeshStreams::UV0,
    }];
    snapshot.materials = vec![Material {
        id: 9,
        kind: MaterialKind::Pbr as i32,
        ..Material::default()
    }];
    snapshot.objects = vec![Object {
        id: 20,
        mesh_id: 5,
        material_id: 9,
        rotation: Float4::new(0.0, 0.0, 0.0, 1.0),
        scale: Float3::new(1.0, 1.0, 1.0),
        ..Object::default()
    }];
    snapshot.positions = vec![Float3::default(); 3];
    snapshot.normals = vec![0; 3];
    snapshot.tangents = vec![0; 3];
    snapshot.uv0 = vec![Float2::default(); 3];
    snapshot.uv1 = vec![Float2::default(); 3];
    snapshot.indices = vec![0, 1, 2];
    snapshot.encode()
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}

#[test]
fn snapshot_then_deltas_then_shutdown() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut bridge = BakeBridge::new(SetupData {
        snapshot: host_snapshot(),
        ..SetupData::default()
    });

    let scene = Arc::new(Mutex::new(BakerScene::default()));
    let worker_scene = Arc::clone(&scene);
    let snapshot_bytes = bridge.setup().snapshot.clone();

    bridge
        .launch_baker(move |handle, scheduler| {
            // One-time snapshot decode at launch.
            let decoded = SceneSnapshot::decode(&snapshot_bytes).expect("host snapshot is valid");
            {
                let mut scene = worker_scene.lock().unwrap();
                assemble(&decoded, &mut *scene).unwrap();
                scene.bounce_count = decoded.setting.bounce_count;
            }

            // Then poll for deltas until asked to leave.
            while !handle.exit_requested() {
                while let Some(task) = scheduler.pop() {
                    let mut scene = worker_scene.lock().unwrap();
                    match task.kind() {
                        TaskKind::UpdateTransforms => {
                            scene.transforms.extend(task.decode_transforms().unwrap());
                        }
                        TaskKind::DeleteLights => {
                            scene.deleted_lights.extend(task.decode_ids().unwrap());
                        }
                        TaskKind::UpdateCamera => scene.camera_updates += 1,
                        TaskKind::UpdateBounceCount => {
                            scene.bounce_count =
                                task.decode_setting().unwrap().bounce_count;
                        }
                        other => panic!("unexpected task kind {other:?}"),
                    }
                }
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();

    assert!(wait_until(Duration::from_secs(5), || bridge.is_running()));
    // The snapshot landed: directional light first, mesh slicing applied.
    assert!(wait_until(Duration::from_secs(5), || {
        scene.lock().unwrap().lights.len() == 2
    }));
    {
        let scene = scene.lock().unwrap();
        assert_eq!(scene.lights[0].id, 2);
        assert_eq!(scene.meshes, vec![(
            5,
            MeshSlice {
                vertex_offset: 0,
                index_offset: 0,
                vertex_count: 3,
                index_count: 3
            }
        )]);
        assert_eq!(scene.materials, vec![9]);
        assert_eq!(scene.objects, vec![20]);
        assert_eq!(scene.bounce_count, 2);
    }

    // Stream deltas: two transforms, one light deletion, two coalesced
    // setting changes.
    let mut transforms = Vec::new();
    Transform {
        id: 20,
        position: Float3::new(1.0, 2.0, 3.0),
        rotation: Float4::new(0.0, 0.0, 0.0, 1.0),
        scale: Float3::new(1.0, 1.0, 1.0),
    }
    .encode(&mut transforms);
    Transform {
        id: 20,
        position: Float3::new(4.0, 5.0, 6.0),
        rotation: Float4::new(0.0, 0.0, 0.0, 1.0),
        scale: Float3::new(1.0, 1.0, 1.0),
    }
    .encode(&mut transforms);
    bridge
        .push_task(TaskKind::UpdateTransforms as u32, &transforms)
        .unwrap();

    bridge
        .push_task(TaskKind::DeleteLights as u32, &1i32.to_le_bytes())
        .unwrap();

    let mut setting = kiln_wire::GlobalSetting::default();
    setting.bounce_count = 8;
    let mut setting_bytes = Vec::new();
    setting.encode(&mut setting_bytes);
    bridge
        .push_task(TaskKind::UpdateCamera as u32, &setting_bytes)
        .unwrap();
    bridge
        .push_task(TaskKind::UpdateBounceCount as u32, &setting_bytes)
        .unwrap();

    assert!(bridge.flush(Duration::from_secs(5)));
    assert!(wait_until(Duration::from_secs(5), || {
        let scene = scene.lock().unwrap();
        scene.transforms.len() == 2
            && scene.deleted_lights == vec![1]
            && scene.camera_updates == 1
            && scene.bounce_count == 8
    }));

    assert!(bridge.request_exit(Duration::from_secs(5)));
    assert!(!bridge.is_running());

    let scene = scene.lock().unwrap();
    assert_eq!(scene.transforms[1].position, Float3::new(4.0, 5.0, 6.0));
}
