//! Tagged, variably sized delta commands.
//!
//! A task is either a homogeneous array of wire records (lights, transforms,
//! bare ids) or a "one global-setting field changed" notification whose
//! payload is a full [`GlobalSetting`] image. Single-change kinds are one-hot
//! bits so the scheduler can coalesce them into a sticky flag word;
//! multi-element kinds use small discrete values that never collide with
//! those bits.

use kiln_wire::{ByteReader, GlobalSetting, HostId, Light, Transform, WireRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TaskKind {
    // Single-field setting changes (coalesced, one-hot).
    UpdateCamera = 0x1,
    UpdateEnvironment = 0x2,
    UpdateDenoiser = 0x4,
    UpdateDistanceHt = 0x8,
    UpdateBounceCount = 0x10,
    UpdateObjectEmissionBoost = 0x20,
    UpdateMaterialEmission = 0x40,
    UpdateLightmapResolution = 0x80,
    UpdateOneLight = 0x100,
    UpdateOneTransform = 0x200,
    DeleteOneNode = 0x400,
    DeleteOneLight = 0x800,
    RunFullBakeLightmap = 0x1000,
    RunFullBakeVlm = 0x2000,

    // Multi-element kinds (queued).
    UpdateLights = 9,
    UpdateTransforms = 10,
    DeleteNodes = 11,
    DeleteLights = 12,
}

impl TaskKind {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0x1 => Self::UpdateCamera,
            0x2 => Self::UpdateEnvironment,
            0x4 => Self::UpdateDenoiser,
            0x8 => Self::UpdateDistanceHt,
            0x10 => Self::UpdateBounceCount,
            0x20 => Self::UpdateObjectEmissionBoost,
            0x40 => Self::UpdateMaterialEmission,
            0x80 => Self::UpdateLightmapResolution,
            0x100 => Self::UpdateOneLight,
            0x200 => Self::UpdateOneTransform,
            0x400 => Self::DeleteOneNode,
            0x800 => Self::DeleteOneLight,
            0x1000 => Self::RunFullBakeLightmap,
            0x2000 => Self::RunFullBakeVlm,
            9 => Self::UpdateLights,
            10 => Self::UpdateTransforms,
            11 => Self::DeleteNodes,
            12 => Self::DeleteLights,
            _ => return None,
        })
    }

    /// Element stride for multi-element kinds; `None` for setting changes,
    /// whose payload is always one full [`GlobalSetting`] image.
    pub fn stride(self) -> Option<usize> {
        match self {
            Self::UpdateLights => Some(Light::SIZE),
            Self::UpdateTransforms => Some(Transform::SIZE),
            Self::DeleteNodes | Self::DeleteLights => Some(std::mem::size_of::<HostId>()),
            _ => None,
        }
    }

    pub fn is_setting_change(self) -> bool {
        self.stride().is_none()
    }
}

/// One queued command. The payload is owned by the task and released exactly
/// once when the task is dropped, whether it was popped and processed or
/// drained at shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeTask {
    kind: TaskKind,
    payload: Box<[u8]>,
}

impl BridgeTask {
    pub fn new(kind: TaskKind, payload: &[u8]) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn byte_len(&self) -> usize {
        self.payload.len()
    }

    /// `bytes / stride` for multi-element kinds, zero otherwise.
    pub fn element_count(&self) -> usize {
        match self.kind.stride() {
            Some(stride) => self.payload.len() / stride,
            None => 0,
        }
    }

    pub fn decode_lights(&self) -> Option<Vec<Light>> {
        if self.kind != TaskKind::UpdateLights {
            return None;
        }
        decode_elements::<Light>(&self.payload)
    }

    pub fn decode_transforms(&self) -> Option<Vec<Transform>> {
        if self.kind != TaskKind::UpdateTransforms {
            return None;
        }
        decode_elements::<Transform>(&self.payload)
    }

    /// Bare ids carried by the delete kinds.
    pub fn decode_ids(&self) -> Option<Vec<HostId>> {
        if !matches!(self.kind, TaskKind::DeleteNodes | TaskKind::DeleteLights) {
            return None;
        }
        if self.payload.len() % std::mem::size_of::<HostId>() != 0 {
            return None;
        }
        Some(
            self.payload
                .chunks_exact(std::mem::size_of::<HostId>())
                .map(|c| HostId::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    /// The full settings image carried by every setting-change kind.
    pub fn decode_setting(&self) -> Option<GlobalSetting> {
        if !self.kind.is_setting_change() {
            return None;
        }
        GlobalSetting::decode(&mut ByteReader::new(&self.payload)).ok()
    }
}

fn decode_elements<T: WireRecord>(payload: &[u8]) -> Option<Vec<T>> {
    if payload.len() % T::SIZE != 0 {
        return None;
    }
    let mut r = ByteReader::new(payload);
    let mut out = Vec::with_capacity(payload.len() / T::SIZE);
    for _ in 0..payload.len() / T::SIZE {
        out.push(T::decode(&mut r).ok()?);
    }
    Some(out)
}
