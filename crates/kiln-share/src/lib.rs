//! `kiln-share` brokers GPU resources whose backing memory is shared between
//! the host's graphics context and the baker's, and optionally across OS
//! processes.
//!
//! The broker is a per-API strategy ([`ShareBroker`]) over thin device
//! collaborator traits; the host plugs in its loaded native function
//! pointers, tests plug in fakes. The source role creates exportable
//! allocations and hands out OS handles; the destination role opens them and
//! never destroys the underlying allocation. Cross-process handle adoption
//! (same-process detection, duplicate-or-fail-closed) lives in [`handle`].

mod api;
mod broker;
mod desc;
mod format;
mod handle;

pub mod d3d11;
pub mod vulkan;

pub use crate::api::{create_broker, GraphicsApi, NativeDevice};
pub use crate::broker::{ShareBroker, ShareError};
pub use crate::desc::{BufferShareDesc, ShareAccess, TextureShareDesc};
pub use crate::format::{dxgi, vk, HostTextureFormat};
pub use crate::handle::{
    adopt_peer_handle, DeviceMemory, HandleDuplicator, NativeResource, PeerProcess, ShareHandle,
};
