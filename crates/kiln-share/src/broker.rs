//! The per-API shared-resource strategy.
//!
//! A broker plays one of two roles per resource. The *source* role creates
//! the backing allocation with exportable memory and writes an OS handle
//! into the caller's out-slot; the *destination* role re-declares the
//! resource from the same descriptor and imports memory from a handle it
//! received, exporting nothing. The destination must never destroy the
//! underlying allocation: releasing a broker drops only what it created.
//!
//! Failure policy: every native-call failure is logged with the attempted
//! parameters and surfaces as an `Err` the caller treats as a null resource.
//! No retries happen at this layer.

use thiserror::Error;

use crate::api::GraphicsApi;
use crate::desc::{BufferShareDesc, TextureShareDesc};
use crate::format::HostTextureFormat;
use crate::handle::{NativeResource, ShareHandle};

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("format {format:?} (srgb={srgb}) is not supported by the {api:?} backend")]
    UnsupportedFormat {
        format: HostTextureFormat,
        srgb: bool,
        api: GraphicsApi,
    },

    #[error("native call {call} failed")]
    NativeCall { call: &'static str },

    #[error("a null shared handle cannot be opened")]
    NullHandle,

    #[error("no device memory type matches bits {type_bits:#x}")]
    NoSuitableMemoryType { type_bits: u32 },

    #[error("resource of {bytes} bytes exceeds what the {api:?} backend can express")]
    TooLarge { bytes: u64, api: GraphicsApi },
}

/// One strategy per native graphics API; selected at runtime from the host's
/// active API.
pub trait ShareBroker {
    fn api(&self) -> GraphicsApi;

    /// Translate a host format to this backend's native enum. `None` means
    /// the format must be rejected, not passed through.
    fn native_format(&self, format: HostTextureFormat, srgb: bool) -> Option<u32>;

    /// Source role: create a texture backed by exportable memory and write
    /// the exported OS handle into `handle_out`.
    fn create_texture(
        &mut self,
        desc: &TextureShareDesc,
        handle_out: &mut ShareHandle,
    ) -> Result<NativeResource, ShareError>;

    /// Destination role: re-declare the texture with identical parameters
    /// and bind memory imported from `handle`. No handle is exported.
    fn open_texture(
        &mut self,
        desc: &TextureShareDesc,
        handle: ShareHandle,
    ) -> Result<NativeResource, ShareError>;

    /// Source role, flat byte size instead of dimensions.
    fn create_buffer(
        &mut self,
        desc: &BufferShareDesc,
        handle_out: &mut ShareHandle,
    ) -> Result<NativeResource, ShareError>;

    /// Destination role for buffers.
    fn open_buffer(
        &mut self,
        desc: &BufferShareDesc,
        handle: ShareHandle,
    ) -> Result<NativeResource, ShareError>;

    /// Drop every native object this broker created. Backing allocations of
    /// opened (destination-role) resources are left untouched.
    fn release_all(&mut self);
}
