//! Direct3D 11 share strategy.
//!
//! D3D11 shared resources carry their own metadata, so the destination role
//! opens a handle directly instead of re-declaring the resource; the
//! descriptor is still required so both sides agree on what is being shared.

use tracing::{debug, error};

use crate::api::GraphicsApi;
use crate::broker::{ShareBroker, ShareError};
use crate::desc::{BufferShareDesc, ShareAccess, TextureShareDesc};
use crate::format::HostTextureFormat;
use crate::handle::{NativeResource, ShareHandle};

/// `D3D11_BIND_*` bits.
pub mod bind {
    pub const VERTEX_BUFFER: u32 = 0x1;
    pub const INDEX_BUFFER: u32 = 0x2;
    pub const SHADER_RESOURCE: u32 = 0x8;
    pub const RENDER_TARGET: u32 = 0x20;
    pub const UNORDERED_ACCESS: u32 = 0x80;
}

/// `D3D11_RESOURCE_MISC_*` bits.
pub mod misc {
    pub const SHARED: u32 = 0x2;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3d11TextureParams {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    /// Native `DXGI_FORMAT` value.
    pub format: u32,
    pub bind_flags: u32,
    pub misc_flags: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3d11BufferParams {
    pub byte_width: u32,
    pub bind_flags: u32,
    pub misc_flags: u32,
}

/// The native calls the host's D3D11 device provides.
pub trait D3d11DeviceOps {
    fn create_texture_2d(
        &mut self,
        params: &D3d11TextureParams,
    ) -> Result<NativeResource, ShareError>;
    fn create_buffer(&mut self, params: &D3d11BufferParams) -> Result<NativeResource, ShareError>;
    /// `IDXGIResource::GetSharedHandle` on a resource created with the
    /// shared misc flag.
    fn shared_handle_of(&mut self, resource: NativeResource) -> Result<ShareHandle, ShareError>;
    /// `ID3D11Device::OpenSharedResource`.
    fn open_shared_resource(&mut self, handle: ShareHandle) -> Result<NativeResource, ShareError>;
    fn destroy_resource(&mut self, resource: NativeResource);
}

pub struct D3d11Broker {
    device: Box<dyn D3d11DeviceOps>,
    /// Source-role resources: the shared allocation is ours.
    owned: Vec<NativeResource>,
    /// Destination-role views onto a peer's allocation.
    opened: Vec<NativeResource>,
}

impl D3d11Broker {
    pub fn new(device: Box<dyn D3d11DeviceOps>) -> Self {
        Self {
            device,
            owned: Vec::new(),
            opened: Vec::new(),
        }
    }

    fn texture_bind_flags(access: ShareAccess) -> u32 {
        let mut flags = 0;
        if access.contains(ShareAccess::READ) {
            flags |= bind::SHADER_RESOURCE;
        }
        if access.contains(ShareAccess::WRITE) {
            flags |= bind::RENDER_TARGET | bind::UNORDERED_ACCESS;
        }
        flags
    }
}

impl ShareBroker for D3d11Broker {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::D3d11
    }

    fn native_format(&self, format: HostTextureFormat, srgb: bool) -> Option<u32> {
        format.dxgi_format(srgb)
    }

    fn create_texture(
        &mut self,
        desc: &TextureShareDesc,
        handle_out: &mut ShareHandle,
    ) -> Result<NativeResource, ShareError> {
        *handle_out = ShareHandle::NULL;
        let format = self.native_format(desc.format, desc.srgb).ok_or_else(|| {
            error!(format = ?desc.format, srgb = desc.srgb, "unsupported texture format");
            ShareError::UnsupportedFormat {
                format: desc.format,
                srgb: desc.srgb,
                api: GraphicsApi::D3d11,
            }
        })?;
        let texture = self.device.create_texture_2d(&D3d11TextureParams {
            width: desc.width,
            height: desc.height,
            mip_count: desc.clamped_mip_count(),
            format,
            bind_flags: Self::texture_bind_flags(desc.access),
            misc_flags: misc::SHARED,
        })?;
        match self.device.shared_handle_of(texture) {
            Ok(handle) => {
                *handle_out = handle;
                self.owned.push(texture);
                debug!(
                    width = desc.width,
                    height = desc.height,
                    format,
                    handle = handle.0,
                    "created shared d3d11 texture"
                );
                Ok(texture)
            }
            Err(err) => {
                self.device.destroy_resource(texture);
                Err(err)
            }
        }
    }

    fn open_texture(
        &mut self,
        desc: &TextureShareDesc,
        handle: ShareHandle,
    ) -> Result<NativeResource, ShareError> {
        if handle.is_null() {
            error!(width = desc.width, height = desc.height, "open_texture with null handle");
            return Err(ShareError::NullHandle);
        }
        let texture = self.device.open_shared_resource(handle)?;
        self.opened.push(texture);
        Ok(texture)
    }

    fn create_buffer(
        &mut self,
        desc: &BufferShareDesc,
        handle_out: &mut ShareHandle,
    ) -> Result<NativeResource, ShareError> {
        *handle_out = ShareHandle::NULL;
        let byte_width = u32::try_from(desc.size).map_err(|_| {
            error!(size = desc.size, "buffer too large for d3d11");
            ShareError::TooLarge {
                bytes: desc.size,
                api: GraphicsApi::D3d11,
            }
        })?;
        let buffer = self.device.create_buffer(&D3d11BufferParams {
            byte_width,
            bind_flags: bind::VERTEX_BUFFER | bind::INDEX_BUFFER,
            misc_flags: misc::SHARED,
        })?;
        match self.device.shared_handle_of(buffer) {
            Ok(handle) => {
                *handle_out = handle;
                self.owned.push(buffer);
                debug!(size = desc.size, handle = handle.0, "created shared d3d11 buffer");
                Ok(buffer)
            }
            Err(err) => {
                self.device.destroy_resource(buffer);
                Err(err)
            }
        }
    }

    fn open_buffer(
        &mut self,
        desc: &BufferShareDesc,
        handle: ShareHandle,
    ) -> Result<NativeResource, ShareError> {
        if handle.is_null() {
            error!(size = desc.size, "open_buffer with null handle");
            return Err(ShareError::NullHandle);
        }
        let buffer = self.device.open_shared_resource(handle)?;
        self.opened.push(buffer);
        Ok(buffer)
    }

    fn release_all(&mut self) {
        for resource in self.owned.drain(..) {
            self.device.destroy_resource(resource);
        }
        for resource in self.opened.drain(..) {
            // Releases this process's reference; the allocation stays with
            // the exporting peer.
            self.device.destroy_resource(resource);
        }
    }
}

impl Drop for D3d11Broker {
    fn drop(&mut self) {
        self.release_all();
    }
}
