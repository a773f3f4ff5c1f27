//! Vulkan share strategy.
//!
//! The broker owns the orchestration — usage flags, external-memory intent,
//! memory-type selection, the export/import split — while the actual API
//! calls live behind [`VulkanDeviceOps`], which the host supplies from its
//! loaded function pointers.

use tracing::{debug, error};

use crate::api::GraphicsApi;
use crate::broker::{ShareBroker, ShareError};
use crate::desc::{BufferShareDesc, ShareAccess, TextureShareDesc};
use crate::format::HostTextureFormat;
use crate::handle::{DeviceMemory, NativeResource, ShareHandle};

/// `VK_IMAGE_USAGE_*` bits.
pub mod image_usage {
    pub const TRANSFER_DST: u32 = 0x2;
    pub const SAMPLED: u32 = 0x4;
    pub const STORAGE: u32 = 0x8;
}

/// `VK_BUFFER_USAGE_*` bits.
pub mod buffer_usage {
    pub const TRANSFER_DST: u32 = 0x2;
    pub const INDEX_BUFFER: u32 = 0x40;
    pub const VERTEX_BUFFER: u32 = 0x80;
}

/// `VK_MEMORY_PROPERTY_*` bits.
pub mod memory_property {
    pub const DEVICE_LOCAL: u32 = 0x1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VkImageParams {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    /// Native `VkFormat` value.
    pub format: u32,
    pub usage: u32,
    /// Chain external-memory create info (source role only, as the host's
    /// plugin does it).
    pub external: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VkBufferParams {
    pub size: u64,
    pub usage: u32,
    pub external: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRequirements {
    pub size: u64,
    pub memory_type_bits: u32,
}

/// Per-type property flags reported by the physical device, indexed by
/// memory type.
#[derive(Debug, Clone, Default)]
pub struct MemoryProperties {
    pub type_flags: Vec<u32>,
}

/// What the allocation is for: exporting to a peer or importing from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationIntent {
    Export { read: bool, write: bool },
    /// Dedicated import bound to the resource being re-declared.
    Import {
        handle: ShareHandle,
        dedicated: NativeResource,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRequest {
    pub size: u64,
    pub memory_type_index: u32,
    pub intent: AllocationIntent,
}

/// The native calls the host's Vulkan device provides.
pub trait VulkanDeviceOps {
    fn create_image(&mut self, params: &VkImageParams) -> Result<NativeResource, ShareError>;
    fn create_buffer(&mut self, params: &VkBufferParams) -> Result<NativeResource, ShareError>;
    fn memory_requirements(&self, resource: NativeResource) -> MemoryRequirements;
    fn memory_properties(&self) -> MemoryProperties;
    fn allocate(&mut self, request: &AllocationRequest) -> Result<DeviceMemory, ShareError>;
    fn bind(&mut self, resource: NativeResource, memory: DeviceMemory) -> Result<(), ShareError>;
    fn export_handle(&mut self, memory: DeviceMemory) -> Result<ShareHandle, ShareError>;
    fn destroy_resource(&mut self, resource: NativeResource);
    fn free_memory(&mut self, memory: DeviceMemory);
}

/// First memory type matching both the requirement bits and the requested
/// property flags.
pub fn find_memory_type_index(
    type_bits: u32,
    required_flags: u32,
    properties: &MemoryProperties,
) -> Option<u32> {
    properties
        .type_flags
        .iter()
        .enumerate()
        .take(32) // memory_type_bits is a u32 bitmask
        .find(|(index, flags)| {
            type_bits & (1u32 << index) != 0 && *flags & required_flags == required_flags
        })
        .map(|(index, _)| index as u32)
}

pub struct VulkanBroker {
    device: Box<dyn VulkanDeviceOps>,
    /// Source-role allocations: destroyed and freed on release.
    owned: Vec<(NativeResource, DeviceMemory)>,
    /// Destination-role objects: the local object is destroyed on release,
    /// the imported allocation stays with its exporting peer.
    imported: Vec<NativeResource>,
}

impl VulkanBroker {
    pub fn new(device: Box<dyn VulkanDeviceOps>) -> Self {
        Self {
            device,
            owned: Vec::new(),
            imported: Vec::new(),
        }
    }

    fn image_usage_for(access: ShareAccess) -> u32 {
        let mut usage = image_usage::TRANSFER_DST;
        if access.contains(ShareAccess::READ) {
            usage |= image_usage::SAMPLED;
        }
        if access.contains(ShareAccess::WRITE) {
            usage |= image_usage::STORAGE;
        }
        usage
    }

    fn translated_format(&self, desc: &TextureShareDesc) -> Result<u32, ShareError> {
        self.native_format(desc.format, desc.srgb).ok_or_else(|| {
            error!(format = ?desc.format, srgb = desc.srgb, "unsupported texture format");
            ShareError::UnsupportedFormat {
                format: desc.format,
                srgb: desc.srgb,
                api: GraphicsApi::Vulkan,
            }
        })
    }

    /// Allocate, bind and (for exports) hand back the OS handle for a
    /// freshly created image or buffer. The resource is destroyed again if
    /// any step fails.
    fn bind_new_allocation(
        &mut self,
        resource: NativeResource,
        intent: AllocationIntent,
    ) -> Result<Option<ShareHandle>, ShareError> {
        match self.try_bind(resource, intent) {
            Ok(handle) => Ok(handle),
            Err(err) => {
                self.device.destroy_resource(resource);
                Err(err)
            }
        }
    }

    fn try_bind(
        &mut self,
        resource: NativeResource,
        intent: AllocationIntent,
    ) -> Result<Option<ShareHandle>, ShareError> {
        let requirements = self.device.memory_requirements(resource);
        let properties = self.device.memory_properties();
        let memory_type_index = find_memory_type_index(
            requirements.memory_type_bits,
            memory_property::DEVICE_LOCAL,
            &properties,
        )
        .ok_or_else(|| {
            error!(
                type_bits = requirements.memory_type_bits,
                "no device-local memory type for shared resource"
            );
            ShareError::NoSuitableMemoryType {
                type_bits: requirements.memory_type_bits,
            }
        })?;

        let memory = self.device.allocate(&AllocationRequest {
            size: requirements.size,
            memory_type_index,
            intent,
        })?;
        if let Err(err) = self.device.bind(resource, memory) {
            self.device.free_memory(memory);
            return Err(err);
        }

        match intent {
            AllocationIntent::Export { .. } => match self.device.export_handle(memory) {
                Ok(handle) => {
                    self.owned.push((resource, memory));
                    Ok(Some(handle))
                }
                Err(err) => {
                    self.device.free_memory(memory);
                    Err(err)
                }
            },
            AllocationIntent::Import { .. } => {
                self.imported.push(resource);
                Ok(None)
            }
        }
    }
}

impl ShareBroker for VulkanBroker {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Vulkan
    }

    fn native_format(&self, format: HostTextureFormat, srgb: bool) -> Option<u32> {
        format.vk_format(srgb)
    }

    fn create_texture(
        &mut self,
        desc: &TextureShareDesc,
        handle_out: &mut ShareHandle,
    ) -> Result<NativeResource, ShareError> {
        *handle_out = ShareHandle::NULL;
        let format = self.translated_format(desc)?;
        let image = self.device.create_image(&VkImageParams {
            width: desc.width,
            height: desc.height,
            mip_count: desc.clamped_mip_count(),
            format,
            usage: Self::image_usage_for(desc.access),
            external: true,
        })?;
        let handle = self.bind_new_allocation(
            image,
            AllocationIntent::Export {
                read: desc.access.contains(ShareAccess::READ),
                write: desc.access.contains(ShareAccess::WRITE),
            },
        )?;
        // Export intent always produces a handle.
        *handle_out = handle.ok_or(ShareError::NullHandle)?;
        debug!(
            width = desc.width,
            height = desc.height,
            format,
            handle = handle_out.0,
            "created exportable vulkan texture"
        );
        Ok(image)
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
        let format = self.translated_format(desc)?;
        let image = self.device.create_image(&VkImageParams {
            width: desc.width,
            height: desc.height,
            mip_count: desc.clamped_mip_count(),
            format,
            usage: Self::image_usage_for(desc.access),
            external: false,
        })?;
        self.bind_new_allocation(
            image,
            AllocationIntent::Import {
                handle,
                dedicated: image,
            },
        )?;
        Ok(image)
    }

    fn create_buffer(
        &mut self,
        desc: &BufferShareDesc,
        handle_out: &mut ShareHandle,
    ) -> Result<NativeResource, ShareError> {
        *handle_out = ShareHandle::NULL;
        let buffer = self.device.create_buffer(&VkBufferParams {
            size: desc.size,
            usage: buffer_usage::VERTEX_BUFFER
                | buffer_usage::INDEX_BUFFER
                | buffer_usage::TRANSFER_DST,
            external: true,
        })?;
        let handle = self.bind_new_allocation(
            buffer,
            AllocationIntent::Export {
                read: desc.access.contains(ShareAccess::READ),
                write: desc.access.contains(ShareAccess::WRITE),
            },
        )?;
        *handle_out = handle.ok_or(ShareError::NullHandle)?;
        debug!(size = desc.size, handle = handle_out.0, "created exportable vulkan buffer");
        Ok(buffer)
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
        let buffer = self.device.create_buffer(&VkBufferParams {
            size: desc.size,
            usage: buffer_usage::VERTEX_BUFFER
                | buffer_usage::INDEX_BUFFER
                | buffer_usage::TRANSFER_DST,
            external: false,
        })?;
        self.bind_new_allocation(
            buffer,
            AllocationIntent::Import {
                handle,
                dedicated: buffer,
            },
        )?;
        Ok(buffer)
    }

    fn release_all(&mut self) {
        for (resource, memory) in self.owned.drain(..) {
            self.device.destroy_resource(resource);
            self.device.free_memory(memory);
        }
        for resource in self.imported.drain(..) {
            // The local image/buffer object goes away; the backing
            // allocation belongs to the exporting peer.
            self.device.destroy_resource(resource);
        }
    }
}

impl Drop for VulkanBroker {
    fn drop(&mut self) {
        self.release_all();
    }
}
