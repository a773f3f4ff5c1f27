//! Source/destination role semantics over fake native devices.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use kiln_share::d3d11::{D3d11BufferParams, D3d11DeviceOps, D3d11TextureParams};
use kiln_share::vulkan::{
    image_usage, AllocationIntent, AllocationRequest, MemoryProperties, MemoryRequirements,
    VkBufferParams, VkImageParams, VulkanDeviceOps,
};
use kiln_share::{
    create_broker, BufferShareDesc, DeviceMemory, GraphicsApi, HostTextureFormat, NativeDevice,
    NativeResource, ShareAccess, ShareError, ShareHandle, TextureShareDesc,
};

#[derive(Default)]
struct VkLog {
    images: Vec<VkImageParams>,
    buffers: Vec<VkBufferParams>,
    allocations: Vec<AllocationRequest>,
    destroyed: Vec<NativeResource>,
    freed: Vec<DeviceMemory>,
    next_id: u64,
}

struct FakeVulkanDevice {
    log: Arc<Mutex<VkLog>>,
}

impl FakeVulkanDevice {
    fn new() -> (Self, Arc<Mutex<VkLog>>) {
        let log = Arc::new(Mutex::new(VkLog::default()));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl VulkanDeviceOps for FakeVulkanDevice {
    fn create_image(&mut self, params: &VkImageParams) -> Result<NativeResource, ShareError> {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        log.images.push(*params);
        Ok(NativeResource(log.next_id))
    }

    fn create_buffer(&mut self, params: &VkBufferParams) -> Result<NativeResource, ShareError> {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        log.buffers.push(*params);
        Ok(NativeResource(log.next_id))
    }

    fn memory_requirements(&self, _resource: NativeResource) -> MemoryRequirements {
        MemoryRequirements {
            size: 4096,
            memory_type_bits: 0b10,
        }
    }

    fn memory_properties(&self) -> MemoryProperties {
        // Type 0 is host-visible, type 1 is device-local.
        MemoryProperties {
            type_flags: vec![0x2, 0x1],
        }
    }

    fn allocate(&mut self, request: &AllocationRequest) -> Result<DeviceMemory, ShareError> {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        log.allocations.push(*request);
        Ok(DeviceMemory(log.next_id))
    }

    fn bind(&mut self, _resource: NativeResource, _memory: DeviceMemory) -> Result<(), ShareError> {
        Ok(())
    }

    fn export_handle(&mut self, memory: DeviceMemory) -> Result<ShareHandle, ShareError> {
        Ok(ShareHandle(memory.0 + 5000))
    }

    fn destroy_resource(&mut self, resource: NativeResource) {
        self.log.lock().unwrap().destroyed.push(resource);
    }

    fn free_memory(&mut self, memory: DeviceMemory) {
        self.log.lock().unwrap().freed.push(memory);
    }
}

fn texture_desc() -> TextureShareDesc {
    TextureShareDesc {
        width: 512,
        height: 512,
        mip_count: 10,
        format: HostTextureFormat::Rgba32,
        srgb: true,
        access: ShareAccess::READ | ShareAccess::WRITE,
    }
}

#[test]
fn vulkan_source_exports_a_handle_and_owns_the_allocation() {
    let (device, log) = FakeVulkanDevice::new();
    let mut broker =
        create_broker(GraphicsApi::Vulkan, NativeDevice::Vulkan(Box::new(device))).unwrap();

    let mut handle = ShareHandle::NULL;
    let texture = broker.create_texture(&texture_desc(), &mut handle).unwrap();
    assert!(!handle.is_null());

    {
        let log = log.lock().unwrap();
        let image = log.images[0];
        assert!(image.external);
        assert_eq!(image.mip_count, 10);
        assert_ne!(image.usage & image_usage::SAMPLED, 0);
        assert_ne!(image.usage & image_usage::STORAGE, 0);
        let allocation = log.allocations[0];
        assert_eq!(allocation.memory_type_index, 1);
        assert!(matches!(
            allocation.intent,
            AllocationIntent::Export {
                read: true,
                write: true
            }
        ));
    }

    drop(broker);
    let log = log.lock().unwrap();
    assert_eq!(log.destroyed, vec![texture]);
    assert_eq!(log.freed.len(), 1);
}

#[test]
fn vulkan_destination_imports_without_exporting_or_freeing() {
    let (device, log) = FakeVulkanDevice::new();
    let mut broker =
        create_broker(GraphicsApi::Vulkan, NativeDevice::Vulkan(Box::new(device))).unwrap();

    let peer_handle = ShareHandle(7777);
    let texture = broker.open_texture(&texture_desc(), peer_handle).unwrap();

    {
        let log = log.lock().unwrap();
        // The destination re-declares the image rather than discovering its
        // parameters from the handle.
        assert!(!log.images[0].external);
        match log.allocations[0].intent {
            AllocationIntent::Import { handle, dedicated } => {
                assert_eq!(handle, peer_handle);
                assert_eq!(dedicated, texture);
            }
            other => panic!("unexpected intent: {other:?}"),
        }
    }

    drop(broker);
    let log = log.lock().unwrap();
    // The local image object goes away, but the imported allocation is the
    // peer's to free.
    assert_eq!(log.destroyed, vec![texture]);
    assert!(log.freed.is_empty());
}

#[test]
fn vulkan_rejects_unsupported_formats_before_any_native_call() {
    let (device, log) = FakeVulkanDevice::new();
    let mut broker =
        create_broker(GraphicsApi::Vulkan, NativeDevice::Vulkan(Box::new(device))).unwrap();

    let mut desc = texture_desc();
    desc.format = HostTextureFormat::Rgb24;
    let mut handle = ShareHandle::NULL;
    let err = broker.create_texture(&desc, &mut handle).unwrap_err();
    assert!(matches!(err, ShareError::UnsupportedFormat { .. }));
    assert!(handle.is_null());
    assert!(log.lock().unwrap().images.is_empty());
}

#[test]
fn vulkan_buffers_mirror_the_texture_flow() {
    let (device, log) = FakeVulkanDevice::new();
    let mut broker =
        create_broker(GraphicsApi::Vulkan, NativeDevice::Vulkan(Box::new(device))).unwrap();

    let desc = BufferShareDesc {
        size: 1 << 20,
        access: ShareAccess::default(),
    };
    let mut handle = ShareHandle::NULL;
    broker.create_buffer(&desc, &mut handle).unwrap();
    assert!(!handle.is_null());
    assert_eq!(log.lock().unwrap().buffers[0].size, 1 << 20);

    assert!(matches!(
        broker.open_buffer(&desc, ShareHandle::NULL).unwrap_err(),
        ShareError::NullHandle
    ));
}

#[derive(Default)]
struct D3dLog {
    textures: Vec<D3d11TextureParams>,
    buffers: Vec<D3d11BufferParams>,
    opened: Vec<ShareHandle>,
    exports: usize,
    destroyed: Vec<NativeResource>,
    next_id: u64,
}

struct FakeD3d11Device {
    log: Arc<Mutex<D3dLog>>,
}

impl FakeD3d11Device {
    fn new() -> (Self, Arc<Mutex<D3dLog>>) {
        let log = Arc::new(Mutex::new(D3dLog::default()));
        (
            Self {
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl D3d11DeviceOps for FakeD3d11Device {
    fn create_texture_2d(
        &mut self,
        params: &D3d11TextureParams,
    ) -> Result<NativeResource, ShareError> {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        log.textures.push(*params);
        Ok(NativeResource(log.next_id))
    }

    fn create_buffer(&mut self, params: &D3d11BufferParams) -> Result<NativeResource, ShareError> {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        log.buffers.push(*params);
        Ok(NativeResource(log.next_id))
    }

    fn shared_handle_of(&mut self, resource: NativeResource) -> Result<ShareHandle, ShareError> {
        let mut log = self.log.lock().unwrap();
        log.exports += 1;
        Ok(ShareHandle(resource.0 + 9000))
    }

    fn open_shared_resource(&mut self, handle: ShareHandle) -> Result<NativeResource, ShareError> {
        let mut log = self.log.lock().unwrap();
        log.next_id += 1;
        log.opened.push(handle);
        Ok(NativeResource(log.next_id))
    }

    fn destroy_resource(&mut self, resource: NativeResource) {
        self.log.lock().unwrap().destroyed.push(resource);
    }
}

#[test]
fn d3d11_source_and_destination_split_export_from_open() {
    let (src_device, src_log) = FakeD3d11Device::new();
    let mut source =
        create_broker(GraphicsApi::D3d11, NativeDevice::D3d11(Box::new(src_device))).unwrap();

    let mut handle = ShareHandle::NULL;
    source.create_texture(&texture_desc(), &mut handle).unwrap();
    assert!(!handle.is_null());
    {
        let log = src_log.lock().unwrap();
        let params = log.textures[0];
        assert_eq!(params.misc_flags, kiln_share::d3d11::misc::SHARED);
        assert_ne!(params.bind_flags & kiln_share::d3d11::bind::SHADER_RESOURCE, 0);
        assert_ne!(params.bind_flags & kiln_share::d3d11::bind::RENDER_TARGET, 0);
        assert_eq!(log.exports, 1);
    }

    let (dst_device, dst_log) = FakeD3d11Device::new();
    let mut destination =
        create_broker(GraphicsApi::D3d11, NativeDevice::D3d11(Box::new(dst_device))).unwrap();
    destination.open_texture(&texture_desc(), handle).unwrap();

    let log = dst_log.lock().unwrap();
    assert_eq!(log.opened, vec![handle]);
    // The destination never exports a new handle.
    assert_eq!(log.exports, 0);
}

#[test]
fn d3d12_selection_fails_closed() {
    let (device, _log) = FakeD3d11Device::new();
    assert!(create_broker(GraphicsApi::D3d12, NativeDevice::D3d11(Box::new(device))).is_none());
}

#[test]
fn mismatched_device_is_rejected() {
    let (device, _log) = FakeVulkanDevice::new();
    assert!(create_broker(GraphicsApi::D3d11, NativeDevice::Vulkan(Box::new(device))).is_none());
}
