//! Runtime graphics-API selection.

use tracing::{error, info};

use crate::broker::ShareBroker;
use crate::d3d11::{D3d11Broker, D3d11DeviceOps};
use crate::vulkan::{VulkanBroker, VulkanDeviceOps};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphicsApi {
    Vulkan,
    D3d11,
    D3d12,
}

impl GraphicsApi {
    /// Map the host runtime's renderer id to an API this crate knows.
    pub fn from_host_renderer(raw: u32) -> Option<Self> {
        Some(match raw {
            2 => Self::D3d11,
            18 => Self::D3d12,
            21 => Self::Vulkan,
            _ => return None,
        })
    }
}

/// The native device the host's render backend exposes.
pub enum NativeDevice {
    Vulkan(Box<dyn VulkanDeviceOps>),
    D3d11(Box<dyn D3d11DeviceOps>),
}

impl NativeDevice {
    pub fn api(&self) -> GraphicsApi {
        match self {
            Self::Vulkan(_) => GraphicsApi::Vulkan,
            Self::D3d11(_) => GraphicsApi::D3d11,
        }
    }
}

/// Build the broker for the host's active graphics API, or nothing if the
/// API has no usable backend.
pub fn create_broker(api: GraphicsApi, device: NativeDevice) -> Option<Box<dyn ShareBroker>> {
    match (api, device) {
        (GraphicsApi::Vulkan, NativeDevice::Vulkan(ops)) => {
            info!("sharing GPU resources through the vulkan backend");
            Some(Box::new(VulkanBroker::new(ops)))
        }
        (GraphicsApi::D3d11, NativeDevice::D3d11(ops)) => {
            info!("sharing GPU resources through the d3d11 backend");
            Some(Box::new(D3d11Broker::new(ops)))
        }
        (GraphicsApi::D3d12, _) => {
            error!("d3d12 resource sharing is not available");
            None
        }
        (api, device) => {
            error!(?api, device_api = ?device.api(), "active api does not match the supplied device");
            None
        }
    }
}
