//! Resource descriptors for shared textures and buffers.

use bitflags::bitflags;

use crate::format::HostTextureFormat;

bitflags! {
    /// How the peers will access the shared resource.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShareAccess: u32 {
        const READ = 0x1;
        const WRITE = 0x2;
    }
}

impl Default for ShareAccess {
    fn default() -> Self {
        Self::READ | Self::WRITE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureShareDesc {
    pub width: u32,
    pub height: u32,
    pub mip_count: u32,
    pub format: HostTextureFormat,
    pub srgb: bool,
    pub access: ShareAccess,
}

impl TextureShareDesc {
    /// A mip chain can be at most `log2(min(width, height)) + 1` levels deep;
    /// hosts routinely ask for more on small textures.
    pub fn clamped_mip_count(&self) -> u32 {
        let max_mips = 32 - self.width.min(self.height).max(1).leading_zeros();
        self.mip_count.clamp(1, max_mips)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferShareDesc {
    pub size: u64,
    pub access: ShareAccess,
}
