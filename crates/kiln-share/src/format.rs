//! Host texture-format codes and per-API translation.
//!
//! The host sends its own format numbering in texture records; each backend
//! translates to its native enum. A format a backend cannot express is
//! recognized and rejected (`None`), never passed through raw.

/// The host's texture-format numbering, as it appears in `Texture::format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum HostTextureFormat {
    Alpha8 = 1,
    Argb4444 = 2,
    Rgb24 = 3,
    Rgba32 = 4,
    Argb32 = 5,
    ArgbFloat = 6,
    Rgb565 = 7,
    Bgr24 = 8,
    R16 = 9,
    Dxt1 = 10,
    Dxt3 = 11,
    Dxt5 = 12,
    Rgba4444 = 13,
    Bgra32 = 14,
    RHalf = 15,
    RgHalf = 16,
    RgbaHalf = 17,
    RFloat = 18,
    RgFloat = 19,
    RgbaFloat = 20,
    Yuy2 = 21,
    Rgb9e5Float = 22,
    RgbFloat = 23,
    Bc6h = 24,
    Bc7 = 25,
    Bc4 = 26,
    Bc5 = 27,
    Dxt1Crunched = 28,
    Dxt5Crunched = 29,
    Rg16 = 62,
    R8 = 63,
    Rg32 = 72,
    Rgba64 = 74,
}

impl HostTextureFormat {
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            1 => Self::Alpha8,
            2 => Self::Argb4444,
            3 => Self::Rgb24,
            4 => Self::Rgba32,
            5 => Self::Argb32,
            6 => Self::ArgbFloat,
            7 => Self::Rgb565,
            8 => Self::Bgr24,
            9 => Self::R16,
            10 => Self::Dxt1,
            11 => Self::Dxt3,
            12 => Self::Dxt5,
            13 => Self::Rgba4444,
            14 => Self::Bgra32,
            15 => Self::RHalf,
            16 => Self::RgHalf,
            17 => Self::RgbaHalf,
            18 => Self::RFloat,
            19 => Self::RgFloat,
            20 => Self::RgbaFloat,
            21 => Self::Yuy2,
            22 => Self::Rgb9e5Float,
            23 => Self::RgbFloat,
            24 => Self::Bc6h,
            25 => Self::Bc7,
            26 => Self::Bc4,
            27 => Self::Bc5,
            28 => Self::Dxt1Crunched,
            29 => Self::Dxt5Crunched,
            62 => Self::Rg16,
            63 => Self::R8,
            72 => Self::Rg32,
            74 => Self::Rgba64,
            _ => return None,
        })
    }

    /// DXGI_FORMAT value for the D3D backends.
    pub fn dxgi_format(self, srgb: bool) -> Option<u32> {
        use dxgi::*;
        Some(match self {
            Self::Alpha8 | Self::R8 => R8_UNORM,
            Self::Argb4444 | Self::Rgba4444 => B4G4R4A4_UNORM,
            Self::Rgba32 => pick(srgb, R8G8B8A8_UNORM_SRGB, R8G8B8A8_UNORM),
            Self::ArgbFloat | Self::RgbaFloat => R32G32B32A32_FLOAT,
            Self::R16 => R16_UNORM,
            Self::Dxt1 | Self::Dxt1Crunched => pick(srgb, BC1_UNORM_SRGB, BC1_UNORM),
            Self::Dxt3 => pick(srgb, BC2_UNORM_SRGB, BC2_UNORM),
            Self::Dxt5 | Self::Dxt5Crunched => pick(srgb, BC3_UNORM_SRGB, BC3_UNORM),
            Self::Bgra32 => pick(srgb, B8G8R8A8_UNORM_SRGB, B8G8R8A8_UNORM),
            Self::RHalf => R16_FLOAT,
            Self::RgHalf => R16G16_FLOAT,
            Self::RgbaHalf => R16G16B16A16_FLOAT,
            Self::RFloat => R32_FLOAT,
            Self::RgFloat => R32G32_FLOAT,
            Self::Yuy2 => R8G8_UNORM,
            Self::Rgb9e5Float => R9G9B9E5_SHAREDEXP,
            Self::RgbFloat => R32G32B32_FLOAT,
            Self::Bc6h => BC6H_UF16,
            Self::Bc7 => pick(srgb, BC7_UNORM_SRGB, BC7_UNORM),
            Self::Bc4 => BC4_UNORM,
            Self::Bc5 => BC5_UNORM,
            Self::Rg16 | Self::Rg32 => R16G16_UNORM,
            Self::Rgba64 => R16G16B16A16_UNORM,
            Self::Rgb24 | Self::Argb32 | Self::Rgb565 | Self::Bgr24 => return None,
        })
    }

    /// VkFormat value for the Vulkan backend.
    pub fn vk_format(self, srgb: bool) -> Option<u32> {
        use vk::*;
        Some(match self {
            Self::Alpha8 | Self::R8 => R8_UNORM,
            Self::Rgba32 | Self::Argb32 => pick(srgb, R8G8B8A8_SRGB, R8G8B8A8_UNORM),
            Self::ArgbFloat | Self::RgbaHalf => R16G16B16A16_SFLOAT,
            Self::R16 | Self::RHalf => R16_SFLOAT,
            Self::Dxt1 | Self::Dxt1Crunched => pick(srgb, BC1_RGB_SRGB_BLOCK, BC1_RGB_UNORM_BLOCK),
            Self::Dxt3 => pick(srgb, BC2_SRGB_BLOCK, BC2_UNORM_BLOCK),
            Self::Dxt5 | Self::Dxt5Crunched => pick(srgb, BC3_SRGB_BLOCK, BC3_UNORM_BLOCK),
            Self::Bgra32 => pick(srgb, B8G8R8A8_SRGB, B8G8R8A8_UNORM),
            Self::RgHalf => R16G16_SFLOAT,
            Self::RFloat => R32_SFLOAT,
            Self::RgFloat | Self::Rg32 => R32G32_SFLOAT,
            Self::RgbaFloat => R32G32B32A32_SFLOAT,
            Self::RgbFloat => R32G32B32_SFLOAT,
            Self::Bc6h => BC6H_SFLOAT_BLOCK,
            Self::Bc7 => pick(srgb, BC7_SRGB_BLOCK, BC7_UNORM_BLOCK),
            Self::Bc4 => BC4_UNORM_BLOCK,
            Self::Bc5 => BC5_UNORM_BLOCK,
            Self::Rgba64 => R16G16B16A16_UNORM,
            Self::Argb4444
            | Self::Rgb24
            | Self::Rgb565
            | Self::Bgr24
            | Self::Rgba4444
            | Self::Yuy2
            | Self::Rgb9e5Float
            | Self::Rg16 => return None,
        })
    }
}

fn pick(srgb: bool, srgb_value: u32, linear_value: u32) -> u32 {
    if srgb {
        srgb_value
    } else {
        linear_value
    }
}

/// `DXGI_FORMAT_*` values used by the D3D backends.
pub mod dxgi {
    pub const R32G32B32A32_FLOAT: u32 = 2;
    pub const R32G32B32_FLOAT: u32 = 6;
    pub const R16G16B16A16_FLOAT: u32 = 10;
    pub const R16G16B16A16_UNORM: u32 = 11;
    pub const R32G32_FLOAT: u32 = 16;
    pub const R8G8B8A8_UNORM: u32 = 28;
    pub const R8G8B8A8_UNORM_SRGB: u32 = 29;
    pub const R16G16_FLOAT: u32 = 34;
    pub const R16G16_UNORM: u32 = 35;
    pub const R32_FLOAT: u32 = 41;
    pub const R8G8_UNORM: u32 = 49;
    pub const R16_FLOAT: u32 = 54;
    pub const R16_UNORM: u32 = 56;
    pub const R8_UNORM: u32 = 61;
    pub const R9G9B9E5_SHAREDEXP: u32 = 67;
    pub const BC1_UNORM: u32 = 71;
    pub const BC1_UNORM_SRGB: u32 = 72;
    pub const BC2_UNORM: u32 = 74;
    pub const BC2_UNORM_SRGB: u32 = 75;
    pub const BC3_UNORM: u32 = 77;
    pub const BC3_UNORM_SRGB: u32 = 78;
    pub const BC4_UNORM: u32 = 80;
    pub const BC5_UNORM: u32 = 83;
    pub const B8G8R8A8_UNORM: u32 = 87;
    pub const B8G8R8A8_UNORM_SRGB: u32 = 91;
    pub const BC6H_UF16: u32 = 95;
    pub const BC7_UNORM: u32 = 98;
    pub const BC7_UNORM_SRGB: u32 = 99;
    pub const B4G4R4A4_UNORM: u32 = 115;
}

/// `VK_FORMAT_*` values used by the Vulkan backend.
pub mod vk {
    pub const R8_UNORM: u32 = 9;
    pub const R8G8B8A8_UNORM: u32 = 37;
    pub const R8G8B8A8_SRGB: u32 = 43;
    pub const B8G8R8A8_UNORM: u32 = 44;
    pub const B8G8R8A8_SRGB: u32 = 50;
    pub const R16_SFLOAT: u32 = 76;
    pub const R16G16_SFLOAT: u32 = 83;
    pub const R16G16B16A16_UNORM: u32 = 91;
    pub const R16G16B16A16_SFLOAT: u32 = 97;
    pub const R32_SFLOAT: u32 = 100;
    pub const R32G32_SFLOAT: u32 = 103;
    pub const R32G32B32_SFLOAT: u32 = 106;
    pub const R32G32B32A32_SFLOAT: u32 = 109;
    pub const BC1_RGB_UNORM_BLOCK: u32 = 131;
    pub const BC1_RGB_SRGB_BLOCK: u32 = 132;
    pub const BC2_UNORM_BLOCK: u32 = 135;
    pub const BC2_SRGB_BLOCK: u32 = 136;
    pub const BC3_UNORM_BLOCK: u32 = 137;
    pub const BC3_SRGB_BLOCK: u32 = 138;
    pub const BC4_UNORM_BLOCK: u32 = 139;
    pub const BC5_UNORM_BLOCK: u32 = 141;
    pub const BC6H_SFLOAT_BLOCK: u32 = 144;
    pub const BC7_UNORM_BLOCK: u32 = 145;
    pub const BC7_SRGB_BLOCK: u32 = 146;
}
