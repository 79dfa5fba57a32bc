pub mod loader;
pub mod source;
pub mod bounds;
pub mod meshlet;
pub mod buffers;
pub mod cpu;

pub use source::{HalaMeshSource, HalaSubmeshGeometry, extract_geometry};
pub use bounds::HalaBounds;
pub use meshlet::HalaMeshlet;
pub use buffers::{HalaGpuMeshlet, HalaMeshletBuffers};
