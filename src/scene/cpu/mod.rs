pub mod mesh;
pub mod scene;

pub use mesh::{HalaMesh, HalaPrimitive};
pub use scene::HalaScene;
