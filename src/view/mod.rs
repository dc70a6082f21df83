// VIEW: Rendering and graphics
pub mod render;
pub mod mesh;
pub mod gpu_init;

pub use render::{OverlayFrame, SceneRenderer};
pub use mesh::{Mesh, MeshBuffer, Vertex};
pub use gpu_init::GpuContext;
