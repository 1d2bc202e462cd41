pub mod bitmap;
pub mod hit;
pub mod raster;
pub mod surface;
pub mod text;

pub use bitmap::{DecodedImage, ImageError};
pub use hit::{hit_test, hit_test_rect};
pub use raster::{RasterError, export_png_data_url, rasterize};
pub use text::{face_count, register_font};
pub use surface::{
    ControlStyle, ImageContent, Instance, InstanceId, InstanceKind, Locks, SnapshotNode, Surface,
    SurfaceSnapshot,
};
