//! Records carried on the interchange streams.

mod frame;
mod heatmap;
mod metropolis;
mod point;

pub use frame::{Detection, Frame, FRAME_TIMESTAMP_FORMAT};
pub use heatmap::{Blob, Heatmap};
pub use metropolis::{BoundingBox, MetropolisRecord, METROPOLIS_VERSION};
pub use point::{Point2D, Point3D};
