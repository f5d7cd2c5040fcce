//! Sensor Control - REST configuration clients for the sensor services
//!
//! Each sensor service exposes its settings as JSON resources over HTTP.
//! The clients here read them with GET and replace them with PUT:
//!
//! - **Camera** (`5050`): per-camera capture, undistortion and streaming
//! - **Media** (`5051`): composed output stream and brightness
//! - **Display** (`5052`): shown cameras and the heatmap overlay
//! - **Engagement analytics** (`5053`): regions of interest, clustering
//! - **Analytics** (`5020`): actions triggered by detections
//!
//! Getters return `None` and setters return `false` on any failure; the
//! failure is logged. Configurations are validated before they are sent.
//!
//! # Example
//!
//! ```rust,no_run
//! use sensor_control::{DisplayClient, ServiceEndpoint};
//!
//! let display = DisplayClient::new(ServiceEndpoint::new("10.0.0.20", 5052)).unwrap();
//! if display.get_heatmap() == Some(false) {
//!     display.set_heatmap(true);
//! }
//! ```

pub mod analytics;
pub mod camera;
pub mod client;
pub mod display;
pub mod endpoint;
pub mod engagement;
pub mod media;

#[cfg(test)]
mod testing;

pub use analytics::{AnalyticsClient, AnalyticsConfiguration, ServiceConfiguration};
pub use camera::{CameraClient, CameraConfig, CamerasConfiguration};
pub use client::{ClientError, ResourceClient, REQUEST_TIMEOUT};
pub use display::{DisplayClient, DisplayConfiguration};
pub use endpoint::ServiceEndpoint;
pub use engagement::{EngagementClient, EngagementConfiguration};
pub use media::{MediaClient, MediaConfiguration};
