pub mod buffered_logger;
pub mod console_logger;
pub mod file_logger;
pub mod frame_collision_bus;
pub mod http_transport;
pub mod noop_logger;
pub mod observation;
pub mod scene_registry;
pub mod simulated_predictor;

pub use buffered_logger::*;
pub use console_logger::*;
pub use file_logger::*;
pub use frame_collision_bus::*;
pub use http_transport::*;
pub use noop_logger::*;
pub use observation::*;
pub use scene_registry::*;
pub use simulated_predictor::*;
