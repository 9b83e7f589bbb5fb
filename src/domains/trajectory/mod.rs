pub mod anchor;
pub mod candidates;
pub mod decoder;
pub mod events;
pub mod ports;
pub mod queue;
pub mod rtt;
pub mod types;
pub mod wire;

pub use anchor::*;
pub use candidates::*;
pub use decoder::*;
pub use events::*;
pub use ports::*;
pub use queue::*;
pub use rtt::*;
pub use types::*;
pub use wire::*;
