pub mod agent_client;
pub mod agent_state;
pub mod crowd;
pub mod orchestrator;
pub mod playback;
pub mod prefetch;

pub use agent_client::*;
pub use agent_state::*;
pub use crowd::*;
pub use orchestrator::*;
pub use playback::*;
pub use prefetch::*;
