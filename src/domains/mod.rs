pub mod logger;
pub mod motion;
pub mod trajectory;

pub use logger::*;
pub use motion::*;
pub use trajectory::*;
