//! Request handlers.

pub mod generate;
pub mod health;
pub mod video;

pub use generate::*;
pub use health::*;
pub use video::*;
