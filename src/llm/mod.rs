pub mod assistant;
pub mod client;
pub mod types;

pub use assistant::*;
pub use client::*;
pub use types::*;
