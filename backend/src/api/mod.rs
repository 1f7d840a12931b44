pub mod analytics;
pub mod channels;
pub mod videos;

pub use analytics::*;
pub use channels::*;
pub use videos::*;
