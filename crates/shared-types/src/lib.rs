pub mod error;
pub mod config;

// Deadline engine domain modules
pub mod calendar;
pub mod compliance;
pub mod deadline;
pub mod jurisdiction;
pub mod reference;
pub mod rule;

pub use error::*;
pub use config::*;

pub use calendar::*;
pub use compliance::*;
pub use deadline::*;
pub use jurisdiction::*;
pub use reference::*;
pub use rule::*;
