pub mod batch;
pub mod cockpit;
pub mod config;
pub mod listing;
pub mod selection;

pub use batch::*;
pub use cockpit::*;
pub use config::*;
pub use listing::*;
pub use selection::*;
