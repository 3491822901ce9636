pub mod errors;
pub mod object;

pub use errors::*;
pub use object::*;
