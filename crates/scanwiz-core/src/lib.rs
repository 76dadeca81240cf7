mod catalog;
mod error;
mod selection;
mod status;
mod wizard;

pub use catalog::*;
pub use error::*;
pub use selection::*;
pub use status::*;
pub use wizard::*;
