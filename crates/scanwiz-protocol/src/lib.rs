mod error;
mod rest;
mod stream;

pub use error::*;
pub use rest::*;
pub use stream::*;
