mod backend;
mod catalog;
mod config;
mod controller;
mod dirs;
mod error;
mod session;
mod stream;
mod workflow;

#[cfg(test)]
mod fakes;

pub use backend::*;
pub use catalog::*;
pub use config::*;
pub use controller::*;
pub use dirs::*;
pub use error::*;
pub use session::*;
pub use stream::*;
pub use workflow::*;
