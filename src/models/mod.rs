pub mod catalog;
pub mod image;
pub mod session;

pub use catalog::*;
pub use image::*;
pub use session::*;
