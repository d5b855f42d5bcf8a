mod submit;
pub use submit::*;

mod info;
pub use info::*;
