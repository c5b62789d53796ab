pub mod flags;
pub mod serve;
pub mod status;

pub use flags::{run_flags, FlagsArgs};
pub use serve::{run_serve, ServeArgs};
pub use status::run_status;
