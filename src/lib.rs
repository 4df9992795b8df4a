pub mod commands;
pub mod constants;
pub mod dvrip;
pub mod error;
pub mod protocol;

pub use commands::*;
pub use dvrip::DVRIPCam;
pub use error::{DVRIPError, Result};