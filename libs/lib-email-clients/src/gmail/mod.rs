pub mod api_quota;
mod constants;

pub use constants::*;
