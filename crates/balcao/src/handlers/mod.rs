//! HTTP request handlers.

mod health;
mod pairing;

pub use health::{livez, readyz, version};
pub use pairing::{qr, qr_svg};
