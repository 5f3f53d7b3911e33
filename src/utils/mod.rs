pub mod encoding;
pub mod error;
pub mod json;

pub use encoding::{b64_decode, b64_encode};
pub use error::ConvertError;
pub use json::{get_int, get_string};
