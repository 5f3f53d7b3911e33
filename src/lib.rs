pub mod node;
pub mod protocol;
pub mod subscription;
pub mod utils;

pub use node::{GrpcOpts, ProxyNode, RealityOpts, WsOpts};
pub use protocol::{decode, encode};
pub use subscription::{extract, extract_from_uris};
pub use utils::ConvertError;
