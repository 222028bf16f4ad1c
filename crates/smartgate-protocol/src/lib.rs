pub mod codec;
pub mod codes;
pub mod request;
pub mod response;

pub use codec::LineCodec;
pub use codes::{CommandCode, EventCode};
pub use request::Request;
pub use response::Response;
