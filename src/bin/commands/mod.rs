pub mod headers_cmd;
pub mod inspect_cmd;
pub mod lookup_cmd;

pub use headers_cmd::{cmd_headers, HeadersArgs};
pub use inspect_cmd::cmd_inspect;
pub use lookup_cmd::{cmd_lookup, LookupArgs};
