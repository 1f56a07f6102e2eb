//! Canonical JSON-RPC 2.0 envelopes and Model Context Protocol payload
//! shapes: method-name constants, error codes, and the single envelope
//! parsing entry point every transport and session relies on.

mod capabilities;
mod content;
mod jsonrpc;
mod lifecycle;
mod logging;
mod method;
mod prompts;
mod resources;
mod roots;
mod sampling;
mod tools;

pub use capabilities::*;
pub use content::*;
pub use jsonrpc::*;
pub use lifecycle::*;
pub use logging::*;
pub use method::*;
pub use prompts::*;
pub use resources::*;
pub use roots::*;
pub use sampling::*;
pub use tools::*;
