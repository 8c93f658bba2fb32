//! JSON-RPC 2.0 transport: message shapes, length-prefixed framing, the
//! tool registry, and the dispatcher that wires them together.

mod dispatcher;
mod framing;
mod protocol;
mod registry;

pub use dispatcher::Dispatcher;
pub use framing::{read_frame, write_frame, MAX_FRAME_BYTES};
pub use protocol::{Notification, Request, Response, RpcError, RpcErrorObject, JSONRPC_VERSION};
pub use registry::{ToolAnnotations, ToolDefinition, ToolHandler, ToolRegistry};
