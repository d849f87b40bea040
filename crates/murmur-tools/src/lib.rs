pub mod registry;

pub use registry::{execute_tool, ToolRegistry};
