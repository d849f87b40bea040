pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod traits;
pub mod types;
pub mod workflow;

pub use config::SwarmConfig;
pub use error::{MurmurError, Result};
pub use model::{ModelBinding, ModelResolver};
pub use types::*;
pub use workflow::{normalize_name, AssistantSpec, EdgeSpec, NodeSpec, ToolBinding, WorkflowSpec};
