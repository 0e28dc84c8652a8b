//! Tool descriptor models.
//!
//! Describe the operations exposed to the dispatch framework so callers can
//! discover names and parameters.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named parameter of a tool.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolParameter {
    /// Parameter name.
    pub name: String,
    /// Whether callers must supply it.
    pub required: bool,
    /// Parameter description.
    pub description: String,
}

/// Describes one callable tool.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolDescriptor {
    /// Tool name used in dispatch.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// Accepted parameters.
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Adds a required string parameter.
    pub fn required(mut self, name: &str, description: &str) -> Self {
        self.parameters.push(ToolParameter {
            name: name.to_string(),
            required: true,
            description: description.to_string(),
        });
        self
    }

    /// Adds an optional string parameter.
    pub fn optional(mut self, name: &str, description: &str) -> Self {
        self.parameters.push(ToolParameter {
            name: name.to_string(),
            required: false,
            description: description.to_string(),
        });
        self
    }
}
