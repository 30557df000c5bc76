//! Tools the assistant model may call.
//!
//! The registry is the extension point for giving the model callable tools.
//! The steady-state configuration is an empty registry: no tools are offered
//! to the model, and the execution path exists for future extension only.

use serde::Serialize;
use serde_json::Value;

use crate::Error;

/// A tool declaration in the shape the chat completion API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// The name the model uses to request the tool.
    pub name: String,
    /// What the tool does, for the model's benefit.
    pub description: String,
    /// JSON schema of the tool's arguments.
    pub parameters: Value,
}

/// A callable tool.
pub trait Tool: Send + Sync {
    /// The declaration offered to the model.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with the model-provided `arguments` and return the text
    /// result to feed back into the conversation.
    ///
    /// # Errors
    /// Implementations may return any [Error]; the relay reports it back as
    /// a structured failure result.
    fn execute(&self, arguments: &Value) -> Result<String, Error>;
}

/// The set of tools declared to the model.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry; the model is offered no tools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `tool` to the model.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Whether any tools have been declared.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The declarations of every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    /// Execute the tool named `name`.
    ///
    /// # Errors
    /// This function will return an [Error::ToolNotFound] naming the tool if
    /// `name` has not been declared, or whatever error the tool itself
    /// returns.
    pub fn execute(&self, name: &str, arguments: &Value) -> Result<String, Error> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.definition().name == name);

        match tool {
            Some(tool) => tool.execute(arguments),
            None => {
                tracing::error!("attempted to execute unknown tool: {name}");
                Err(Error::ToolNotFound(name.to_owned()))
            }
        }
    }
}
