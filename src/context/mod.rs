//! Host message context boundary.
//!
//! # Data Flow
//! ```text
//! host framework
//!     → MessageContext::parameter (string-typed inputs)
//!     → params.rs (typed parsing)
//!     → pool / auth subsystems
//!     → MessageContext::set_property / report_error (results back to host)
//!     → MessageContext::set_response (operation output into a variable)
//! ```
//!
//! # Design Decisions
//! - The core never sees the host framework, only this trait
//! - Values cross the boundary as strings; typing happens in params.rs

pub mod constants;
pub mod operation;
pub mod params;
pub mod response;

use std::collections::HashMap;

pub use operation::ConnectorOperation;
pub use response::ConnectorResponse;

/// The narrow view of a host message the connector needs.
pub trait MessageContext: Send {
    /// Look up an input parameter by name.
    fn parameter(&self, name: &str) -> Option<String>;

    /// Look up a property previously set on the message.
    fn property(&self, name: &str) -> Option<String>;

    /// Set a property on the message.
    fn set_property(&mut self, name: &str, value: String);

    /// Store an operation's response in a message variable.
    fn set_response(&mut self, variable: &str, response: ConnectorResponse);

    /// Record a structured error on the message.
    fn report_error(&mut self, code: &str, message: &str) {
        self.set_property(constants::PROPERTY_ERROR_CODE, code.to_string());
        self.set_property(constants::PROPERTY_ERROR_MESSAGE, message.to_string());
    }
}

/// In-memory context backed by two maps.
#[derive(Debug, Clone, Default)]
pub struct SimpleContext {
    parameters: HashMap<String, String>,
    properties: HashMap<String, String>,
    responses: HashMap<String, ConnectorResponse>,
}

impl SimpleContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style parameter insertion.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(name, value);
        self
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn remove_parameter(&mut self, name: &str) -> Option<String> {
        self.parameters.remove(name)
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }

    pub fn response(&self, variable: &str) -> Option<&ConnectorResponse> {
        self.responses.get(variable)
    }
}

impl MessageContext for SimpleContext {
    fn parameter(&self, name: &str) -> Option<String> {
        self.parameters.get(name).cloned()
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }

    fn set_property(&mut self, name: &str, value: String) {
        self.properties.insert(name.to_string(), value);
    }

    fn set_response(&mut self, variable: &str, response: ConnectorResponse) {
        self.responses.insert(variable.to_string(), response);
    }
}
