//! Observable events
//!
//! Every log line carries exactly one of these events. Events are explicit
//! and typed, and each has a fixed severity.

use std::fmt;

use super::logger::Severity;

/// Observable events in fieldmodel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded
    ConfigLoaded,
    /// Model definitions loaded from the model directory
    ModelsLoaded,
    /// A model was registered in the loader
    ModelRegistered,

    // Model definition hazards
    /// An explicit default on a container type will be shared by all instances
    SharedMutableDefault,
    /// Two fields claim the same input key; the earlier field owns it
    AliasOverlap,

    // Instantiation
    /// An instance was created
    InstanceCreated,
    /// Input was rejected
    ValidationFailed,
    /// A default factory produced a value for an omitted field
    DefaultFactoryInvoked,

    // CLI
    /// A CLI command failed
    CommandFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ModelsLoaded => "MODELS_LOADED",
            Event::ModelRegistered => "MODEL_REGISTERED",
            Event::SharedMutableDefault => "SHARED_MUTABLE_DEFAULT",
            Event::AliasOverlap => "ALIAS_OVERLAP",
            Event::InstanceCreated => "INSTANCE_CREATED",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::DefaultFactoryInvoked => "DEFAULT_FACTORY_INVOKED",
            Event::CommandFailed => "COMMAND_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SharedMutableDefault | Event::AliasOverlap | Event::ValidationFailed => {
                Severity::Warn
            }
            Event::InstanceCreated | Event::DefaultFactoryInvoked => Severity::Trace,
            Event::ConfigLoaded | Event::ModelsLoaded | Event::ModelRegistered => Severity::Info,
            Event::CommandFailed => Severity::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
