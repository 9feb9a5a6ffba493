pub mod config;
pub mod descriptor;
pub mod error;
pub mod outcome;

pub use config::{FileMakerConfig, RawConnectionSettings};
pub use descriptor::{ParamSpec, ParamType, ParameterSchema, ToolDescriptor};
pub use error::{Error, ErrorPayload, Result};
pub use outcome::ScriptOutcome;
