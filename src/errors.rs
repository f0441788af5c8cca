use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BenchError {
    #[error("registration error: {0}")]
    Registration(String),
    #[error("case execution error: {0}")]
    CaseExecution(String),
    #[error("teardown error: {0}")]
    Teardown(String),
    #[error("lookup error: {0}")]
    Lookup(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(String),
}

impl BenchError {
    pub fn registration<T: Into<String>>(msg: T) -> Self {
        BenchError::Registration(msg.into())
    }

    pub fn case_execution<T: Into<String>>(msg: T) -> Self {
        BenchError::CaseExecution(msg.into())
    }

    pub fn teardown<T: Into<String>>(msg: T) -> Self {
        BenchError::Teardown(msg.into())
    }

    pub fn lookup<T: Into<String>>(msg: T) -> Self {
        BenchError::Lookup(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        BenchError::InvalidInput(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        BenchError::Io(msg.into())
    }

    /// True for errors raised while resolving regression inputs rather than
    /// while measuring.
    pub fn is_lookup(&self) -> bool {
        matches!(self, BenchError::Lookup(_))
    }
}
