// Licensed under the Apache-2.0 license

use crate::config::ConfigError;
use crate::test_list::TestListError;
use compliance_isa::IsaSpecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    IsaSpec(#[from] IsaSpecError),
    #[error(transparent)]
    TestList(#[from] TestListError),
    #[error("{op} is not allowed while the adapter is {state}")]
    Lifecycle { op: &'static str, state: String },
    #[error("{name}: {role} executable not found. Please check environment setup.")]
    MissingExecutable { role: &'static str, name: String },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("a scheduler worker panicked")]
    WorkerPanicked,
}

impl AdapterError {
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| AdapterError::Io { context, source }
    }
}
