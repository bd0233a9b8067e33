use thiserror::Error;

/// Errors raised by component identity and registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("illegal parameter: {0}")]
    IllegalParameter(String),

    #[error("not found component instance")]
    NotFound,
}
