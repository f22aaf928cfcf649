use thiserror::Error;

use crate::puzzle::Variable;

/// Errors raised while building a puzzle or propagating constraints.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The grid description yields a degenerate slot or has inconsistent dimensions.
    #[error("Malformed structure: {0}")]
    MalformedStructure(String),

    /// Arc consistency removed every candidate from a variable's domain.
    #[error("Domain of {variable} was emptied during arc consistency")]
    EmptyDomainDuringPropagation {
        /// The variable whose domain was exhausted.
        variable: Variable,
    },
}
