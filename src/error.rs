use thiserror::Error;

use crate::fragment::SmilesError;

/// Everything that can stop a name from being turned into a structure.
///
/// `ComponentGeneration` and `StructureBuilding` are rejections of the name
/// itself. `Internal` means two passes disagreed about the shape of the data
/// they hand each other, which is a bug rather than a bad name.
#[derive(Debug, Error)]
pub enum ChemError {
    /// The tree could not be normalized or resolved.
    #[error("{message}{}", .token.as_ref().map(|t| format!(" (at '{t}')")).unwrap_or_default())]
    ComponentGeneration {
        message: String,
        token: Option<String>,
    },

    /// The tree was understood but the graph could not be built.
    #[error("{0}")]
    StructureBuilding(String),

    /// A contract between passes was broken.
    #[error("internal error: {0}")]
    Internal(String),

    /// A fragment SMILES string from the token vocabulary was malformed.
    #[error("invalid fragment SMILES: {0}")]
    Smiles(#[from] SmilesError),

    /// The textual tree could not be read.
    #[error("malformed tree: {0}")]
    TreeFormat(String),
}

impl ChemError {
    pub fn component(message: impl Into<String>) -> Self {
        ChemError::ComponentGeneration {
            message: message.into(),
            token: None,
        }
    }

    /// A component generation error that remembers the offending token text.
    pub fn component_at(message: impl Into<String>, token: impl Into<String>) -> Self {
        ChemError::ComponentGeneration {
            message: message.into(),
            token: Some(token.into()),
        }
    }

    pub fn building(message: impl Into<String>) -> Self {
        ChemError::StructureBuilding(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ChemError::Internal(message.into())
    }

    /// True for errors that indicate a bug rather than an uninterpretable name.
    pub fn is_internal(&self) -> bool {
        matches!(self, ChemError::Internal(_))
    }

    /// The substring of the name that triggered the error, when known.
    pub fn token(&self) -> Option<&str> {
        match self {
            ChemError::ComponentGeneration { token, .. } => token.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_error_mentions_token() {
        let err = ChemError::component_at("Brackets do not match!", "tri-(2-yl");
        assert_eq!(err.to_string(), "Brackets do not match! (at 'tri-(2-yl')");
        assert_eq!(err.token(), Some("tri-(2-yl"));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_internal_errors_are_distinguishable() {
        let err = ChemError::internal("dummy atom had no bonds");
        assert!(err.is_internal());
        assert!(ChemError::building("no free valency").to_string().contains("valency"));
    }
}
