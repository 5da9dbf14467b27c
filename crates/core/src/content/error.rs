use thiserror::Error;

/// Errors that can occur when building an entity from attributes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("Attributes must be a JSON object")]
    NotAnObject,
    #[error("Attribute '{0}' cannot be mass-assigned")]
    Guarded(&'static str),
    #[error("Invalid {entity} attributes: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_display() {
        let error = AttributeError::Guarded("id");
        assert_eq!(error.to_string(), "Attribute 'id' cannot be mass-assigned");
    }

    #[test]
    fn test_invalid_display() {
        let error = AttributeError::Invalid {
            entity: "Post",
            reason: "missing field `title`".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid Post attributes: missing field `title`"
        );
    }
}
