//! Error types for the Kindred system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.
//! Every error here is a contract violation reported synchronously by the
//! call that detected it; nothing is retried or deferred.

use std::any::TypeId;
use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;
use crate::types::ComponentKey;

/// The main error type for Kindred operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Shorthand for attaching the name of the failing operation.
    #[must_use]
    pub fn in_operation(self, operation: &'static str) -> Self {
        self.with_context(ErrorContext::new().with_operation(operation))
    }

    /// Creates an invalid entity error.
    #[must_use]
    pub fn entity_invalid(id: EntityId) -> Self {
        Self::new(ErrorKind::EntityInvalid(id))
    }

    /// Creates a duplicate attribute error.
    #[must_use]
    pub fn duplicate_attribute(entity: EntityId, component: ComponentKey) -> Self {
        Self::new(ErrorKind::DuplicateAttribute { entity, component })
    }

    /// Creates an attribute not found error.
    #[must_use]
    pub fn attribute_not_found(entity: EntityId, component: ComponentKey) -> Self {
        Self::new(ErrorKind::AttributeNotFound { entity, component })
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: ComponentKey, actual: TypeId) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The identifier was destroyed or never created.
    #[error("entity invalid: {0:?}")]
    EntityInvalid(EntityId),

    /// The entity already holds a value of this component type.
    #[error("duplicate attribute: {component} already on entity {entity:?}")]
    DuplicateAttribute {
        /// The entity that was targeted.
        entity: EntityId,
        /// The component type that was already present.
        component: ComponentKey,
    },

    /// The entity holds no value of this component type.
    #[error("attribute not found: {component} on entity {entity:?}")]
    AttributeNotFound {
        /// The entity that was queried.
        entity: EntityId,
        /// The component type that was not found.
        component: ComponentKey,
    },

    /// A type-erased value did not match the store it was handed to.
    #[error("type mismatch: expected {expected}, got {actual:?}")]
    TypeMismatch {
        /// The store's component type.
        expected: ComponentKey,
        /// The type id of the supplied value.
        actual: TypeId,
    },
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Name of the registry operation that failed.
    pub operation: Option<&'static str>,
    /// Free-form detail.
    pub detail: Option<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Sets the detail message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(operation) = self.operation {
            write!(f, "in {operation}")?;
        }
        if let Some(detail) = &self.detail {
            if self.operation.is_some() {
                write!(f, ": ")?;
            }
            write!(f, "{detail}")?;
        }
        Ok(())
    }
}

/// Result type alias for Kindred operations.
pub type Result<T> = std::result::Result<T, Error>;
