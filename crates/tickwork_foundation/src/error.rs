//! Error types for Tickwork.
//!
//! Most "failures" in a world are structural (a null handle, `false`, `None`).
//! [`Error`] is reserved for contract violations that a caller can act on:
//! using a dead entity, or mutating the entity list while it is being
//! iterated.

use std::fmt;

use thiserror::Error;

use crate::entity::EntityId;

/// Result type alias using the Tickwork [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Tickwork operations.
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

    /// Creates a stale entity error.
    #[must_use]
    pub fn stale_entity(id: EntityId) -> Self {
        Self::new(ErrorKind::StaleEntity(id))
    }

    /// Creates an invalid entity error.
    #[must_use]
    pub fn invalid_entity() -> Self {
        Self::new(ErrorKind::InvalidEntity)
    }

    /// Creates an iteration-in-progress error for the named operation.
    #[must_use]
    pub fn iteration_in_progress(operation: &'static str) -> Self {
        Self::new(ErrorKind::IterationInProgress { operation })
    }

    /// Creates a component borrowed error.
    #[must_use]
    pub fn component_borrowed(component: &'static str) -> Self {
        Self::new(ErrorKind::ComponentBorrowed { component })
    }

    /// Creates a system busy error.
    #[must_use]
    pub fn system_busy(system: u64) -> Self {
        Self::new(ErrorKind::SystemBusy(system))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The entity was deallocated, or belongs to a world generation before a reset.
    #[error("stale entity reference: {0:?}")]
    StaleEntity(EntityId),

    /// The reserved invalid entity was used where a live entity is required.
    #[error("invalid entity")]
    InvalidEntity,

    /// A structural mutation was attempted while entities are being iterated.
    #[error("cannot {operation} while entities are being iterated")]
    IterationInProgress {
        /// The rejected operation.
        operation: &'static str,
    },

    /// A component's storage is borrowed and cannot be replaced.
    #[error("component {component} is currently borrowed")]
    ComponentBorrowed {
        /// Type name of the component.
        component: &'static str,
    },

    /// A system's own hook is running, so it cannot be reconfigured.
    #[error("system {0} is busy")]
    SystemBusy(u64),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The entity being operated on, if any.
    pub entity: Option<EntityId>,
    /// Name of the system whose hook was running, if any.
    pub system: Option<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the entity.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Sets the system name.
    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        if let Some(entity) = self.entity {
            write!(f, "on {entity}")?;
            sep = " ";
        }
        if let Some(system) = &self.system {
            write!(f, "{sep}in system {system}")?;
        }
        Ok(())
    }
}
