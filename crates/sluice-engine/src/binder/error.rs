//! Error types for name binding
//!
//! Every variant is one diagnostic class with a stable code. Binding never stops
//! on these: they are converted into diagnostics and the walk continues.

use super::symbols::Location;
use thiserror::Error;

/// Errors that can occur during name binding
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindError {
    /// Two declarations of one name in one name domain
    #[error("duplicate declaration of '{name}'")]
    DuplicateDeclaration {
        name: String,
        location: Location,
        previous: Location,
    },

    /// Ordinary names must not start with `$`
    #[error("identifier '{name}' must not start with '$'")]
    LeadingDollar { name: String, location: Location },

    /// Composite formals must start with `$`
    #[error("composite parameter '{name}' must start with '$'")]
    LeadingDollarMissing { name: String, location: Location },

    /// A target-language keyword used as an attribute name
    #[error("'{name}' is a reserved identifier")]
    ReservedIdentifier { name: String, location: Location },

    /// A definition that depends on itself
    #[error("circular definition of '{name}'")]
    CircularDefinition { name: String, location: Location },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String, location: Location },

    #[error("unknown attribute '{name}' in '{base}'")]
    UnknownAttribute {
        name: String,
        base: String,
        location: Location,
    },

    /// Attribute reachable through several streams with incompatible meanings
    #[error("ambiguous reference to '{name}' through {origins}")]
    AmbiguousReference {
        name: String,
        origins: String,
        location: Location,
    },

    /// Simple name found through several wildcard or implicit namespaces
    #[error("identifier '{name}' is ambiguous; it is defined in namespaces {namespaces}")]
    AmbiguousAcrossNamespaces {
        name: String,
        namespaces: String,
        location: Location,
    },

    /// Two clauses of one invocation with the same label
    #[error("duplicate clause '{label}'")]
    DuplicateClause {
        label: String,
        location: Location,
        previous: Location,
    },

    #[error("duplicate port name '{name}'")]
    DuplicatePortName {
        name: String,
        location: Location,
        previous: Location,
    },

    /// Output clause naming no output port
    #[error("invalid port name '{name}'")]
    InvalidPortName { name: String, location: Location },

    #[error("cannot locate port '{name}'")]
    UnknownPort { name: String, location: Location },

    #[error("'{name}' names more than one port")]
    MultiplePorts { name: String, location: Location },

    #[error("'{name}' is not an {expected} port")]
    PortDirectionMismatch {
        name: String,
        expected: &'static str,
        location: Location,
    },

    #[error("operator '{operator}' has no parameter '{name}'")]
    UnknownParameter {
        name: String,
        operator: String,
        location: Location,
    },

    #[error("required composite parameter '{name}' of '{composite}' not found")]
    MissingCompositeParameter {
        name: String,
        composite: String,
        location: Location,
    },

    #[error("composite '{name}' instantiates itself")]
    RecursiveComposite { name: String, location: Location },

    #[error("composite '{name}' is not public in namespace '{namespace}'")]
    InvisibleComposite {
        name: String,
        namespace: String,
        location: Location,
    },

    #[error("'onProcess' is only allowed on Custom operators, not '{operator}'")]
    OnProcessNotCustom { operator: String, location: Location },

    #[error("immutable variable '{name}' is missing an initializer")]
    MissingInitializer { name: String, location: Location },

    #[error("'{name}' is not an operator")]
    NotAnOperator { name: String, location: Location },

    #[error("tuple extendee '{name}' is not a tuple type")]
    TupleExtendeeNotTuple { name: String, location: Location },

    #[error("duplicate attribute '{name}' with a different type")]
    DuplicateAttribute { name: String, location: Location },

    #[error("'{name}' is not static and cannot be accessed through an operator")]
    NonStaticThroughOperator { name: String, location: Location },

    #[error("state variable '{name}' shadows a stream attribute")]
    StateShadowsAttribute { name: String, location: Location },

    #[error("unknown config '{label}'")]
    UnknownConfig { label: String, location: Location },

    #[error("'{name}' expects {expected} {direction} port(s), found {actual}")]
    PortCountMismatch {
        name: String,
        direction: &'static str,
        expected: usize,
        actual: usize,
        location: Location,
    },

    #[error("main composite '{name}' not found")]
    UnknownMainComposite { name: String },

    #[error("parameter '{name}' of '{composite}' expects {expected}")]
    ActualKindMismatch {
        name: String,
        composite: String,
        expected: &'static str,
        location: Location,
    },
}

impl BindError {
    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        use BindError::*;
        match self {
            DuplicateDeclaration { .. } => "E2001",
            LeadingDollar { .. } => "E2002",
            LeadingDollarMissing { .. } => "E2003",
            ReservedIdentifier { .. } => "E2004",
            CircularDefinition { .. } => "E2005",
            UnknownIdentifier { .. } => "E2006",
            UnknownAttribute { .. } => "E2007",
            AmbiguousReference { .. } => "E2008",
            AmbiguousAcrossNamespaces { .. } => "E2009",
            DuplicateClause { .. } => "E2010",
            DuplicatePortName { .. } => "E2011",
            InvalidPortName { .. } => "E2012",
            UnknownPort { .. } => "E2013",
            MultiplePorts { .. } => "E2014",
            PortDirectionMismatch { .. } => "E2015",
            UnknownParameter { .. } => "E2016",
            MissingCompositeParameter { .. } => "E2017",
            RecursiveComposite { .. } => "E2018",
            InvisibleComposite { .. } => "E2019",
            OnProcessNotCustom { .. } => "E2020",
            MissingInitializer { .. } => "E2021",
            NotAnOperator { .. } => "E2022",
            TupleExtendeeNotTuple { .. } => "E2023",
            DuplicateAttribute { .. } => "E2024",
            NonStaticThroughOperator { .. } => "E2025",
            StateShadowsAttribute { .. } => "E2026",
            UnknownConfig { .. } => "E2027",
            PortCountMismatch { .. } => "E2028",
            UnknownMainComposite { .. } => "E2029",
            ActualKindMismatch { .. } => "E2030",
        }
    }

    /// Primary location, if the error has one
    pub fn location(&self) -> Option<Location> {
        use BindError::*;
        match self {
            DuplicateDeclaration { location, .. }
            | LeadingDollar { location, .. }
            | LeadingDollarMissing { location, .. }
            | ReservedIdentifier { location, .. }
            | CircularDefinition { location, .. }
            | UnknownIdentifier { location, .. }
            | UnknownAttribute { location, .. }
            | AmbiguousReference { location, .. }
            | AmbiguousAcrossNamespaces { location, .. }
            | DuplicateClause { location, .. }
            | DuplicatePortName { location, .. }
            | InvalidPortName { location, .. }
            | UnknownPort { location, .. }
            | MultiplePorts { location, .. }
            | PortDirectionMismatch { location, .. }
            | UnknownParameter { location, .. }
            | MissingCompositeParameter { location, .. }
            | RecursiveComposite { location, .. }
            | InvisibleComposite { location, .. }
            | OnProcessNotCustom { location, .. }
            | MissingInitializer { location, .. }
            | NotAnOperator { location, .. }
            | TupleExtendeeNotTuple { location, .. }
            | DuplicateAttribute { location, .. }
            | NonStaticThroughOperator { location, .. }
            | StateShadowsAttribute { location, .. }
            | UnknownConfig { location, .. }
            | PortCountMismatch { location, .. }
            | ActualKindMismatch { location, .. } => Some(*location),
            UnknownMainComposite { .. } => None,
        }
    }

    /// Earlier declaration the error collides with
    pub fn previous(&self) -> Option<Location> {
        match self {
            BindError::DuplicateDeclaration { previous, .. }
            | BindError::DuplicateClause { previous, .. }
            | BindError::DuplicatePortName { previous, .. } => Some(*previous),
            _ => None,
        }
    }

    /// Label text under the primary location
    pub fn label(&self) -> &'static str {
        use BindError::*;
        match self {
            DuplicateDeclaration { .. } | DuplicatePortName { .. } => "redeclared here",
            DuplicateClause { .. } => "repeated here",
            CircularDefinition { .. } => "defined in terms of itself",
            UnknownIdentifier { .. } | UnknownAttribute { .. } => "not found in this scope",
            AmbiguousReference { .. } | AmbiguousAcrossNamespaces { .. } => "ambiguous",
            LeadingDollar { .. } | LeadingDollarMissing { .. } | ReservedIdentifier { .. } => {
                "illegal identifier"
            }
            _ => "",
        }
    }
}

/// Errors loading operator models
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read operator model '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed operator model: {0}")]
    Json(#[from] serde_json::Error),

    #[error("operator model '{operator}' declares parameter '{name}' twice")]
    DuplicateParameter { operator: String, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Span;

    fn loc(start: usize) -> Location {
        Location::new(0, Span::new(start, start + 1, 1, start as u32 + 1))
    }

    #[test]
    fn test_codes_are_stable() {
        let dup = BindError::DuplicateDeclaration {
            name: "x".into(),
            location: loc(5),
            previous: loc(1),
        };
        assert_eq!(dup.code(), "E2001");
        assert_eq!(dup.previous(), Some(loc(1)));
        assert_eq!(dup.to_string(), "duplicate declaration of 'x'");
    }

    #[test]
    fn test_location_is_primary() {
        let err = BindError::CircularDefinition {
            name: "A".into(),
            location: loc(3),
        };
        assert_eq!(err.location(), Some(loc(3)));
        assert!(err.previous().is_none());
        assert!(BindError::UnknownMainComposite { name: "M".into() }
            .location()
            .is_none());
    }
}
