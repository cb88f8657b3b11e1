use std::borrow::Cow;
use std::error;
use std::fmt;

// -----------------------------------------------------------------------------
// SaveError

/// Hard failures while saving an object graph.
///
/// Everything recoverable during a save (a member with nothing to write,
/// an empty collection) is not an error; these variants abort the whole
/// `save_*` call.
#[derive(Debug)]
pub enum SaveError {
    /// The value's type has no registered save route: no custom saver, no
    /// member table, no collection or scalar entry.
    UnknownType {
        /// Tag of the offending type.
        tag: Cow<'static, str>,
    },
    /// A custom saver hook reported a failure.
    Custom {
        /// Tag of the type whose hook failed.
        tag: Cow<'static, str>,
        /// Hook-provided description.
        message: String,
    },
    /// The external JSON writer rejected the produced tree.
    Serialization {
        /// The writer's error.
        source: serde_json::Error,
    },
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::UnknownType { tag } => {
                write!(
                    f,
                    "no save route registered for type `{tag}` (is it registered, or does it need a custom saver?)",
                )
            }
            SaveError::Custom { tag, message } => {
                write!(f, "custom saver for `{tag}` failed: {message}")
            }
            SaveError::Serialization { source } => {
                write!(
                    f,
                    "the JSON writer rejected the produced tree: {source} (does every value in the graph have a custom saver where its members cannot serialize?)",
                )
            }
        }
    }
}

impl error::Error for SaveError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            SaveError::Serialization { source } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(source: serde_json::Error) -> Self {
        SaveError::Serialization { source }
    }
}

// -----------------------------------------------------------------------------
// LoadError

/// Hard failures while loading a value tree.
///
/// These indicate the file and the code are out of sync and abort the
/// whole `load_*` call. Structural problems such as an unresolvable tag
/// or a null element degrade gracefully instead: the affected subtree is
/// dropped with a log line and loading continues.
#[derive(Debug)]
pub enum LoadError {
    /// The JSON text could not be parsed at all.
    Parse {
        /// The reader's error.
        source: serde_json::Error,
    },
    /// A scalar could not be converted to the declared type of the slot
    /// it was read for.
    Coercion {
        /// Tag of the declared type.
        target: Cow<'static, str>,
        /// What went wrong during conversion.
        detail: String,
    },
    /// A loaded value does not fit the slot it was loaded for.
    MismatchedType {
        /// The member name or `"element"` for collection slots.
        slot: Cow<'static, str>,
        /// Tag of the value that was actually loaded.
        found: Cow<'static, str>,
    },
    /// A custom loader hook reported a failure.
    Custom {
        /// Tag of the type whose hook failed.
        tag: Cow<'static, str>,
        /// Hook-provided description.
        message: String,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Parse { source } => write!(f, "invalid JSON text: {source}"),
            LoadError::Coercion { target, detail } => {
                write!(f, "cannot coerce value to `{target}`: {detail}")
            }
            LoadError::MismatchedType { slot, found } => {
                write!(f, "loaded value of type `{found}` does not fit `{slot}`")
            }
            LoadError::Custom { tag, message } => {
                write!(f, "custom loader for `{tag}` failed: {message}")
            }
        }
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            LoadError::Parse { source } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(source: serde_json::Error) -> Self {
        LoadError::Parse { source }
    }
}
