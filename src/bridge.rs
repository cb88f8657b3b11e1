//! Bridge to an embedded scripting runtime.
//!
//! Objects implemented in a script layer have no Rust type to register,
//! so they are routed by tag instead: their tags carry the
//! [`SCRIPT_TAG_PREFIX`], and a [`ScriptRuntime`] adapter answers the
//! hook questions the registry would otherwise answer. The drivers ask
//! the runtime first for every value they meet; a value the runtime does
//! not claim is handled through its [`TypeMeta`](crate::TypeMeta) as
//! usual.

use crate::error::{LoadError, SaveError};
use crate::load::Loader;
use crate::savable::Savable;
use crate::save::Saver;
use crate::tree::{ObjectNode, Value};

/// Tag prefix marking a scripted class, `"script:"`.
pub const SCRIPT_TAG_PREFIX: &str = "script:";

/// Build the tag a scripted class is saved under.
#[inline]
pub fn scripted_tag(class: &str) -> String {
    format!("{SCRIPT_TAG_PREFIX}{class}")
}

/// Extract the class name from a scripted tag, or return `None` for a
/// plain tag.
#[inline]
pub fn script_class(tag: &str) -> Option<&str> {
    tag.strip_prefix(SCRIPT_TAG_PREFIX)
}

// -----------------------------------------------------------------------------
// ScriptRuntime

/// Adapter over an embedded scripting runtime.
///
/// Every method that answers a hook question returns `Option`, where
/// `None` means "this value is not mine" and hands the decision back to
/// the registry. Only [`class_of`](Self::class_of) and
/// [`create_instance`](Self::create_instance) have no default, the rest
/// can be left out by runtimes that do not support the hook.
pub trait ScriptRuntime {
    /// The scripted class of a value, or `None` for plain Rust values.
    fn class_of(&self, value: &dyn Savable) -> Option<String>;

    /// Create an instance of a scripted class, with access to the object
    /// the instance will be attached to. Returning `None` means the
    /// class is unknown to the runtime; the loader drops the subtree and
    /// carries on.
    fn create_instance(
        &self,
        class: &str,
        parent: Option<&dyn Savable>,
    ) -> Option<Box<dyn Savable>>;

    /// Run the scripted custom saver for a value, if it declares one.
    /// The produced tree is written verbatim.
    fn call_custom_saver(
        &self,
        _value: &dyn Savable,
        _saver: &Saver,
    ) -> Option<Result<Value, SaveError>> {
        None
    }

    /// Run the scripted custom loader for a value, if it declares one.
    fn call_custom_loader(
        &self,
        _value: &mut dyn Savable,
        _node: &ObjectNode,
        _loader: &Loader,
    ) -> Option<Result<(), LoadError>> {
        None
    }

    /// Run the scripted post-load hook for a value. Returns whether the
    /// runtime handled the value.
    fn call_done_loading(&self, _value: &mut dyn Savable) -> bool {
        false
    }

    /// The savable members of a scripted value, materialized for the
    /// member walk. `None` hands the walk back to the registry.
    fn savable_members(&self, _value: &dyn Savable) -> Option<Vec<(String, Box<dyn Savable>)>> {
        None
    }
}

// -----------------------------------------------------------------------------
// Test runtime


// -----------------------------------------------------------------------------
// Tests
