use std::borrow::Cow;

use crate::bridge::ScriptRuntime;
use crate::error::SaveError;
use crate::hooks::{HookDispatch, MemberSource};
use crate::registry::{TypeMeta, TypeRegistry};
use crate::savable::Savable;
use crate::tree::{ObjectNode, TYPE_KEY, Value};

// -----------------------------------------------------------------------------
// Saver

/// Driver turning an object graph into a value tree.
///
/// # Saving Rules
///
/// For every value it meets, the driver follows a fixed priority order:
///
/// 1. **Custom saver**: a scripted saver claimed by the runtime, or the
///    type's registered `custom_saver` hook. Its output is written
///    verbatim, in particular no `"type"` key is added to it.
///
/// 2. **Member walk**: if the value declares members (through the
///    runtime or its member table), each member is saved recursively
///    into an object node, and the type tag is appended under the
///    `"type"` key. A declared-but-empty table still produces the
///    tagged object.
///
/// 3. **Collection**: containers save as bare arrays of their saved
///    elements, with no tag of their own.
///
/// 4. **Scalar**: leaf values convert through their `serde`
///    implementation.
///
/// A value none of the rules apply to aborts the save with
/// [`SaveError::UnknownType`].
///
/// # Example
///
/// ```
/// use savetree::{Saver, TypeRegistry, savable};
///
/// #[derive(Default)]
/// struct Player {
///     name: String,
///     level: i64,
/// }
///
/// savable! {
///     Player {
///         default;
///         members { name: String, level: i64 }
///     }
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register::<Player>();
///
/// let player = Player { name: "Ada".into(), level: 3 };
/// let tree = Saver::new(&registry).save_value(&player).unwrap();
///
/// assert_eq!(tree["name"], "Ada");
/// assert_eq!(tree["level"], 3);
/// assert_eq!(tree["type"], concat!(module_path!(), "::Player"));
/// ```
pub struct Saver<'a> {
    registry: &'a TypeRegistry,
    runtime: Option<&'a dyn ScriptRuntime>,
    pretty: bool,
}

impl<'a> Saver<'a> {
    /// Creates a saver with no scripting runtime.
    ///
    /// If part of the object graph lives in a script layer, use
    /// [`with_runtime`](Self::with_runtime).
    #[inline]
    pub const fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            runtime: None,
            pretty: true,
        }
    }

    /// Creates a saver with a scripting runtime.
    #[inline]
    pub const fn with_runtime(registry: &'a TypeRegistry, runtime: &'a dyn ScriptRuntime) -> Self {
        Self {
            registry,
            runtime: Some(runtime),
            pretty: true,
        }
    }

    /// Sets whether [`save_to_string`](Self::save_to_string) writes
    /// pretty-printed text. On by default.
    #[inline]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Returns the registry this saver resolves types through.
    #[inline]
    pub const fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Save a value and everything reachable from it into a tree.
    pub fn save_value(&self, value: &dyn Savable) -> Result<Value, SaveError> {
        let dispatch = HookDispatch::resolve(self.registry, self.runtime, value);

        if let Some(result) = dispatch.custom_saver(value, self) {
            return result;
        }

        if let Some(source) = dispatch.member_source(value) {
            let tag = dispatch
                .tag()
                .unwrap_or_else(|| Cow::Borrowed(value.type_tag()));
            let mut node = ObjectNode::new();
            match source {
                MemberSource::Table(members) => {
                    for member in members {
                        let child = (member.get)(value);
                        node.insert(member.name.to_string(), self.save_value(child)?);
                    }
                }
                MemberSource::Runtime(members) => {
                    for (name, child) in members {
                        node.insert(name, self.save_value(&*child)?);
                    }
                }
            }
            node.insert(TYPE_KEY.to_string(), Value::String(tag.into_owned()));
            return Ok(Value::Object(node));
        }

        if let Some(list) = dispatch.meta().and_then(TypeMeta::list) {
            let mut items = Vec::new();
            for element in list.iter(value) {
                items.push(self.save_value(element)?);
            }
            return Ok(Value::Array(items));
        }

        if let Some(scalar) = dispatch.meta().and_then(TypeMeta::scalar) {
            return Ok(serde_json::to_value(scalar.serialize_ref(value))?);
        }

        Err(SaveError::UnknownType {
            tag: dispatch
                .tag()
                .unwrap_or_else(|| Cow::Borrowed(value.type_tag())),
        })
    }

    /// Save a value into JSON text.
    ///
    /// See [`pretty`](Self::pretty) for the output shape.
    pub fn save_to_string(&self, value: &dyn Savable) -> Result<String, SaveError> {
        let tree = self.save_value(value)?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&tree)
        } else {
            serde_json::to_string(&tree)
        };
        text.map_err(SaveError::from)
    }
}

// -----------------------------------------------------------------------------
// Tests
