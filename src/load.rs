use std::any::TypeId;
use std::borrow::Cow;

use log::{debug, warn};

use crate::bridge::{ScriptRuntime, script_class};
use crate::error::LoadError;
use crate::hooks::HookDispatch;
use crate::registry::{MemberDef, TypeMeta, TypeRegistry};
use crate::savable::{FromLoaded, Savable};
use crate::tree::{ObjectNode, TYPE_KEY, Value};

// -----------------------------------------------------------------------------
// Loader

/// Driver turning a value tree back into an object graph.
///
/// # Loading Rules
///
/// Every object node resolves to an instance in a fixed priority order:
///
/// 1. **Tag**: a `"type"` key names the type to build. A scripted tag is
///    handed to the runtime, any other tag is looked up in the registry.
/// 2. **Slot type**: an untagged node falls back to the declared type of
///    the slot it is loaded for.
///
/// The instance is then built through the type's factory hook if it has
/// one, or its default construction route, and populated either by its
/// custom loader or by the member walk, never both. The post-load hook
/// runs last.
///
/// # Degradation
///
/// A tree and the program that wrote it drift apart over time, so
/// structural problems do not abort the load: an unresolvable tag, an
/// uninstantiable type, a member with no slot or a null element lose
/// only the affected subtree, with a log line each. Hard errors are
/// reserved for unparsable text, scalar values that cannot convert to
/// their declared slot type, and loaded values that do not fit the slot
/// they were built for.
///
/// # Example
///
/// ```
/// use savetree::{Loader, Saver, TypeRegistry, savable};
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
/// let player = Player { name: "Ada".into(), level: 9 };
/// let tree = Saver::new(&registry).save_value(&player).unwrap();
///
/// let loaded: Player = Loader::new(&registry)
///     .load_as(&tree)
///     .unwrap()
///     .expect("the tag resolves");
/// assert_eq!(loaded.name, "Ada");
/// assert_eq!(loaded.level, 9);
/// ```
pub struct Loader<'a> {
    registry: &'a TypeRegistry,
    runtime: Option<&'a dyn ScriptRuntime>,
}

impl<'a> Loader<'a> {
    /// Creates a loader with no scripting runtime.
    ///
    /// Scripted tags cannot be resolved without one; their subtrees are
    /// dropped with a warning.
    #[inline]
    pub const fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            runtime: None,
        }
    }

    /// Creates a loader with a scripting runtime.
    #[inline]
    pub const fn with_runtime(registry: &'a TypeRegistry, runtime: &'a dyn ScriptRuntime) -> Self {
        Self {
            registry,
            runtime: Some(runtime),
        }
    }

    /// Returns the registry this loader resolves types through.
    #[inline]
    pub const fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Load the root of a tree.
    ///
    /// `Ok(None)` means the root itself could not be resolved to an
    /// instance; the reasons are on the log.
    pub fn load(&self, tree: &Value) -> Result<Option<Box<dyn Savable>>, LoadError> {
        self.load_value(tree, None, None)
    }

    /// Load the root of a tree as a known type.
    ///
    /// The type also serves as the slot type for an untagged root.
    pub fn load_as<T: FromLoaded>(&self, tree: &Value) -> Result<Option<T>, LoadError> {
        match self.load_value(tree, T::load_guess(), None)? {
            Some(value) => match T::from_loaded(value) {
                Ok(value) => Ok(Some(value)),
                Err(other) => Err(LoadError::MismatchedType {
                    slot: Cow::Borrowed("root"),
                    found: Cow::Borrowed(other.type_tag()),
                }),
            },
            None => Ok(None),
        }
    }

    /// Parse JSON text and load its root.
    pub fn load_from_str(&self, text: &str) -> Result<Option<Box<dyn Savable>>, LoadError> {
        let tree: Value = serde_json::from_str(text)?;
        self.load(&tree)
    }

    /// Load one node of the tree.
    ///
    /// `guess` is the declared type of the slot the node is loaded for,
    /// used when the node carries no tag of its own. `parent` is the
    /// object the loaded value will be attached to; it is handed to
    /// factory hooks and to the host wiring of container elements.
    ///
    /// This is the recursion step custom loaders call for their
    /// children.
    pub fn load_value(
        &self,
        node: &Value,
        guess: Option<TypeId>,
        parent: Option<&dyn Savable>,
    ) -> Result<Option<Box<dyn Savable>>, LoadError> {
        match node {
            Value::Object(object) => self.load_object(object, guess, parent),
            Value::Array(items) => match guess.and_then(|id| self.registry.get(id)) {
                Some(meta) => self.load_array(items, meta, parent),
                None => {
                    warn!(
                        "cannot load an array without a declared container type, dropping {} elements",
                        items.len(),
                    );
                    Ok(None)
                }
            },
            Value::Null => Ok(None),
            leaf => self.load_leaf(leaf, guess),
        }
    }

    // ------------------------------------------------------------------
    // Objects

    fn load_object(
        &self,
        node: &ObjectNode,
        guess: Option<TypeId>,
        parent: Option<&dyn Savable>,
    ) -> Result<Option<Box<dyn Savable>>, LoadError> {
        let Some(mut value) = self.create_instance(node, guess, parent) else {
            return Ok(None);
        };
        self.populate(&mut *value, node)?;
        Ok(Some(value))
    }

    fn create_instance(
        &self,
        node: &ObjectNode,
        guess: Option<TypeId>,
        parent: Option<&dyn Savable>,
    ) -> Option<Box<dyn Savable>> {
        match node.get(TYPE_KEY) {
            Some(Value::String(tag)) => {
                if let Some(class) = script_class(tag) {
                    let Some(runtime) = self.runtime else {
                        warn!(
                            "tag `{tag}` needs a scripting runtime and none is attached, \
                             dropping the subtree",
                        );
                        return None;
                    };
                    let instance = runtime.create_instance(class, parent);
                    if instance.is_none() {
                        warn!(
                            "the scripting runtime cannot instantiate `{class}`, \
                             dropping the subtree",
                        );
                    }
                    return instance;
                }
                match self.registry.get_with_tag(tag) {
                    Some(meta) => self.instantiate(meta, parent),
                    None => {
                        warn!("tag `{tag}` is not registered, dropping the subtree");
                        None
                    }
                }
            }
            Some(_) => {
                warn!("the `type` key does not hold a tag, dropping the subtree");
                None
            }
            None => match guess.and_then(|id| self.registry.get(id)) {
                Some(meta) => self.instantiate(meta, parent),
                None => {
                    warn!("untagged object with no declared slot type, dropping the subtree");
                    None
                }
            },
        }
    }

    fn instantiate(&self, meta: &TypeMeta, parent: Option<&dyn Savable>) -> Option<Box<dyn Savable>> {
        if let Some(factory) = meta.factory() {
            if let Some(instance) = factory(parent, meta.tag()) {
                return Some(instance);
            }
            // A declining factory is not final, the default route still
            // applies.
        }
        if let Some(construct) = meta.construct() {
            return Some(construct());
        }
        warn!("no way to construct `{}`, dropping the subtree", meta.tag());
        None
    }

    fn populate(&self, value: &mut dyn Savable, node: &ObjectNode) -> Result<(), LoadError> {
        let dispatch = HookDispatch::resolve(self.registry, self.runtime, value);

        match dispatch.custom_loader(value, node, self) {
            Some(result) => result?,
            None => match dispatch.meta().and_then(TypeMeta::members) {
                Some(members) => self.populate_members(value, members, node)?,
                None => {
                    if let Some(class) = dispatch.script_class() {
                        debug!(
                            "scripted class `{class}` has no custom loader, \
                             instance left as created",
                        );
                    }
                }
            },
        }

        dispatch.done_loading(value);
        Ok(())
    }

    fn populate_members(
        &self,
        value: &mut dyn Savable,
        members: &[MemberDef],
        node: &ObjectNode,
    ) -> Result<(), LoadError> {
        for (key, child) in node {
            if key == TYPE_KEY {
                continue;
            }
            let mut matches = members.iter().filter(|member| member.name == key.as_str());
            let Some(member) = matches.next() else {
                warn!("no member `{key}` to load into, skipping the value");
                continue;
            };
            if matches.next().is_some() {
                warn!("member `{key}` is declared more than once, using the first declaration");
            }

            let Some(loaded) = self.load_member_value(member, child, &*value)? else {
                continue;
            };
            if let Err(rejected) = (member.set)(&mut *value, loaded) {
                return Err(LoadError::MismatchedType {
                    slot: Cow::Borrowed(member.name),
                    found: Cow::Borrowed(rejected.type_tag()),
                });
            }
        }
        Ok(())
    }

    fn load_member_value(
        &self,
        member: &MemberDef,
        node: &Value,
        parent: &dyn Savable,
    ) -> Result<Option<Box<dyn Savable>>, LoadError> {
        if node.is_null() {
            // A null member usually means nothing was saved here. The
            // only null that carries a value is an `Option` slot.
            if let Some(scalar) = self.guessed_meta(member.guess).and_then(TypeMeta::scalar) {
                if let Ok(value) = scalar.deserialize(node) {
                    return Ok(Some(value));
                }
            }
            debug!("member `{}` holds null, leaving the default in place", member.name);
            return Ok(None);
        }
        self.load_value(node, member.guess, Some(parent))
    }

    // ------------------------------------------------------------------
    // Arrays

    fn load_array(
        &self,
        items: &[Value],
        meta: &TypeMeta,
        parent: Option<&dyn Savable>,
    ) -> Result<Option<Box<dyn Savable>>, LoadError> {
        let Some(list) = meta.list() else {
            warn!(
                "`{}` is not a container but an array was saved for it, dropping {} elements",
                meta.tag(),
                items.len(),
            );
            return Ok(None);
        };

        let mut container = list.new_empty();
        for item in items {
            let Some(element) = self.load_value(item, list.element_guess(), parent)? else {
                warn!("dropping an unloadable element of `{}`", meta.tag());
                continue;
            };
            if let Err(rejected) = list.push(&mut *container, element) {
                return Err(LoadError::MismatchedType {
                    slot: Cow::Borrowed("element"),
                    found: Cow::Borrowed(rejected.type_tag()),
                });
            }
            if let Some(last) = list.last_mut(&mut *container) {
                self.wire_host(last, parent);
            }
        }
        Ok(Some(container))
    }

    fn wire_host(&self, element: &mut dyn Savable, parent: Option<&dyn Savable>) {
        let Some(parent) = parent else {
            return;
        };
        if let Some(wire) = self
            .registry
            .get(element.ty_id())
            .and_then(TypeMeta::set_host)
        {
            wire(element, parent);
        }
    }

    // ------------------------------------------------------------------
    // Leaves

    fn load_leaf(
        &self,
        leaf: &Value,
        guess: Option<TypeId>,
    ) -> Result<Option<Box<dyn Savable>>, LoadError> {
        if let Some(meta) = self.guessed_meta(guess) {
            if let Some(scalar) = meta.scalar() {
                return match scalar.deserialize(leaf) {
                    Ok(value) => Ok(Some(value)),
                    Err(err) => Err(LoadError::Coercion {
                        target: Cow::Borrowed(meta.tag()),
                        detail: err.to_string(),
                    }),
                };
            }
        }
        Ok(scalar_box(leaf))
    }

    fn guessed_meta(&self, guess: Option<TypeId>) -> Option<&TypeMeta> {
        guess.and_then(|id| self.registry.get(id))
    }
}

// Natural typing for untyped slots: integers come back as `i64` (or
// `u64` beyond its range), fractions as `f64`.
fn scalar_box(leaf: &Value) -> Option<Box<dyn Savable>> {
    match leaf {
        Value::Bool(value) => Some(Box::new(*value)),
        Value::Number(number) => {
            if let Some(value) = number.as_i64() {
                Some(Box::new(value))
            } else if let Some(value) = number.as_u64() {
                Some(Box::new(value))
            } else {
                number
                    .as_f64()
                    .map(|value| Box::new(value) as Box<dyn Savable>)
            }
        }
        Value::String(text) => Some(Box::new(text.clone())),
        _ => None,
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{ScriptedValue, StubRuntime};
    use crate::error::SaveError;
    use crate::savable::HasHost;
    use crate::save::Saver;
    use serde_json::json;

    #[derive(Default, Debug)]
    struct Bough {
        value: i64,
        host_tag: String,
    }

    impl HasHost for Bough {
        fn set_host(&mut self, host: &dyn Savable) {
            self.host_tag = host.type_tag().to_string();
        }
    }

    crate::savable! {
        Bough {
            default;
            host;
            members { value: i64 }
        }
    }

    #[derive(Default, Debug)]
    struct Arbor {
        label: String,
        children: Vec<Bough>,
        anything: Vec<Box<dyn Savable>>,
    }

    crate::savable! {
        Arbor {
            default;
            members { label: String, children: Vec<Bough>, anything: Vec<Box<dyn Savable>> }
        }
    }

    #[derive(Default)]
    struct Packed {
        a: i64,
        b: i64,
    }

    fn load_packed(value: &mut Packed, node: &ObjectNode, _loader: &Loader) -> Result<(), LoadError> {
        if let Some(given) = node.get("a").and_then(Value::as_i64) {
            value.a = given * 10;
        }
        Ok(())
    }

    crate::savable! {
        Packed {
            default;
            members { a: i64, b: i64 }
            custom_loader = load_packed;
        }
    }

    #[derive(Default)]
    struct Stamped {
        seen: i64,
        stamped: bool,
    }

    fn stamp(value: &mut Stamped) {
        value.stamped = true;
    }

    crate::savable! {
        Stamped {
            default;
            members { seen: i64 }
            done_loading = stamp;
        }
    }

    #[derive(Default)]
    struct Spawned {
        via: String,
    }

    fn spawn(parent: Option<&dyn Savable>, _tag: &str) -> Option<Box<dyn Savable>> {
        Some(Box::new(Spawned {
            via: parent
                .map(|parent| parent.type_tag().to_string())
                .unwrap_or_default(),
        }))
    }

    crate::savable! {
        Spawned {
            factory = spawn;
            members {}
        }
    }

    #[derive(Default)]
    struct Holder {
        child: Spawned,
    }

    crate::savable! {
        Holder {
            default;
            members { child: Spawned }
        }
    }

    #[derive(Default)]
    struct Tuned {
        bias: Option<i64>,
    }

    crate::savable! {
        Tuned {
            default;
            members { bias: Option<i64> }
        }
    }

    #[derive(Default, Debug)]
    struct Meter {
        samples: Vec<f64>,
        ticks: Vec<i64>,
    }

    crate::savable! {
        Meter {
            default;
            members { samples: Vec<f64>, ticks: Vec<i64> }
        }
    }

    #[derive(Default)]
    struct Fallback {
        touched: bool,
    }

    fn decline(_parent: Option<&dyn Savable>, _tag: &str) -> Option<Box<dyn Savable>> {
        None
    }

    crate::savable! {
        Fallback {
            default;
            factory = decline;
            members {}
        }
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry.register::<Arbor>();
        registry.register::<Packed>();
        registry.register::<Stamped>();
        registry.register::<Holder>();
        registry.register::<Fallback>();
        registry.register::<Tuned>();
        registry.register::<Meter>();
        registry
    }

    fn tag_of(name: &str) -> String {
        format!("{}::{name}", module_path!())
    }

    #[test]
    fn round_trip_preserves_the_graph() {
        let registry = registry();
        let arbor = Arbor {
            label: "old oak".into(),
            children: vec![
                Bough {
                    value: 1,
                    host_tag: String::new(),
                },
                Bough {
                    value: 2,
                    host_tag: String::new(),
                },
            ],
            anything: vec![Box::new(5_i64), Box::new(String::from("twig"))],
        };

        let tree = Saver::new(&registry).save_value(&arbor).unwrap();
        let loaded: Arbor = Loader::new(&registry).load_as(&tree).unwrap().unwrap();

        assert_eq!(loaded.label, "old oak");
        assert_eq!(loaded.children.len(), 2);
        assert_eq!(loaded.children[0].value, 1);
        assert_eq!(loaded.children[1].value, 2);
        assert_eq!(loaded.anything.len(), 2);
        assert_eq!(*loaded.anything[0].downcast_ref::<i64>().unwrap(), 5);
        assert_eq!(loaded.anything[1].downcast_ref::<String>().unwrap(), "twig");
    }

    #[test]
    fn hosts_are_wired_right_after_append() {
        let registry = registry();
        let tree = json!({
            "label": "l",
            "children": [ { "value": 1, "type": tag_of("Bough") } ],
            "type": tag_of("Arbor"),
        });

        let loaded: Arbor = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.children[0].host_tag, tag_of("Arbor"));
    }

    #[test]
    fn untagged_root_loads_through_the_guess() {
        let registry = registry();
        let loaded: Option<Bough> = Loader::new(&registry)
            .load_as(&json!({ "value": 5 }))
            .unwrap();
        assert_eq!(loaded.unwrap().value, 5);
    }

    #[test]
    fn unresolvable_tags_lose_only_their_subtree() {
        let registry = registry();
        let tree = json!({
            "label": "l",
            "children": [
                { "value": 1, "type": tag_of("Bough") },
                { "value": 2, "type": "ghost::Missing" },
                { "value": 3, "type": tag_of("Bough") },
            ],
            "type": tag_of("Arbor"),
        });

        let loaded: Arbor = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        let values: Vec<i64> = loaded.children.iter().map(|child| child.value).collect();
        assert_eq!(values, [1, 3]);
    }

    #[test]
    fn null_members_keep_their_defaults() {
        let registry = registry();
        let tree = json!({ "label": null, "type": tag_of("Arbor") });
        let loaded: Arbor = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.label, "");
    }

    #[test]
    fn null_elements_are_skipped() {
        let registry = registry();
        let tree = json!({
            "children": [ null, { "value": 4, "type": tag_of("Bough") } ],
            "type": tag_of("Arbor"),
        });
        let loaded: Arbor = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.children.len(), 1);
        assert_eq!(loaded.children[0].value, 4);
    }

    #[test]
    fn option_members_round_trip_through_null() {
        let registry = registry();

        let tree = Saver::new(&registry)
            .save_value(&Tuned { bias: None })
            .unwrap();
        assert_eq!(tree["bias"], Value::Null);
        let loaded: Tuned = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.bias, None);

        let tree = Saver::new(&registry)
            .save_value(&Tuned { bias: Some(3) })
            .unwrap();
        let loaded: Tuned = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.bias, Some(3));
    }

    #[test]
    fn array_order_is_preserved() {
        let registry = registry();
        let tree = json!({
            "children": [
                { "value": 3, "type": tag_of("Bough") },
                { "value": 1, "type": tag_of("Bough") },
                { "value": 2, "type": tag_of("Bough") },
            ],
            "type": tag_of("Arbor"),
        });

        let loaded: Arbor = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        let values: Vec<i64> = loaded.children.iter().map(|child| child.value).collect();
        assert_eq!(values, [3, 1, 2]);
    }

    #[test]
    fn unknown_members_are_skipped() {
        let registry = registry();
        let tree = json!({
            "label": "kept",
            "vintage": 1877,
            "type": tag_of("Arbor"),
        });
        let loaded: Arbor = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.label, "kept");
    }

    #[test]
    fn scalar_elements_coerce_through_the_element_type() {
        // Written as integers, declared as floats: the element type's
        // registered conversion absorbs the difference.
        let registry = registry();
        let tree = json!({ "samples": [1, 2], "type": tag_of("Meter") });
        let loaded: Meter = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.samples, [1.0, 2.0]);
    }

    #[test]
    fn lossy_scalar_elements_are_hard_errors() {
        let registry = registry();
        let tree = json!({ "ticks": [1, 2.5], "type": tag_of("Meter") });
        let err = Loader::new(&registry).load_as::<Meter>(&tree).unwrap_err();
        assert!(matches!(err, LoadError::Coercion { .. }));
    }

    #[test]
    fn scalar_mismatches_are_hard_errors() {
        let registry = registry();
        let tree = json!({ "value": "not a number", "type": tag_of("Bough") });
        let err = Loader::new(&registry).load_as::<Bough>(&tree).unwrap_err();
        assert!(matches!(err, LoadError::Coercion { .. }));
    }

    #[test]
    fn root_type_mismatch_is_a_hard_error() {
        let registry = registry();
        let tree = json!({ "value": 1, "type": tag_of("Bough") });
        let err = Loader::new(&registry).load_as::<Arbor>(&tree).unwrap_err();
        assert!(matches!(err, LoadError::MismatchedType { .. }));
    }

    #[test]
    fn duplicate_member_names_use_the_first_entry() {
        // The macro cannot declare two members under one name, but the
        // `TypeMeta` builder can.
        #[derive(Default, Debug)]
        struct Twice {
            a: i64,
            b: i64,
        }

        crate::savable! {
            Twice {
                default;
                members {}
            }
        }

        let shadowed = TypeMeta::of::<Twice>(concat!(module_path!(), "::Twice"))
            .with_default::<Twice>()
            .with_members(vec![
                MemberDef {
                    name: "a",
                    get: |owner| &owner.downcast_ref::<Twice>().unwrap().a as &dyn Savable,
                    set: |owner, value| {
                        let twice = owner.downcast_mut::<Twice>().unwrap();
                        i64::from_loaded(value).map(|value| twice.a = value)
                    },
                    guess: Some(TypeId::of::<i64>()),
                },
                MemberDef {
                    name: "a",
                    get: |owner| &owner.downcast_ref::<Twice>().unwrap().b as &dyn Savable,
                    set: |owner, value| {
                        let twice = owner.downcast_mut::<Twice>().unwrap();
                        i64::from_loaded(value).map(|value| twice.b = value)
                    },
                    guess: Some(TypeId::of::<i64>()),
                },
            ]);

        let mut registry = TypeRegistry::new();
        registry.insert(shadowed);

        let tree = json!({ "a": 7, "type": tag_of("Twice") });
        let loaded: Twice = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.a, 7);
        assert_eq!(loaded.b, 0);
    }

    #[test]
    fn custom_loaders_replace_the_member_walk() {
        let registry = registry();
        let tree = json!({ "a": 1, "b": 2, "type": tag_of("Packed") });
        let loaded: Packed = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.a, 10);
        assert_eq!(loaded.b, 0);
    }

    #[test]
    fn the_post_load_hook_runs_after_population() {
        let registry = registry();
        let tree = json!({ "seen": 3, "type": tag_of("Stamped") });
        let loaded: Stamped = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.seen, 3);
        assert!(loaded.stamped);
    }

    #[test]
    fn factories_receive_the_parent() {
        let registry = registry();
        let tree = json!({
            "child": { "type": tag_of("Spawned") },
            "type": tag_of("Holder"),
        });
        let loaded: Holder = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert_eq!(loaded.child.via, tag_of("Holder"));
    }

    #[test]
    fn declining_factories_fall_back_to_default() {
        let registry = registry();
        let tree = json!({ "type": tag_of("Fallback") });
        let loaded: Fallback = Loader::new(&registry).load_as(&tree).unwrap().unwrap();
        assert!(!loaded.touched);
    }

    #[test]
    fn bare_arrays_need_a_declared_container() {
        let registry = registry();
        let loaded = Loader::new(&registry).load(&json!([1, 2, 3])).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn null_roots_load_to_nothing() {
        let registry = registry();
        assert!(Loader::new(&registry).load(&Value::Null).unwrap().is_none());
    }

    #[test]
    fn non_string_tags_drop_the_subtree() {
        let registry = registry();
        let loaded = Loader::new(&registry).load(&json!({ "type": 5 })).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn text_round_trip() {
        let registry = registry();
        let arbor = Arbor {
            label: "written".into(),
            children: Vec::new(),
            anything: Vec::new(),
        };

        let text = Saver::new(&registry).save_to_string(&arbor).unwrap();
        let loaded = Loader::new(&registry).load_from_str(&text).unwrap().unwrap();
        assert_eq!(loaded.take::<Arbor>().unwrap().label, "written");
    }

    #[test]
    fn unparsable_text_is_a_hard_error() {
        let registry = registry();
        let err = Loader::new(&registry).load_from_str("{ not json").unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn scripted_round_trip() {
        let registry = registry();
        let mut value = ScriptedValue::new("quest.Giver");
        value.fields.insert("gold".into(), json!(10));

        let tree = Saver::with_runtime(&registry, &StubRuntime)
            .save_value(&value)
            .unwrap();
        let loaded = Loader::with_runtime(&registry, &StubRuntime)
            .load(&tree)
            .unwrap()
            .unwrap();

        let scripted = loaded.take::<ScriptedValue>().unwrap();
        assert_eq!(scripted.class, "quest.Giver");
        assert_eq!(scripted.fields["gold"], 10);
        assert_eq!(scripted.fields["loaded"], true);
    }

    #[test]
    fn unknown_script_classes_lose_only_their_subtree() {
        let registry = registry();
        let loader = Loader::with_runtime(&registry, &StubRuntime);
        let loaded = loader
            .load(&json!({ "type": "script:UnknownThing" }))
            .unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn scripted_tags_need_a_runtime() {
        let registry = registry();
        let loaded = Loader::new(&registry)
            .load(&json!({ "type": "script:ui.Panel" }))
            .unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn save_errors_do_not_leak_into_loading() {
        // An unregistered value in a heterogeneous container fails the
        // save, it never produces a tree with holes.
        struct Ghost;

        impl Savable for Ghost {
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
                self
            }

            fn type_tag(&self) -> &'static str {
                concat!(module_path!(), "::Ghost")
            }
        }

        let registry = registry();
        let arbor = Arbor {
            label: String::new(),
            children: Vec::new(),
            anything: vec![Box::new(Ghost)],
        };

        let err = Saver::new(&registry).save_value(&arbor).unwrap_err();
        assert!(matches!(err, SaveError::UnknownType { .. }));
    }
}
