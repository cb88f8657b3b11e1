//! Hook resolution shared by the save and load drivers.
//!
//! For every value a driver meets, the hooks can come from two places:
//! the scripting runtime (for values it claims) or the value's
//! [`TypeMeta`]. The runtime always gets the first word, the registry
//! answers for everything the runtime declines.

use std::borrow::Cow;

use crate::bridge::{ScriptRuntime, scripted_tag};
use crate::error::{LoadError, SaveError};
use crate::load::Loader;
use crate::registry::{MemberDef, TypeMeta, TypeRegistry};
use crate::savable::Savable;
use crate::save::Saver;
use crate::tree::{ObjectNode, Value};

/// Where a value's members come from during a save walk.
pub(crate) enum MemberSource<'a> {
    /// The registered member table.
    Table(&'a [MemberDef]),
    /// Members materialized by the scripting runtime.
    Runtime(Vec<(String, Box<dyn Savable>)>),
}

/// The resolved hook set for one value.
pub(crate) struct HookDispatch<'a> {
    meta: Option<&'a TypeMeta>,
    runtime: Option<&'a dyn ScriptRuntime>,
    script_class: Option<String>,
}

impl<'a> HookDispatch<'a> {
    pub(crate) fn resolve(
        registry: &'a TypeRegistry,
        runtime: Option<&'a dyn ScriptRuntime>,
        value: &dyn Savable,
    ) -> Self {
        let script_class = runtime.and_then(|runtime| runtime.class_of(value));
        Self {
            meta: registry.meta_of(value),
            runtime,
            script_class,
        }
    }

    #[inline]
    pub(crate) fn meta(&self) -> Option<&'a TypeMeta> {
        self.meta
    }

    #[inline]
    pub(crate) fn script_class(&self) -> Option<&str> {
        self.script_class.as_deref()
    }

    /// The tag this value saves under, if anything knows the value.
    pub(crate) fn tag(&self) -> Option<Cow<'static, str>> {
        match &self.script_class {
            Some(class) => Some(Cow::Owned(scripted_tag(class))),
            None => self.meta.map(|meta| Cow::Borrowed(meta.tag())),
        }
    }

    // The runtime only answers for values it claimed through `class_of`.
    fn scripted_runtime(&self) -> Option<&'a dyn ScriptRuntime> {
        match self.script_class {
            Some(_) => self.runtime,
            None => None,
        }
    }

    pub(crate) fn custom_saver(
        &self,
        value: &dyn Savable,
        saver: &Saver,
    ) -> Option<Result<Value, SaveError>> {
        if let Some(runtime) = self.scripted_runtime() {
            if let Some(result) = runtime.call_custom_saver(value, saver) {
                return Some(result);
            }
        }
        let hook = self.meta?.custom_saver()?;
        Some(hook(value, saver))
    }

    pub(crate) fn custom_loader(
        &self,
        value: &mut dyn Savable,
        node: &ObjectNode,
        loader: &Loader,
    ) -> Option<Result<(), LoadError>> {
        if let Some(runtime) = self.scripted_runtime() {
            if let Some(result) = runtime.call_custom_loader(value, node, loader) {
                return Some(result);
            }
        }
        let hook = self.meta?.custom_loader()?;
        Some(hook(value, node, loader))
    }

    pub(crate) fn done_loading(&self, value: &mut dyn Savable) {
        if let Some(runtime) = self.scripted_runtime() {
            if runtime.call_done_loading(value) {
                return;
            }
        }
        if let Some(hook) = self.meta.and_then(TypeMeta::done_loading) {
            hook(value);
        }
    }

    /// `None` means the value declares no members at all, which sends
    /// the save walk to its collection or scalar route.
    pub(crate) fn member_source(&self, value: &dyn Savable) -> Option<MemberSource<'a>> {
        if let Some(runtime) = self.scripted_runtime() {
            if let Some(members) = runtime.savable_members(value) {
                return Some(MemberSource::Runtime(members));
            }
        }
        self.meta?.members().map(MemberSource::Table)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::testing::{ScriptedValue, StubRuntime};
    use crate::registry::TypeRegistry;
    use crate::save::Saver;

    #[derive(Default)]
    struct Counter {
        ticks: i64,
    }

    fn bump(counter: &mut Counter) {
        counter.ticks += 1;
    }

    crate::savable! {
        Counter {
            default;
            members { ticks: i64 }
            done_loading = bump;
        }
    }

    #[test]
    fn scripted_values_resolve_through_the_runtime() {
        let registry = TypeRegistry::new();
        let runtime = StubRuntime;
        let value = ScriptedValue::new("ui.Panel");

        let dispatch = HookDispatch::resolve(&registry, Some(&runtime), &value);
        assert_eq!(dispatch.script_class(), Some("ui.Panel"));
        assert!(dispatch.meta().is_none());
        assert_eq!(dispatch.tag().unwrap(), "script:ui.Panel");

        let saver = Saver::new(&registry);
        let tree = dispatch.custom_saver(&value, &saver).unwrap().unwrap();
        assert_eq!(tree["type"], "script:ui.Panel");
    }

    #[test]
    fn plain_values_resolve_through_the_registry() {
        let registry = TypeRegistry::new();
        let value = 3_i64;

        let dispatch = HookDispatch::resolve(&registry, None, &value);
        assert!(dispatch.script_class().is_none());
        assert_eq!(dispatch.tag().unwrap(), "i64");

        let saver = Saver::new(&registry);
        assert!(dispatch.custom_saver(&value, &saver).is_none());
        assert!(dispatch.member_source(&value).is_none());
    }

    #[test]
    fn done_loading_falls_back_to_the_meta_hook() {
        let mut registry = TypeRegistry::new();
        registry.register::<Counter>();
        let runtime = StubRuntime;
        let mut value = Counter::default();

        let dispatch = HookDispatch::resolve(&registry, Some(&runtime), &value);
        dispatch.done_loading(&mut value);
        assert_eq!(value.ticks, 1);
    }
}
