use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::registry::{GetTypeMeta, ScalarMeta, TypeMeta};
use crate::savable::Savable;

// -----------------------------------------------------------------------------
// TypeRegistry

/// A registry of savable types.
///
/// This struct is used as the central store for type information.
/// [Registering] a type will generate a new [`TypeMeta`] entry in this
/// store using the type's [`GetTypeMeta`] implementation (which is
/// usually generated by declaring the type with the
/// [`savable!`](crate::savable!) macro).
///
/// Both the save and the load driver borrow a registry and resolve every
/// value they meet through it, either by [`TypeId`] or by the tag read
/// from a `"type"` key.
///
/// # Example
///
/// ```
/// use savetree::TypeRegistry;
///
/// let registry = TypeRegistry::new(); // `new` registers the primitive scalars
///
/// let meta = registry.get_with_tag("i32").unwrap();
/// let scalar = meta.scalar().unwrap();
///
/// let value = scalar.deserialize(&serde_json::json!(7)).unwrap();
/// assert_eq!(value.take::<i32>().unwrap(), 7);
/// ```
///
/// [Registering]: TypeRegistry::register
pub struct TypeRegistry {
    metas: HashMap<TypeId, TypeMeta>,
    tags: HashMap<&'static str, TypeId>,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`] .
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a empty [`TypeRegistry`].
    #[inline]
    pub fn empty() -> Self {
        Self {
            metas: HashMap::new(),
            tags: HashMap::new(),
        }
    }

    /// Create a type registry with default registrations for the
    /// primitive scalars.
    ///
    /// - `bool` `char`
    /// - `i8 - i64` `isize`
    /// - `u8 - u64` `usize`
    /// - `f32` `f64`
    /// - `String`
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register::<bool>();
        registry.register::<char>();
        registry.register::<u8>();
        registry.register::<u16>();
        registry.register::<u32>();
        registry.register::<u64>();
        registry.register::<usize>();
        registry.register::<i8>();
        registry.register::<i16>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<isize>();
        registry.register::<f32>();
        registry.register::<f64>();
        registry.register::<String>();
        registry
    }

    // - If key [`TypeId`] has already exist, the function will do nothing and return `false`.
    // - If the key [`TypeId`] does not exist, the function will insert value and return `true`.
    fn register_internal(
        &mut self,
        type_id: TypeId,
        get_type_meta: impl FnOnce() -> TypeMeta,
    ) -> bool {
        match self.metas.entry(type_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                let meta = get_type_meta();
                match self.tags.entry(meta.tag()) {
                    Entry::Occupied(existing) => {
                        if *existing.get() != type_id {
                            warn!(
                                "type tag `{}` is already taken, keeping the first registration",
                                meta.tag(),
                            );
                        }
                    }
                    Entry::Vacant(tag_slot) => {
                        tag_slot.insert(type_id);
                    }
                }
                slot.insert(meta);
                true
            }
        }
    }

    /// Attempts to register the type `T` if it has not yet been registered already.
    ///
    /// This will also recursively register any type dependencies as
    /// specified by [`GetTypeMeta::register_dependencies`]. For types
    /// declared with [`savable!`](crate::savable!), these are the types
    /// of the listed members.
    ///
    /// If the meta for `T` already exists it is kept as is, and the
    /// dependencies are not visited again.
    ///
    /// # Example
    ///
    /// ```
    /// use std::any::TypeId;
    /// use savetree::{TypeRegistry, savable};
    ///
    /// #[derive(Default)]
    /// struct Sprite {
    ///     frame: u32,
    /// }
    ///
    /// savable! {
    ///     Sprite {
    ///         default;
    ///         members { frame: u32 }
    ///     }
    /// }
    ///
    /// let mut registry = TypeRegistry::empty();
    /// registry.register::<Sprite>();
    ///
    /// // The main type
    /// assert!(registry.contains(TypeId::of::<Sprite>()));
    ///
    /// // Its member types
    /// assert!(registry.contains(TypeId::of::<u32>()));
    /// ```
    pub fn register<T: GetTypeMeta>(&mut self) {
        if self.register_internal(TypeId::of::<T>(), T::get_type_meta) {
            T::register_dependencies(self);
        }
    }

    /// Registers `T` as a plain scalar, converted through `serde`.
    ///
    /// This is the route for leaf types that are not declared with
    /// [`savable!`](crate::savable!) and have no members to walk. The tag
    /// is taken from [`type_name`](std::any::type_name), so it is stable
    /// only within one build of the program.
    pub fn register_scalar<T: Savable + Serialize + DeserializeOwned>(&mut self) {
        self.register_internal(TypeId::of::<T>(), || {
            TypeMeta::of::<T>(std::any::type_name::<T>()).with_scalar(ScalarMeta::of::<T>())
        });
    }

    /// Try add or do nothing.
    ///
    /// - If the meta's [`TypeId`] already exist, the function will do
    ///   nothing and return `false`.
    /// - If it does not exist, the meta is inserted and the function
    ///   returns `true`.
    ///
    /// This method will _not_ register type dependencies.
    /// Use [`register`](Self::register) to register a type with its dependencies.
    #[inline]
    pub fn insert(&mut self, meta: TypeMeta) -> bool {
        self.register_internal(meta.type_id(), || meta)
    }

    /// Whether the type with given [`TypeId`] has been registered in this registry.
    #[inline]
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.metas.contains_key(&type_id)
    }

    /// Returns a reference to the [`TypeMeta`] of the type with
    /// the given [`TypeId`].
    ///
    /// If the specified type has not been registered, returns `None`.
    #[inline]
    pub fn get(&self, type_id: TypeId) -> Option<&TypeMeta> {
        self.metas.get(&type_id)
    }

    /// Returns a reference to the [`TypeMeta`] of the type registered
    /// under the given tag.
    ///
    /// If no type with the given tag has been registered, returns `None`.
    pub fn get_with_tag(&self, tag: &str) -> Option<&TypeMeta> {
        match self.tags.get(tag) {
            Some(id) => self.get(*id),
            None => None,
        }
    }

    /// Returns a reference to the [`TypeMeta`] describing the given
    /// value, resolved through its reported [`TypeId`].
    #[inline]
    pub fn meta_of(&self, value: &dyn Savable) -> Option<&TypeMeta> {
        self.get(value.ty_id())
    }

    /// Returns the number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// Returns `true` if no type has been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Returns an iterator over the [`TypeMeta`]s of the registered types.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &TypeMeta> {
        self.metas.values()
    }
}

// -----------------------------------------------------------------------------
// Automatic registration

/// One entry of the distributed registration list.
///
/// Declaring a type with [`savable!`](crate::savable!) submits one of
/// these through the `inventory` crate, so that
/// [`TypeRegistry::auto_register`] can pick the type up without an
/// explicit [`register`](TypeRegistry::register) call.
#[cfg(feature = "auto_register")]
pub struct AutoRegistration {
    /// Registers the submitting type, with its dependencies.
    pub register: fn(&mut TypeRegistry),
}

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

impl TypeRegistry {
    /// Registers every type declared with [`savable!`](crate::savable!)
    /// across the whole program.
    ///
    /// This method is equivalent to calling
    /// [`register`](Self::register) for each declared type. Repeated
    /// calls are cheap and will not insert duplicates.
    ///
    /// ## Return Value
    ///
    /// Returns `true` if the distributed registration list is available.
    /// When the `auto_register` feature is disabled, this method does
    /// nothing and returns `false`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::any::TypeId;
    /// use savetree::{TypeRegistry, savable};
    ///
    /// #[derive(Default)]
    /// struct Marker;
    ///
    /// savable! {
    ///     Marker {
    ///         default;
    ///         members {}
    ///     }
    /// }
    ///
    /// let mut registry = TypeRegistry::new();
    /// assert!(registry.auto_register());
    /// assert!(registry.contains(TypeId::of::<Marker>()));
    /// ```
    #[cfg(feature = "auto_register")]
    pub fn auto_register(&mut self) -> bool {
        for entry in inventory::iter::<AutoRegistration> {
            (entry.register)(self);
        }
        true
    }

    /// Does nothing, the `auto_register` feature is disabled.
    #[cfg(not(feature = "auto_register"))]
    #[inline(always)]
    pub fn auto_register(&mut self) -> bool {
        false
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registers_primitive_scalars() {
        let registry = TypeRegistry::new();
        assert!(registry.contains(TypeId::of::<bool>()));
        assert!(registry.contains(TypeId::of::<f64>()));
        assert!(registry.contains(TypeId::of::<String>()));
        assert!(registry.get_with_tag("String").is_some());
    }

    #[test]
    fn register_keeps_the_first_meta() {
        let mut registry = TypeRegistry::empty();
        registry.register::<i32>();
        let before = registry.len();
        registry.register::<i32>();
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut registry = TypeRegistry::empty();
        assert!(registry.insert(TypeMeta::of::<i32>("i32")));
        assert!(!registry.insert(TypeMeta::of::<i32>("i32")));
    }

    #[test]
    fn scalar_registration_resolves_by_type_name() {
        let mut registry = TypeRegistry::empty();
        registry.register_scalar::<String>();
        let meta = registry
            .get_with_tag(std::any::type_name::<String>())
            .unwrap();
        assert_eq!(meta.type_id(), TypeId::of::<String>());
    }

    #[test]
    fn meta_of_resolves_through_the_value() {
        let registry = TypeRegistry::new();
        let value: Box<dyn Savable> = Box::new(5_i64);
        let meta = registry.meta_of(&*value).unwrap();
        assert_eq!(meta.tag(), "i64");
    }
}
