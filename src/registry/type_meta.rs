use std::any::TypeId;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{LoadError, SaveError};
use crate::load::Loader;
use crate::savable::{HasHost, Savable};
use crate::save::Saver;
use crate::tree::{ObjectNode, Value};

// -----------------------------------------------------------------------------
// Hook signatures

/// Builds a fresh, default-valued instance.
pub type ConstructFn = fn() -> Box<dyn Savable>;

/// Builds an instance from the parent object (if any) and the type tag,
/// or declines by returning `None`.
pub type FactoryFn = fn(Option<&dyn Savable>, &str) -> Option<Box<dyn Savable>>;

/// Produces the complete saved tree for a value, bypassing the member walk.
pub type CustomSaverFn = fn(&dyn Savable, &Saver) -> Result<Value, SaveError>;

/// Populates an instance from its saved node, bypassing the member walk.
pub type CustomLoaderFn = fn(&mut dyn Savable, &ObjectNode, &Loader) -> Result<(), LoadError>;

/// Runs after an instance has been fully populated.
pub type DoneLoadingFn = fn(&mut dyn Savable);

/// Hands a freshly appended element a reference to its container's owner.
pub type SetHostFn = fn(&mut dyn Savable, &dyn Savable);

// -----------------------------------------------------------------------------
// TypeMeta

/// Runtime storage for everything the save and load drivers need to know
/// about one type, registered into the [`TypeRegistry`].
///
/// A `TypeMeta` records the type's tag, how to construct it, and which of
/// the save/load hooks it participates in. An instance can be created
/// using the [`TypeMeta::of`] method, but is more often generated by the
/// [`savable!`](crate::savable!) macro through [`GetTypeMeta`].
///
/// # Example
///
/// ```
/// use savetree::TypeMeta;
///
/// let meta = TypeMeta::of::<i32>("i32").with_default::<i32>();
///
/// let make = meta.construct().unwrap();
/// assert_eq!(make().take::<i32>().unwrap(), 0);
/// ```
///
/// [`TypeRegistry`]: crate::TypeRegistry
pub struct TypeMeta {
    type_id: TypeId,
    tag: &'static str,
    construct: Option<ConstructFn>,
    factory: Option<FactoryFn>,
    custom_saver: Option<CustomSaverFn>,
    custom_loader: Option<CustomLoaderFn>,
    done_loading: Option<DoneLoadingFn>,
    set_host: Option<SetHostFn>,
    members: Option<Vec<MemberDef>>,
    list: Option<ListMeta>,
    scalar: Option<ScalarMeta>,
}

impl TypeMeta {
    /// Create a empty [`TypeMeta`] for a type.
    ///
    /// The result has no construction route, no hooks and no member
    /// table. Chain `with_*` calls to fill it in.
    #[inline]
    pub fn of<T: Savable>(tag: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            tag,
            construct: None,
            factory: None,
            custom_saver: None,
            custom_loader: None,
            done_loading: None,
            set_host: None,
            members: None,
            list: None,
            scalar: None,
        }
    }

    /// Construct instances through `T`'s [`Default`].
    pub fn with_default<T: Savable + Default>(mut self) -> Self {
        debug_assert_eq!(self.type_id, TypeId::of::<T>());
        self.construct = Some(|| Box::new(T::default()));
        self
    }

    /// Construct instances through the given factory first, falling back
    /// to the default route when it declines.
    pub fn with_factory(mut self, factory: FactoryFn) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Save values of this type through the given hook instead of the
    /// member walk. The hook's output is written verbatim.
    pub fn with_custom_saver(mut self, saver: CustomSaverFn) -> Self {
        self.custom_saver = Some(saver);
        self
    }

    /// Populate values of this type through the given hook instead of the
    /// member walk.
    pub fn with_custom_loader(mut self, loader: CustomLoaderFn) -> Self {
        self.custom_loader = Some(loader);
        self
    }

    /// Run the given hook once an instance has been fully populated.
    pub fn with_done_loading(mut self, done: DoneLoadingFn) -> Self {
        self.done_loading = Some(done);
        self
    }

    /// Let freshly loaded container elements of this type receive their
    /// container's owner through [`HasHost`].
    pub fn with_host<T: Savable + HasHost>(mut self) -> Self {
        debug_assert_eq!(self.type_id, TypeId::of::<T>());
        self.set_host = Some(|value, host| {
            if let Some(value) = value.downcast_mut::<T>() {
                value.set_host(host);
            }
        });
        self
    }

    /// Declare the type's member table.
    ///
    /// An empty table is meaningful: the type saves as a tagged object
    /// with no further keys. A type without any table at all falls back
    /// to its collection or scalar route instead.
    pub fn with_members(mut self, members: Vec<MemberDef>) -> Self {
        self.members = Some(members);
        self
    }

    /// Declare the type a container, loadable element by element.
    pub fn with_list(mut self, list: ListMeta) -> Self {
        self.list = Some(list);
        self
    }

    /// Declare the type a scalar leaf, converted through `serde`.
    pub fn with_scalar(mut self, scalar: ScalarMeta) -> Self {
        self.scalar = Some(scalar);
        self
    }

    /// Returns the [`TypeId`] this meta was built for.
    #[inline(always)]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the tag written to and matched against the `"type"` key.
    #[inline(always)]
    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    /// Returns the default construction route, if one was declared.
    #[inline(always)]
    pub const fn construct(&self) -> Option<ConstructFn> {
        self.construct
    }

    /// Returns the factory hook, if one was declared.
    #[inline(always)]
    pub const fn factory(&self) -> Option<FactoryFn> {
        self.factory
    }

    /// Returns the custom saver hook, if one was declared.
    #[inline(always)]
    pub const fn custom_saver(&self) -> Option<CustomSaverFn> {
        self.custom_saver
    }

    /// Returns the custom loader hook, if one was declared.
    #[inline(always)]
    pub const fn custom_loader(&self) -> Option<CustomLoaderFn> {
        self.custom_loader
    }

    /// Returns the post-load hook, if one was declared.
    #[inline(always)]
    pub const fn done_loading(&self) -> Option<DoneLoadingFn> {
        self.done_loading
    }

    /// Returns the host wiring hook, if one was declared.
    #[inline(always)]
    pub const fn set_host(&self) -> Option<SetHostFn> {
        self.set_host
    }

    /// Returns the member table.
    ///
    /// `None` means the type declared no table at all, which is distinct
    /// from `Some` of an empty one.
    #[inline]
    pub fn members(&self) -> Option<&[MemberDef]> {
        self.members.as_deref()
    }

    /// Returns the container description, if one was declared.
    #[inline]
    pub fn list(&self) -> Option<&ListMeta> {
        self.list.as_ref()
    }

    /// Returns the scalar description, if one was declared.
    #[inline]
    pub fn scalar(&self) -> Option<&ScalarMeta> {
        self.scalar.as_ref()
    }
}

impl fmt::Debug for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMeta")
            .field("tag", &self.tag)
            .field("members", &self.members.as_ref().map(Vec::len))
            .field("list", &self.list.is_some())
            .field("scalar", &self.scalar.is_some())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// MemberDef

/// One named member of a type, with type-erased access to its slot.
///
/// Internally stores function pointers corresponding to a specific field
/// of a specific type. When given a savable value, they downcast to the
/// concrete type and touch the field directly.
#[derive(Clone, Copy)]
pub struct MemberDef {
    /// The key this member is written under.
    pub name: &'static str,
    /// Borrows the member out of its owner for saving.
    pub get: fn(&dyn Savable) -> &dyn Savable,
    /// Moves a loaded value into the member's slot, handing the value
    /// back if it is not of the slot's type.
    pub set: fn(&mut dyn Savable, Box<dyn Savable>) -> Result<(), Box<dyn Savable>>,
    /// The declared type of the slot, used to resolve untagged values.
    /// `None` for slots that accept any savable value.
    pub guess: Option<TypeId>,
}

impl fmt::Debug for MemberDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// ListMeta

/// Container support for a type, registered as part of its [`TypeMeta`].
///
/// Loading an array needs to build the container up element by element,
/// and saving one needs to walk it. Both sides go through the function
/// pointers stored here, monomorphized for the concrete container type
/// by [`ListMeta::vec`].
#[derive(Clone, Copy)]
pub struct ListMeta {
    pub(crate) new_empty: fn() -> Box<dyn Savable>,
    pub(crate) push: fn(&mut dyn Savable, Box<dyn Savable>) -> Result<(), Box<dyn Savable>>,
    pub(crate) last_mut: fn(&mut dyn Savable) -> Option<&mut dyn Savable>,
    pub(crate) iter: for<'a> fn(&'a dyn Savable) -> Box<dyn Iterator<Item = &'a dyn Savable> + 'a>,
    pub(crate) element_guess: Option<TypeId>,
}

impl ListMeta {
    /// Build a fresh, empty container.
    #[inline(always)]
    pub fn new_empty(&self) -> Box<dyn Savable> {
        (self.new_empty)()
    }

    /// Append a loaded element, handing it back if it is not of the
    /// container's element type.
    #[inline(always)]
    pub fn push(
        &self,
        container: &mut dyn Savable,
        element: Box<dyn Savable>,
    ) -> Result<(), Box<dyn Savable>> {
        (self.push)(container, element)
    }

    /// Borrow the most recently appended element.
    #[inline(always)]
    pub fn last_mut<'a>(&self, container: &'a mut dyn Savable) -> Option<&'a mut dyn Savable> {
        (self.last_mut)(container)
    }

    /// Walk the container's elements in order.
    #[inline(always)]
    pub fn iter<'a>(
        &self,
        container: &'a dyn Savable,
    ) -> Box<dyn Iterator<Item = &'a dyn Savable> + 'a> {
        (self.iter)(container)
    }

    /// The declared element type, used to resolve untagged elements.
    /// `None` for containers of arbitrary savable values.
    #[inline(always)]
    pub const fn element_guess(&self) -> Option<TypeId> {
        self.element_guess
    }
}

// -----------------------------------------------------------------------------
// ScalarMeta

/// `serde` conversion support for leaf types, registered as part of
/// their [`TypeMeta`].
///
/// Internally stores function pointers corresponding to a specific type.
/// When given a savable value, it downcasts to the concrete type and
/// invokes the `serde` conversions.
///
/// Passing an incorrectly typed value to [`ScalarMeta::serialize_ref`]
/// will cause a panic.
#[derive(Clone, Copy)]
pub struct ScalarMeta {
    serialize: fn(&dyn Savable) -> &dyn erased_serde::Serialize,
    deserialize: fn(&Value) -> Result<Box<dyn Savable>, serde_json::Error>,
}

impl ScalarMeta {
    /// Create the conversion table for `T`.
    pub fn of<T: Savable + Serialize + DeserializeOwned>() -> Self {
        Self {
            serialize: |value| match value.downcast_ref::<T>() {
                Some(value) => value as &dyn erased_serde::Serialize,
                None => panic!(
                    "scalar serialize type mismatched, conversion for `{}` got value of type `{}`",
                    std::any::type_name::<T>(),
                    value.type_tag(),
                ),
            },
            deserialize: |value| Ok(Box::new(T::deserialize(value)?)),
        }
    }

    /// Borrow the value as a `serde` serializable.
    ///
    /// # Panic
    /// - Mismatched type
    #[inline(always)]
    pub fn serialize_ref<'a>(&self, value: &'a dyn Savable) -> &'a dyn erased_serde::Serialize {
        (self.serialize)(value)
    }

    /// Convert a tree node into a boxed value of the described type.
    #[inline(always)]
    pub fn deserialize(&self, value: &Value) -> Result<Box<dyn Savable>, serde_json::Error> {
        (self.deserialize)(value)
    }
}

// -----------------------------------------------------------------------------
// GetTypeMeta

/// A trait which allows a type to generate its [`TypeMeta`]
/// for registration into the [`TypeRegistry`].
///
/// This trait is usually implemented by declaring the type with the
/// [`savable!`](crate::savable!) macro, which also wires up dependency
/// registration for the member types.
///
/// # Example
///
/// ```
/// use savetree::{GetTypeMeta, savable};
///
/// #[derive(Default)]
/// struct Door {
///     open: bool,
/// }
///
/// savable! {
///     Door {
///         default;
///         members { open: bool }
///     }
/// }
///
/// let meta = Door::get_type_meta();
/// assert_eq!(meta.members().map(<[_]>::len), Some(1));
/// ```
///
/// [`TypeRegistry`]: crate::TypeRegistry
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `GetTypeMeta` so cannot provide registration information",
    note = "consider declaring `{Self}` with the `savable!` macro"
)]
pub trait GetTypeMeta: Savable {
    /// Returns the [`TypeMeta`] for this type.
    fn get_type_meta() -> TypeMeta;

    /// Registers other types needed by this type.
    /// **Allow** not to register oneself.
    fn register_dependencies(_registry: &mut crate::registry::TypeRegistry) {}
}
