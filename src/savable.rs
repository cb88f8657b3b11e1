use std::any::{Any, TypeId};
use std::fmt;

use crate::registry::TypeRegistry;

// -----------------------------------------------------------------------------
// Savable

/// The foundational trait for values participating in save/load.
///
/// Any value that appears in a persisted object graph is handled through
/// `dyn Savable`, from domain structs down to member scalars.
/// The trait itself is deliberately small: conversions to [`Any`] for
/// downcasting, plus the runtime [type tag](Savable::type_tag) the engine
/// embeds under the reserved `"type"` key. Everything else a type can do
/// (member tables, hooks, scalar conversion) lives in its registered
/// [`TypeMeta`](crate::TypeMeta), not on the trait.
///
/// # Recommendations
///
/// It's strongly recommended to use the [`savable!`](crate::savable) macro
/// rather than implementing this trait manually. The macro implements
/// `Savable`, [`FromLoaded`] and [`GetTypeMeta`](crate::GetTypeMeta)
/// together, which keeps the tag and the registry entry consistent.
///
/// # Type Identification
///
/// [`Any::type_id`] called on a `Box<dyn Savable>` returns the container's
/// type ID, not the inner value's. Use [`Savable::ty_id`] instead, which
/// routes through [`as_any`](Savable::as_any) and therefore stays correct
/// even for boxed trait objects:
///
/// ```
/// use savetree::Savable;
/// use std::any::TypeId;
///
/// let x: Box<dyn Savable> = Box::new(10_i32);
///
/// assert_eq!(x.ty_id(), TypeId::of::<i32>());
/// ```
///
/// # Manual Implementation
///
/// The three `Any` conversions are always the identity:
///
/// ```rust, ignore
/// fn as_any(&self) -> &dyn Any { self }
/// fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// fn into_any(self: Box<Self>) -> Box<dyn Any> { self }
/// ```
///
/// `type_tag` must return the same string the type registers under,
/// otherwise a saved graph cannot be resolved back to the type.
pub trait Savable: Any {
    /// Casts this value to [`Any`] by reference.
    fn as_any(&self) -> &dyn Any;

    /// Casts this value to [`Any`] by mutable reference.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Casts this boxed value to a boxed [`Any`].
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// The tag identifying this value's concrete type in saved data.
    ///
    /// Stable across runs and toolchains for macro-registered types
    /// (module path + type name). Values only ever saved through the
    /// scalar or collection paths never write their tag; for those it is
    /// diagnostic output only.
    fn type_tag(&self) -> &'static str;

    /// Returns the [`TypeId`] of the underlying value.
    ///
    /// When you call `type_id` on a `Box<dyn Savable>`, it returns the
    /// [`TypeId`] of the entire container instead of the contents. This is
    /// prone to errors, so we provide this method.
    #[inline]
    fn ty_id(&self) -> TypeId {
        self.as_any().type_id()
    }
}

impl dyn Savable {
    /// Returns `true` if the underlying value is of type `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use savetree::Savable;
    /// let x: Box<dyn Savable> = Box::new(10_i32);
    ///
    /// assert!(x.is::<i32>());
    /// ```
    #[inline(always)]
    pub fn is<T: Savable>(&self) -> bool {
        self.ty_id() == TypeId::of::<T>()
    }

    /// Downcasts the value to type `T` by reference.
    ///
    /// If the underlying value is not of type `T`, returns `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use savetree::Savable;
    /// let x: Box<dyn Savable> = Box::new(10_i32);
    ///
    /// let y = x.downcast_ref::<i32>().unwrap();
    /// assert_eq!(*y, 10);
    /// ```
    #[inline]
    pub fn downcast_ref<T: Savable>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Downcasts the value to type `T` by mutable reference.
    ///
    /// If the underlying value is not of type `T`, returns `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use savetree::Savable;
    /// let mut x: Box<dyn Savable> = Box::new(10_i32);
    ///
    /// let y = x.downcast_mut::<i32>().unwrap();
    /// *y += 2;
    ///
    /// assert_eq!(*y, 12);
    /// ```
    #[inline]
    pub fn downcast_mut<T: Savable>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    /// Downcasts the value to type `T`, unboxing and consuming the trait
    /// object.
    ///
    /// If the underlying value is not of type `T`, returns `Err(self)` so
    /// the caller keeps ownership.
    ///
    /// # Examples
    ///
    /// ```
    /// # use savetree::Savable;
    /// let x: Box<dyn Savable> = Box::new(10_i32);
    ///
    /// let x = x.take::<i32>().unwrap();
    /// assert_eq!(x, 10);
    /// ```
    #[inline]
    pub fn take<T: Savable>(self: Box<dyn Savable>) -> Result<T, Box<dyn Savable>> {
        if self.is::<T>() {
            match self.into_any().downcast::<T>() {
                Ok(value) => Ok(*value),
                // `is` routes through the same `as_any` chain, so the two
                // checks cannot disagree.
                Err(_) => unreachable!("downcast failed after type check"),
            }
        } else {
            Err(self)
        }
    }
}

impl fmt::Debug for dyn Savable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Savable({})", self.type_tag())
    }
}

// -----------------------------------------------------------------------------
// FromLoaded

/// Conversion from a loaded dynamic value into a typed slot.
///
/// The [`Loader`](crate::Loader) produces `Box<dyn Savable>` values; this
/// trait is how those land in concrete member fields and collection
/// elements. For concrete types the conversion is an unbox; for
/// `Box<dyn Savable>` slots (polymorphic members) it is a pass-through,
/// which is what lets one population code path serve both.
///
/// It also carries the two pieces of static knowledge the engine needs
/// about a declared slot type:
///
/// - [`load_guess`](FromLoaded::load_guess): the [`TypeId`] to resolve
///   when a tree node carries no `"type"` tag, or `None` for polymorphic
///   slots which always need a tag.
/// - [`register_dependency`](FromLoaded::register_dependency): how to pull
///   the type into a [`TypeRegistry`] when something that contains it is
///   registered.
///
/// Implemented by the [`savable!`](crate::savable) macro; implemented
/// generically for `Vec<T>`, `Option<T>` and `Box<dyn Savable>`.
pub trait FromLoaded: Savable + Sized {
    /// The declared-type hint used when a tree node has no type tag.
    fn load_guess() -> Option<TypeId>;

    /// Registers this type into `registry` as a dependency of another
    /// registration.
    fn register_dependency(registry: &mut TypeRegistry);

    /// Converts a loaded value into `Self`, returning the value back on a
    /// type mismatch.
    fn from_loaded(value: Box<dyn Savable>) -> Result<Self, Box<dyn Savable>>;
}

// -----------------------------------------------------------------------------
// HasHost

/// Capability for loaded values that keep a reference to their container.
///
/// When the [`Loader`](crate::Loader) appends a value to a collection it
/// checks whether the value's type registered this capability (the `host`
/// clause of [`savable!`](crate::savable)) and, if so, calls
/// [`set_host`](HasHost::set_host) with the object logically containing the
/// collection. This happens immediately after the append, while the rest of
/// the parent may still be unpopulated.
///
/// The host is passed by reference; implementations record whatever they
/// need from it (an id, a name, a channel handle) rather than the reference
/// itself.
///
/// ```
/// use savetree::{HasHost, Savable};
///
/// #[derive(Default)]
/// struct Clip {
///     track: String,
/// }
///
/// impl HasHost for Clip {
///     fn set_host(&mut self, host: &dyn Savable) {
///         self.track = host.type_tag().to_owned();
///     }
/// }
/// ```
pub trait HasHost {
    /// Receives the logically-containing object once this value is placed
    /// into its container.
    fn set_host(&mut self, host: &dyn Savable);
}
