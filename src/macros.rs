/// Declare a type savable and describe its saved shape.
///
/// The macro implements [`Savable`](crate::Savable),
/// [`FromLoaded`](crate::FromLoaded) and [`GetTypeMeta`](crate::GetTypeMeta)
/// for a concrete (non-generic) type, and submits the type for
/// [`TypeRegistry::auto_register`](crate::TypeRegistry::auto_register)
/// when the `auto_register` feature is enabled. The type tag is the
/// type's module path.
///
/// Clauses, in any order:
///
/// - `default;` construct instances through [`Default`]
/// - `host;` hand loaded container elements their owner through
///   [`HasHost`](crate::HasHost)
/// - `members { name: Type, ... }` the member table; an empty table is
///   allowed and saves as a tagged object with no further keys
/// - `factory = path;` instance creation hook, tried before `default`
/// - `custom_saver = path;` replaces the member walk when saving
/// - `custom_loader = path;` replaces the member walk when loading
/// - `done_loading = path;` runs after the instance is populated
///
/// The hook paths must point to functions with these shapes, where `T`
/// is the declared type:
///
/// - factory: `fn(Option<&dyn Savable>, &str) -> Option<Box<dyn Savable>>`
/// - custom_saver: `fn(&T, &Saver) -> Result<Value, SaveError>`
/// - custom_loader: `fn(&mut T, &ObjectNode, &Loader) -> Result<(), LoadError>`
/// - done_loading: `fn(&mut T)`
///
/// # Example
///
/// ```
/// use savetree::{GetTypeMeta, savable};
///
/// #[derive(Default)]
/// struct Clip {
///     start: f64,
///     len: f64,
/// }
///
/// savable! {
///     Clip {
///         default;
///         members { start: f64, len: f64 }
///     }
/// }
///
/// #[derive(Default)]
/// struct Track {
///     name: String,
///     clips: Vec<Clip>,
/// }
///
/// fn on_loaded(track: &mut Track) {
///     track.name = track.name.trim().to_string();
/// }
///
/// savable! {
///     Track {
///         default;
///         members { name: String, clips: Vec<Clip> }
///         done_loading = on_loaded;
///     }
/// }
///
/// let meta = Track::get_type_meta();
/// assert!(meta.construct().is_some());
/// assert!(meta.done_loading().is_some());
/// assert_eq!(meta.members().map(<[_]>::len), Some(2));
/// ```
#[macro_export]
macro_rules! savable {
    ($ty:ident { $($clauses:tt)* }) => {
        impl $crate::Savable for $ty {
            #[inline]
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            #[inline]
            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            #[inline]
            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }

            #[inline]
            fn type_tag(&self) -> &'static str {
                ::std::concat!(::std::module_path!(), "::", ::std::stringify!($ty))
            }
        }

        impl $crate::FromLoaded for $ty {
            #[inline]
            fn load_guess() -> ::std::option::Option<::std::any::TypeId> {
                ::std::option::Option::Some(::std::any::TypeId::of::<$ty>())
            }

            fn register_dependency(registry: &mut $crate::TypeRegistry) {
                registry.register::<$ty>();
            }

            #[inline]
            fn from_loaded(
                value: ::std::boxed::Box<dyn $crate::Savable>,
            ) -> ::std::result::Result<Self, ::std::boxed::Box<dyn $crate::Savable>> {
                value.take::<$ty>()
            }
        }

        impl $crate::GetTypeMeta for $ty {
            fn get_type_meta() -> $crate::TypeMeta {
                let meta = $crate::TypeMeta::of::<$ty>(
                    ::std::concat!(::std::module_path!(), "::", ::std::stringify!($ty)),
                );
                $crate::savable!(@apply $ty, meta, $($clauses)*)
            }

            fn register_dependencies(registry: &mut $crate::TypeRegistry) {
                // Declarations without member types expand to nothing.
                let _ = &registry;
                $crate::savable!(@deps registry, $($clauses)*);
            }
        }

        $crate::submit_registration!($ty);
    };

    // ------------------------------------------------------------------
    // Clause walk: build up the TypeMeta.

    (@apply $ty:ident, $meta:expr, ) => { $meta };
    (@apply $ty:ident, $meta:expr, default; $($rest:tt)*) => {
        $crate::savable!(@apply $ty, $meta.with_default::<$ty>(), $($rest)*)
    };
    (@apply $ty:ident, $meta:expr, host; $($rest:tt)*) => {
        $crate::savable!(@apply $ty, $meta.with_host::<$ty>(), $($rest)*)
    };
    (@apply $ty:ident, $meta:expr, factory = $hook:path; $($rest:tt)*) => {
        $crate::savable!(@apply $ty, $meta.with_factory($hook), $($rest)*)
    };
    (@apply $ty:ident, $meta:expr, custom_saver = $hook:path; $($rest:tt)*) => {
        $crate::savable!(@apply $ty, $meta.with_custom_saver(|value, saver| {
            match value.downcast_ref::<$ty>() {
                ::std::option::Option::Some(value) => $hook(value, saver),
                ::std::option::Option::None => {
                    ::std::result::Result::Err($crate::SaveError::Custom {
                        tag: ::std::borrow::Cow::Borrowed(
                            ::std::concat!(::std::module_path!(), "::", ::std::stringify!($ty)),
                        ),
                        message: ::std::string::String::from(
                            "custom saver received a value of another type",
                        ),
                    })
                }
            }
        }), $($rest)*)
    };
    (@apply $ty:ident, $meta:expr, custom_loader = $hook:path; $($rest:tt)*) => {
        $crate::savable!(@apply $ty, $meta.with_custom_loader(|value, node, loader| {
            match value.downcast_mut::<$ty>() {
                ::std::option::Option::Some(value) => $hook(value, node, loader),
                ::std::option::Option::None => {
                    ::std::result::Result::Err($crate::LoadError::Custom {
                        tag: ::std::borrow::Cow::Borrowed(
                            ::std::concat!(::std::module_path!(), "::", ::std::stringify!($ty)),
                        ),
                        message: ::std::string::String::from(
                            "custom loader received a value of another type",
                        ),
                    })
                }
            }
        }), $($rest)*)
    };
    (@apply $ty:ident, $meta:expr, done_loading = $hook:path; $($rest:tt)*) => {
        $crate::savable!(@apply $ty, $meta.with_done_loading(|value| {
            if let ::std::option::Option::Some(value) = value.downcast_mut::<$ty>() {
                $hook(value);
            }
        }), $($rest)*)
    };
    (@apply $ty:ident, $meta:expr, members { $($member:ident : $mty:ty),* $(,)? } $(;)? $($rest:tt)*) => {
        $crate::savable!(@apply $ty, $meta.with_members(::std::vec![
            $(
                $crate::MemberDef {
                    name: ::std::stringify!($member),
                    get: |owner| match owner.downcast_ref::<$ty>() {
                        ::std::option::Option::Some(owner) => {
                            &owner.$member as &dyn $crate::Savable
                        }
                        ::std::option::Option::None => ::std::panic!(
                            "member access type mismatched, `{}` of `{}` got value of type `{}`",
                            ::std::stringify!($member),
                            ::std::stringify!($ty),
                            owner.type_tag(),
                        ),
                    },
                    set: |owner, value| {
                        let ::std::option::Option::Some(owner) = owner.downcast_mut::<$ty>()
                        else {
                            return ::std::result::Result::Err(value);
                        };
                        match <$mty as $crate::FromLoaded>::from_loaded(value) {
                            ::std::result::Result::Ok(value) => {
                                owner.$member = value;
                                ::std::result::Result::Ok(())
                            }
                            ::std::result::Result::Err(value) => {
                                ::std::result::Result::Err(value)
                            }
                        }
                    },
                    guess: <$mty as $crate::FromLoaded>::load_guess(),
                }
            ),*
        ]), $($rest)*)
    };

    // ------------------------------------------------------------------
    // Clause walk: register the member types.

    (@deps $registry:ident, ) => {};
    (@deps $registry:ident, default; $($rest:tt)*) => {
        $crate::savable!(@deps $registry, $($rest)*)
    };
    (@deps $registry:ident, host; $($rest:tt)*) => {
        $crate::savable!(@deps $registry, $($rest)*)
    };
    (@deps $registry:ident, factory = $hook:path; $($rest:tt)*) => {
        $crate::savable!(@deps $registry, $($rest)*)
    };
    (@deps $registry:ident, custom_saver = $hook:path; $($rest:tt)*) => {
        $crate::savable!(@deps $registry, $($rest)*)
    };
    (@deps $registry:ident, custom_loader = $hook:path; $($rest:tt)*) => {
        $crate::savable!(@deps $registry, $($rest)*)
    };
    (@deps $registry:ident, done_loading = $hook:path; $($rest:tt)*) => {
        $crate::savable!(@deps $registry, $($rest)*)
    };
    (@deps $registry:ident, members { $($member:ident : $mty:ty),* $(,)? } $(;)? $($rest:tt)*) => {
        $(
            <$mty as $crate::FromLoaded>::register_dependency($registry);
        )*
        $crate::savable!(@deps $registry, $($rest)*)
    };
}

/// Submit a declared type to the distributed registration list.
///
/// Expanded by [`savable!`](crate::savable!), not meant to be called
/// directly. With the `auto_register` feature disabled this expands to
/// nothing.
#[cfg(feature = "auto_register")]
#[doc(hidden)]
#[macro_export]
macro_rules! submit_registration {
    ($ty:ident) => {
        $crate::inventory::submit! {
            $crate::AutoRegistration {
                register: |registry| registry.register::<$ty>(),
            }
        }
    };
}

#[cfg(not(feature = "auto_register"))]
#[doc(hidden)]
#[macro_export]
macro_rules! submit_registration {
    ($ty:ident) => {};
}

// -----------------------------------------------------------------------------
// Tests
