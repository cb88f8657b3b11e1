//! Provide the type registry the save and load drivers resolve types through.
//!
//! ## Menu
//!
//! - [`TypeMeta`]: Everything known about one type, a tag plus its hooks and routes.
//! - [`GetTypeMeta`]: A trait provide a function to crate a `TypeMeta` from a type.
//! - [`TypeRegistry`]: A container for storaging and operating `TypeMeta`s.
//! - [`MemberDef`]: One named member slot of a type.
//! - [`ListMeta`]: Container support, element iteration and appending.
//! - [`ScalarMeta`]: `serde` conversion support for leaf types.
//!
//! ## auto_register
//!
//! See [`TypeRegistry::auto_register`] .
//!
//! We use the [`inventory`] crate to implement static registration,
//! not all platforms support it (although major platforms do).
//! The feature can be disabled entirely, in which case every type is
//! registered by an explicit [`TypeRegistry::register`] call.

// -----------------------------------------------------------------------------
// Modules

mod type_meta;
mod type_registry;

// -----------------------------------------------------------------------------
// Exports

pub use type_meta::{GetTypeMeta, ListMeta, MemberDef, ScalarMeta, TypeMeta};
pub use type_meta::{
    ConstructFn, CustomLoaderFn, CustomSaverFn, DoneLoadingFn, FactoryFn, SetHostFn,
};
#[cfg(feature = "auto_register")]
pub use type_registry::AutoRegistration;
pub use type_registry::TypeRegistry;
