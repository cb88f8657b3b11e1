//! Savable support for the primitive scalars and the std containers.
//!
//! ## Implemented Menu
//!
//! - scalars:
//!     - `bool` `char`
//!     - `i8`-`i64` `isize`
//!     - `u8`-`u64` `usize`
//!     - `f32` `f64`
//!     - `String`
//!     - `Option<T>`, converted through `serde` as one opaque leaf
//! - containers:
//!     - `Vec<T>`
//!     - `Vec<Box<dyn Savable>>`, heterogeneous elements resolved
//!       through the registry

// -----------------------------------------------------------------------------
// Modules

mod list;

// -----------------------------------------------------------------------------
// Scalars

use std::any::{Any, TypeId};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::registry::{GetTypeMeta, ScalarMeta, TypeMeta, TypeRegistry};
use crate::savable::{FromLoaded, Savable};

macro_rules! impl_scalar {
    ($ty:ty, $tag:literal) => {
        impl Savable for $ty {
            #[inline]
            fn as_any(&self) -> &dyn Any {
                self
            }

            #[inline]
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }

            #[inline]
            fn into_any(self: Box<Self>) -> Box<dyn Any> {
                self
            }

            #[inline]
            fn type_tag(&self) -> &'static str {
                $tag
            }
        }

        impl FromLoaded for $ty {
            #[inline]
            fn load_guess() -> Option<TypeId> {
                Some(TypeId::of::<$ty>())
            }

            fn register_dependency(registry: &mut TypeRegistry) {
                registry.register::<$ty>();
            }

            #[inline]
            fn from_loaded(value: Box<dyn Savable>) -> Result<Self, Box<dyn Savable>> {
                value.take::<$ty>()
            }
        }

        impl GetTypeMeta for $ty {
            fn get_type_meta() -> TypeMeta {
                TypeMeta::of::<$ty>($tag).with_scalar(ScalarMeta::of::<$ty>())
            }
        }
    };
}

impl_scalar!(bool, "bool");
impl_scalar!(char, "char");
impl_scalar!(u8, "u8");
impl_scalar!(u16, "u16");
impl_scalar!(u32, "u32");
impl_scalar!(u64, "u64");
impl_scalar!(usize, "usize");
impl_scalar!(i8, "i8");
impl_scalar!(i16, "i16");
impl_scalar!(i32, "i32");
impl_scalar!(i64, "i64");
impl_scalar!(isize, "isize");
impl_scalar!(f32, "f32");
impl_scalar!(f64, "f64");
impl_scalar!(String, "String");

// -----------------------------------------------------------------------------
// Option

// An `Option` member is one opaque leaf, not a nested object: it saves as
// its value or as null, and loads back through `serde` in one step.

impl<T: Savable> Savable for Option<T> {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    #[inline]
    fn type_tag(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<T> FromLoaded for Option<T>
where
    T: Savable + Serialize + DeserializeOwned,
{
    #[inline]
    fn load_guess() -> Option<TypeId> {
        Some(TypeId::of::<Self>())
    }

    fn register_dependency(registry: &mut TypeRegistry) {
        registry.register::<Self>();
    }

    #[inline]
    fn from_loaded(value: Box<dyn Savable>) -> Result<Self, Box<dyn Savable>> {
        value.take::<Self>()
    }
}

impl<T> GetTypeMeta for Option<T>
where
    T: Savable + Serialize + DeserializeOwned,
{
    fn get_type_meta() -> TypeMeta {
        TypeMeta::of::<Self>(std::any::type_name::<Self>()).with_scalar(ScalarMeta::of::<Self>())
    }
}

// -----------------------------------------------------------------------------
// Tests
