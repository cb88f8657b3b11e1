use std::any::{Any, TypeId};

use crate::registry::{GetTypeMeta, ListMeta, TypeMeta, TypeRegistry};
use crate::savable::{FromLoaded, Savable};

// -----------------------------------------------------------------------------
// Box<dyn Savable>

// A boxed value reports its inner type, not the box. This is what lets a
// `Vec<Box<dyn Savable>>` element resolve to the registration of the
// value it carries.

impl Savable for Box<dyn Savable> {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        (**self).as_any_mut()
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        (*self).into_any()
    }

    #[inline]
    fn type_tag(&self) -> &'static str {
        (**self).type_tag()
    }

    #[inline]
    fn ty_id(&self) -> TypeId {
        (**self).ty_id()
    }
}

impl FromLoaded for Box<dyn Savable> {
    /// An open slot, any loaded value fits as is.
    #[inline]
    fn load_guess() -> Option<TypeId> {
        None
    }

    fn register_dependency(_registry: &mut TypeRegistry) {}

    #[inline]
    fn from_loaded(value: Box<dyn Savable>) -> Result<Self, Box<dyn Savable>> {
        Ok(value)
    }
}

// -----------------------------------------------------------------------------
// Vec

impl<T: FromLoaded> Savable for Vec<T> {
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

impl<T: FromLoaded> FromLoaded for Vec<T> {
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

impl<T: FromLoaded> GetTypeMeta for Vec<T> {
    fn get_type_meta() -> TypeMeta {
        TypeMeta::of::<Self>(std::any::type_name::<Self>()).with_list(ListMeta::vec::<T>())
    }

    fn register_dependencies(registry: &mut TypeRegistry) {
        T::register_dependency(registry);
    }
}

impl ListMeta {
    /// Create the container table for `Vec<T>`.
    ///
    /// With `T = Box<dyn Savable>` the element type is left open: every
    /// element resolves through the registry on its own, and the pushed
    /// boxes are moved in as is.
    pub fn vec<T: FromLoaded>() -> Self {
        Self {
            new_empty: || Box::new(Vec::<T>::new()),
            push: |container, element| {
                let Some(items) = container.downcast_mut::<Vec<T>>() else {
                    return Err(element);
                };
                match T::from_loaded(element) {
                    Ok(element) => {
                        items.push(element);
                        Ok(())
                    }
                    Err(element) => Err(element),
                }
            },
            last_mut: |container| match container.downcast_mut::<Vec<T>>() {
                Some(items) => items.last_mut().map(|item| item as &mut dyn Savable),
                None => None,
            },
            iter: |container| match container.downcast_ref::<Vec<T>>() {
                Some(items) => Box::new(items.iter().map(|item| item as &dyn Savable)),
                None => panic!(
                    "container walk type mismatched, walk for `{}` got value of type `{}`",
                    std::any::type_name::<Vec<T>>(),
                    container.type_tag(),
                ),
            },
            element_guess: T::load_guess(),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
