#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Modules

mod bridge;
mod error;
mod hooks;
mod impls;
mod load;
mod macros;
mod registry;
mod savable;
mod save;
mod tree;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use bridge::{SCRIPT_TAG_PREFIX, ScriptRuntime, script_class, scripted_tag};
pub use error::{LoadError, SaveError};
pub use load::Loader;
pub use registry::{
    ConstructFn, CustomLoaderFn, CustomSaverFn, DoneLoadingFn, FactoryFn, GetTypeMeta, ListMeta,
    MemberDef, ScalarMeta, SetHostFn, TypeMeta, TypeRegistry,
};
pub use savable::{FromLoaded, HasHost, Savable};
pub use save::Saver;
pub use tree::{ObjectNode, TYPE_KEY, Value};

#[cfg(feature = "auto_register")]
pub use registry::AutoRegistration;

// `savable!` expands `inventory::submit!` blocks through this path, so
// downstream crates do not need their own `inventory` dependency.
#[cfg(feature = "auto_register")]
#[doc(hidden)]
pub use inventory;
