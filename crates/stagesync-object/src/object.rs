//! The erased domain object seam.
//!
//! The merge core never sees concrete domain types; it manipulates
//! `dyn SyncObject` values through accessors registered in the capability
//! table. Concrete types opt in with [`impl_sync_object!`].

use std::any::Any;

use crate::error::{ObjectError, ObjectResult};
use crate::ids::{FieldId, TypeKey};

/// A domain object participating in synchronization.
///
/// Implementations are plain data types. Environments hand out detached
/// copies, so objects must be cloneable behind the trait.
pub trait SyncObject: Any + Send {
    /// The registered type key for this object.
    fn type_key(&self) -> TypeKey;

    /// Upcast to `Any` for accessor downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast to `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Consume the boxed object as `Any`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Detached copy of this object.
    fn boxed_clone(&self) -> Box<dyn SyncObject>;
}

/// Implement [`SyncObject`] for a `Clone` data type with a fixed type key.
#[macro_export]
macro_rules! impl_sync_object {
    ($ty:ty, $key:expr) => {
        impl $crate::SyncObject for $ty {
            fn type_key(&self) -> $crate::TypeKey {
                $crate::TypeKey::new($key)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn ::std::any::Any> {
                self
            }

            fn boxed_clone(&self) -> Box<dyn $crate::SyncObject> {
                Box::new(self.clone())
            }
        }
    };
}

/// Downcast a shared object reference, wrapping failure with context.
pub fn downcast_ref<'a, T: SyncObject>(
    object: &'a dyn SyncObject,
    type_key: &TypeKey,
    field: &FieldId,
) -> ObjectResult<&'a T> {
    object.as_any().downcast_ref::<T>().ok_or_else(|| {
        ObjectError::accessor(
            type_key.clone(),
            field.clone(),
            format!(
                "expected {}, found object of type {}",
                std::any::type_name::<T>(),
                object.type_key()
            ),
        )
    })
}

/// Downcast a mutable object reference, wrapping failure with context.
pub fn downcast_mut<'a, T: SyncObject>(
    object: &'a mut dyn SyncObject,
    type_key: &TypeKey,
    field: &FieldId,
) -> ObjectResult<&'a mut T> {
    let found = object.type_key();
    object.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
        ObjectError::accessor(
            type_key.clone(),
            field.clone(),
            format!(
                "expected {}, found object of type {found}",
                std::any::type_name::<T>()
            ),
        )
    })
}

/// Downcast a boxed object, wrapping failure with context.
pub fn downcast_boxed<T: SyncObject>(
    object: Box<dyn SyncObject>,
    type_key: &TypeKey,
    field: &FieldId,
) -> ObjectResult<T> {
    let found = object.type_key();
    object.into_any().downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        ObjectError::accessor(
            type_key.clone(),
            field.clone(),
            format!(
                "expected {}, found object of type {found}",
                std::any::type_name::<T>()
            ),
        )
    })
}
