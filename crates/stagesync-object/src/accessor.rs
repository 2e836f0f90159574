//! Accessor utilities: bean-style naming helpers, map-key normalization, and
//! the typed-to-erased accessor constructors the capability table is built
//! from.
//!
//! Field metadata exported from the source environment uses bean-style
//! accessor names (`getCode`/`setCode`), so the naming helpers here preserve
//! those conventions. The constructors wrap strongly typed closures over one
//! concrete type into closures over `dyn SyncObject`; every downcast or value
//! conversion failure is wrapped as [`ObjectError::Accessor`] naming the type
//! and field, never swallowed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ObjectError, ObjectResult};
use crate::ids::{FieldId, Guid, TypeKey};
use crate::object::{downcast_boxed, downcast_mut, downcast_ref, SyncObject};

/// Erased getter for a basic attribute.
pub type BasicGet = Arc<dyn Fn(&dyn SyncObject) -> ObjectResult<Value> + Send + Sync>;
/// Erased setter for a basic attribute.
pub type BasicSet = Arc<dyn Fn(&mut dyn SyncObject, Value) -> ObjectResult<()> + Send + Sync>;
/// Erased borrow of a single-valued association.
pub type SingleGet =
    Arc<dyn for<'a> Fn(&'a dyn SyncObject) -> ObjectResult<Option<&'a dyn SyncObject>> + Send + Sync>;
/// Erased mutable borrow of a single-valued association.
pub type SingleGetMut = Arc<
    dyn for<'a> Fn(&'a mut dyn SyncObject) -> ObjectResult<Option<&'a mut dyn SyncObject>>
        + Send
        + Sync,
>;
/// Erased assignment of a single-valued association.
pub type SingleSet =
    Arc<dyn Fn(&mut dyn SyncObject, Option<Box<dyn SyncObject>>) -> ObjectResult<()> + Send + Sync>;
/// Erased borrow of a collection's elements, in collection order.
pub type ElementsGet =
    Arc<dyn for<'a> Fn(&'a dyn SyncObject) -> ObjectResult<Vec<&'a dyn SyncObject>> + Send + Sync>;
/// Erased mutable borrow of a collection's elements, in collection order.
pub type ElementsGetMut = Arc<
    dyn for<'a> Fn(&'a mut dyn SyncObject) -> ObjectResult<Vec<&'a mut dyn SyncObject>> + Send + Sync,
>;
/// Erased append of an element to a collection.
pub type ElementInsert =
    Arc<dyn Fn(&mut dyn SyncObject, Box<dyn SyncObject>) -> ObjectResult<()> + Send + Sync>;
/// Erased in-order retain over a collection's elements.
pub type ElementRetain = Arc<
    dyn Fn(&mut dyn SyncObject, &dyn Fn(&dyn SyncObject) -> bool) -> ObjectResult<()> + Send + Sync,
>;
/// Erased map-key extractor for a collection element.
pub type MapKeyGet = Arc<dyn Fn(&dyn SyncObject) -> ObjectResult<Value> + Send + Sync>;
/// Erased post-load lifecycle hook.
pub type PostLoad = Arc<dyn Fn(&mut dyn SyncObject) -> ObjectResult<()> + Send + Sync>;
/// Factory producing a blank instance of a type.
pub type Creator = Arc<dyn Fn() -> Box<dyn SyncObject> + Send + Sync>;
/// Erased guid extractor.
pub type GuidGet = Arc<dyn Fn(&dyn SyncObject) -> ObjectResult<Guid> + Send + Sync>;

/// Derive the conventional setter name from a getter name.
///
/// `getX` maps to `setX` and `isX` to `setX`. A name matching neither
/// convention is returned unchanged, signalling that no setter exists by
/// convention.
#[must_use]
pub fn setter_name(getter: &str) -> String {
    if let Some(rest) = getter.strip_prefix("get") {
        if !rest.is_empty() {
            return format!("set{rest}");
        }
    }
    if let Some(rest) = getter.strip_prefix("is") {
        if !rest.is_empty() {
            return format!("set{rest}");
        }
    }
    getter.to_string()
}

/// Derive the logical property name from a bean-style getter name.
///
/// `getDisplayName` maps to `displayName`, `isEnabled` to `enabled`. A name
/// matching neither convention is returned unchanged.
#[must_use]
pub fn property_name(getter: &str) -> String {
    let rest = getter
        .strip_prefix("get")
        .or_else(|| getter.strip_prefix("is"))
        .filter(|rest| !rest.is_empty());
    match rest {
        Some(rest) => {
            let mut chars = rest.chars();
            match chars.next() {
                Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
                None => rest.to_string(),
            }
        }
        None => getter.to_string(),
    }
}

/// Collapse widened numeric forms of a map key to a canonical representation
/// so that keys such as `1.0` and `1` compare equal. Non-numeric values pass
/// through unchanged.
#[must_use]
pub fn normalize_key(value: Value) -> Value {
    match value {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                return Value::from(int);
            }
            if let Some(float) = number.as_f64() {
                if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
                    return Value::from(float as i64);
                }
            }
            Value::Number(number)
        }
        other => other,
    }
}

/// Build the erased getter/setter pair for a basic attribute.
///
/// The attribute value crosses the erasure boundary as `serde_json::Value`.
pub fn basic_access<T, V>(
    type_key: &TypeKey,
    field: &FieldId,
    get: impl Fn(&T) -> V + Send + Sync + 'static,
    set: impl Fn(&mut T, V) + Send + Sync + 'static,
) -> (BasicGet, BasicSet)
where
    T: SyncObject,
    V: Serialize + DeserializeOwned,
{
    let (tk, f) = (type_key.clone(), field.clone());
    let getter: BasicGet = Arc::new(move |object| {
        let concrete = downcast_ref::<T>(object, &tk, &f)?;
        serde_json::to_value(get(concrete))
            .map_err(|err| ObjectError::accessor(tk.clone(), f.clone(), err.to_string()))
    });

    let (tk, f) = (type_key.clone(), field.clone());
    let setter: BasicSet = Arc::new(move |object, value| {
        let concrete = downcast_mut::<T>(object, &tk, &f)?;
        let typed: V = serde_json::from_value(value)
            .map_err(|err| ObjectError::accessor(tk.clone(), f.clone(), err.to_string()))?;
        set(concrete, typed);
        Ok(())
    });

    (getter, setter)
}

/// Build the erased accessor triple for a single-valued association.
pub fn single_access<T, C>(
    type_key: &TypeKey,
    field: &FieldId,
    get: impl for<'a> Fn(&'a T) -> Option<&'a C> + Send + Sync + 'static,
    get_mut: impl for<'a> Fn(&'a mut T) -> Option<&'a mut C> + Send + Sync + 'static,
    set: impl Fn(&mut T, Option<C>) + Send + Sync + 'static,
) -> (SingleGet, SingleGetMut, SingleSet)
where
    T: SyncObject,
    C: SyncObject,
{
    let (tk, f) = (type_key.clone(), field.clone());
    let getter: SingleGet = Arc::new(move |object| {
        let concrete = downcast_ref::<T>(object, &tk, &f)?;
        Ok(get(concrete).map(|child| child as &dyn SyncObject))
    });

    let (tk, f) = (type_key.clone(), field.clone());
    let getter_mut: SingleGetMut = Arc::new(move |object| {
        let concrete = downcast_mut::<T>(object, &tk, &f)?;
        Ok(get_mut(concrete).map(|child| child as &mut dyn SyncObject))
    });

    let (tk, f) = (type_key.clone(), field.clone());
    let setter: SingleSet = Arc::new(move |object, value| {
        let typed = match value {
            Some(boxed) => Some(downcast_boxed::<C>(boxed, &tk, &f)?),
            None => None,
        };
        let concrete = downcast_mut::<T>(object, &tk, &f)?;
        set(concrete, typed);
        Ok(())
    });

    (getter, getter_mut, setter)
}

/// Erased access to a `Vec`-backed collection association.
#[derive(Clone)]
pub struct CollectionAccess {
    /// Borrow elements in collection order.
    pub elements: ElementsGet,
    /// Mutably borrow elements in collection order.
    pub elements_mut: ElementsGetMut,
    /// Append an element.
    pub insert: ElementInsert,
    /// Retain elements, visiting them in collection order.
    pub retain: ElementRetain,
}

/// Build erased access for a `Vec`-backed collection association.
pub fn collection_access<T, C>(
    type_key: &TypeKey,
    field: &FieldId,
    get: impl for<'a> Fn(&'a T) -> &'a Vec<C> + Send + Sync + 'static,
    get_mut: impl for<'a> Fn(&'a mut T) -> &'a mut Vec<C> + Send + Sync + Clone + 'static,
) -> CollectionAccess
where
    T: SyncObject,
    C: SyncObject,
{
    let (tk, f) = (type_key.clone(), field.clone());
    let elements: ElementsGet = Arc::new(move |object| {
        let concrete = downcast_ref::<T>(object, &tk, &f)?;
        Ok(get(concrete)
            .iter()
            .map(|element| element as &dyn SyncObject)
            .collect())
    });

    let (tk, f) = (type_key.clone(), field.clone());
    let inner = get_mut.clone();
    let elements_mut: ElementsGetMut = Arc::new(move |object| {
        let concrete = downcast_mut::<T>(object, &tk, &f)?;
        Ok(inner(concrete)
            .iter_mut()
            .map(|element| element as &mut dyn SyncObject)
            .collect())
    });

    let (tk, f) = (type_key.clone(), field.clone());
    let inner = get_mut.clone();
    let insert: ElementInsert = Arc::new(move |object, element| {
        let typed = downcast_boxed::<C>(element, &tk, &f)?;
        let concrete = downcast_mut::<T>(object, &tk, &f)?;
        inner(concrete).push(typed);
        Ok(())
    });

    let (tk, f) = (type_key.clone(), field.clone());
    let retain: ElementRetain = Arc::new(move |object, keep| {
        let concrete = downcast_mut::<T>(object, &tk, &f)?;
        get_mut(concrete).retain(|element| keep(element as &dyn SyncObject));
        Ok(())
    });

    CollectionAccess {
        elements,
        elements_mut,
        insert,
        retain,
    }
}

/// Build an erased map-key extractor for collection elements of type `C`.
pub fn map_key_access<C, V>(
    type_key: &TypeKey,
    field: &FieldId,
    get: impl Fn(&C) -> V + Send + Sync + 'static,
) -> MapKeyGet
where
    C: SyncObject,
    V: Serialize,
{
    let (tk, f) = (type_key.clone(), field.clone());
    Arc::new(move |element| {
        let concrete = downcast_ref::<C>(element, &tk, &f)?;
        serde_json::to_value(get(concrete))
            .map_err(|err| ObjectError::accessor(tk.clone(), f.clone(), err.to_string()))
    })
}

/// Build an erased post-load hook for type `T`.
pub fn post_load<T>(
    type_key: &TypeKey,
    name: &str,
    hook: impl Fn(&mut T) + Send + Sync + 'static,
) -> PostLoad
where
    T: SyncObject,
{
    let (tk, f) = (type_key.clone(), FieldId::new(name));
    Arc::new(move |object| {
        let concrete = downcast_mut::<T>(object, &tk, &f)?;
        hook(concrete);
        Ok(())
    })
}

/// Build an erased guid extractor for type `T`.
pub fn guid_access<T>(
    type_key: &TypeKey,
    get: impl Fn(&T) -> Guid + Send + Sync + 'static,
) -> GuidGet
where
    T: SyncObject,
{
    let tk = type_key.clone();
    let f = FieldId::new("guid");
    Arc::new(move |object| {
        let concrete = downcast_ref::<T>(object, &tk, &f)?;
        Ok(get(concrete))
    })
}

/// Build a creator producing `T::default()` instances.
pub fn default_creator<T>() -> Creator
where
    T: SyncObject + Default,
{
    Arc::new(|| Box::new(T::default()))
}
