//! Runtime payload type tags and the type-erased payload container.
//!
//! Producers and consumers never share a base type. Every published value is
//! wrapped in a [`Payload`] carrying a [`PayloadType`] derived from the value's
//! static type, and every callback is registered with the tag of the type it
//! accepts. Dispatch compares the two tags exactly: there is no subtyping,
//! so a callback for `u32` never sees an `i32`.

use std::any::{Any, TypeId};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime identifier of a payload's static type
#[derive(Debug, Clone, Copy)]
pub struct PayloadType {
    id: TypeId,
    name: &'static str,
}

impl PayloadType {
    /// Tag for the type `T`
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully-qualified type name, for diagnostics only
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths stripped (`Vec<alloc::string::String>` becomes `Vec<String>`)
    pub fn short_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut path = String::new();
        for ch in self.name.chars() {
            if ch.is_alphanumeric() || ch == '_' || ch == ':' {
                path.push(ch);
            } else {
                out.push_str(last_segment(&path));
                path.clear();
                out.push(ch);
            }
        }
        out.push_str(last_segment(&path));
        out
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

// Type names are not guaranteed unique, so identity is the TypeId alone.
impl PartialEq for PayloadType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PayloadType {}

impl Hash for PayloadType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A published value together with its type tag
///
/// Cloning is cheap: the value itself is shared behind an `Arc`.
#[derive(Clone)]
pub struct Payload {
    ty: PayloadType,
    value: Arc<dyn Any + Send + Sync>,
}

impl Payload {
    /// Wrap a value, tagging it with its static type
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            ty: PayloadType::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// The tag assigned at construction
    pub fn payload_type(&self) -> PayloadType {
        self.ty
    }

    /// Check whether the payload holds exactly a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.ty == PayloadType::of::<T>()
    }

    /// Borrow the value as `T` if the tags match exactly
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("type", &self.ty.name)
            .finish_non_exhaustive()
    }
}
