//! Capability keys identifying what can be requested from a resolver.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier for "a thing that can be requested".
///
/// A capability is derived from a Rust type, concrete or `dyn Trait`, and
/// may carry a label so that several registrations of the same type can live
/// side by side. The type name is kept for diagnostics only: equality and
/// hashing look at the `TypeId` and the label.
///
/// # Examples
///
/// ```rust
/// use scoped_registry::Capability;
///
/// trait Notifier: Send + Sync {}
///
/// let plain = Capability::of::<String>();
/// let named = Capability::named::<String>("greeting");
/// let as_trait = Capability::of::<dyn Notifier>();
///
/// assert_ne!(plain, named);
/// assert_eq!(named.label(), Some("greeting"));
/// assert!(as_trait.type_name().contains("Notifier"));
/// assert_eq!(plain, Capability::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct Capability {
    id: TypeId,
    type_name: &'static str,
    label: Option<&'static str>,
}

impl Capability {
    /// Capability for the type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            label: None,
        }
    }

    /// Capability for the type `T` under `label`.
    #[inline]
    pub fn named<T: ?Sized + 'static>(label: &'static str) -> Self {
        Self {
            label: Some(label),
            ..Self::of::<T>()
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn label(&self) -> Option<&'static str> {
        self.label
    }

    /// Human readable form used in errors and log events.
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Capability {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.label == other.label
    }
}

impl Eq for Capability {}

impl Hash for Capability {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.label.hash(state);
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("type_name", &self.type_name)
            .field("label", &self.label)
            .finish()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label {
            Some(label) => write!(f, "{}#{}", self.type_name, label),
            None => f.write_str(self.type_name),
        }
    }
}
