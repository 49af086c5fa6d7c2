//! Resolution chain used for cycle detection.
//!
//! Every construction pushes a frame that lives on the stack of the
//! resolving call and points at its parent. The chain is handed to the
//! producer through its [`ResolverContext`](crate::ResolverContext), so
//! nested resolutions see exactly the capabilities under construction on
//! their own call stack and nothing from other threads.

use crate::capability::Capability;
use crate::error::{ContainerError, ContainerResult};

pub(crate) struct Frame<'a> {
    capability: Capability,
    depth: usize,
    parent: Option<&'a Frame<'a>>,
}

impl<'a> Frame<'a> {
    /// Enters `capability` below `parent`, failing if that closes a cycle or
    /// the chain would grow past `max_depth`.
    pub(crate) fn enter(
        parent: Option<&'a Frame<'a>>,
        capability: Capability,
        max_depth: usize,
    ) -> ContainerResult<Self> {
        if let Some(parent) = parent {
            if parent.chain().any(|c| *c == capability) {
                let mut path = parent.path();
                path.push(capability.display_name());
                return Err(ContainerError::CircularDependency { path });
            }
        }

        let depth = parent.map_or(1, |p| p.depth + 1);
        if depth > max_depth {
            return Err(ContainerError::DepthExceeded { depth: max_depth });
        }

        Ok(Self {
            capability,
            depth,
            parent,
        })
    }

    pub(crate) fn capability(&self) -> &Capability {
        &self.capability
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    /// Capabilities from this frame up to the outermost one.
    fn chain(&self) -> impl Iterator<Item = &Capability> + '_ {
        std::iter::successors(Some(self), |f| f.parent).map(|f| &f.capability)
    }

    /// Names from the outermost frame down to this one.
    fn path(&self) -> Vec<String> {
        let mut names: Vec<String> = self.chain().map(Capability::display_name).collect();
        names.reverse();
        names
    }
}
