//! Build-time checks over declared dependencies.
//!
//! Only what was declared with `depends_on` is inspected; producers that
//! resolve undeclared capabilities are invisible here and are caught at
//! resolution time instead.

use crate::capability::Capability;
use crate::error::{ContainerError, ContainerResult};
use crate::registration::{CapabilityMap, Registration};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

pub(crate) fn validate(
    registrations: &CapabilityMap<Registration>,
    order: &[Capability],
) -> ContainerResult<()> {
    let mut problems = Vec::new();

    for reg in order.iter().filter_map(|c| registrations.get(c)) {
        for dep in &reg.dependencies {
            match registrations.get(dep) {
                None => problems.push(ContainerError::UnresolvedCapability {
                    name: dep.display_name(),
                }),
                Some(target) if !reg.lifetime.may_capture(target.lifetime) => {
                    problems.push(ContainerError::LifetimeMismatch {
                        consumer: reg.capability.display_name(),
                        consumer_lifetime: reg.lifetime,
                        dependency: dep.display_name(),
                        dependency_lifetime: target.lifetime,
                    })
                }
                Some(_) => {}
            }
        }
    }

    let mut marks: CapabilityMap<Mark> = CapabilityMap::default();
    let mut stack = Vec::new();
    for capability in order {
        visit(*capability, registrations, &mut marks, &mut stack, &mut problems);
    }

    match problems.len() {
        0 => Ok(()),
        1 => Err(problems.remove(0)),
        _ => Err(ContainerError::ValidationFailed { problems }),
    }
}

/// Depth-first walk reporting every back edge as a cycle.
fn visit(
    capability: Capability,
    registrations: &CapabilityMap<Registration>,
    marks: &mut CapabilityMap<Mark>,
    stack: &mut Vec<Capability>,
    problems: &mut Vec<ContainerError>,
) {
    match marks.get(&capability) {
        Some(Mark::Done) => return,
        Some(Mark::Visiting) => {
            if let Some(start) = stack.iter().position(|c| *c == capability) {
                let mut path: Vec<String> = stack[start..].iter().map(Capability::display_name).collect();
                path.push(capability.display_name());
                problems.push(ContainerError::CircularDependency { path });
            }
            return;
        }
        None => {}
    }

    let Some(reg) = registrations.get(&capability) else {
        return;
    };

    marks.insert(capability, Mark::Visiting);
    stack.push(capability);
    for dep in &reg.dependencies {
        visit(*dep, registrations, marks, stack, problems);
    }
    stack.pop();
    marks.insert(capability, Mark::Done);
}
