use super::models::{AssignedPorts, Assignment, Allocation, Role};
use crate::dispatcher::{Dispatcher, Port};
use crate::error::{PlannerError, Result};
use crate::ports::{PortFinder, PortProbe};
use indexmap::IndexMap;
use log::{debug, warn};
use rand::Rng;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Places instances of a role on dispatchers in round-robin order.
///
/// Each role pass starts at the first dispatcher. Dispatchers that do not
/// accept the role are skipped. Port finders live for one pass and are
/// created the first time a dispatcher is used.
pub struct RoleAllocator<'a, P: ?Sized, R: ?Sized> {
    dispatchers: &'a mut IndexMap<String, Dispatcher>,
    probe: &'a P,
    rng: &'a mut R,
}

impl<'a, P, R> RoleAllocator<'a, P, R>
where
    P: PortProbe + ?Sized,
    R: Rng + ?Sized,
{
    pub fn new(dispatchers: &'a mut IndexMap<String, Dispatcher>, probe: &'a P, rng: &'a mut R) -> Self {
        Self {
            dispatchers,
            probe,
            rng,
        }
    }

    /// Places up to `count` instances of `role`.
    ///
    /// `port_lists` holds one candidate list per port the role needs (agents:
    /// external then internal). Instance `i` is named `ids[i]`; missing names
    /// are generated and appended to `ids`.
    ///
    /// Stops early, returning an incomplete allocation, when a full rotation
    /// finds no dispatcher that accepts the role.
    pub fn allocate(
        &mut self,
        role: Role,
        count: usize,
        port_lists: &[&[Port]],
        ids: &mut Vec<String>,
    ) -> Result<Allocation> {
        if port_lists.len() != role.ports_per_instance() {
            return Err(PlannerError::Internal(format!(
                "{} needs {} port lists, got {}",
                role,
                role.ports_per_instance(),
                port_lists.len()
            )));
        }

        let order: Vec<String> = self.dispatchers.keys().cloned().collect();
        let mut allocation = Allocation::new(role, count);
        let mut finders: HashMap<(usize, usize), PortFinder> = HashMap::new();
        let mut cursor = 0;

        for index in 0..count {
            let Some(slot) = self.next_eligible(&order, &mut cursor, role) else {
                warn!(
                    "No dispatcher accepts a {}; placed {} of {}",
                    role,
                    allocation.len(),
                    count
                );
                break;
            };

            let dispatcher_id = &order[slot];
            let dispatcher = self.dispatchers.get_mut(dispatcher_id).ok_or_else(|| {
                PlannerError::Internal(format!("dispatcher '{}' vanished", dispatcher_id))
            })?;

            let mut ports = Vec::with_capacity(port_lists.len());
            for (list_index, candidates) in port_lists.iter().enumerate() {
                let finder = match finders.entry((slot, list_index)) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert(PortFinder::new(candidates, dispatcher)?),
                };
                ports.push(finder.next(dispatcher, self.probe, self.rng)?);
            }

            while ids.len() <= index {
                ids.push(role.synthesize_id(ids.len()));
            }
            let id = ids[index].clone();

            let assigned = match (role, ports.as_slice()) {
                (Role::Agent, [ext_port, int_port]) => AssignedPorts::Agent {
                    ext_port: *ext_port,
                    int_port: *int_port,
                },
                (_, [port]) => AssignedPorts::Server { port: *port },
                _ => {
                    return Err(PlannerError::Internal(format!(
                        "{} got {} ports",
                        role,
                        ports.len()
                    )))
                }
            };

            debug!("{} '{}' -> {} {:?}", role, id, dispatcher_id, ports);
            allocation.push(Assignment::new(role, id, dispatcher_id.clone(), assigned));
        }

        Ok(allocation)
    }

    /// Advances `cursor` past at most one full rotation and returns the slot
    /// of the first dispatcher accepting `role`.
    fn next_eligible(&self, order: &[String], cursor: &mut usize, role: Role) -> Option<usize> {
        for _ in 0..order.len() {
            let slot = *cursor;
            *cursor = (*cursor + 1) % order.len();
            if self
                .dispatchers
                .get(&order[slot])
                .is_some_and(|d| d.allows(role))
            {
                return Some(slot);
            }
        }
        None
    }
}
