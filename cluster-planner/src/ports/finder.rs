use super::probe::PortProbe;
use crate::dispatcher::{Dispatcher, Port};
use crate::error::{PlannerError, Result};
use log::{debug, warn};
use rand::Rng;

/// Lowest port handed out by the fallback search.
pub const MIN_PORT: Port = 1024;

/// Shift applied per overlap index to candidate ports of co-located
/// dispatchers.
pub const OVERLAP_STRIDE: u32 = 20;

/// Number of ports the fallback search can visit before giving up.
const FALLBACK_RANGE: usize = (Port::MAX as usize) - (MIN_PORT as usize) + 1;

/// Hands out ports for one role list on one dispatcher.
///
/// Configured candidates are tried first, in order. After that the finder
/// starts at a random port and walks upwards, wrapping from 65535 back to
/// 1024. Every returned port is claimed in the dispatcher's avoid set, so no
/// two finders of the same run return the same port for a dispatcher.
#[derive(Debug, Clone)]
pub struct PortFinder {
    dispatcher: String,
    candidates: Vec<Port>,
    next_candidate: usize,
    overlap_offset: u32,
    last: Option<Port>,
}

impl PortFinder {
    pub fn new(candidates: &[Port], dispatcher: &Dispatcher) -> Result<Self> {
        dispatcher.validate()?;
        let overlap_offset = dispatcher
            .port_overlap_index()
            .map(|index| index as u32 * OVERLAP_STRIDE)
            .unwrap_or(0);

        Ok(Self {
            dispatcher: dispatcher.id.clone(),
            candidates: candidates.to_vec(),
            next_candidate: 0,
            overlap_offset,
            last: None,
        })
    }

    pub fn dispatcher(&self) -> &str {
        &self.dispatcher
    }

    /// Candidates not yet consumed.
    pub fn remaining_candidates(&self) -> &[Port] {
        &self.candidates[self.next_candidate.min(self.candidates.len())..]
    }

    /// Returns the next port that is neither claimed in this run nor reported
    /// busy by `probe`, and claims it.
    pub fn next<P, R>(&mut self, dispatcher: &mut Dispatcher, probe: &P, rng: &mut R) -> Result<Port>
    where
        P: PortProbe + ?Sized,
        R: Rng + ?Sized,
    {
        if dispatcher.id != self.dispatcher {
            return Err(PlannerError::Internal(format!(
                "port finder for '{}' used with dispatcher '{}'",
                self.dispatcher, dispatcher.id
            )));
        }

        let mut fallback_rejections = 0;
        loop {
            let port = match self.take_candidate() {
                Some(port) => port,
                None => {
                    if fallback_rejections >= FALLBACK_RANGE {
                        return Err(PlannerError::PortsExhausted {
                            dispatcher: self.dispatcher.clone(),
                        });
                    }
                    fallback_rejections += 1;
                    self.step(rng)
                }
            };
            self.last = Some(port);

            if dispatcher.is_avoided(port) {
                continue;
            }
            if !probe.is_port_free(dispatcher, port)? {
                debug!("Port {} busy on '{}', trying next", port, self.dispatcher);
                continue;
            }

            dispatcher.claim(port);
            return Ok(port);
        }
    }

    fn take_candidate(&mut self) -> Option<Port> {
        while let Some(&candidate) = self.candidates.get(self.next_candidate) {
            self.next_candidate += 1;
            match Port::try_from(candidate as u32 + self.overlap_offset) {
                Ok(port) => return Some(port),
                Err(_) => warn!(
                    "Candidate port {} + {} out of range on '{}', skipping",
                    candidate, self.overlap_offset, self.dispatcher
                ),
            }
        }
        None
    }

    fn step<R: Rng + ?Sized>(&self, rng: &mut R) -> Port {
        match self.last {
            None => rng.gen_range(MIN_PORT..=Port::MAX),
            Some(port) if port == Port::MAX => MIN_PORT,
            Some(port) => port + 1,
        }
    }
}
