use super::Dispatcher;
use crate::error::Result;
use indexmap::IndexMap;
use log::debug;

/// Tags dispatchers that share a host with a zero-based overlap index, in the
/// order they appear, so that the port finders can shift their candidate
/// ports apart. Dispatchers alone on their host are left untouched.
///
/// Returns the number of shared hosts found.
pub fn detect_ip_collisions(dispatchers: &mut IndexMap<String, Dispatcher>) -> Result<usize> {
    let mut by_host: IndexMap<String, Vec<String>> = IndexMap::new();
    for (id, dispatcher) in dispatchers.iter() {
        by_host
            .entry(dispatcher.host()?)
            .or_default()
            .push(id.clone());
    }

    let mut shared = 0;
    for (host, ids) in by_host.iter().filter(|(_, ids)| ids.len() > 1) {
        debug!("Dispatchers {:?} share host {}", ids, host);
        shared += 1;
        for (index, id) in ids.iter().enumerate() {
            if let Some(dispatcher) = dispatchers.get_mut(id) {
                dispatcher.set_port_overlap_index(index);
            }
        }
    }

    Ok(shared)
}
