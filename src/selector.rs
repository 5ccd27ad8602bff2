use std::collections::HashMap;

use tracing::debug;

use crate::dedupe::AssetDeduper;
use crate::domain::Recording;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeciesGroup {
    pub species: String,
    pub recordings: Vec<Recording>,
}

/// Buckets recordings by species, best quality first, at most `cap` each.
///
/// Groups come back in first-seen order and ties keep their catalog order.
/// A recording is dropped up front only when it has neither a species nor a
/// media URL; one missing just its URL still takes a slot and is filtered
/// out when tasks are built. A repeated id counts once per group.
pub fn select(recordings: Vec<Recording>, cap: usize) -> Vec<SpeciesGroup> {
    let mut groups: Vec<(SpeciesGroup, AssetDeduper)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for recording in recordings {
        if !recording.has_species() && !recording.has_media() {
            continue;
        }
        let species = recording.species.clone().unwrap_or_default();
        let slot = *index.entry(species.clone()).or_insert_with(|| {
            groups.push((
                SpeciesGroup {
                    species,
                    recordings: Vec::new(),
                },
                AssetDeduper::new(),
            ));
            groups.len() - 1
        });
        let (group, seen) = &mut groups[slot];
        if !seen.mark(&recording.id) {
            debug!("dropping repeated recording {} for {}", recording.id, group.species);
            continue;
        }
        group.recordings.push(recording);
    }

    groups
        .into_iter()
        .map(|(mut group, _)| {
            // Vec::sort_by_key is stable.
            group.recordings.sort_by_key(|recording| recording.quality);
            group.recordings.truncate(cap);
            group
        })
        .collect()
}
