use rand::{seq::SliceRandom, Rng};
use rhythm_combat_core::{CombatantId, ContentError, Track, TrackId};
use serde::{Deserialize, Serialize};

/// Track available for encounters, optionally restricted to some opponents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Track to play.
    pub track: Track,
    /// Opponents the track is reserved for. Empty means any opponent.
    #[serde(default)]
    pub opponents: Vec<CombatantId>,
}

/// Collection of tracks an encounter may be played to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackCatalog {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

impl TrackCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a track reserved for `opponents`, or open to all when empty.
    #[must_use]
    pub fn with_track(mut self, track: Track, opponents: Vec<CombatantId>) -> Self {
        self.entries.push(CatalogEntry { track, opponents });
        self
    }

    /// Number of tracks in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the catalog has no tracks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a track by identifier.
    pub fn get(&self, id: &TrackId) -> Result<&Track, ContentError> {
        self.entries
            .iter()
            .map(|entry| &entry.track)
            .find(|track| track.id() == id)
            .ok_or_else(|| ContentError::UnknownTrack { track: id.clone() })
    }

    /// Picks a track for an encounter against `opponent`.
    ///
    /// Tracks reserved for the opponent are preferred. When none are, any
    /// track in the catalog may be chosen.
    pub fn select<R: Rng + ?Sized>(
        &self,
        opponent: CombatantId,
        rng: &mut R,
    ) -> Result<&Track, ContentError> {
        let reserved: Vec<&Track> = self
            .entries
            .iter()
            .filter(|entry| entry.opponents.contains(&opponent))
            .map(|entry| &entry.track)
            .collect();
        let candidates = if reserved.is_empty() {
            self.entries.iter().map(|entry| &entry.track).collect()
        } else {
            reserved
        };

        candidates
            .choose(rng)
            .copied()
            .ok_or(ContentError::EmptyCatalog)
    }
}

#[cfg(test)]
mod tests {
    use super::TrackCatalog;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rhythm_combat_core::{CombatantId, ContentError, Track, TrackId};

    fn track(name: &str) -> Track {
        Track::new(TrackId::new(name), 120.0, 30.0)
    }

    #[test]
    fn empty_catalog_reports_no_content() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let catalog = TrackCatalog::new();
        assert_eq!(
            catalog.select(CombatantId::new(1), &mut rng),
            Err(ContentError::EmptyCatalog)
        );
    }

    #[test]
    fn reserved_tracks_win_over_open_ones() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let catalog = TrackCatalog::new()
            .with_track(track("open"), Vec::new())
            .with_track(track("boss-theme"), vec![CombatantId::new(9)]);
        for _ in 0..16 {
            let selected = catalog.select(CombatantId::new(9), &mut rng).map(Track::id);
            assert_eq!(selected, Ok(&TrackId::new("boss-theme")));
        }
    }

    #[test]
    fn unreserved_opponents_may_get_any_track() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let catalog = TrackCatalog::new().with_track(track("boss-theme"), vec![CombatantId::new(9)]);
        let selected = catalog.select(CombatantId::new(2), &mut rng).map(Track::id);
        assert_eq!(selected, Ok(&TrackId::new("boss-theme")));
    }

    #[test]
    fn lookup_by_identifier() {
        let catalog = TrackCatalog::new().with_track(track("a"), Vec::new());
        assert!(catalog.get(&TrackId::new("a")).is_ok());
        assert_eq!(
            catalog.get(&TrackId::new("b")),
            Err(ContentError::UnknownTrack {
                track: TrackId::new("b")
            })
        );
    }
}
