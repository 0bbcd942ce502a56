//! Per-start-time symbol widths, used to line up parallel tracks.

use std::collections::BTreeMap;

use super::symbols::{LyricSymbol, MusicSymbol};

/// For each track, the summed width of its symbols at every start time, and
/// the widest of those across all tracks (lyrics included).
#[derive(Debug, Clone, Default)]
pub struct SymbolWidths {
    widths: Vec<BTreeMap<i32, i32>>,
    maxwidths: BTreeMap<i32, i32>,
    starttimes: Vec<i32>,
}

impl SymbolWidths {
    pub fn new(tracks: &[Vec<MusicSymbol>], tracklyrics: Option<&[Vec<LyricSymbol>]>) -> Self {
        let widths: Vec<BTreeMap<i32, i32>> = tracks.iter().map(|t| track_widths(t)).collect();

        let mut maxwidths: BTreeMap<i32, i32> = BTreeMap::new();
        let mut raise = |time: i32, width: i32| {
            let entry = maxwidths.entry(time).or_insert(width);
            *entry = (*entry).max(width);
        };
        for dict in &widths {
            for (&time, &width) in dict {
                raise(time, width);
            }
        }
        for lyric in tracklyrics.into_iter().flatten().flatten() {
            raise(lyric.start_time, lyric.min_width());
        }

        let starttimes = maxwidths.keys().copied().collect();
        Self { widths, maxwidths, starttimes }
    }

    /// Extra pixels `track` needs at `start` to match the widest track.
    pub fn extra_width(&self, track: usize, start: i32) -> i32 {
        let max = self.maxwidths.get(&start).copied().unwrap_or(0);
        match self.widths.get(track).and_then(|w| w.get(&start)) {
            Some(&width) => max - width,
            None => max,
        }
    }

    /// Every start time in every track, ascending.
    pub fn start_times(&self) -> &[i32] {
        &self.starttimes
    }

    pub fn max_width(&self, start: i32) -> Option<i32> {
        self.maxwidths.get(&start).copied()
    }
}

/// Bars are not aligned, so they are left out.
fn track_widths(symbols: &[MusicSymbol]) -> BTreeMap<i32, i32> {
    let mut widths = BTreeMap::new();
    for symbol in symbols.iter().filter(|s| !s.is_bar()) {
        *widths.entry(symbol.start_time()).or_insert(0) += symbol.min_width();
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::symbols::{BarSymbol, BlankSymbol, RestSymbol};
    use crate::time_signature::NoteDuration;
    use pretty_assertions::assert_eq;

    fn rest(start: i32) -> MusicSymbol {
        MusicSymbol::Rest(RestSymbol::new(start, NoteDuration::Quarter))
    }

    #[test]
    fn extra_width_matches_widest_track() {
        let tracks = vec![
            vec![MusicSymbol::Bar(BarSymbol::new(0)), rest(0), rest(0), rest(480)],
            vec![rest(0), MusicSymbol::Blank(BlankSymbol::new(960, 0))],
        ];
        let widths = SymbolWidths::new(&tracks, None);
        assert_eq!(widths.start_times(), &[0, 480, 960]);
        assert_eq!(widths.extra_width(0, 0), 0);
        assert_eq!(widths.extra_width(1, 0), 20);
        assert_eq!(widths.extra_width(1, 480), 20);
        assert_eq!(widths.extra_width(0, 960), 0);
    }

    #[test]
    fn lyrics_can_widen_a_start_time() {
        let tracks = vec![vec![rest(0)]];
        let lyrics = vec![vec![LyricSymbol::new(0, "together")]];
        let widths = SymbolWidths::new(&tracks, Some(&lyrics));
        assert_eq!(widths.max_width(0), Some(53));
        assert_eq!(widths.extra_width(0, 0), 33);
    }
}
