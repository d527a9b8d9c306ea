//! Grid marks: authoritative layer plus the optimistic overlay.
//!
//! Authoritative marks and pending local intents are stored separately and
//! never merged in place. What the player sees is always computed as
//! "authoritative mark, unless a pending intent overrides it", so dropping the
//! overlay restores exactly the last confirmed state.

use std::collections::BTreeMap;

use strum::{AsRefStr, Display};

use super::types::{CellMark, GridPosition, GridSize, Line, ParticipantId, Revision};

/// Direction of a local intent on one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IntentKind {
    Mark,
    Unmark,
}

/// Unconfirmed local intent overlaid on one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PendingIntent {
    /// State the local participant last asked for.
    pub desired: IntentKind,
    /// Requests sent to the store for this cell that have not resolved yet.
    pub in_flight: u32,
}

impl PendingIntent {
    pub const fn shows_mark(&self) -> bool {
        matches!(self.desired, IntentKind::Mark)
    }
}

/// Grid contents for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    size: GridSize,
    marks: BTreeMap<GridPosition, CellMark>,
    pending: BTreeMap<GridPosition, PendingIntent>,
    /// Last revision merged per cell. Deletions keep their entry.
    revisions: BTreeMap<GridPosition, Revision>,
    /// Revision of the snapshot the board was built from.
    baseline: Revision,
}

impl Board {
    pub fn new(size: GridSize) -> Self {
        Self::from_marks(size, std::iter::empty(), Revision::ZERO)
    }

    /// Builds a board from a full snapshot. Any event at or below `baseline`
    /// is already reflected and will be treated as a duplicate.
    pub fn from_marks<I>(size: GridSize, marks: I, baseline: Revision) -> Self
    where
        I: IntoIterator<Item = CellMark>,
    {
        Self {
            size,
            marks: marks.into_iter().map(|m| (m.position, m)).collect(),
            pending: BTreeMap::new(),
            revisions: BTreeMap::new(),
            baseline,
        }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn contains(&self, position: GridPosition) -> bool {
        self.size.contains(position)
    }

    /// Last confirmed mark on a cell.
    pub fn authoritative(&self, position: GridPosition) -> Option<&CellMark> {
        self.marks.get(&position)
    }

    pub fn pending(&self, position: GridPosition) -> Option<&PendingIntent> {
        self.pending.get(&position)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_cells(&self) -> impl Iterator<Item = (GridPosition, &PendingIntent)> {
        self.pending.iter().map(|(pos, intent)| (*pos, intent))
    }

    pub fn marks(&self) -> impl Iterator<Item = &CellMark> {
        self.marks.values()
    }

    /// Owner as rendered: the pending overlay wins over the authoritative mark.
    pub fn effective_owner(
        &self,
        position: GridPosition,
        local: ParticipantId,
    ) -> Option<ParticipantId> {
        match self.pending.get(&position) {
            Some(intent) if intent.shows_mark() => Some(local),
            Some(_) => None,
            None => self.marks.get(&position).map(|mark| mark.owner),
        }
    }

    /// True when `revision` has not been merged for this cell yet.
    pub fn is_newer(&self, position: GridPosition, revision: Revision) -> bool {
        let seen = self
            .revisions
            .get(&position)
            .copied()
            .unwrap_or(Revision::ZERO)
            .max(self.baseline);
        revision > seen
    }

    /// Records one more in-flight request for `position` and the state it asks for.
    pub fn record_intent(&mut self, position: GridPosition, desired: IntentKind) {
        let entry = self.pending.entry(position).or_insert(PendingIntent {
            desired,
            in_flight: 0,
        });
        entry.desired = desired;
        entry.in_flight += 1;
    }

    /// Retires one in-flight request. Returns true when the overlay for the
    /// cell was removed as a result.
    pub fn retire_intent(&mut self, position: GridPosition) -> bool {
        let Some(intent) = self.pending.get_mut(&position) else {
            return false;
        };
        intent.in_flight = intent.in_flight.saturating_sub(1);
        if intent.in_flight == 0 {
            self.pending.remove(&position);
            true
        } else {
            false
        }
    }

    pub fn discard_intent(&mut self, position: GridPosition) -> Option<PendingIntent> {
        self.pending.remove(&position)
    }

    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Writes the authoritative content of one cell at `revision`.
    pub fn set_authoritative(
        &mut self,
        position: GridPosition,
        mark: Option<CellMark>,
        revision: Revision,
    ) {
        match mark {
            Some(mark) => {
                self.marks.insert(position, mark);
            }
            None => {
                self.marks.remove(&position);
            }
        }
        self.revisions.insert(position, revision);
    }

    /// Lines fully owned by a single participant, using effective ownership.
    pub fn completed_lines(&self, local: ParticipantId) -> Vec<(ParticipantId, Line)> {
        self.size
            .lines()
            .into_iter()
            .filter_map(|line| {
                let mut owners = line
                    .positions(self.size)
                    .into_iter()
                    .map(|pos| self.effective_owner(pos, local));
                let first = owners.next()??;
                owners
                    .all(|owner| owner == Some(first))
                    .then_some((first, line))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::Timestamp;

    const ME: ParticipantId = ParticipantId(1);
    const OTHER: ParticipantId = ParticipantId(2);

    fn mark(row: u8, col: u8, owner: ParticipantId) -> CellMark {
        CellMark::new(GridPosition::new(row, col), owner, Timestamp::EPOCH)
    }

    #[test]
    fn overlay_hides_without_touching_authoritative() {
        let pos = GridPosition::ORIGIN;
        let mut board = Board::from_marks(GridSize::square(3), [mark(0, 0, ME)], Revision(4));

        board.record_intent(pos, IntentKind::Unmark);
        assert_eq!(board.effective_owner(pos, ME), None);
        assert_eq!(board.authoritative(pos).map(|m| m.owner), Some(ME));

        assert!(board.retire_intent(pos));
        assert_eq!(board.effective_owner(pos, ME), Some(ME));
    }

    #[test]
    fn intents_track_in_flight_requests() {
        let pos = GridPosition::new(1, 1);
        let mut board = Board::new(GridSize::square(3));

        board.record_intent(pos, IntentKind::Mark);
        board.record_intent(pos, IntentKind::Unmark);
        assert_eq!(board.pending(pos).map(|p| p.in_flight), Some(2));
        assert_eq!(board.effective_owner(pos, ME), None);

        assert!(!board.retire_intent(pos));
        assert!(board.retire_intent(pos));
        assert!(!board.has_pending());
    }

    #[test]
    fn baseline_and_cell_revisions_gate_events() {
        let pos = GridPosition::new(0, 1);
        let mut board = Board::from_marks(GridSize::square(3), [], Revision(5));
        assert!(!board.is_newer(pos, Revision(5)));
        assert!(board.is_newer(pos, Revision(6)));

        board.set_authoritative(pos, Some(mark(0, 1, OTHER)), Revision(8));
        assert!(!board.is_newer(pos, Revision(7)));
        assert!(board.is_newer(GridPosition::new(2, 2), Revision(7)));
    }

    #[test]
    fn completed_lines_need_a_single_owner() {
        let marks = [mark(0, 0, ME), mark(0, 1, ME), mark(1, 1, OTHER), mark(1, 0, OTHER)];
        let mut board = Board::from_marks(GridSize::square(2), marks, Revision(1));
        assert_eq!(board.completed_lines(ME), vec![(ME, Line::Row(0)), (OTHER, Line::Row(1))]);

        board.record_intent(GridPosition::new(0, 1), IntentKind::Unmark);
        assert_eq!(board.completed_lines(ME), vec![(OTHER, Line::Row(1))]);
    }
}
