//! Render-ready projection of [`SessionState`].
//!
//! A view is a pure function of state. Front-ends draw it and issue no logic
//! of their own; every gate (can the user mark? pause?) is decided here.

use crate::state::{
    Color, GridPosition, GridSize, Lifecycle, Line, ParticipantId, Role, SessionCode,
    SessionState,
};

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellView {
    pub position: GridPosition,
    pub owner: Option<ParticipantId>,
    /// Owner's display color, when marked by a participant still on the roster.
    pub color: Option<Color>,
    /// The cell shows an unconfirmed local intent.
    pub pending: bool,
}

impl CellView {
    pub fn is_marked(&self) -> bool {
        self.owner.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub display_name: String,
    pub role: Role,
    pub color: Color,
    pub is_local: bool,
    /// Cells currently shown as owned by this participant.
    pub marks: usize,
}

/// Which controls are enabled for the local participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Controls {
    pub can_mark: bool,
    pub can_start: bool,
    pub can_pause: bool,
    pub can_resume: bool,
    pub can_end: bool,
}

impl Controls {
    fn project(lifecycle: Lifecycle, role: Option<Role>) -> Self {
        let Some(role) = role else {
            return Self::default();
        };
        let host_may = |to| role.is_host() && lifecycle.can_transition_to(to);
        Self {
            can_mark: lifecycle.accepts_marks() && role.can_mark(),
            can_start: lifecycle == Lifecycle::Pending && host_may(Lifecycle::Active),
            can_pause: host_may(Lifecycle::Paused),
            can_resume: lifecycle == Lifecycle::Paused && host_may(Lifecycle::Active),
            can_end: host_may(Lifecycle::Ended),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionView {
    pub code: SessionCode,
    pub size: GridSize,
    pub lifecycle: Lifecycle,
    /// Row-major cells.
    pub rows: Vec<Vec<CellView>>,
    pub participants: Vec<ParticipantView>,
    pub controls: Controls,
    /// Feed disconnected; the grid shows last known state.
    pub stale: bool,
    pub completed_lines: Vec<(ParticipantId, Line)>,
}

impl SessionView {
    pub fn project(state: &SessionState) -> Self {
        let size = state.board.size();
        let rows: Vec<Vec<CellView>> = (0..size.rows)
            .map(|row| {
                (0..size.cols)
                    .map(|col| {
                        let position = GridPosition::new(row, col);
                        let owner = state.effective_owner(position);
                        CellView {
                            position,
                            owner,
                            color: owner.and_then(|id| state.roster.color_of(id)),
                            pending: state.board.pending(position).is_some(),
                        }
                    })
                    .collect()
            })
            .collect();

        let participants = state
            .roster
            .iter()
            .map(|p| ParticipantView {
                id: p.id,
                display_name: p.display_name.clone(),
                role: p.role,
                color: p.color,
                is_local: p.id == state.local,
                marks: rows
                    .iter()
                    .flatten()
                    .filter(|cell| cell.owner == Some(p.id))
                    .count(),
            })
            .collect();

        Self {
            code: state.session.code.clone(),
            size,
            lifecycle: state.lifecycle(),
            rows,
            participants,
            controls: Controls::project(state.lifecycle(), state.local_role()),
            stale: state.is_stale(),
            completed_lines: state.board.completed_lines(state.local),
        }
    }

    pub fn cell(&self, position: GridPosition) -> Option<&CellView> {
        self.rows
            .get(position.row as usize)?
            .get(position.col as usize)
    }

    pub fn marked_count(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.is_marked()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::engine::SessionEngine;
    use crate::event::Operation;
    use crate::state::Revision;
    use crate::testing::{ALICE, BOB, CAROL, active_state, mark_event, snapshot};

    #[test]
    fn cells_carry_owner_color_and_pending_flag() {
        let mut state = active_state(ALICE);
        let mut engine = SessionEngine::new(&mut state);
        engine
            .execute(&Action::Remote(mark_event(
                Revision(9),
                Operation::Insert,
                GridPosition::new(1, 1),
                BOB,
            )))
            .unwrap();
        engine.execute(&Action::Mark(GridPosition::ORIGIN)).unwrap();

        let view = SessionView::project(&state);
        let bob_cell = view.cell(GridPosition::new(1, 1)).unwrap();
        assert_eq!(bob_cell.owner, Some(BOB));
        assert_eq!(bob_cell.color, Some(state.roster.color_of(BOB).unwrap()));
        assert!(!bob_cell.pending);

        let own_cell = view.cell(GridPosition::ORIGIN).unwrap();
        assert_eq!(own_cell.owner, Some(ALICE));
        assert!(own_cell.pending);
        assert_eq!(view.marked_count(), 2);
    }

    #[test]
    fn participant_colors_are_distinct() {
        let view = SessionView::project(&active_state(BOB));
        let mut colors: Vec<_> = view.participants.iter().map(|p| p.color).collect();
        colors.sort();
        colors.dedup();
        assert_eq!(colors.len(), view.participants.len());
        assert!(view.participants.iter().any(|p| p.is_local && p.id == BOB));
    }

    #[test]
    fn controls_follow_lifecycle_and_role() {
        let host = SessionView::project(&active_state(ALICE)).controls;
        assert!(host.can_mark && host.can_pause && host.can_end);
        assert!(!host.can_resume && !host.can_start);

        let player = SessionView::project(&active_state(BOB)).controls;
        assert!(player.can_mark);
        assert!(!player.can_pause && !player.can_end);

        let spectator = SessionView::project(&active_state(CAROL)).controls;
        assert!(!spectator.can_mark);

        let paused = SessionState::from_snapshot(snapshot(Lifecycle::Paused, Revision(1)), ALICE);
        let controls = SessionView::project(&paused).controls;
        assert!(!controls.can_mark && controls.can_resume && !controls.can_pause);

        let ended = SessionState::from_snapshot(snapshot(Lifecycle::Ended, Revision(1)), ALICE);
        assert_eq!(SessionView::project(&ended).controls, Controls::default());

        let pending = SessionState::from_snapshot(snapshot(Lifecycle::Pending, Revision(1)), ALICE);
        assert!(SessionView::project(&pending).controls.can_start);
    }

    #[test]
    fn completed_lines_are_reported() {
        let mut state = active_state(BOB);
        let mut engine = SessionEngine::new(&mut state);
        for col in 0..5 {
            engine
                .execute(&Action::Remote(mark_event(
                    Revision(10 + col as u64),
                    Operation::Insert,
                    GridPosition::new(2, col),
                    BOB,
                )))
                .unwrap();
        }
        let view = SessionView::project(&state);
        assert_eq!(view.completed_lines, vec![(BOB, Line::Row(2))]);
        assert_eq!(
            view.participants.iter().find(|p| p.id == BOB).map(|p| p.marks),
            Some(5)
        );
    }
}
