use std::collections::BTreeMap;

use super::types::{Color, Participant, ParticipantId, Revision, Role};

/// Participants currently connected to the session.
///
/// The participant count is derived from the map, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Roster {
    participants: BTreeMap<ParticipantId, Participant>,
    /// Last revision merged per participant. Removals keep their entry so a
    /// late duplicate insert cannot resurrect a departed participant.
    revisions: BTreeMap<ParticipantId, Revision>,
    baseline: Revision,
}

impl Roster {
    pub fn from_participants<I>(participants: I, baseline: Revision) -> Self
    where
        I: IntoIterator<Item = Participant>,
    {
        Self {
            participants: participants.into_iter().map(|p| (p.id, p)).collect(),
            revisions: BTreeMap::new(),
            baseline,
        }
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    pub fn role_of(&self, id: ParticipantId) -> Option<Role> {
        self.get(id).map(|p| p.role)
    }

    pub fn color_of(&self, id: ParticipantId) -> Option<Color> {
        self.get(id).map(|p| p.color)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn is_newer(&self, id: ParticipantId, revision: Revision) -> bool {
        let seen = self
            .revisions
            .get(&id)
            .copied()
            .unwrap_or(Revision::ZERO)
            .max(self.baseline);
        revision > seen
    }

    pub fn upsert(&mut self, participant: Participant, revision: Revision) {
        self.revisions.insert(participant.id, revision);
        self.participants.insert(participant.id, participant);
    }

    pub fn remove(&mut self, id: ParticipantId, revision: Revision) -> Option<Participant> {
        self.revisions.insert(id, revision);
        self.participants.remove(&id)
    }
}
