use crate::types::{Participant, ParticipantId, ReplicatedField};

/// Host-side roster and participant model. The mode never owns participants;
/// any id may stop resolving between two calls.
pub trait ParticipantRegistry {
    /// Present participants in the host's enumeration order.
    fn roster(&self) -> Vec<Participant>;

    fn participant(&self, id: ParticipantId) -> Option<Participant>;

    fn set_health(&mut self, id: ParticipantId, health: i32) -> bool;

    fn set_max_health(&mut self, id: ParticipantId, max_health: i32) -> bool;

    /// Pushes the field to clients now instead of on the next natural sync.
    fn replicate(&mut self, id: ParticipantId, field: ReplicatedField);

    fn kill(&mut self, id: ParticipantId) -> bool;
}

/// Vector-backed registry used by the bundled binaries and tests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryRegistry {
    participants: Vec<Participant>,
    replications: Vec<(ParticipantId, ReplicatedField)>,
    kills: Vec<ParticipantId>,
}

impl InMemoryRegistry {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self {
            participants,
            ..Self::default()
        }
    }

    pub fn upsert(&mut self, participant: Participant) {
        match self
            .participants
            .iter_mut()
            .find(|current| current.id == participant.id)
        {
            Some(current) => *current = participant,
            None => self.participants.push(participant),
        }
    }

    pub fn remove(&mut self, id: ParticipantId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        Some(self.participants.remove(index))
    }

    pub fn get_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn replications(&self) -> &[(ParticipantId, ReplicatedField)] {
        &self.replications
    }

    pub fn kills(&self) -> &[ParticipantId] {
        &self.kills
    }
}

impl ParticipantRegistry for InMemoryRegistry {
    fn roster(&self) -> Vec<Participant> {
        self.participants.clone()
    }

    fn participant(&self, id: ParticipantId) -> Option<Participant> {
        self.participants.iter().find(|p| p.id == id).cloned()
    }

    fn set_health(&mut self, id: ParticipantId, health: i32) -> bool {
        let Some(participant) = self.get_mut(id) else {
            return false;
        };
        participant.health = health;
        true
    }

    fn set_max_health(&mut self, id: ParticipantId, max_health: i32) -> bool {
        let Some(participant) = self.get_mut(id) else {
            return false;
        };
        participant.max_health = max_health;
        true
    }

    fn replicate(&mut self, id: ParticipantId, field: ReplicatedField) {
        self.replications.push((id, field));
    }

    fn kill(&mut self, id: ParticipantId) -> bool {
        let Some(participant) = self.get_mut(id) else {
            return false;
        };
        participant.alive = false;
        participant.health = 0;
        self.kills.push(id);
        true
    }
}
