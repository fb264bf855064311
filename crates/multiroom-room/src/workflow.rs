//! The creation workflow state machine.

use std::fmt;

use crate::PendingCreateRequest;

/// Identifies one creation workflow. Load completions carry it so a
/// completion can never be applied to the wrong request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkflowId(pub u64);

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wf-{}", self.0)
    }
}

/// Where a creation workflow is.
///
/// ```text
/// Requested → SpaceLoading ─┬→ Registering ─┬→ PlacingRequester ─┬→ Complete
///                           │               │                    └→ Abandoned
///                           │               └→ Abandoned
///                           └→ Failed
/// ```
///
/// `Abandoned` means the space loaded but the requester could not be
/// placed (it disconnected or joined another room); the space is queued
/// for teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationState {
    Requested,
    SpaceLoading,
    Registering,
    PlacingRequester,
    Complete,
    Abandoned,
    Failed,
}

impl CreationState {
    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        use CreationState::*;
        matches!(
            (self, target),
            (Requested, SpaceLoading)
                | (SpaceLoading, Registering)
                | (SpaceLoading, Failed)
                | (Registering, PlacingRequester)
                | (Registering, Abandoned)
                | (PlacingRequester, Complete)
                | (PlacingRequester, Abandoned)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Abandoned | Self::Failed)
    }
}

impl fmt::Display for CreationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The create request currently owned by the creation serializer.
#[derive(Debug, Clone)]
pub struct CreationWorkflow {
    id: WorkflowId,
    request: PendingCreateRequest,
    state: CreationState,
}

impl CreationWorkflow {
    pub fn new(id: WorkflowId, request: PendingCreateRequest) -> Self {
        Self {
            id,
            request,
            state: CreationState::Requested,
        }
    }

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    pub fn request(&self) -> &PendingCreateRequest {
        &self.request
    }

    pub fn state(&self) -> CreationState {
        self.state
    }

    /// Moves to `next`. Invalid transitions are ignored and logged.
    pub fn advance(&mut self, next: CreationState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                workflow = %self.id,
                from = %self.state,
                to = %next,
                "invalid creation transition"
            );
            return false;
        }
        tracing::trace!(workflow = %self.id, from = %self.state, to = %next, "creation transition");
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use multiroom_transport::ConnectionId;

    use super::*;

    fn workflow() -> CreationWorkflow {
        CreationWorkflow::new(
            WorkflowId(1),
            PendingCreateRequest {
                requester: ConnectionId::new(1),
                room_name: "Arena".into(),
                room_data: String::new(),
                space_id: "ArenaSpace".into(),
                max_occupancy: 2,
            },
        )
    }

    #[test]
    fn test_creation_state_happy_path() {
        use CreationState::*;
        assert!(Requested.can_transition_to(SpaceLoading));
        assert!(SpaceLoading.can_transition_to(Registering));
        assert!(Registering.can_transition_to(PlacingRequester));
        assert!(PlacingRequester.can_transition_to(Complete));
    }

    #[test]
    fn test_creation_state_rejects_skips_and_reversals() {
        use CreationState::*;
        assert!(!Requested.can_transition_to(Registering));
        assert!(!SpaceLoading.can_transition_to(Abandoned));
        assert!(!Complete.can_transition_to(Requested));
        assert!(!Failed.can_transition_to(SpaceLoading));
    }

    #[test]
    fn test_creation_state_is_terminal() {
        assert!(CreationState::Complete.is_terminal());
        assert!(CreationState::Abandoned.is_terminal());
        assert!(CreationState::Failed.is_terminal());
        assert!(!CreationState::SpaceLoading.is_terminal());
    }

    #[test]
    fn test_advance_valid_and_invalid() {
        let mut wf = workflow();
        assert!(wf.advance(CreationState::SpaceLoading));
        assert!(!wf.advance(CreationState::Complete));
        assert_eq!(wf.state(), CreationState::SpaceLoading);
    }

    #[test]
    fn test_workflow_id_display() {
        assert_eq!(WorkflowId(12).to_string(), "wf-12");
    }
}
