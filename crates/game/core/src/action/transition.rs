use crate::engine::Outcome;
use crate::state::SessionState;

/// Defines how a concrete action variant mutates session state.
///
/// Implementors can override the validation hooks to surface pre- and
/// post-conditions that must hold around the state mutation. Hooks receive
/// read-only access and must stay side-effect free.
pub trait Transition {
    type Error;

    /// Validates pre-conditions using the state **before** mutation.
    fn pre_validate(&self, _state: &SessionState) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Applies the action by mutating the state directly. Implementations
    /// may assume that `pre_validate` has already run successfully.
    fn apply(&self, state: &mut SessionState) -> Result<Outcome, Self::Error>;

    /// Validates post-conditions using the state **after** mutation.
    fn post_validate(&self, _state: &SessionState) -> Result<(), Self::Error> {
        Ok(())
    }
}
