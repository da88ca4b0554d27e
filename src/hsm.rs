//! Generic hierarchical state machine plumbing shared by the device AO and
//! the API AO (§4.1, §9).
//!
//! Both active objects share the same five-state skeleton:
//!
//! ```text
//! Backstop
//! ├── Disabled
//! ├── Starting
//! ├── Error
//! └── Enabled
//!     ├── Idle
//!     └── Busy
//!         ├── Read   (device AO only)
//!         └── Write  (device AO only)
//! ```
//!
//! Rather than a dynamic-dispatch event processor, a state is a plain
//! tagged variant, and the ancestor chain for each variant is a `const`
//! array returned by [`StateTree::chain`] (innermost state first, root
//! last). Dispatch walks that chain calling one handler per level until a
//! handler reports [`Outcome::Handled`] or a [`Outcome::Transition`];
//! unhandled events (`Outcome::Bubble`) fall through to the next, shallower,
//! handler. The root level (`Backstop`) must never bubble further.

/// Result of a single handler invocation at one level of the hierarchy.
pub enum Outcome<S> {
    /// The event was consumed; no transition.
    Handled,
    /// The event was consumed and the state machine should transition to
    /// `S`.
    Transition(S),
    /// The event does not apply at this level; try the parent.
    Bubble,
}

/// A state that knows its own superstate chain.
///
/// `chain()` returns the ancestor list innermost-first, always ending in the
/// shared root (`Backstop`). Implementations are small `const` lookup
/// tables; see [`crate::device::DeviceState::chain`] and
/// [`crate::api::ApiState::chain`].
pub trait StateTree: Copy + PartialEq + 'static {
    /// Ancestor chain for this state, starting with the state itself and
    /// ending at the shared root.
    fn chain(self) -> &'static [Self];
}

/// Drives one event through the handler chain for `current`, calling
/// `handler(obj, level, event)` at each level from innermost to root until
/// one of them reports [`Outcome::Handled`] or [`Outcome::Transition`].
///
/// Returns `Some(target)` if a transition was requested, `None` if the
/// event was fully handled (or bubbled past the root, which is itself a
/// handling no-op per §4.1: "Unknown signals are logged and dropped").
pub fn dispatch<S, E>(
    current: S,
    event: &E,
    mut handler: impl FnMut(S, &E) -> Outcome<S>,
) -> Option<S>
where
    S: StateTree,
{
    for &level in current.chain() {
        match handler(level, event) {
            Outcome::Handled => return None,
            Outcome::Transition(target) => return Some(target),
            Outcome::Bubble => continue,
        }
    }
    None
}

/// Computes the exit and entry chains for a transition from `current` to
/// `target`: every level of `current`'s chain that is not also an ancestor
/// of `target` (innermost first, the order to run exit handlers in), and
/// every level of `target`'s chain that was not already active (returned
/// outermost first — reverse it to get entry order).
///
/// This is the "exit up to the least common ancestor, then enter back down"
/// rule standard to hierarchical state machines, and is what lets, e.g., a
/// transition from `Read` to `Idle` re-run `Busy`'s exit handler (disarming
/// the busy timer) without re-running `Enabled`'s entry handler (which
/// would re-publish `Ready`).
///
/// Exposed as plain slices rather than a callback-driving function so a
/// caller can run exit/entry handlers as ordinary sequential method calls
/// against both its own state and an injected collaborator (e.g. a
/// [`crate::scheduler::Scheduler`]) without needing two independent
/// closures to each capture the same `&mut` collaborator.
pub fn transition_chains<S>(current: S, target: S) -> (&'static [S], &'static [S])
where
    S: StateTree,
{
    let from_chain = current.chain();
    let to_chain = target.chain();

    // Find how many trailing (outermost) levels are shared between the two
    // chains; those are neither exited nor re-entered.
    let mut shared = 0;
    while shared < from_chain.len()
        && shared < to_chain.len()
        && from_chain[from_chain.len() - 1 - shared] == to_chain[to_chain.len() - 1 - shared]
    {
        shared += 1;
    }

    (&from_chain[..from_chain.len() - shared], &to_chain[..to_chain.len() - shared])
}
