//! Connection state machine.
//!
//! ```text
//! Idle -> Connecting -> Open -> { Reconnecting -> Connecting }* -> Closed(Completed | Exhausted | UserClosed)
//! ```
//!
//! A final result closes the connection from any live state (`Finished`), and
//! a drop observed after completion closes it the same way instead of
//! scheduling a reconnect.
//!
//! The reconnect counter lives inside the state: `Open` implies zero, and
//! `Connecting { attempt }` / `Reconnecting { attempt }` carry the reattempt
//! number. `Closed(_)` is terminal: the only event it accepts is another
//! owner close, which leaves it unchanged.

use std::fmt;

use crate::config::ReconnectPolicy;

/// Why a connection reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
	/// Closed after the session received its final result.
	Completed,
	/// The reconnect budget ran out.
	Exhausted,
	/// Torn down by the owner (new submission, shutdown).
	UserClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
	Idle,
	Connecting { attempt: u32 },
	Open,
	Reconnecting { attempt: u32 },
	Closed(CloseReason),
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
	/// The owner asks for the first connection.
	Dial,
	/// The transport finished its handshake.
	Opened,
	/// The stream ended (or the dial failed) without the owner asking.
	Dropped { session_complete: bool },
	/// The pending reconnect timer fired.
	RetryDue,
	/// The session received its final result.
	Finished,
	/// The owner tears the connection down.
	Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
	pub from: LinkState,
	pub event: LinkEvent,
}

impl fmt::Display for IllegalTransition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "illegal link transition: {:?} on {:?}", self.from, self.event)
	}
}

impl std::error::Error for IllegalTransition {}

impl LinkState {
	/// Exhaustive transition table.
	pub fn next(self, event: LinkEvent, policy: &ReconnectPolicy) -> Result<LinkState, IllegalTransition> {
		use LinkEvent as E;
		use LinkState as S;

		let next = match (self, event) {
			(S::Idle, E::Dial) => S::Connecting { attempt: 0 },
			(S::Connecting { .. }, E::Opened) => S::Open,
			(S::Open, E::Dropped { session_complete }) => dropped(0, session_complete, policy),
			(S::Connecting { attempt }, E::Dropped { session_complete }) => dropped(attempt, session_complete, policy),
			(S::Reconnecting { attempt }, E::RetryDue) => S::Connecting { attempt },
			(S::Connecting { .. } | S::Open | S::Reconnecting { .. }, E::Finished) => S::Closed(CloseReason::Completed),
			(S::Closed(reason), E::Close) => S::Closed(reason),
			(_, E::Close) => S::Closed(CloseReason::UserClosed),

			(S::Idle, E::Opened | E::Dropped { .. } | E::RetryDue | E::Finished)
			| (S::Connecting { .. }, E::Dial | E::RetryDue)
			| (S::Open, E::Dial | E::Opened | E::RetryDue)
			| (S::Reconnecting { .. }, E::Dial | E::Opened | E::Dropped { .. })
			| (S::Closed(_), E::Dial | E::Opened | E::Dropped { .. } | E::RetryDue | E::Finished) => {
				return Err(IllegalTransition { from: self, event });
			}
		};

		Ok(next)
	}

	/// Reconnect counter implied by the state.
	pub fn attempts(self) -> u32 {
		match self {
			LinkState::Connecting { attempt } | LinkState::Reconnecting { attempt } => attempt,
			LinkState::Idle | LinkState::Open | LinkState::Closed(_) => 0,
		}
	}

	pub fn is_closed(self) -> bool {
		matches!(self, LinkState::Closed(_))
	}
}

fn dropped(counter: u32, session_complete: bool, policy: &ReconnectPolicy) -> LinkState {
	if session_complete {
		LinkState::Closed(CloseReason::Completed)
	} else if counter < policy.max_attempts {
		LinkState::Reconnecting { attempt: counter + 1 }
	} else {
		LinkState::Closed(CloseReason::Exhausted)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn step(state: LinkState, event: LinkEvent) -> LinkState {
		state.next(event, &ReconnectPolicy::default()).unwrap()
	}

	const DROP: LinkEvent = LinkEvent::Dropped { session_complete: false };

	#[test]
	fn open_resets_counter() {
		let state = step(LinkState::Idle, LinkEvent::Dial);
		let state = step(state, LinkEvent::Opened);
		let state = step(state, DROP);
		assert_eq!(state, LinkState::Reconnecting { attempt: 1 });
		let state = step(state, LinkEvent::RetryDue);
		let state = step(state, LinkEvent::Opened);
		assert_eq!(state.attempts(), 0);
		assert_eq!(step(state, DROP), LinkState::Reconnecting { attempt: 1 });
	}

	#[test]
	fn three_failed_reattempts_exhaust() {
		let mut state = step(step(LinkState::Idle, LinkEvent::Dial), LinkEvent::Opened);
		state = step(state, DROP);
		for attempt in 1..=3 {
			assert_eq!(state, LinkState::Reconnecting { attempt });
			state = step(state, LinkEvent::RetryDue);
			state = step(state, DROP);
		}
		assert_eq!(state, LinkState::Closed(CloseReason::Exhausted));
	}

	#[test]
	fn completed_session_never_reconnects() {
		let open = step(step(LinkState::Idle, LinkEvent::Dial), LinkEvent::Opened);
		assert_eq!(
			step(open, LinkEvent::Dropped { session_complete: true }),
			LinkState::Closed(CloseReason::Completed)
		);
		let connecting = LinkState::Connecting { attempt: 2 };
		assert_eq!(
			step(connecting, LinkEvent::Dropped { session_complete: true }),
			LinkState::Closed(CloseReason::Completed)
		);
	}

	#[test]
	fn final_result_closes_any_live_state() {
		for live in [LinkState::Connecting { attempt: 0 }, LinkState::Open, LinkState::Reconnecting { attempt: 2 }] {
			assert_eq!(step(live, LinkEvent::Finished), LinkState::Closed(CloseReason::Completed));
		}
		assert!(LinkState::Idle.next(LinkEvent::Finished, &ReconnectPolicy::default()).is_err());
	}

	#[test]
	fn close_is_idempotent() {
		let closed = step(LinkState::Reconnecting { attempt: 2 }, LinkEvent::Close);
		assert_eq!(closed, LinkState::Closed(CloseReason::UserClosed));
		assert_eq!(step(closed, LinkEvent::Close), closed);

		let exhausted = LinkState::Closed(CloseReason::Exhausted);
		assert_eq!(step(exhausted, LinkEvent::Close), exhausted);
	}

	#[test]
	fn closed_rejects_everything_but_close() {
		let policy = ReconnectPolicy::default();
		let closed = LinkState::Closed(CloseReason::Completed);
		for event in [LinkEvent::Dial, LinkEvent::Opened, DROP, LinkEvent::RetryDue, LinkEvent::Finished] {
			assert!(closed.next(event, &policy).is_err(), "{event:?} should be rejected");
		}
	}

	#[test]
	fn zero_budget_exhausts_immediately() {
		let policy = ReconnectPolicy {
			max_attempts: 0,
			..ReconnectPolicy::default()
		};
		assert_eq!(LinkState::Open.next(DROP, &policy).unwrap(), LinkState::Closed(CloseReason::Exhausted));
	}
}
