use tokio::sync::watch;

use crate::Error;

/// The stages of session establishment.
///
/// MoQ runs on WebTransport, which runs on HTTP/3, so both the outer and inner handshakes must complete in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakeState {
	Idle,
	WebTransportRequested,
	WebTransportEstablished,
	ClientSetupSent,
	MoqtEstablished,
	Failed(String),
}

impl HandshakeState {
	fn rank(&self) -> Option<u8> {
		match self {
			Self::Idle => Some(0),
			Self::WebTransportRequested => Some(1),
			Self::WebTransportEstablished => Some(2),
			Self::ClientSetupSent => Some(3),
			Self::MoqtEstablished => Some(4),
			Self::Failed(_) => None,
		}
	}

	pub fn is_failed(&self) -> bool {
		matches!(self, Self::Failed(_))
	}

	pub fn is_established(&self) -> bool {
		matches!(self, Self::MoqtEstablished)
	}

	/// Returns true if this state is at or past the given stage.
	pub fn has_reached(&self, stage: &HandshakeState) -> bool {
		match (self.rank(), stage.rank()) {
			(Some(a), Some(b)) => a >= b,
			_ => false,
		}
	}

	/// Only single steps forward are legal, plus failure from any non-failed state.
	pub fn can_advance(&self, next: &HandshakeState) -> bool {
		match (self.rank(), next.rank()) {
			(Some(a), Some(b)) => b == a + 1,
			(Some(_), None) => true,
			(None, _) => false,
		}
	}
}

/// Owns the handshake state and publishes every transition.
pub struct Handshake {
	state: watch::Sender<HandshakeState>,
}

impl Handshake {
	pub fn new() -> Self {
		let (state, _) = watch::channel(HandshakeState::Idle);
		Self { state }
	}

	pub fn state(&self) -> HandshakeState {
		self.state.borrow().clone()
	}

	/// Move to the next stage, rejecting anything that skips a stage or leaves a failed state.
	pub fn advance(&self, next: HandshakeState) -> Result<(), Error> {
		let current = self.state();
		if !current.can_advance(&next) {
			tracing::warn!(?current, ?next, "illegal handshake transition");
			return Err(Error::NotReady(current));
		}

		tracing::debug!(state = ?next, "handshake");
		self.state.send_replace(next);

		Ok(())
	}

	/// Move to the failed state, returning false if already failed.
	pub fn fail(&self, reason: impl Into<String>) -> bool {
		let reason = reason.into();

		self.state.send_if_modified(|state| {
			if state.is_failed() {
				return false;
			}

			tracing::warn!(%reason, from = ?state, "handshake failed");
			*state = HandshakeState::Failed(reason);
			true
		})
	}

	pub fn subscribe(&self) -> watch::Receiver<HandshakeState> {
		self.state.subscribe()
	}
}

impl Default for Handshake {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use HandshakeState::*;

	fn stages() -> Vec<HandshakeState> {
		vec![
			Idle,
			WebTransportRequested,
			WebTransportEstablished,
			ClientSetupSent,
			MoqtEstablished,
			Failed("boom".into()),
		]
	}

	#[test]
	fn test_happy_path() {
		let handshake = Handshake::new();
		let mut rx = handshake.subscribe();

		for next in [WebTransportRequested, WebTransportEstablished, ClientSetupSent, MoqtEstablished] {
			handshake.advance(next.clone()).unwrap();
			assert!(rx.has_changed().unwrap());
			assert_eq!(*rx.borrow_and_update(), next);
		}

		assert!(handshake.state().is_established());
	}

	#[test]
	fn test_skip_rejected() {
		let handshake = Handshake::new();
		handshake.advance(WebTransportRequested).unwrap();

		assert!(handshake.advance(ClientSetupSent).is_err());
		assert!(handshake.advance(MoqtEstablished).is_err());
		assert!(handshake.advance(WebTransportRequested).is_err());
		assert!(handshake.advance(Idle).is_err());
		assert_eq!(handshake.state(), WebTransportRequested);
	}

	#[test]
	fn test_fail_terminal() {
		let handshake = Handshake::new();
		handshake.advance(WebTransportRequested).unwrap();

		assert!(handshake.fail("timeout"));
		assert!(!handshake.fail("again"));
		assert_eq!(handshake.state(), Failed("timeout".into()));

		assert!(handshake.advance(WebTransportEstablished).is_err());
		assert!(!handshake.state().has_reached(&Idle));
	}

	#[test]
	fn test_established_requires_intermediate_states() {
		// Try every sequence of up to six attempted transitions.
		let stages = stages();
		let mut pending = vec![Vec::<HandshakeState>::new()];

		while let Some(attempts) = pending.pop() {
			let handshake = Handshake::new();
			let mut visited = vec![Idle];

			for next in &attempts {
				let ok = match next {
					Failed(reason) => handshake.fail(reason.clone()),
					next => handshake.advance(next.clone()).is_ok(),
				};
				if ok {
					visited.push(handshake.state());
				}
			}

			if handshake.state() == MoqtEstablished {
				assert_eq!(
					visited,
					vec![
						Idle,
						WebTransportRequested,
						WebTransportEstablished,
						ClientSetupSent,
						MoqtEstablished
					]
				);
			}

			if attempts.len() < 6 {
				for next in &stages {
					let mut attempts = attempts.clone();
					attempts.push(next.clone());
					pending.push(attempts);
				}
			}
		}
	}

	#[test]
	fn test_has_reached() {
		assert!(MoqtEstablished.has_reached(&ClientSetupSent));
		assert!(ClientSetupSent.has_reached(&ClientSetupSent));
		assert!(!WebTransportEstablished.has_reached(&ClientSetupSent));
		assert!(!Failed("x".into()).has_reached(&Idle));
	}
}
