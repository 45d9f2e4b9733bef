use crate::{error::PushError, types::ConnectionState};

/// Owner of the stream's `ConnectionState`.
///
/// Only `begin_connect` is guarded; transport events are facts and are
/// applied from any state.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
}

impl ConnectionStateMachine {
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Enter `Connecting`. Only valid from `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<ConnectionState, PushError> {
        if self.state != ConnectionState::Disconnected {
            return Err(PushError::invalid_state(self.state, "begin_connect"));
        }
        Ok(self.transition(ConnectionState::Connecting))
    }

    /// Handshake completed (initial connect or a reconnect).
    pub fn on_connected(&mut self) -> ConnectionState {
        self.transition(ConnectionState::Connected)
    }

    /// Stream dropped or was torn down.
    pub fn on_disconnected(&mut self) -> ConnectionState {
        self.transition(ConnectionState::Disconnected)
    }

    fn transition(&mut self, next: ConnectionState) -> ConnectionState {
        self.state = next;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_connect_drop_reconnect_cycle() {
        let mut sm = ConnectionStateMachine::default();
        assert_eq!(sm.state(), ConnectionState::Disconnected);

        sm.begin_connect().expect("connect from disconnected must work");
        assert_eq!(sm.state(), ConnectionState::Connecting);

        sm.on_connected();
        assert!(sm.is_connected());

        sm.on_disconnected();
        assert_eq!(sm.state(), ConnectionState::Disconnected);

        sm.on_connected();
        assert_eq!(sm.state(), ConnectionState::Connected);
    }

    #[test]
    fn rejects_begin_connect_while_connected() {
        let mut sm = ConnectionStateMachine::default();
        sm.begin_connect().expect("first connect must work");
        sm.on_connected();

        let err = sm
            .begin_connect()
            .expect_err("second connect should be rejected");
        assert_eq!(err.code, "invalid_state_transition");
        assert_eq!(sm.state(), ConnectionState::Connected);
    }

    #[test]
    fn rejects_begin_connect_while_connecting() {
        let mut sm = ConnectionStateMachine::default();
        sm.begin_connect().expect("first connect must work");
        assert!(sm.begin_connect().is_err());
    }
}
