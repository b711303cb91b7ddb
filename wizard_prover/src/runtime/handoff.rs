//! One-shot challenge hand-off between the round runtime and a background
//! witness solver.
//!
//! A solver task starts building a witness on its own thread, blocks the
//! moment it needs a transcript-derived challenge only the runtime can
//! supply, and resumes once the runtime sends it. Both endpoints consume
//! themselves on use, so delivery is exactly-once by construction.

use std::sync::mpsc;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    /// The peer endpoint was dropped before the exchange completed.
    #[error("challenge hand-off channel disconnected")]
    Disconnected,
}

/// The runtime side: sends exactly one challenge.
pub struct ChallengeSupplier<T>(mpsc::SyncSender<T>);

impl<T> ChallengeSupplier<T> {
    pub fn supply(self, value: T) -> Result<(), HandoffError> {
        self.0.send(value).map_err(|_| HandoffError::Disconnected)
    }
}

/// The solver side: blocks until the challenge arrives.
pub struct ChallengeReceiver<T>(mpsc::Receiver<T>);

impl<T> ChallengeReceiver<T> {
    pub fn recv(self) -> Result<T, HandoffError> {
        self.0.recv().map_err(|_| HandoffError::Disconnected)
    }
}

/// A rendezvous pair for one challenge. The buffer of one lets the runtime
/// send without waiting for the solver to have reached its blocking point.
pub fn challenge_handoff<T>() -> (ChallengeSupplier<T>, ChallengeReceiver<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (ChallengeSupplier(tx), ChallengeReceiver(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use wizard_shared_types::Fr;

    #[test]
    fn solver_blocks_until_the_challenge_arrives() {
        let (supplier, receiver) = challenge_handoff::<Fr>();
        let solver = thread::spawn(move || {
            // Stand-in for a witness computation needing one challenge.
            let challenge = receiver.recv()?;
            Ok::<Fr, HandoffError>(challenge + Fr::from(1))
        });
        supplier.supply(Fr::from(41)).unwrap();
        let result = solver.join().unwrap().unwrap();
        assert_eq!(result, Fr::from(42));
    }

    #[test]
    fn dropped_supplier_reports_disconnection() {
        let (supplier, receiver) = challenge_handoff::<Fr>();
        drop(supplier);
        assert_eq!(receiver.recv(), Err(HandoffError::Disconnected));
    }

    #[test]
    fn dropped_receiver_reports_disconnection() {
        let (supplier, receiver) = challenge_handoff::<Fr>();
        drop(receiver);
        assert_eq!(
            supplier.supply(Fr::from(7)),
            Err(HandoffError::Disconnected)
        );
    }
}
