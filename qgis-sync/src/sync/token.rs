use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::SyncError;

/// Generation counter shared by all runs of a synchronizer.
///
/// Every run takes a [`SyncTicket`]. Issuing a new ticket makes all earlier tickets stale, so
/// results of a superseded run (a late WFS response of the previous project) are dropped instead
/// of being added to the map.
#[derive(Debug, Clone, Default)]
pub struct SyncToken(Arc<AtomicU64>);

impl SyncToken {
    /// Creates a new token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, invalidating all tickets issued before.
    pub fn issue(&self) -> SyncTicket {
        let generation = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        SyncTicket {
            token: self.clone(),
            generation,
        }
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Permission of one run to modify the map.
#[derive(Debug, Clone)]
pub struct SyncTicket {
    token: SyncToken,
    generation: u64,
}

impl SyncTicket {
    /// Generation of the ticket.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns true if no newer ticket has been issued.
    pub fn is_current(&self) -> bool {
        self.token.generation() == self.generation
    }

    /// Returns [`SyncError::Superseded`] if a newer ticket has been issued.
    pub fn check(&self) -> Result<(), SyncError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(SyncError::Superseded)
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn newer_ticket_supersedes() {
        let token = SyncToken::new();
        let first = token.issue();
        assert!(first.is_current());

        let second = token.issue();
        assert!(!first.is_current());
        assert_matches!(first.check(), Err(SyncError::Superseded));
        assert!(second.check().is_ok());
        assert_eq!(second.generation(), 2);
    }
}
