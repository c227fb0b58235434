/// Generation token attached to an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Issues monotonically increasing tickets for one kind of request. Only the
/// most recently issued ticket is current; results carrying an older one are stale.
#[derive(Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn issue(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }

    /// Makes every outstanding ticket stale without issuing a new one.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_ticket_is_current() {
        let mut seq = RequestSequence::default();
        let a = seq.issue();
        assert!(seq.is_current(a));

        let b = seq.issue();
        assert!(!seq.is_current(a));
        assert!(seq.is_current(b));
    }

    #[test]
    fn test_invalidate_retires_outstanding_ticket() {
        let mut seq = RequestSequence::default();
        let a = seq.issue();
        seq.invalidate();
        assert!(!seq.is_current(a));
        let b = seq.issue();
        assert!(seq.is_current(b));
    }
}
