use dashmap::DashSet;

/// Addresses the bot has heard from during this process lifetime.
///
/// Grows only. Broadcast loops take a snapshot and iterate the copy, so a
/// concurrent insert never disturbs an in-flight broadcast.
#[derive(Default)]
pub(crate) struct RecipientRegistry {
    recipients: DashSet<String>,
}

impl RecipientRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns true if the address was not known before.
    pub(crate) fn add(&self, address: &str) -> bool {
        if address.is_empty() || self.recipients.contains(address) {
            return false;
        }
        self.recipients.insert(address.to_string())
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        let mut all: Vec<String> = self.recipients.iter().map(|r| r.key().clone()).collect();
        all.sort();
        all
    }

    pub(crate) fn len(&self) -> usize {
        self.recipients.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, address: &str) -> bool {
        self.recipients.contains(address)
    }
}
