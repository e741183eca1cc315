use crate::model::DocumentKind;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub kind: DocumentKind,
    pub document_id: String,
    pub days_remaining: i64,
}

/// Alerts already shown this session.
///
/// Entries for documents that drop out of the fetched set are evicted, so the ledger
/// holds at most one window of day-counts per tracked document.
#[derive(Debug, Default)]
pub struct AlertLedger {
    shown: HashSet<AlertKey>,
}

impl AlertLedger {
    /// Record `key`; returns false when it was already shown.
    pub fn insert(&mut self, key: AlertKey) -> bool {
        self.shown.insert(key)
    }

    /// Drop every entry whose document is not in `live_ids`.
    pub fn retain_documents(&mut self, live_ids: &HashSet<&str>) -> usize {
        let before = self.shown.len();
        self.shown
            .retain(|k| live_ids.contains(k.document_id.as_str()));
        before - self.shown.len()
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }
}
