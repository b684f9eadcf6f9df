use serde::Serialize;

/// Reference header set for the current batch of files.
///
/// Empty until the first file is reconciled; from then on every candidate must
/// carry the same names. Only [`HeaderSet::reset`] returns it to the empty state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderSet {
    names: Vec<String>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while no reference has been established.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Admit or reject a candidate header row.
    ///
    /// The first candidate always becomes the reference. Afterwards a candidate
    /// is accepted when it has the same length and contains every reference
    /// name, in any order. Comparison is case-sensitive. Membership is checked
    /// per name, so a reference repeating a name accepts any candidate of the
    /// same length that contains it.
    pub fn reconcile(&mut self, candidate: &[String]) -> bool {
        if self.names.is_empty() {
            self.names = candidate.to_vec();
            return true;
        }
        headers_match(&self.names, candidate)
    }

    pub fn reset(&mut self) {
        self.names.clear();
    }
}

fn headers_match(reference: &[String], candidate: &[String]) -> bool {
    reference.len() == candidate.len() && reference.iter().all(|name| candidate.contains(name))
}
