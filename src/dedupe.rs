use std::collections::HashSet;

/// Asset ids already handled for one species during one run.
#[derive(Debug, Default)]
pub struct AssetDeduper {
    seen: HashSet<String>,
}

impl AssetDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id`; returns `false` if it was already seen.
    pub fn mark(&mut self, id: &str) -> bool {
        self.seen.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
