use std::collections::VecDeque;

/// Recently played route anchors, echoed back to the service as short-term
/// memory. Oldest entries are trimmed once `max_len` is exceeded.
#[derive(Debug, Clone)]
pub struct AnchorHistory {
    entries: VecDeque<i64>,
    max_len: usize,
    send_empty: bool,
}

impl AnchorHistory {
    pub fn new(max_len: usize, send_empty: bool) -> Self {
        Self { entries: VecDeque::new(), max_len: max_len.max(1), send_empty }
    }

    pub fn record(&mut self, anchor: i64) {
        self.entries.push_back(anchor);
        while self.entries.len() > self.max_len {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> Vec<i64> {
        self.entries.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Comma-joined form field. `None` means the field is omitted.
    pub fn to_field(&self) -> Option<String> {
        if self.entries.is_empty() {
            return self.send_empty.then(String::new);
        }
        let joined = self
            .entries
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Some(joined)
    }
}
