use std::sync::Arc;

use hubnet_core::error::Result;

use crate::chat::module::ChatModule;
use crate::chat::types::{ChatEvent, PreChat, PreKind};
use crate::directory::PlayerDirectory;
use crate::party::Member;

/// Trim, drop control characters, cap the length; cancel if nothing is left.
pub struct Sanitize {
    kind: PreKind,
    max_len: usize,
}

impl Sanitize {
    pub fn new(kind: PreKind, max_len: usize) -> Self {
        Self { kind, max_len }
    }
}

impl ChatModule<PreChat> for Sanitize {
    fn name(&self) -> &'static str {
        "sanitize"
    }

    fn kind(&self) -> PreKind {
        self.kind
    }

    fn process(&self, event: &mut PreChat) -> Result<()> {
        let body = event.body_mut();
        let cleaned: String = body.text().chars().filter(|c| !c.is_control()).collect();
        let capped: String = cleaned.trim().chars().take(self.max_len).collect();
        let capped = capped.trim_end().to_string();

        if capped.is_empty() {
            body.cancel("empty message");
        }
        body.set_text(capped);
        Ok(())
    }
}

/// Replace configured words with `*`, ASCII case-insensitive.
pub struct WordFilter {
    kind: PreKind,
    words: Vec<String>,
}

impl WordFilter {
    pub fn new(kind: PreKind, words: &[String]) -> Self {
        let words = words
            .iter()
            .map(|w| w.trim().to_ascii_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { kind, words }
    }

    pub fn mask(&self, text: &str) -> String {
        // ASCII lowering keeps byte offsets, so ranges found in `lower` are
        // valid in `text`.
        let lower = text.to_ascii_lowercase();
        let mut masked = vec![false; text.len()];
        for w in &self.words {
            for (start, m) in lower.match_indices(w.as_str()) {
                masked[start..start + m.len()].fill(true);
            }
        }

        text.char_indices()
            .map(|(i, c)| if masked[i] { '*' } else { c })
            .collect()
    }
}

impl ChatModule<PreChat> for WordFilter {
    fn name(&self) -> &'static str {
        "word_filter"
    }

    fn kind(&self) -> PreKind {
        self.kind
    }

    fn process(&self, event: &mut PreChat) -> Result<()> {
        if self.words.is_empty() {
            return Ok(());
        }
        let body = event.body_mut();
        let masked = self.mask(body.text());
        body.set_text(masked);
        Ok(())
    }
}

/// Resolve a direct message's target name through the player directory.
pub struct DirectTarget {
    directory: Arc<PlayerDirectory>,
}

impl DirectTarget {
    pub fn new(directory: Arc<PlayerDirectory>) -> Self {
        Self { directory }
    }
}

impl ChatModule<PreChat> for DirectTarget {
    fn name(&self) -> &'static str {
        "direct_target"
    }

    fn kind(&self) -> PreKind {
        PreKind::Direct
    }

    fn process(&self, event: &mut PreChat) -> Result<()> {
        let PreChat::Direct(req) = event else {
            return Ok(());
        };
        match self.directory.find_by_name(&req.target_name) {
            Some(rec) => req.target = Some(Member::new(rec.member, rec.name)),
            None => req
                .body
                .cancel(format!("player {} is not online", req.target_name)),
        }
        Ok(())
    }
}
