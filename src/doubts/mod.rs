//! Pending doubts and the doubt history.
//!
//! The pending list is the teacher's work queue. The history keeps every doubt
//! seen in this session, answered or not, and is what quizzes and reports are
//! built from. Both collections are keyed by the doubt id, so re-delivered
//! messages merge instead of duplicating.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::protocol::{AiAnswer, Id, StudentDoubt};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doubt {
    pub id: Id,
    pub name: String,
    pub text: String,
    pub answer: Option<String>,
    #[serde(default)]
    pub is_broadcasting: bool,
    #[serde(default)]
    pub voice_generated: bool,
}

impl Doubt {
    pub fn has_answer(&self) -> bool {
        self.answer.as_deref().is_some_and(|a| !a.trim().is_empty())
    }

    fn history_copy(&self) -> Self {
        Self {
            is_broadcasting: false,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DoubtBoard {
    pending: Vec<Doubt>,
    history: Vec<Doubt>,
}

impl DoubtBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an incoming doubt, assigning a timestamp id when it has none.
    /// Returns the id the doubt is filed under.
    pub fn receive(&mut self, incoming: StudentDoubt) -> Id {
        let id = incoming.id.unwrap_or_else(Id::now);
        let doubt = Doubt {
            id: id.clone(),
            name: incoming.name,
            text: incoming.text,
            answer: None,
            is_broadcasting: false,
            voice_generated: incoming.voice_generated,
        };

        if self.pending.iter().any(|d| d.id == id) {
            debug!("Doubt {} already pending", id);
        } else {
            self.pending.push(doubt.clone());
        }

        if !self.history.iter().any(|d| d.id == id) {
            self.history.push(doubt);
        }

        id
    }

    /// Applies a broadcast answer to the history, appending unknown doubts.
    pub fn merge_answer(&mut self, message: &AiAnswer) {
        let existing = message
            .id
            .as_ref()
            .and_then(|id| self.history.iter_mut().find(|d| &d.id == id));

        match existing {
            Some(entry) => {
                if message.answer.is_some() {
                    entry.answer = message.answer.clone();
                }
            }
            None => self.history.push(Doubt {
                id: message.id.clone().unwrap_or_else(Id::now),
                name: message.name.clone(),
                text: message.text.clone(),
                answer: message.answer.clone(),
                is_broadcasting: false,
                voice_generated: false,
            }),
        }
    }

    /// Stores an answer on a pending doubt without broadcasting it.
    pub fn set_local_answer(&mut self, id: &Id, answer: String) -> bool {
        match self.pending.iter_mut().find(|d| &d.id == id) {
            Some(doubt) => {
                doubt.answer = Some(answer);
                true
            }
            None => false,
        }
    }

    pub fn mark_broadcasting(&mut self, id: &Id) -> bool {
        match self.pending.iter_mut().find(|d| &d.id == id) {
            Some(doubt) => {
                doubt.is_broadcasting = true;
                true
            }
            None => false,
        }
    }

    /// Removes a doubt from the pending list, carrying its latest answer into
    /// the history.
    pub fn resolve(&mut self, id: &Id) -> Option<Doubt> {
        let index = self.pending.iter().position(|d| &d.id == id)?;
        let doubt = self.pending.remove(index);

        match self.history.iter_mut().find(|h| h.id == doubt.id) {
            Some(entry) => {
                if doubt.answer.is_some() {
                    entry.answer = doubt.answer.clone();
                }
            }
            None => self.history.push(doubt.history_copy()),
        }

        Some(doubt)
    }

    /// Edits the text of a doubt in both collections.
    pub fn update_text(&mut self, id: &Id, text: &str) -> bool {
        let mut found = false;
        for doubt in self
            .pending
            .iter_mut()
            .chain(self.history.iter_mut())
            .filter(|d| &d.id == id)
        {
            doubt.text = text.to_string();
            found = true;
        }
        found
    }

    pub fn pending(&self) -> &[Doubt] {
        &self.pending
    }

    pub fn history(&self) -> &[Doubt] {
        &self.history
    }

    pub fn pending_doubt(&self, id: &Id) -> Option<&Doubt> {
        self.pending.iter().find(|d| &d.id == id)
    }

    /// Pending doubts still waiting for an answer.
    pub fn unread_count(&self) -> usize {
        self.pending.iter().filter(|d| !d.has_answer()).count()
    }

    /// Every question asked this session, in arrival order.
    pub fn questions(&self) -> Vec<String> {
        self.history.iter().map(|d| d.text.clone()).collect()
    }

    pub fn questions_from<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Doubt> + 'a {
        self.history.iter().filter(move |d| d.name == name)
    }
}
