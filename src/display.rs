use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display targets a page may expose. Every one of them is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementId {
    Location,
    Altitude,
    Speed,
    Battery,
    FireStatus,
    LastUpdate,
    CurrentTime,
    CurrentDate,
    DbUpdateTime,
}

impl ElementId {
    pub const ALL: [ElementId; 9] = [
        ElementId::Location,
        ElementId::Altitude,
        ElementId::Speed,
        ElementId::Battery,
        ElementId::FireStatus,
        ElementId::LastUpdate,
        ElementId::CurrentTime,
        ElementId::CurrentDate,
        ElementId::DbUpdateTime,
    ];

    /// The element id used in page markup.
    pub fn dom_id(&self) -> &'static str {
        match self {
            ElementId::Location => "location",
            ElementId::Altitude => "altitude",
            ElementId::Speed => "speed",
            ElementId::Battery => "battery",
            ElementId::FireStatus => "fire-status",
            ElementId::LastUpdate => "last-update",
            ElementId::CurrentTime => "current-time",
            ElementId::CurrentDate => "current-date",
            ElementId::DbUpdateTime => "db-update-time",
        }
    }
}

/// A set of text targets a view writes into.
///
/// Writes to an absent target are skipped and reported with `false`;
/// they are never an error.
pub trait Surface {
    fn set_text(&mut self, id: ElementId, text: &str) -> bool;
    fn set_class(&mut self, id: ElementId, class: &str) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Element {
    pub text: String,
    pub class: String,
}

/// In-memory surface used by the headless host and by tests.
#[derive(Debug, Clone, Default)]
pub struct TextBoard {
    elements: BTreeMap<ElementId, Element>,
}

impl TextBoard {
    /// A board with no targets at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_targets(ids: &[ElementId]) -> Self {
        let elements = ids.iter().map(|id| (*id, Element::default())).collect();
        Self { elements }
    }

    pub fn all() -> Self {
        Self::with_targets(&ElementId::ALL)
    }

    #[cfg(test)]
    pub fn has(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn text(&self, id: ElementId) -> Option<&str> {
        self.elements.get(&id).map(|e| e.text.as_str())
    }

    #[cfg(test)]
    pub fn class(&self, id: ElementId) -> Option<&str> {
        self.elements.get(&id).map(|e| e.class.as_str())
    }

    /// `dom-id: text` lines for every target that has been written.
    pub fn lines(&self) -> Vec<String> {
        self.elements
            .iter()
            .filter(|(_, e)| !e.text.is_empty())
            .map(|(id, e)| {
                if e.class.is_empty() {
                    format!("{:>15}: {}", id.dom_id(), e.text)
                } else {
                    format!("{:>15}: {} [{}]", id.dom_id(), e.text, e.class)
                }
            })
            .collect()
    }
}

impl Surface for TextBoard {
    fn set_text(&mut self, id: ElementId, text: &str) -> bool {
        match self.elements.get_mut(&id) {
            Some(element) => {
                element.text = text.to_string();
                true
            }
            None => false,
        }
    }

    fn set_class(&mut self, id: ElementId, class: &str) -> bool {
        match self.elements.get_mut(&id) {
            Some(element) => {
                element.class = class.to_string();
                true
            }
            None => false,
        }
    }
}
