//! In-memory fake [`DomAdapter`], mirroring the teacher's
//! `StubAudioSource` (agent/src/types.rs): deterministic, no real
//! browser dependency, driven entirely by values the test sets up.

use super::{DomAdapter, ElementFacts, ElementHandle, ElementKind};

pub struct TestDom {
    elements: Vec<(ElementKind, ElementFacts)>,
    modals: Vec<i64>,
    next_id: u64,
}

impl TestDom {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            modals: Vec::new(),
            next_id: 0,
        }
    }

    /// Register one candidate element and return its handle.
    pub fn push_element(&mut self, kind: ElementKind, facts: ElementFacts) -> ElementHandle {
        let handle = ElementHandle(self.elements.len() as u64);
        self.elements.push((kind, facts));
        handle
    }

    /// Register a visible modal-scope candidate with the given stacking
    /// index; returns its handle (index into push order).
    pub fn push_modal(&mut self, z_index: i64) -> ElementHandle {
        let handle = ElementHandle(self.modals.len() as u64);
        self.modals.push(z_index);
        handle
    }
}

impl Default for TestDom {
    fn default() -> Self {
        Self::new()
    }
}

impl DomAdapter for TestDom {
    fn modal_candidates(&self) -> Vec<(ElementHandle, i64)> {
        self.modals
            .iter()
            .enumerate()
            .map(|(i, z)| (ElementHandle(i as u64), *z))
            .collect()
    }

    fn candidates(&self, _scope_root: Option<&ElementHandle>) -> Vec<(ElementHandle, ElementKind, ElementFacts)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, (kind, facts))| (ElementHandle(i as u64), *kind, facts.clone()))
            .collect()
    }

    fn ensure_voice_id(&mut self, handle: &ElementHandle) -> String {
        self.next_id += 1;
        format!("voice-test-{}-{}", handle.0, self.next_id)
    }
}
