//! DOM indexing: at request start, walk the accessible scope root and
//! produce a snapshot `TargetIndex` of every addressable element.
//!
//! The engine never touches a concrete DOM API directly; it goes
//! through the [`DomAdapter`] trait, mirroring the teacher's
//! `AudioSource`/`AudioSink` split (agent/src/types.rs) so the indexer
//! can be driven by an in-memory fake in tests and by `web-sys` in the
//! browser build.

#[cfg(feature = "browser")]
pub mod web_sys_adapter;

pub mod test_dom;

use crate::normalize::normalize;

/// Scope from which a `TargetIndex` was collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Page,
    Modal,
}

/// One addressable element, resolved at index time.
#[derive(Debug, Clone, PartialEq)]
pub struct DomTarget {
    pub id: String,
    pub handle: ElementHandle,
    pub raw_label: String,
    pub normalized_label: String,
    pub synonyms: Vec<String>,
    pub risk: Option<Risk>,
    pub default_action: ActionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Activate,
    Focus,
    ScrollFocus,
}

/// Opaque non-owning reference to a DOM element. Lifetime is bounded by
/// the browsing session and by the adapter that produced it; targets
/// must never be cached across requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementHandle(pub u64);

/// Snapshot of addressable targets plus the scope they were collected
/// from. Valid for exactly one resolution request.
#[derive(Debug, Clone)]
pub struct TargetIndex {
    pub targets: Vec<DomTarget>,
    pub scope: Scope,
}

/// Element kind as seen by eligibility/default-action rules. An adapter
/// classifies each candidate element into one of these before the
/// indexer applies eligibility and label-derivation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Button,
    AnchorWithHref,
    Input,
    Select,
    Textarea,
    DisclosureSummary,
    RoleButton,
    RoleLink,
    RoleTab,
    RoleMenuItem,
    RoleOption,
    Other,
}

impl ElementKind {
    fn is_natively_interactive(self) -> bool {
        matches!(
            self,
            ElementKind::Button
                | ElementKind::AnchorWithHref
                | ElementKind::Input
                | ElementKind::Select
                | ElementKind::Textarea
                | ElementKind::DisclosureSummary
        )
    }

    fn has_interactive_role(self) -> bool {
        matches!(
            self,
            ElementKind::RoleButton
                | ElementKind::RoleLink
                | ElementKind::RoleTab
                | ElementKind::RoleMenuItem
                | ElementKind::RoleOption
        )
    }

    fn default_action(self) -> ActionKind {
        match self {
            ElementKind::Button
            | ElementKind::AnchorWithHref
            | ElementKind::RoleButton
            | ElementKind::RoleLink => ActionKind::Click,
            ElementKind::RoleTab
            | ElementKind::RoleMenuItem
            | ElementKind::RoleOption
            | ElementKind::DisclosureSummary => ActionKind::Activate,
            ElementKind::Input | ElementKind::Select | ElementKind::Textarea => ActionKind::Focus,
            ElementKind::Other => ActionKind::ScrollFocus,
        }
    }
}

/// Raw facts an adapter reports about one candidate element, before the
/// indexer applies eligibility, visibility, allow/deny and label rules.
#[derive(Debug, Clone, Default)]
pub struct ElementFacts {
    pub has_voice_label_override: bool,
    pub voice_label: Option<String>,
    pub aria_label: Option<String>,
    pub labelledby_text: Option<String>,
    pub associated_label_text: Option<String>,
    pub visible_text: Option<String>,
    pub placeholder: Option<String>,
    pub title: Option<String>,
    pub is_text_entry: bool,

    pub visible: bool,
    pub deny: bool,
    pub allow: bool,
    pub matches_global_deny: bool,
    pub risk_high: bool,

    pub synonyms_raw: Option<String>,
    pub existing_voice_id: Option<String>,
}

/// The DOM access surface the indexer depends on. A real implementation
/// walks `window.document`; `TestDom` is an in-memory fake for tests.
pub trait DomAdapter {
    /// All elements in document order that declare a modal-scope marker
    /// (`dialog[open]`, `[role=dialog][aria-modal=true]`,
    /// `[aria-modal=true]`, `[data-voice-modal=true]`) and are visible.
    /// Each entry carries a stacking index used for topmost selection.
    fn modal_candidates(&self) -> Vec<(ElementHandle, i64)>;

    /// All elements within `scope_root` (None = whole document) that are
    /// candidate addressable elements, in document order, together with
    /// their classified kind and raw facts.
    fn candidates(&self, scope_root: Option<&ElementHandle>) -> Vec<(ElementHandle, ElementKind, ElementFacts)>;

    /// Write a stable `data-voice-id` attribute onto an element that
    /// lacks one, returning the id used (existing or newly generated).
    fn ensure_voice_id(&mut self, handle: &ElementHandle) -> String;
}

/// Build the Target Index for one request: select the scope root, filter
/// to eligible/visible/allowed elements, derive labels, and assign
/// default actions. See spec §4.5.
pub fn build_index(adapter: &mut dyn DomAdapter, global_deny_active: bool) -> (TargetIndex, Option<ElementHandle>) {
    let scope_root = select_scope_root(adapter);
    let scope = if scope_root.is_some() { Scope::Modal } else { Scope::Page };

    let candidates = adapter.candidates(scope_root.as_ref());
    let mut targets = Vec::new();

    for (handle, kind, facts) in candidates {
        if !is_eligible(kind, &facts) {
            continue;
        }
        if !facts.visible {
            continue;
        }
        if !is_allowed(&facts, global_deny_active) {
            continue;
        }
        let Some(raw_label) = derive_label(&facts) else {
            continue;
        };
        let normalized_label = normalize(&raw_label);
        if normalized_label.is_empty() {
            continue;
        }

        let id = facts
            .existing_voice_id
            .clone()
            .unwrap_or_else(|| adapter.ensure_voice_id(&handle));
        let synonyms = facts
            .synonyms_raw
            .as_deref()
            .map(parse_synonyms)
            .unwrap_or_default();
        let risk = facts.risk_high.then_some(Risk::High);

        targets.push(DomTarget {
            id,
            handle,
            raw_label,
            normalized_label,
            synonyms,
            risk,
            default_action: kind.default_action(),
        });
    }

    (TargetIndex { targets, scope }, scope_root)
}

fn select_scope_root(adapter: &dyn DomAdapter) -> Option<ElementHandle> {
    let mut candidates = adapter.modal_candidates();
    // Highest stacking index first; ties broken by latest document order,
    // i.e. last in the (document-order) list wins among ties.
    candidates.sort_by(|a, b| a.1.cmp(&b.1));
    let max_z = candidates.iter().map(|(_, z)| *z).max()?;
    candidates
        .into_iter()
        .filter(|(_, z)| *z == max_z)
        .last()
        .map(|(handle, _)| handle)
}

fn is_eligible(kind: ElementKind, facts: &ElementFacts) -> bool {
    facts.has_voice_label_override || kind.is_natively_interactive() || kind.has_interactive_role()
}

fn is_allowed(facts: &ElementFacts, global_deny_active: bool) -> bool {
    if facts.deny {
        return false;
    }
    if facts.allow {
        return true;
    }
    if global_deny_active && facts.matches_global_deny {
        return false;
    }
    true
}

fn derive_label(facts: &ElementFacts) -> Option<String> {
    let candidates = [
        facts.voice_label.as_deref(),
        facts.aria_label.as_deref(),
        facts.labelledby_text.as_deref(),
        facts.associated_label_text.as_deref(),
        facts.visible_text.as_deref(),
        facts.is_text_entry.then_some(facts.placeholder.as_deref()).flatten(),
        facts.title.as_deref(),
    ];
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}

fn parse_synonyms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(normalize)
        .filter(|s| !s.is_empty())
        .collect()
}
