//! Per-request bookkeeping: id minting and the payloads an in-flight
//! request needs to carry across a suspension point (capture timeout,
//! highlight delay, ambiguous-match hold).

use uuid::Uuid;

use crate::dom::{ActionKind, DomTarget};
use crate::events::RequestId;

pub fn new_request_id() -> RequestId {
    Uuid::new_v4().to_string()
}

/// An action chosen by the matcher, waiting on either the `highlightMs`
/// delay or an explicit user confirmation before it executes.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub request_id: RequestId,
    pub target: DomTarget,
    pub action: ActionKind,
}

/// State carried while the engine holds in the ambiguous-match error
/// state, waiting for `selectDisambiguationTarget` or `cancel`.
#[derive(Debug, Clone)]
pub struct AmbiguousHold {
    pub request_id: RequestId,
    pub candidates: Vec<DomTarget>,
}

pub fn action_kind_str(action: ActionKind) -> &'static str {
    match action {
        ActionKind::Click => "click",
        ActionKind::Activate => "activate",
        ActionKind::Focus => "focus",
        ActionKind::ScrollFocus => "scroll_focus",
    }
}
