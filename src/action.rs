//! Executes the default action derived for a resolved target. Never
//! retries (spec §4.7); failures surface as a plain error string on the
//! `ActionExecuted` event.

use crate::dom::{ActionKind, ElementHandle};
use crate::error::{Result, VoiceRouterError};

/// The executor's access to the live DOM: one element-targeted
/// operation per [`ActionKind`]. A real implementation dispatches
/// through `web-sys`; tests use `FakeExecutor`.
pub trait ActionExecutorBackend {
    fn click(&mut self, handle: &ElementHandle) -> Result<()>;
    fn focus(&mut self, handle: &ElementHandle) -> Result<()>;
    fn scroll_into_view_then_focus(&mut self, handle: &ElementHandle) -> Result<()>;
}

pub fn execute(backend: &mut dyn ActionExecutorBackend, action: ActionKind, handle: &ElementHandle) -> Result<()> {
    match action {
        ActionKind::Click | ActionKind::Activate => backend.click(handle),
        ActionKind::Focus => backend.focus(handle),
        ActionKind::ScrollFocus => backend.scroll_into_view_then_focus(handle),
    }
}

/// Deterministic backend for tests, mirroring the teacher's
/// `StubAudioSource`: records every call it receives and can be primed
/// to fail.
#[derive(Default)]
pub struct FakeExecutor {
    pub calls: Vec<(&'static str, ElementHandle)>,
    pub fail_with: Option<String>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionExecutorBackend for FakeExecutor {
    fn click(&mut self, handle: &ElementHandle) -> Result<()> {
        self.calls.push(("click", handle.clone()));
        match &self.fail_with {
            Some(msg) => Err(VoiceRouterError::ExecutionFailed(msg.clone())),
            None => Ok(()),
        }
    }

    fn focus(&mut self, handle: &ElementHandle) -> Result<()> {
        self.calls.push(("focus", handle.clone()));
        match &self.fail_with {
            Some(msg) => Err(VoiceRouterError::ExecutionFailed(msg.clone())),
            None => Ok(()),
        }
    }

    fn scroll_into_view_then_focus(&mut self, handle: &ElementHandle) -> Result<()> {
        self.calls.push(("scroll_focus", handle.clone()));
        match &self.fail_with {
            Some(msg) => Err(VoiceRouterError::ExecutionFailed(msg.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_and_activate_both_dispatch_click() {
        let mut backend = FakeExecutor::new();
        execute(&mut backend, ActionKind::Click, &ElementHandle(1)).unwrap();
        execute(&mut backend, ActionKind::Activate, &ElementHandle(2)).unwrap();
        assert_eq!(backend.calls, vec![("click", ElementHandle(1)), ("click", ElementHandle(2))]);
    }

    #[test]
    fn focus_dispatches_focus() {
        let mut backend = FakeExecutor::new();
        execute(&mut backend, ActionKind::Focus, &ElementHandle(3)).unwrap();
        assert_eq!(backend.calls, vec![("focus", ElementHandle(3))]);
    }

    #[test]
    fn failure_surfaces_as_execution_failed() {
        let mut backend = FakeExecutor {
            fail_with: Some("detached node".into()),
            ..Default::default()
        };
        let err = execute(&mut backend, ActionKind::ScrollFocus, &ElementHandle(4)).unwrap_err();
        assert_eq!(err.code(), "EXECUTION_FAILED");
    }
}
