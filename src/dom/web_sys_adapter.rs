//! Real browser-backed [`DomAdapter`], built on `web-sys`/`js-sys`.
//! Compiled only under the `browser` feature; the pure indexing logic in
//! `dom::mod` never depends on these types directly.

use std::cell::RefCell;

use js_sys::Array;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlInputElement, HtmlTextAreaElement};

use super::{DomAdapter, ElementFacts, ElementHandle, ElementKind};

const MODAL_SELECTOR: &str = "dialog[open], [role=\"dialog\"][aria-modal=\"true\"], [aria-modal=\"true\"], [data-voice-modal=\"true\"]";
const CANDIDATE_SELECTOR: &str = "\
    button, a[href], input:not([type=\"hidden\"]), select, textarea, \
    details > summary, \
    [role=\"button\"], [role=\"link\"], [role=\"tab\"], [role=\"menuitem\"], [role=\"option\"], \
    [data-voice-label]";

pub struct WebSysAdapter {
    document: Document,
    deny_selectors: Vec<String>,
    // Every `ElementHandle` minted this request indexes into here.
    // `RefCell` because `DomAdapter::candidates`/`modal_candidates` take
    // `&self`, matching the rest of the engine's read-only index pass.
    handles: RefCell<Vec<Element>>,
}

impl WebSysAdapter {
    pub fn new(document: Document, deny_selectors: Vec<String>) -> Self {
        Self {
            document,
            deny_selectors,
            handles: RefCell::new(Vec::new()),
        }
    }

    fn register(&self, el: Element) -> ElementHandle {
        let mut handles = self.handles.borrow_mut();
        let id = handles.len() as u64;
        handles.push(el);
        ElementHandle(id)
    }

    fn classify(el: &Element) -> ElementKind {
        let tag = el.tag_name().to_lowercase();
        let role = el.get_attribute("role").unwrap_or_default();
        match tag.as_str() {
            "button" => ElementKind::Button,
            "a" if el.has_attribute("href") => ElementKind::AnchorWithHref,
            "input" => ElementKind::Input,
            "select" => ElementKind::Select,
            "textarea" => ElementKind::Textarea,
            "summary" => ElementKind::DisclosureSummary,
            _ => match role.as_str() {
                "button" => ElementKind::RoleButton,
                "link" => ElementKind::RoleLink,
                "tab" => ElementKind::RoleTab,
                "menuitem" => ElementKind::RoleMenuItem,
                "option" => ElementKind::RoleOption,
                _ => ElementKind::Other,
            },
        }
    }

    fn is_visible(el: &Element) -> bool {
        if el.has_attribute("hidden") {
            return false;
        }
        if el.get_attribute("aria-hidden").as_deref() == Some("true") {
            return false;
        }
        if let Some(html_el) = el.dyn_ref::<HtmlElement>() {
            let style = match web_sys::window().and_then(|w| w.get_computed_style(html_el).ok().flatten()) {
                Some(s) => s,
                None => return true,
            };
            if style.get_property_value("display").unwrap_or_default() == "none" {
                return false;
            }
            if style.get_property_value("visibility").unwrap_or_default() == "hidden" {
                return false;
            }
        }
        let rect = el.get_bounding_client_rect();
        rect.width() > 0.0 || rect.height() > 0.0
    }

    fn labelledby_text(&self, el: &Element) -> Option<String> {
        let ids = el.get_attribute("aria-labelledby")?;
        let mut parts = Vec::new();
        for id in ids.split_whitespace() {
            if let Some(node) = self.document.get_element_by_id(id) {
                let text = node.text_content().unwrap_or_default();
                if !text.trim().is_empty() {
                    parts.push(text.trim().to_string());
                }
            }
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    fn associated_label_text(&self, el: &Element) -> Option<String> {
        if let Some(id) = el.get_attribute("id") {
            let escaped = id.replace('"', "\\\"");
            if let Ok(Some(label)) = self.document.query_selector(&format!("label[for=\"{escaped}\"]")) {
                let text = label.text_content().unwrap_or_default();
                if !text.trim().is_empty() {
                    return Some(text.trim().to_string());
                }
            }
        }
        let mut node = el.parent_element();
        while let Some(ancestor) = node {
            if ancestor.tag_name().eq_ignore_ascii_case("label") {
                let text = ancestor.text_content().unwrap_or_default();
                if !text.trim().is_empty() {
                    return Some(text.trim().to_string());
                }
            }
            node = ancestor.parent_element();
        }
        None
    }

    fn placeholder(el: &Element) -> Option<String> {
        if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
            let p = input.placeholder();
            return (!p.is_empty()).then_some(p);
        }
        if let Some(textarea) = el.dyn_ref::<HtmlTextAreaElement>() {
            let p = textarea.placeholder();
            return (!p.is_empty()).then_some(p);
        }
        None
    }

    fn matches_global_deny(&self, el: &Element) -> bool {
        self.deny_selectors
            .iter()
            .any(|selector| el.matches(selector).unwrap_or(false))
    }

    fn facts_for(&self, el: &Element, kind: ElementKind) -> ElementFacts {
        let is_text_entry = matches!(kind, ElementKind::Input | ElementKind::Textarea);
        ElementFacts {
            has_voice_label_override: el.has_attribute("data-voice-label"),
            voice_label: el.get_attribute("data-voice-label"),
            aria_label: el.get_attribute("aria-label"),
            labelledby_text: self.labelledby_text(el),
            associated_label_text: self.associated_label_text(el),
            visible_text: {
                let text = el.text_content().unwrap_or_default();
                (!text.trim().is_empty()).then(|| text.trim().to_string())
            },
            placeholder: Self::placeholder(el),
            title: el.get_attribute("title"),
            is_text_entry,
            visible: Self::is_visible(el),
            deny: el.get_attribute("data-voice-deny").as_deref() == Some("true"),
            allow: el.get_attribute("data-voice-allow").as_deref() == Some("true"),
            matches_global_deny: self.matches_global_deny(el),
            risk_high: el.get_attribute("data-voice-risk").as_deref() == Some("high"),
            synonyms_raw: el.get_attribute("data-voice-synonyms"),
            existing_voice_id: el.get_attribute("data-voice-id"),
        }
    }

    fn query_all(&self, root: Option<&Element>, selector: &str) -> Vec<Element> {
        let list = match root {
            Some(r) => r.query_selector_all(selector),
            None => self.document.query_selector_all(selector),
        };
        let Ok(list) = list else { return Vec::new() };
        let array = Array::from(&list);
        array
            .iter()
            .filter_map(|v| v.dyn_into::<Element>().ok())
            .collect()
    }
}

impl DomAdapter for WebSysAdapter {
    fn modal_candidates(&self) -> Vec<(ElementHandle, i64)> {
        self.handles.borrow_mut().clear();
        self.query_all(None, MODAL_SELECTOR)
            .into_iter()
            .filter(Self::is_visible)
            .map(|el| {
                let z = el
                    .dyn_ref::<HtmlElement>()
                    .and_then(|html_el| web_sys::window().and_then(|w| w.get_computed_style(html_el).ok().flatten()))
                    .and_then(|s| s.get_property_value("z-index").ok())
                    .and_then(|v| v.parse::<i64>().ok())
                    .unwrap_or(0);
                let handle = self.register(el);
                (handle, z)
            })
            .collect()
    }

    fn candidates(&self, scope_root: Option<&ElementHandle>) -> Vec<(ElementHandle, ElementKind, ElementFacts)> {
        let root_el = scope_root.and_then(|h| self.handles.borrow().get(h.0 as usize).cloned());
        self.handles.borrow_mut().clear();
        let elements = self.query_all(root_el.as_ref(), CANDIDATE_SELECTOR);
        elements
            .into_iter()
            .map(|el| {
                let kind = Self::classify(&el);
                let facts = self.facts_for(&el, kind);
                let handle = self.register(el);
                (handle, kind, facts)
            })
            .collect()
    }

    fn ensure_voice_id(&mut self, handle: &ElementHandle) -> String {
        if let Some(el) = self.handles.borrow().get(handle.0 as usize) {
            if let Some(existing) = el.get_attribute("data-voice-id") {
                return existing;
            }
            let generated = format!("voice-{}", uuid::Uuid::new_v4());
            let _ = el.set_attribute("data-voice-id", &generated);
            return generated;
        }
        format!("voice-{}", uuid::Uuid::new_v4())
    }
}
