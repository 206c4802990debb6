//! Input filling
//!
//! Each [`FillMethod`] is a strategy for putting a value into a form control
//! the way a user (or a framework listening for users) would see it: as a
//! sequence of dispatched events around the actual state change.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::Value;
use smol::Timer;
use weft_dom::{ControlKind, DomError, EventInit, EventInterface, NodeId, SelectorError};

use crate::describe::describe;
use crate::message::FillRequest;
use crate::page::Page;
use crate::BridgeConfig;

/// Fill failures, rendered verbatim into `error` replies
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum FillError {
    #[error("Input not found")]
    InputNotFound,

    #[error("Element not found")]
    ElementNotFound,

    #[error("Field not found")]
    FieldNotFound,

    #[error("Input is not an HTMLInputElement or HTMLTextAreaElement!")]
    NotTextInput,

    #[error("Input is not an HTMLInputElement!")]
    NotCheckable,

    #[error("Input is not an HTMLSelectElement!")]
    NotSelect,

    #[error("Unknown input type")]
    UnknownInputType,

    #[error("Input not filled successfully")]
    NotFilled,

    #[error("No {0}")]
    MissingGlobal(String),

    #[error("No React event handlers")]
    NoReactHandlers,

    /// A page handler threw
    #[error("{}", describe(.0).unwrap_or_else(|| "Unknown error".to_string()))]
    Thrown(Value),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// What a strategy reports when it does not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    Filled,
    Skipped(String),
    /// The strategy ran but cannot vouch for the result
    NotConfirmed,
}

impl FillOutcome {
    fn value_undefined() -> Self {
        Self::Skipped("Value is undefined".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMethod {
    Default,
    DefaultWithoutBlur,
    SetValue,
    SetValueOnly,
    ClearValue,
    SelectOption,
    SelectCheckboxOrRadio,
    Click,
    Blur,
    JQuery,
    React,
    ReactClick,
}

impl FillMethod {
    /// Method by wire name; anything unrecognised fills the default way
    pub fn parse(name: Option<&str>) -> Self {
        match name {
            Some("defaultWithoutBlur" | "vanillaWithoutBlur") => Self::DefaultWithoutBlur,
            Some("setValue") => Self::SetValue,
            Some("setValueOnly") => Self::SetValueOnly,
            Some("clearValue") => Self::ClearValue,
            Some("selectOption") => Self::SelectOption,
            Some("selectCheckboxOrRadio") => Self::SelectCheckboxOrRadio,
            Some("click") => Self::Click,
            Some("blur") => Self::Blur,
            Some("jQuery") => Self::JQuery,
            Some("react") => Self::React,
            Some("reactClick") => Self::ReactClick,
            _ => Self::Default,
        }
    }
}

/// A fill request with its descriptors resolved against the page
#[derive(Debug, Clone, PartialEq)]
pub struct FillContext {
    pub method: FillMethod,
    pub element: Option<NodeId>,
    pub value_element: Option<NodeId>,
    pub value: Option<Value>,
    pub event: Option<String>,
    pub event_options: Option<Value>,
    pub init: EventInit,
}

impl FillContext {
    pub fn new(
        request: &FillRequest,
        element: Option<NodeId>,
        value_element: Option<NodeId>,
    ) -> Self {
        Self {
            method: FillMethod::parse(request.method.as_deref()),
            element,
            value_element,
            value: request.value.clone(),
            event: request.event.clone(),
            event_options: request.event_options.clone(),
            init: event_init(request.event_options.as_ref()),
        }
    }

    /// `eventOptions.assign`, with `%VALUE%` replaced by `value`
    fn assigned(&self, value: Option<&Value>) -> BTreeMap<String, String> {
        let assign = self.event_options.as_ref().and_then(|o| o.get("assign"));
        let Some(Value::Object(assign)) = assign else {
            return BTreeMap::new();
        };
        assign
            .iter()
            .map(|(key, v)| {
                let v = match v {
                    Value::String(s) if s == "%VALUE%" => value.map(js_string).unwrap_or_default(),
                    other => js_string(other),
                };
                (key.clone(), v)
            })
            .collect()
    }
}

/// Event init from `eventOptions`, dropping members of the wrong type
fn event_init(options: Option<&Value>) -> EventInit {
    let Some(Value::Object(options)) = options else {
        return EventInit::default();
    };
    let mut options = options.clone();
    options.retain(|key, value| match key.as_str() {
        "bubbles" | "cancelable" | "composed" => value.is_boolean(),
        "key" | "code" => value.is_string(),
        "keyCode" | "repeat" => value.is_u64(),
        _ => false,
    });
    serde_json::from_value(Value::Object(options)).unwrap_or_default()
}

/// Value as a DOM property setter stringifies it
pub fn js_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(js_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Run the context's fill method
pub async fn fill(
    page: &RefCell<Page>,
    config: &BridgeConfig,
    ctx: &FillContext,
) -> Result<FillOutcome, FillError> {
    tracing::debug!(method = ?ctx.method, element = ?ctx.element, "fill");
    if ctx.method != FillMethod::Default {
        return fill_now(&mut page.borrow_mut(), config, ctx, ctx.method);
    }

    let Some(element) = ctx.element else {
        return Ok(FillOutcome::NotConfirmed);
    };
    if let Some(event) = &ctx.event {
        let interface = if ctx.init.has_key() {
            EventInterface::KeyboardEvent
        } else {
            EventInterface::Event
        };
        page.borrow_mut().fire(element, event, interface, &ctx.init);
        return Ok(FillOutcome::Filled);
    }

    let outcome = default_without_blur(&mut page.borrow_mut(), ctx)?;
    match outcome {
        FillOutcome::Filled => {}
        FillOutcome::Skipped(_) => return Ok(outcome),
        FillOutcome::NotConfirmed => return Err(FillError::NotFilled),
    }

    Timer::after(config.settle_delay()).await;
    page.borrow_mut().blur(element, &ctx.init);
    Ok(FillOutcome::Filled)
}

/// Methods that never suspend
fn fill_now(
    page: &mut Page,
    config: &BridgeConfig,
    ctx: &FillContext,
    method: FillMethod,
) -> Result<FillOutcome, FillError> {
    match method {
        FillMethod::Default | FillMethod::DefaultWithoutBlur => default_without_blur(page, ctx),
        FillMethod::SetValue => set_value(page, ctx.element, ctx.value.as_ref(), &ctx.init),
        FillMethod::SetValueOnly => set_value_only(page, ctx),
        FillMethod::ClearValue => {
            set_value(page, ctx.element, Some(&Value::String(String::new())), &ctx.init)
        }
        FillMethod::SelectOption => select_option(page, ctx),
        FillMethod::SelectCheckboxOrRadio => select_checkbox_or_radio(page, ctx),
        FillMethod::Click => Ok(click(page, ctx.element, &ctx.init)),
        FillMethod::Blur => blur(page, ctx),
        FillMethod::JQuery => fill_jquery(page, ctx),
        FillMethod::React => fill_react(page, config, ctx),
        FillMethod::ReactClick => react_click(page, config, ctx),
    }
}

fn default_without_blur(page: &mut Page, ctx: &FillContext) -> Result<FillOutcome, FillError> {
    let element = ctx.element.ok_or(FillError::InputNotFound)?;
    let tree = page.tree();

    if tree.control_kind(element) == Some(ControlKind::Select) {
        select_option(page, ctx)
    } else if tree.is_button_like(element) {
        Ok(click(page, Some(element), &ctx.init))
    } else if tree.is_checkable(element)
        || ctx.value_element.is_some_and(|n| tree.is_checkable(n))
    {
        select_checkbox_or_radio(page, ctx)
    } else if tree.is_text_control(element) {
        set_value(page, Some(element), ctx.value.as_ref(), &ctx.init)
    } else {
        Err(FillError::UnknownInputType)
    }
}

fn set_value(
    page: &mut Page,
    element: Option<NodeId>,
    value: Option<&Value>,
    init: &EventInit,
) -> Result<FillOutcome, FillError> {
    let Some(value) = value else {
        return Ok(FillOutcome::value_undefined());
    };
    let element = element
        .filter(|&n| page.tree().is_text_control(n))
        .ok_or(FillError::NotTextInput)?;

    page.focus(element, init);
    page.click(element, init);
    page.fire(element, "keydown", EventInterface::KeyboardEvent, init);
    page.fire(element, "keypress", EventInterface::KeyboardEvent, init);
    page.tree_mut().set_value(element, &js_string(value))?;
    page.fire(element, "textInput", EventInterface::CustomEvent, init);
    page.fire(element, "input", EventInterface::InputEvent, init);
    page.fire(element, "keyup", EventInterface::KeyboardEvent, init);
    page.fire(element, "change", EventInterface::Event, init);
    Ok(FillOutcome::Filled)
}

fn set_value_only(page: &mut Page, ctx: &FillContext) -> Result<FillOutcome, FillError> {
    let Some(value) = &ctx.value else {
        return Ok(FillOutcome::value_undefined());
    };
    let element = ctx
        .element
        .filter(|&n| page.tree().is_text_control(n))
        .ok_or(FillError::NotTextInput)?;
    page.tree_mut().set_value(element, &js_string(value))?;
    Ok(FillOutcome::Filled)
}

/// Value carried by an `<option>` value element, else the request's value
fn option_or_value(page: &Page, ctx: &FillContext) -> Option<Value> {
    match ctx.value_element {
        Some(opt) if page.tree().control_kind(opt) == Some(ControlKind::Option) => {
            Some(Value::String(page.tree().option_value(opt)))
        }
        _ => ctx.value.clone(),
    }
}

fn select_option(page: &mut Page, ctx: &FillContext) -> Result<FillOutcome, FillError> {
    let Some(value) = option_or_value(page, ctx) else {
        return Ok(FillOutcome::value_undefined());
    };
    let element = ctx
        .element
        .filter(|&n| page.tree().control_kind(n) == Some(ControlKind::Select))
        .ok_or(FillError::NotSelect)?;
    let init = &ctx.init;

    page.focus(element, init);
    page.click(element, init);
    page.tree_mut().set_value(element, &js_string(&value))?;
    page.fire(element, "textInput", EventInterface::CustomEvent, init);
    page.fire(element, "input", EventInterface::InputEvent, init);
    page.fire(element, "change", EventInterface::Event, init);
    page.click(element, init);
    page.blur(element, init);
    Ok(FillOutcome::Filled)
}

fn select_checkbox_or_radio(page: &mut Page, ctx: &FillContext) -> Result<FillOutcome, FillError> {
    let (target, value) = match ctx.value_element {
        Some(n) if page.tree().is_checkable(n) => (Some(n), true),
        _ => (ctx.element, ctx.value.as_ref().is_none_or(truthy)),
    };
    let Some(target) = target else {
        return Ok(FillOutcome::NotConfirmed);
    };
    let init = &ctx.init;

    if !matches!(page.tree().control_kind(target), Some(ControlKind::Input(_))) {
        if !page.tree().is_checkable(target) {
            return Err(FillError::NotCheckable);
        }
        if value {
            page.focus(target, init);
            page.click(target, init);
            page.fire(target, "change", EventInterface::Event, init);
            page.blur(target, init);
        }
        return Ok(FillOutcome::Filled);
    }

    if page.tree().checked(target) != value {
        page.focus(target, init);
        page.click(target, init);
        page.tree_mut().set_checked(target, value)?;
        page.fire(target, "textInput", EventInterface::CustomEvent, init);
        page.fire(target, "input", EventInterface::InputEvent, init);
        page.fire(target, "change", EventInterface::Event, init);
        page.blur(target, init);
    }
    Ok(FillOutcome::Filled)
}

fn click(page: &mut Page, element: Option<NodeId>, init: &EventInit) -> FillOutcome {
    let Some(element) = element else {
        return FillOutcome::NotConfirmed;
    };
    page.fire(element, "focus", EventInterface::FocusEvent, init);
    page.fire(element, "mousedown", EventInterface::MouseEvent, init);
    page.fire(element, "mouseup", EventInterface::MouseEvent, init);
    page.click(element, init);
    page.fire(element, "blur", EventInterface::FocusEvent, init);
    FillOutcome::Filled
}

fn blur(page: &mut Page, ctx: &FillContext) -> Result<FillOutcome, FillError> {
    let element = ctx
        .element
        .filter(|&n| page.tree().is_text_control(n))
        .ok_or(FillError::NotTextInput)?;
    page.blur(element, &ctx.init);
    Ok(FillOutcome::Filled)
}

// ----------------------------------------------------------------------
// jQuery
// ----------------------------------------------------------------------

fn fill_jquery(page: &mut Page, ctx: &FillContext) -> Result<FillOutcome, FillError> {
    if !page.has_global("jQuery") {
        return Err(FillError::MissingGlobal("jQuery".to_string()));
    }
    let element = ctx.element.ok_or(FillError::ElementNotFound)?;
    let is_select = page.tree().control_kind(element) == Some(ControlKind::Select);
    let value = if is_select { option_or_value(page, ctx) } else { ctx.value.clone() };

    match jquery_sequence(page, ctx, element, is_select, value.as_ref()) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            let current = page.tree().value(element).map(Value::String);
            if ctx.event.is_none() && current != value {
                tracing::warn!(error = %err, "jQuery fill left a different value");
                return Ok(FillOutcome::NotConfirmed);
            }
            Err(err)
        }
    }
}

fn jquery_sequence(
    page: &mut Page,
    ctx: &FillContext,
    element: NodeId,
    is_select: bool,
    value: Option<&Value>,
) -> Result<FillOutcome, FillError> {
    let init = &ctx.init;
    if let Some(event) = &ctx.event {
        page.jquery_trigger(element, event, init, BTreeMap::new())?;
        return Ok(FillOutcome::Filled);
    }

    let tree = page.tree();
    let checkable = ctx
        .value_element
        .filter(|&n| tree.is_checkable(n))
        .or_else(|| tree.is_checkable(element).then_some(element));
    let assigned = ctx.assigned(value);
    let trigger = |page: &mut Page, node: NodeId, event: &str| {
        page.jquery_trigger(node, event, init, assigned.clone())
    };

    if is_select {
        let Some(value) = value else {
            return Ok(FillOutcome::value_undefined());
        };
        trigger(page, element, "focus")?;
        trigger(page, element, "click")?;
        page.tree_mut().set_value(element, &js_string(value))?;
        trigger(page, element, "input")?;
        trigger(page, element, "change")?;
    } else if let Some(target) = checkable {
        trigger(page, target, "focus")?;
        trigger(page, target, "click")?;
        page.tree_mut().set_checked(target, value.is_some_and(truthy))?;
        trigger(page, target, "input")?;
        trigger(page, target, "change")?;
    } else {
        let Some(value) = value else {
            return Ok(FillOutcome::value_undefined());
        };
        trigger(page, element, "focus")?;
        trigger(page, element, "click")?;
        trigger(page, element, "keydown")?;
        trigger(page, element, "keypress")?;
        page.tree_mut().set_value(element, &js_string(value))?;
        trigger(page, element, "input")?;
        trigger(page, element, "keyup")?;
        trigger(page, element, "change")?;
    }
    Ok(FillOutcome::Filled)
}

// ----------------------------------------------------------------------
// React
// ----------------------------------------------------------------------

/// Dispatches on the element, then calls the matching props handler
struct ReactTarget<'a> {
    element: NodeId,
    prop_key: String,
    init: &'a EventInit,
}

impl ReactTarget<'_> {
    fn emit(&self, page: &mut Page, event_type: &str, interface: EventInterface, handler: &str) {
        page.fire(self.element, event_type, interface, self.init);
        if page.tree().expando_has_member(self.element, &self.prop_key, handler) {
            let (element, key) = (self.element, self.prop_key.as_str());
            page.invoke_handler(element, key, handler, event_type, interface, self.init);
        }
    }
}

fn fill_react(
    page: &mut Page,
    config: &BridgeConfig,
    ctx: &FillContext,
) -> Result<FillOutcome, FillError> {
    let element = ctx.element.ok_or(FillError::ElementNotFound)?;
    let prop_key = page
        .react_props_key(element, &config.react_marker_prefixes)
        .ok_or(FillError::NoReactHandlers)?;
    let react = ReactTarget { element, prop_key, init: &ctx.init };

    let kind = page.tree().control_kind(element);
    if kind == Some(ControlKind::Select) {
        let value = option_or_value(page, ctx);
        react.emit(page, "focus", EventInterface::FocusEvent, "onFocus");
        react.emit(page, "click", EventInterface::MouseEvent, "onClick");
        if let Some(value) = &value {
            page.tree_mut().set_value(element, &js_string(value))?;
        }
        react.emit(page, "input", EventInterface::InputEvent, "onInput");
        react.emit(page, "change", EventInterface::Event, "onChange");
        react.emit(page, "blur", EventInterface::FocusEvent, "onBlur");
        return Ok(FillOutcome::Filled);
    }

    if page.tree().is_button_like(element) {
        react.emit(page, "focus", EventInterface::FocusEvent, "onFocus");
        react.emit(page, "mousedown", EventInterface::MouseEvent, "onMouseDown");
        react.emit(page, "mouseup", EventInterface::MouseEvent, "onMouseUp");
        react.emit(page, "click", EventInterface::MouseEvent, "onClick");
        react.emit(page, "blur", EventInterface::FocusEvent, "onBlur");
        return Ok(FillOutcome::Filled);
    }

    let tree = page.tree();
    let checkable = ctx
        .value_element
        .filter(|&n| tree.is_checkable(n))
        .or_else(|| tree.is_checkable(element).then_some(element));
    if let Some(target) = checkable {
        let value = ctx.value.as_ref().is_none_or(truthy);
        if matches!(page.tree().control_kind(target), Some(ControlKind::Input(_))) {
            if page.tree().checked(target) != value {
                react.emit(page, "focus", EventInterface::FocusEvent, "onFocus");
                react.emit(page, "click", EventInterface::MouseEvent, "onClick");
                page.tree_mut().set_checked(target, value)?;
                react.emit(page, "input", EventInterface::InputEvent, "onInput");
                react.emit(page, "change", EventInterface::Event, "onChange");
                react.emit(page, "blur", EventInterface::FocusEvent, "onBlur");
            }
        } else if value {
            react.emit(page, "focus", EventInterface::FocusEvent, "onFocus");
            react.emit(page, "click", EventInterface::MouseEvent, "onClick");
            react.emit(page, "change", EventInterface::Event, "onChange");
            react.emit(page, "blur", EventInterface::FocusEvent, "onBlur");
        }
        return Ok(FillOutcome::Filled);
    }

    if page.tree().is_text_control(element) {
        let Some(value) = &ctx.value else {
            return Ok(FillOutcome::value_undefined());
        };
        let text = js_string(value);
        let rounds = 1 + ctx.init.repeat.unwrap_or(0);
        for _ in 0..rounds {
            react.emit(page, "focus", EventInterface::FocusEvent, "onFocus");
            react.emit(page, "click", EventInterface::MouseEvent, "onClick");
            react.emit(page, "keydown", EventInterface::KeyboardEvent, "onKeyDown");
            react.emit(page, "keypress", EventInterface::KeyboardEvent, "onKeyPress");
            page.tree_mut().set_value(element, &text)?;
            react.emit(page, "input", EventInterface::InputEvent, "onInput");
            react.emit(page, "keyup", EventInterface::KeyboardEvent, "onKeyUp");
            react.emit(page, "change", EventInterface::Event, "onChange");
            react.emit(page, "blur", EventInterface::FocusEvent, "onBlur");
        }
        return Ok(FillOutcome::Filled);
    }

    Err(FillError::UnknownInputType)
}

fn react_click(
    page: &mut Page,
    config: &BridgeConfig,
    ctx: &FillContext,
) -> Result<FillOutcome, FillError> {
    let element = ctx.element.ok_or(FillError::ElementNotFound)?;
    let handler = page
        .react_props_key(element, &config.react_marker_prefixes)
        .filter(|key| page.tree().expando_has_member(element, key, "onClick"));

    match handler {
        Some(key) => {
            let interface = EventInterface::MouseEvent;
            page.invoke_handler(element, &key, "onClick", "click", interface, &ctx.init);
        }
        None => {
            tracing::debug!(?element, "no React click handler, clicking natively");
            page.click(element, &ctx.init);
        }
    }
    Ok(FillOutcome::Filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use weft_dom::Document;

    fn ctx(method: FillMethod, element: Option<NodeId>, value: Option<Value>) -> FillContext {
        FillContext {
            method,
            element,
            value_element: None,
            value,
            event: None,
            event_options: None,
            init: EventInit::default(),
        }
    }

    fn page_with(tag: &str, attrs: &[(&str, &str)]) -> (Page, NodeId) {
        let mut doc = Document::new("https://example.test/");
        let body = doc.body().unwrap();
        let tree = doc.tree_mut();
        let el = tree.create_element(tag);
        for (name, value) in attrs {
            tree.set_attribute(el, name, value).unwrap();
        }
        tree.append_child(body, el).unwrap();
        (Page::new(doc), el)
    }

    #[test]
    fn test_method_names() {
        assert_eq!(FillMethod::parse(None), FillMethod::Default);
        assert_eq!(FillMethod::parse(Some("vanillaWithBlur")), FillMethod::Default);
        assert_eq!(FillMethod::parse(Some("vanillaWithoutBlur")), FillMethod::DefaultWithoutBlur);
        assert_eq!(FillMethod::parse(Some("tinyMCE")), FillMethod::Default);
        assert_eq!(FillMethod::parse(Some("reactClick")), FillMethod::ReactClick);
    }

    #[test]
    fn test_js_string_and_truthiness() {
        assert_eq!(js_string(&json!(12)), "12");
        assert_eq!(js_string(&json!(1.5)), "1.5");
        assert_eq!(js_string(&json!(null)), "");
        assert_eq!(js_string(&json!(["a", 1, null])), "a,1,");
        assert_eq!(js_string(&json!({"a": 1})), "[object Object]");
        assert!(!truthy(&json!("")));
        assert!(!truthy(&json!(0)));
        assert!(truthy(&json!("false")));
        assert!(truthy(&json!([])));
    }

    #[test]
    fn test_event_init_is_lenient() {
        let init = event_init(Some(&json!({"key": "Enter", "repeat": "twice", "bubbles": true})));
        assert_eq!(init.key.as_deref(), Some("Enter"));
        assert_eq!(init.repeat, None);
        assert!(init.bubbles);
        assert_eq!(event_init(Some(&json!("nope"))), EventInit::default());
    }

    #[test]
    fn test_assign_substitutes_value() {
        let mut c = ctx(FillMethod::JQuery, None, Some(json!("Ada")));
        c.event_options = Some(json!({"assign": {"which": 13, "data": "%VALUE%"}}));
        let assigned = c.assigned(c.value.as_ref());
        assert_eq!(assigned["which"], "13");
        assert_eq!(assigned["data"], "Ada");
    }

    #[test]
    fn test_set_value_sequence() {
        let (mut page, input) = page_with("input", &[]);
        let init = EventInit::default();
        let outcome = set_value(&mut page, Some(input), Some(&json!("Ada")), &init).unwrap();
        assert_eq!(outcome, FillOutcome::Filled);
        assert_eq!(page.tree().value(input).as_deref(), Some("Ada"));
        assert_eq!(
            page.tree().events().native_types(input),
            ["focus", "click", "keydown", "keypress", "textInput", "input", "keyup", "change"]
        );
    }

    #[test]
    fn test_set_value_without_value_is_skipped() {
        let (mut page, div) = page_with("div", &[]);
        // the missing value wins over the wrong element type
        let outcome = set_value(&mut page, Some(div), None, &EventInit::default()).unwrap();
        assert_eq!(outcome, FillOutcome::Skipped("Value is undefined".into()));
        assert!(page.tree().events().is_empty());

        let init = EventInit::default();
        let err = set_value(&mut page, Some(div), Some(&json!("x")), &init).unwrap_err();
        assert_eq!(err.to_string(), "Input is not an HTMLInputElement or HTMLTextAreaElement!");
    }

    #[test]
    fn test_checkbox_only_toggles_on_change() {
        let (mut page, checkbox) = page_with("input", &[("type", "checkbox"), ("checked", "")]);
        let c = ctx(FillMethod::SelectCheckboxOrRadio, Some(checkbox), None);
        assert_eq!(select_checkbox_or_radio(&mut page, &c).unwrap(), FillOutcome::Filled);
        assert!(page.tree().events().is_empty());

        let c = ctx(FillMethod::SelectCheckboxOrRadio, Some(checkbox), Some(json!(false)));
        select_checkbox_or_radio(&mut page, &c).unwrap();
        assert!(!page.tree().checked(checkbox));
        assert_eq!(
            page.tree().events().native_types(checkbox),
            ["focus", "click", "textInput", "input", "change", "blur"]
        );
    }

    #[test]
    fn test_role_checkbox() {
        let (mut page, div) = page_with("div", &[("role", "checkbox")]);
        let c = ctx(FillMethod::SelectCheckboxOrRadio, Some(div), Some(json!(true)));
        select_checkbox_or_radio(&mut page, &c).unwrap();
        assert_eq!(page.tree().events().native_types(div), ["focus", "click", "change", "blur"]);

        let (mut page, span) = page_with("span", &[]);
        let c = ctx(FillMethod::SelectCheckboxOrRadio, Some(span), None);
        assert_eq!(select_checkbox_or_radio(&mut page, &c), Err(FillError::NotCheckable));
    }

    #[test]
    fn test_click_sequence() {
        let (mut page, button) = page_with("button", &[]);
        assert_eq!(click(&mut page, Some(button), &EventInit::default()), FillOutcome::Filled);
        assert_eq!(
            page.tree().events().native_types(button),
            ["focus", "mousedown", "mouseup", "click", "blur"]
        );
        assert_eq!(click(&mut page, None, &EventInit::default()), FillOutcome::NotConfirmed);
    }

    #[test]
    fn test_default_routes_unknown_elements() {
        let (mut page, div) = page_with("div", &[]);
        let c = ctx(FillMethod::DefaultWithoutBlur, Some(div), Some(json!("x")));
        assert_eq!(default_without_blur(&mut page, &c), Err(FillError::UnknownInputType));

        let c = ctx(FillMethod::DefaultWithoutBlur, None, Some(json!("x")));
        assert_eq!(default_without_blur(&mut page, &c), Err(FillError::InputNotFound));
    }

    #[test]
    fn test_jquery_requires_global() {
        let (mut page, input) = page_with("input", &[]);
        let c = ctx(FillMethod::JQuery, Some(input), Some(json!("x")));
        let err = fill_jquery(&mut page, &c).unwrap_err();
        assert_eq!(err.to_string(), "No jQuery");
    }

    #[test]
    fn test_jquery_fault_after_value_set_is_rethrown() {
        let (mut page, input) = page_with("input", &[]);
        page.define_global("jQuery");
        page.set_jquery_fault(input, "change", json!({"message": "handler exploded"}));
        let c = ctx(FillMethod::JQuery, Some(input), Some(json!("Ada")));
        let err = fill_jquery(&mut page, &c).unwrap_err();
        assert_eq!(err.to_string(), "handler exploded");
    }

    #[test]
    fn test_jquery_fault_before_value_set_is_unconfirmed() {
        let (mut page, input) = page_with("input", &[]);
        page.define_global("jQuery");
        page.set_jquery_fault(input, "keydown", json!("nope"));
        let c = ctx(FillMethod::JQuery, Some(input), Some(json!("Ada")));
        assert_eq!(fill_jquery(&mut page, &c), Ok(FillOutcome::NotConfirmed));
    }

    #[test]
    fn test_react_requires_props() {
        let (mut page, input) = page_with("input", &[]);
        let c = ctx(FillMethod::React, Some(input), Some(json!("x")));
        let outcome = fill_react(&mut page, &BridgeConfig::default(), &c);
        assert_eq!(outcome, Err(FillError::NoReactHandlers));
    }

    #[test]
    fn test_react_text_repeats() {
        let (mut page, input) = page_with("input", &[]);
        page.set_react_props(input, "__reactProps$x", ["onChange", "onInput"]).unwrap();
        let mut c = ctx(FillMethod::React, Some(input), Some(json!("Ada")));
        c.init.repeat = Some(1);
        fill_react(&mut page, &BridgeConfig::default(), &c).unwrap();

        let events = page.tree().events();
        assert_eq!(events.handlers(input), ["onInput", "onChange", "onInput", "onChange"]);
        assert_eq!(events.native_types(input).len(), 18);
        assert_eq!(page.tree().value(input).as_deref(), Some("Ada"));
    }

    #[test]
    fn test_react_click_falls_back_to_native() {
        let (mut page, button) = page_with("button", &[]);
        let click = ctx(FillMethod::ReactClick, Some(button), None);
        react_click(&mut page, &BridgeConfig::default(), &click).unwrap();
        assert_eq!(page.tree().events().native_types(button), ["click"]);
        assert!(page.tree().events().handlers(button).is_empty());

        page.set_react_props(button, "__reactEventHandlers$y", ["onClick"]).unwrap();
        react_click(&mut page, &BridgeConfig::default(), &click).unwrap();
        assert_eq!(page.tree().events().handlers(button), ["onClick"]);
    }
}
