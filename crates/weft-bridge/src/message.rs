//! Wire messages
//!
//! Inbound payloads arrive as window messages whose `data.action` names the
//! request. Outbound replies carry their own action and are posted back to
//! the same window.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use weft_locate::ElementDescriptor;

use crate::BridgeConfig;

/// Identifies the window a message was posted from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u32);

/// A message event: the posting window and the structured-clone payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub source: WindowId,
    pub data: Value,
}

impl Envelope {
    pub fn new(source: WindowId, data: Value) -> Self {
        Self { source, data }
    }

    /// The payload's `action`, if any
    pub fn action(&self) -> Option<&str> {
        self.data.get("action").and_then(Value::as_str)
    }
}

/// Which request an action names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Fill,
    Track,
    WaitFor,
}

impl RequestKind {
    /// Match a prefixed action name
    pub fn from_action(action: &str, config: &BridgeConfig) -> Option<Self> {
        match action.strip_prefix(config.action_prefix.as_str())? {
            "fillInput" => Some(Self::Fill),
            "trackInput" => Some(Self::Track),
            "waitFor" => Some(Self::WaitFor),
            _ => None,
        }
    }

    /// Action name of the replies to this request
    pub fn reply_action(self, config: &BridgeConfig) -> String {
        config.action(match self {
            Self::Fill => "updateFilledInput",
            Self::Track => "updateTrackedInput",
            Self::WaitFor => "updateWaitFor",
        })
    }
}

/// Keep an explicit JSON `null` distinct from an absent field
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundInput {
    pub found_element: ElementDescriptor,
    /// Opaque caller key echoed in the reply
    #[serde(default)]
    pub key_path: Value,
}

/// `fillInput` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillRequest {
    pub found_input: FoundInput,
    #[serde(default)]
    pub found_value_element: Option<ElementDescriptor>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub value: Option<Value>,
    /// Custom event to dispatch instead of filling
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub event_options: Option<Value>,
}

/// Path and index of the tracked input inside its field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputLocation {
    pub element_path: String,
    #[serde(default)]
    pub element_index: usize,
}

/// A CSS selector, or a list of them matched as one comma-joined list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SelectorText {
    One(String),
    List(Vec<String>),
}

impl SelectorText {
    pub fn joined(&self) -> String {
        match self {
            SelectorText::One(selector) => selector.clone(),
            SelectorText::List(selectors) => selectors.join(", "),
        }
    }
}

impl From<&str> for SelectorText {
    fn from(selector: &str) -> Self {
        SelectorText::One(selector.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedInputSelector {
    /// Elements whose text is reported instead of the input's value
    #[serde(default)]
    pub input_text_path: Option<SelectorText>,
}

/// The tracked input as the page last found it
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundTrackedInput {
    pub found_field_element: ElementDescriptor,
    #[serde(default)]
    pub found_input_element: Option<InputLocation>,
    #[serde(default)]
    pub tracked_input_selector: TrackedInputSelector,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedInput {
    #[serde(default)]
    pub label_text: String,
}

/// `trackInput` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub tracked_input: TrackedInput,
    pub found_tracked_input: FoundTrackedInput,
    #[serde(default)]
    pub method: Option<String>,
}

/// `waitFor` payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitRequest {
    pub found_element: ElementDescriptor,
    #[serde(default)]
    pub method: Option<String>,
    /// Deadline in milliseconds
    #[serde(default)]
    pub time: Option<u64>,
}

/// A reply posted back to the window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outbound {
    pub action: String,
    #[serde(flatten)]
    pub reply: Reply,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Fill(FillReply),
    Track(TrackReply),
    TrackUpdate(TrackUpdate),
    Wait(WaitReply),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillStatus {
    Filled,
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FillReply {
    pub key_path: Value,
    pub status: FillStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Tracking,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackReply {
    pub label_text: String,
    pub status: TrackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Posted whenever a tracked input changes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackUpdate {
    pub label_text: String,
    /// A string, or a list of strings for checkbox/radio groups
    pub input_value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaitReply {
    pub status: WaitStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_matching() {
        let config = BridgeConfig::default();
        assert_eq!(RequestKind::from_action("__weft__fillInput", &config), Some(RequestKind::Fill));
        assert_eq!(
            RequestKind::from_action("__weft__waitFor", &config),
            Some(RequestKind::WaitFor)
        );
        assert_eq!(RequestKind::from_action("__weft__updateFilledInput", &config), None);
        assert_eq!(RequestKind::from_action("fillInput", &config), None);
        assert_eq!(RequestKind::Track.reply_action(&config), "__weft__updateTrackedInput");
    }

    #[test]
    fn test_fill_value_presence() {
        let base = json!({
            "foundInput": {"foundElement": {"elementPath": "//input"}, "keyPath": ["a", 0]}
        });

        let absent: FillRequest = serde_json::from_value(base.clone()).unwrap();
        assert_eq!(absent.value, None);

        let mut with_null = base.clone();
        with_null["value"] = Value::Null;
        let null: FillRequest = serde_json::from_value(with_null).unwrap();
        assert_eq!(null.value, Some(Value::Null));

        let mut with_text = base;
        with_text["value"] = json!("Ada");
        let text: FillRequest = serde_json::from_value(with_text).unwrap();
        assert_eq!(text.value, Some(json!("Ada")));
        assert_eq!(text.found_input.key_path, json!(["a", 0]));
    }

    #[test]
    fn test_reply_wire_shape() {
        let reply = Outbound {
            action: "__weft__updateFilledInput".into(),
            reply: Reply::Fill(FillReply {
                key_path: json!("email"),
                status: FillStatus::Skipped,
                message: Some("Value is undefined".into()),
            }),
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({
                "action": "__weft__updateFilledInput",
                "keyPath": "email",
                "status": "skipped",
                "message": "Value is undefined"
            })
        );

        let wait = Outbound {
            action: "__weft__updateWaitFor".into(),
            reply: Reply::Wait(WaitReply { status: WaitStatus::Success, message: None }),
        };
        assert_eq!(
            serde_json::to_value(&wait).unwrap(),
            json!({"action": "__weft__updateWaitFor", "status": "success"})
        );
    }

    #[test]
    fn test_track_request_decodes() {
        let request: TrackRequest = serde_json::from_value(json!({
            "method": "jQuery",
            "trackedInput": {"labelText": "Size", "required": true},
            "foundTrackedInput": {
                "foundFieldElement": {"elementPath": "//fieldset"},
                "foundInputElement": {"elementPath": "./select", "elementIndex": 0},
                "trackedInputSelector": {"inputTextPath": ["option:checked", ".chosen"]}
            }
        }))
        .unwrap();
        assert_eq!(request.tracked_input.label_text, "Size");
        let found = request.found_tracked_input;
        assert_eq!(found.found_input_element.unwrap().element_path, "./select");
        let selector = found.tracked_input_selector.input_text_path.unwrap();
        assert_eq!(selector.joined(), "option:checked, .chosen");
    }

    #[test]
    fn test_track_request_needs_found_tracked_input() {
        let flat = json!({
            "method": "jQuery",
            "trackedInput": {
                "labelText": "Size",
                "foundFieldElement": {"elementPath": "//fieldset"}
            }
        });
        assert!(serde_json::from_value::<TrackRequest>(flat).is_err());
    }
}
