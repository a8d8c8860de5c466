use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_BODY: &str = "You have a new notification";
pub(crate) const DEFAULT_TAG: &str = "default";
pub(crate) const DEFAULT_TARGET_URL: &str = "/";

/// Wire shape of a push message. Every field is optional; `data` is passed
/// through to the notification untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_interaction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// What gets displayed for a push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIntent {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub data: serde_json::Value,
}

impl NotificationIntent {
    /// The page a click should lead to, when the push carried one.
    pub fn target_url(&self) -> &str {
        self.data
            .get("url")
            .and_then(|url| url.as_str())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_TARGET_URL)
    }
}

/// Defaults applied to any field the push payload leaves out.
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub title: String,
    pub icon: String,
}

impl PushPayload {
    /// Decodes raw push bytes. Never fails: each field of a JSON object is
    /// read on its own so one mistyped field does not lose the others,
    /// readable non-object text becomes the body of a default notification,
    /// and anything else falls back to an empty payload.
    pub fn decode(raw: Option<&[u8]>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        if let Ok(serde_json::Value::Object(fields)) = serde_json::from_slice(raw) {
            return Self::from_fields(&fields);
        }
        match std::str::from_utf8(raw).map(str::trim) {
            Ok(text) if !text.is_empty() => Self {
                body: Some(text.to_string()),
                ..Self::default()
            },
            _ => Self::default(),
        }
    }

    fn from_fields(fields: &serde_json::Map<String, serde_json::Value>) -> Self {
        let text = |name: &str| {
            fields
                .get(name)
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        };
        Self {
            title: text("title"),
            body: text("body"),
            icon: text("icon"),
            tag: text("tag"),
            require_interaction: fields
                .get("requireInteraction")
                .and_then(serde_json::Value::as_bool),
            data: fields.get("data").cloned(),
        }
    }

    pub fn into_intent(self, defaults: &NotificationDefaults) -> NotificationIntent {
        let non_empty = |value: Option<String>| value.filter(|value| !value.trim().is_empty());

        let mut data = match self.data {
            Some(serde_json::Value::Object(map)) => serde_json::Value::Object(map),
            _ => serde_json::Value::Object(serde_json::Map::new()),
        };
        if data.get("url").and_then(|url| url.as_str()).is_none()
            && let Some(map) = data.as_object_mut()
        {
            map.insert(
                "url".to_string(),
                serde_json::Value::String(DEFAULT_TARGET_URL.to_string()),
            );
        }

        NotificationIntent {
            title: non_empty(self.title).unwrap_or_else(|| defaults.title.clone()),
            body: non_empty(self.body).unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: non_empty(self.icon).unwrap_or_else(|| defaults.icon.clone()),
            badge: defaults.icon.clone(),
            tag: non_empty(self.tag).unwrap_or_else(|| DEFAULT_TAG.to_string()),
            require_interaction: self.require_interaction.unwrap_or(false),
            data,
        }
    }
}
