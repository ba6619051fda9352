use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Named, JSON-encoded event handed to a presentation layer.
pub struct FeedEvent {
    pub event: String,
    pub data: String,
}

impl FeedEvent {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<String>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Single-line rendering, `{"event":..,"data":..}`.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let data: serde_json::Value = serde_json::from_str(&self.data)?;
        serde_json::to_string(&serde_json::json!({
            "event": self.event,
            "data": data,
        }))
    }
}
