//! Server-to-client event payloads sent over SSE. The source builds these as
//! ad hoc dicts at each call site (`send_private`, `_sub_pub`, `_torp_pub`,
//! `_fueler_pub`); per the Design Notes ("dynamic dict payloads -> tagged
//! variants") they are a closed, serde-tagged enum here so a typo in an
//! event's shape is a compile error instead of a silently-malformed SSE
//! frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{FuelerId, SubId, TorpedoId};
use crate::sonar::{EchoContact, PassiveContact};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent immediately on SSE connect, before the first snapshot.
    Hello { server_time: f64 },
    /// Full or partial world snapshot.
    Snapshot { state: Value },
    SubUpdate { sub_id: SubId, state: Value },
    TorpedoUpdate { torpedo_id: TorpedoId, state: Value },
    FuelerUpdate { fueler_id: FuelerId, state: Value },
    Explosion {
        torpedo_id: TorpedoId,
        x: f64,
        y: f64,
        depth: f64,
        affected: Vec<ExplosionHit>,
    },
    PassiveContact {
        observer_sub_id: Option<SubId>,
        observer_torpedo_id: Option<TorpedoId>,
        contact: PassiveContact,
    },
    ActivePingEcho {
        observer_sub_id: SubId,
        contacts: Vec<EchoContact>,
    },
    ActivePingDetected {
        observer_sub_id: SubId,
        bearing_deg: f64,
    },
    /// Keepalive, emitted at least every 15s of SSE connection idle time.
    Ping,
    Error { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplosionHit {
    pub sub_id: SubId,
    pub damage: f64,
    pub killed: bool,
}

impl ServerEvent {
    /// SSE wire format: `event: <type>\ndata: <json>\n\n`.
    pub fn to_sse_frame(&self) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(self)?;
        let event_name = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("message")
            .to_string();
        let data = serde_json::to_string(&value)?;
        Ok(format!("event: {event_name}\ndata: {data}\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_event_serializes_with_tagged_type() {
        let frame = ServerEvent::Ping.to_sse_frame().unwrap();
        assert!(frame.starts_with("event: ping\n"));
        assert!(frame.contains("\"type\":\"ping\""));
    }
}
