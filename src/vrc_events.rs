//! The VRChat event name registry contract (spec §6.3).
//!
//! Recognising `_onInteract`, `_onPlayerJoined`, and the rest of the
//! fixed VRChat callback surface is the host's job; this crate only
//! needs to know, given a label name, whether it's a recognised event
//! (so the assembler can `.export` it and prioritise it during label
//! canonicalisation, spec §4.G) and what its Udon-visible name and
//! parameter list are.

/// One parameter of a recognised VRChat event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventParam {
    pub name: String,
    pub udon_type: String,
}

/// The Udon-visible shape of a recognised event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventDefinition {
    /// The name Udon dispatches by (may differ from the surface
    /// method name's casing, e.g. `_onInteract` vs `Interact`).
    pub udon_name: String,
    pub parameters: Vec<EventParam>,
}

/// Recognises VRChat's fixed event-callback surface.
pub trait VrcEventRegistry {
    /// Is `name` a recognised VRChat event label?
    fn is_vrc_event_label(&self, name: &str) -> bool;

    /// Look up the Udon-visible definition of a recognised event.
    fn get_vrc_event_definition(&self, name: &str) -> Option<EventDefinition>;
}

/// A registry backed by a fixed static list, for tests and small
/// embeddings; a real host typically generates this table from
/// VRChat's UdonSharp event metadata instead.
#[derive(Clone, Debug, Default)]
pub struct StaticEventRegistry {
    events: Vec<(String, EventDefinition)>,
}

impl StaticEventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, def: EventDefinition) -> &mut Self {
        self.events.push((name.into(), def));
        self
    }

    /// A registry pre-populated with `_start` and the handful of
    /// lifecycle events every UdonBehaviour can expect to exist.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.insert(
            "_start",
            EventDefinition {
                udon_name: "_start".to_string(),
                parameters: vec![],
            },
        );
        reg.insert(
            "_update",
            EventDefinition {
                udon_name: "_update".to_string(),
                parameters: vec![],
            },
        );
        reg.insert(
            "_onInteract",
            EventDefinition {
                udon_name: "_onInteract".to_string(),
                parameters: vec![],
            },
        );
        reg.insert(
            "_onPlayerJoined",
            EventDefinition {
                udon_name: "_onPlayerJoined".to_string(),
                parameters: vec![EventParam {
                    name: "player".to_string(),
                    udon_type: "VRCPlayerApi".to_string(),
                }],
            },
        );
        reg.insert(
            "_onPlayerLeft",
            EventDefinition {
                udon_name: "_onPlayerLeft".to_string(),
                parameters: vec![EventParam {
                    name: "player".to_string(),
                    udon_type: "VRCPlayerApi".to_string(),
                }],
            },
        );
        reg
    }
}

impl VrcEventRegistry for StaticEventRegistry {
    fn is_vrc_event_label(&self, name: &str) -> bool {
        self.events.iter().any(|(n, _)| n == name)
    }

    fn get_vrc_event_definition(&self, name: &str) -> Option<EventDefinition> {
        self.events
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d.clone())
    }
}
