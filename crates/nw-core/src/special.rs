//! Special events: optional session-wide rule twists chosen at creation.

use serde::Serialize;

/// A session modifier rolled once when the session is created.
///
/// An active event hands out a throwable item to some participants; a
/// thrown item kills on a successful hit roll, independent of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecialEvent {
    /// Event name shown in the session announcement and summary.
    pub name: &'static str,
    /// Name of the throwable item the event hands out.
    pub item: &'static str,
    /// Percent chance per participant to receive the item at the deal.
    pub grant_percent: u32,
    /// Percent chance that a thrown item kills its target.
    pub hit_percent: u32,
}

/// Catalog of known special events. Selection is uniform once the
/// session-creation roll decides an event happens at all.
pub const SPECIAL_EVENTS: &[SpecialEvent] = &[SpecialEvent {
    name: "Potato Festival",
    item: "potato",
    grant_percent: 20,
    hit_percent: 20,
}];

impl std::fmt::Display for SpecialEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
