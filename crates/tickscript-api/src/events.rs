use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

/// Built-in events an app can subscribe to by defining `__on_<event>`
///
/// The display form is the name used in the hook, e.g. `player_jumps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Event {
    // Server events
    /// Once per server tick, before hosts are ticked
    Tick,
    /// Once per tick for the nether dimension
    TickNether,
    /// Once per tick for the end dimension
    TickEnder,

    // Player lifecycle
    PlayerConnects,
    PlayerDisconnects,
    PlayerDies,
    PlayerRespawns,
    PlayerChangesDimension,

    // Player movement
    PlayerJumps,
    PlayerDeploysElytra,
    PlayerWakesUp,
    PlayerRides,
    PlayerStartsSneaking,
    PlayerStopsSneaking,
    PlayerStartsSprinting,
    PlayerStopsSprinting,

    // Player interaction
    PlayerUsesItem,
    PlayerReleasesItem,
    PlayerFinishesUsingItem,
    PlayerClicksBlock,
    PlayerRightClicksBlock,
    PlayerBreaksBlock,
    PlayerPlacesBlock,
    PlayerInteractsWithEntity,
    PlayerAttacksEntity,
    PlayerTakesDamage,
    PlayerDealsDamage,
    PlayerDropsItem,
    PlayerDropsStack,
    PlayerPicksUpItem,
    PlayerSwitchesSlot,
    PlayerSwapsHands,
    PlayerChoosesRecipe,
    Statistic,
}

impl Event {
    /// Every built-in event, in declaration order
    pub fn all() -> impl Iterator<Item = Event> {
        Self::iter()
    }

    /// Look up an event by its hook name
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::PlayerJumps.to_string(), "player_jumps");
        assert_eq!(Event::Tick.to_string(), "tick");
        assert_eq!(Event::from_name("player_deploys_elytra"), Some(Event::PlayerDeploysElytra));
        assert_eq!(Event::from_name("close"), None);
    }

    #[test]
    fn test_every_event_resolves_by_name() {
        let events: Vec<Event> = Event::all().collect();
        assert_eq!(events.len(), 34);
        for event in events {
            assert_eq!(Event::from_name(&event.to_string()), Some(event));
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert_eq!(Event::from_name("Tick"), None);
        assert_eq!(Event::from_name("player-jumps"), None);
    }
}
