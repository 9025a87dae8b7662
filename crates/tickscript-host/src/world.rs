use tickscript_api::Actor;

/// Prefix of the scoreboard tag carried by marker entities an app spawns
pub const MARKER_TAG_PREFIX: &str = "__tickscript_marker";

/// The game world, as far as the host needs it
pub trait World {
    /// The actor used when the server itself invokes hooks
    fn server_actor(&self) -> Actor;

    /// Resolve a connected player by name
    fn find_player(&self, name: &str) -> Option<Actor>;

    /// Remove every marker entity carrying `tag`, returning how many were removed
    fn remove_tagged_markers(&mut self, tag: &str) -> usize;
}

/// Marker tag for entities owned by an app (or by the unnamed host)
pub fn marker_tag(app: Option<&str>) -> String {
    format!("{}_{}", MARKER_TAG_PREFIX, app.unwrap_or(""))
}

/// A world with no players and no entities
#[derive(Debug, Default)]
pub struct NullWorld;

impl World for NullWorld {
    fn server_actor(&self) -> Actor {
        Actor::server()
    }

    fn find_player(&self, _name: &str) -> Option<Actor> {
        None
    }

    fn remove_tagged_markers(&mut self, _tag: &str) -> usize {
        0
    }
}
