//! Domain entities whose tables this tool keeps in shape.

mod player;

pub use player::Player;

use crate::schema::EntityRegistry;

/// The entities to migrate, in migration order.
///
/// Adding an entity means registering it here.
pub fn registry() -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    registry.register::<Player>();
    registry
}
