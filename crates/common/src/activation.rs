use serde::{Deserialize, Serialize};

/// A discrete input that can trigger an ability.
///
/// Hosts translate raw input (clicks, key presses, falls) into these
/// triggers; the core never sees raw input events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Left click / swing.
    Attack,
    /// Swing that hit an entity.
    AttackEntity,
    /// Right click in the air.
    Interact,
    /// Right click on a block.
    InteractBlock,
    /// Right click on an entity.
    InteractEntity,
    Sneak,
    SneakRelease,
    Fall,
    /// Always-on abilities started by the engine, never by input.
    Passive,
    /// Completed input combo.
    Sequence,
}

impl Activation {
    pub fn is_interact(self) -> bool {
        matches!(
            self,
            Activation::Interact | Activation::InteractBlock | Activation::InteractEntity
        )
    }
}
