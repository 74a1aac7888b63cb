//! Built-in abilities and their default collision rules.
//!
//! Each ability is a plain struct implementing [`bending_kernel::Ability`];
//! [`register_defaults`] adds all of them to a catalog builder with factories
//! that capture the given configuration.

pub mod config;
pub mod earth_blast;
pub mod earth_pillar;
pub mod fire_blast;
pub mod fire_jet;
pub mod fire_shield;
#[cfg(test)]
mod testing;
mod util;

pub use config::AbilitiesConfig;
pub use earth_blast::EarthBlast;
pub use earth_pillar::EarthPillar;
pub use fire_blast::FireBlast;
pub use fire_jet::FireJet;
pub use fire_shield::FireShield;

use bending_collision::{CollisionConfig, LayerConfig, PairConfig};
use bending_common::{Activation, Element};
use bending_kernel::{AbilityCatalogBuilder, AbilityDescription};

/// Registers every built-in ability.
pub fn register_defaults(builder: AbilityCatalogBuilder, config: &AbilitiesConfig) -> AbilityCatalogBuilder {
    let fire_blast = config.fire_blast.clone();
    let fire_shield = config.fire_shield.clone();
    let fire_jet = config.fire_jet.clone();
    let earth_pillar = config.earth_pillar.clone();
    let earth_blast = config.earth_blast.clone();
    builder
        .register(
            AbilityDescription::builder(FireBlast::NAME)
                .element(Element::Fire)
                .activation(Activation::Attack)
                .factory(move || Box::new(FireBlast::new(fire_blast.clone()))),
        )
        .register(
            AbilityDescription::builder(FireShield::NAME)
                .element(Element::Fire)
                .activations([Activation::Attack, Activation::Sneak])
                .single_instance(true)
                .factory(move || Box::new(FireShield::new(fire_shield.clone()))),
        )
        .register(
            AbilityDescription::builder(FireJet::NAME)
                .element(Element::Fire)
                .activation(Activation::Attack)
                .harmless(true)
                .single_instance(true)
                .cancel_on_swing(true)
                .factory(move || Box::new(FireJet::new(fire_jet.clone()))),
        )
        .register(
            AbilityDescription::builder(EarthPillar::NAME)
                .element(Element::Earth)
                .activation(Activation::Attack)
                .factory(move || Box::new(EarthPillar::new(earth_pillar.clone()))),
        )
        .register(
            AbilityDescription::builder(EarthBlast::NAME)
                .element(Element::Earth)
                .activation(Activation::Sneak)
                .single_instance(true)
                .factory(move || Box::new(EarthBlast::new(earth_blast.clone()))),
        )
}

/// Projectiles cancel each other, shields stop projectiles, pillars stop
/// both.
pub fn default_collisions() -> CollisionConfig {
    CollisionConfig {
        layers: vec![
            LayerConfig {
                abilities: vec![FireBlast::NAME.into(), EarthBlast::NAME.into()],
                self_cancelling: true,
            },
            LayerConfig {
                abilities: vec![FireShield::NAME.into()],
                self_cancelling: false,
            },
        ],
        pairs: [FireBlast::NAME, EarthBlast::NAME]
            .into_iter()
            .map(|projectile| PairConfig {
                first: projectile.into(),
                second: EarthPillar::NAME.into(),
                remove_first: true,
                remove_second: false,
                allow_same_user: false,
            })
            .collect(),
    }
}
