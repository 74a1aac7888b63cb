use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use bending_common::{AbilityId, Activation, Element};

use crate::ability::Ability;

/// Creates a fresh, inactive instance of an ability type.
pub type AbilityFactory = Arc<dyn Fn() -> Box<dyn Ability> + Send + Sync>;

/// Invalid ability registration. Fails the catalog build.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("ability name must not be empty")]
    EmptyName,
    #[error("ability '{0}' has no element")]
    MissingElement(String),
    #[error("ability '{0}' has no activation trigger")]
    NoActivation(String),
    #[error("ability '{0}' has no factory")]
    MissingFactory(String),
    #[error("ability '{0}' registered twice")]
    DuplicateName(String),
}

/// Static metadata of one ability type plus its factory.
#[derive(Clone)]
pub struct AbilityDescription {
    pub(crate) id: AbilityId,
    name: String,
    element: Element,
    activations: BTreeSet<Activation>,
    hidden: bool,
    can_bind: bool,
    harmless: bool,
    bypass_cooldown: bool,
    single_instance: bool,
    cancel_on_swing: bool,
    factory: AbilityFactory,
}

impl AbilityDescription {
    pub fn builder(name: impl Into<String>) -> AbilityDescriptionBuilder {
        AbilityDescriptionBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> AbilityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element(&self) -> Element {
        self.element
    }

    pub fn activations(&self) -> &BTreeSet<Activation> {
        &self.activations
    }

    pub fn is_activated_by(&self, trigger: Activation) -> bool {
        self.activations.contains(&trigger)
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Sequence-activated abilities cannot be bound to a slot.
    pub fn can_bind(&self) -> bool {
        self.can_bind
    }

    pub fn is_harmless(&self) -> bool {
        self.harmless
    }

    pub fn bypasses_cooldown(&self) -> bool {
        self.bypass_cooldown
    }

    /// At most one live instance per user.
    pub fn is_single_instance(&self) -> bool {
        self.single_instance
    }

    /// Toggle abilities that the user's next swing removes.
    pub fn cancels_on_swing(&self) -> bool {
        self.cancel_on_swing
    }

    pub fn permission(&self) -> String {
        format!("bending.ability.{}", self.name)
    }

    pub fn create(&self) -> Box<dyn Ability> {
        (self.factory)()
    }
}

impl fmt::Debug for AbilityDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityDescription")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("element", &self.element)
            .field("activations", &self.activations)
            .finish_non_exhaustive()
    }
}

/// Validating builder for [`AbilityDescription`].
#[derive(Default)]
pub struct AbilityDescriptionBuilder {
    name: String,
    element: Option<Element>,
    activations: BTreeSet<Activation>,
    hidden: bool,
    harmless: bool,
    bypass_cooldown: bool,
    single_instance: bool,
    cancel_on_swing: bool,
    factory: Option<AbilityFactory>,
}

impl AbilityDescriptionBuilder {
    pub fn element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    pub fn activation(mut self, trigger: Activation) -> Self {
        self.activations.insert(trigger);
        self
    }

    pub fn activations(mut self, triggers: impl IntoIterator<Item = Activation>) -> Self {
        self.activations.extend(triggers);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn harmless(mut self, harmless: bool) -> Self {
        self.harmless = harmless;
        self
    }

    pub fn bypass_cooldown(mut self, bypass: bool) -> Self {
        self.bypass_cooldown = bypass;
        self
    }

    pub fn single_instance(mut self, single: bool) -> Self {
        self.single_instance = single;
        self
    }

    pub fn cancel_on_swing(mut self, cancel: bool) -> Self {
        self.cancel_on_swing = cancel;
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Ability> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn build(self, id: AbilityId) -> Result<AbilityDescription, CatalogError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::EmptyName);
        }
        let element = self
            .element
            .ok_or_else(|| CatalogError::MissingElement(name.clone()))?;
        if self.activations.is_empty() {
            return Err(CatalogError::NoActivation(name));
        }
        let factory = self
            .factory
            .ok_or_else(|| CatalogError::MissingFactory(name.clone()))?;
        let can_bind = !self.activations.contains(&Activation::Sequence);
        Ok(AbilityDescription {
            id,
            name,
            element,
            activations: self.activations,
            hidden: self.hidden,
            can_bind,
            harmless: self.harmless,
            bypass_cooldown: self.bypass_cooldown,
            single_instance: self.single_instance,
            cancel_on_swing: self.cancel_on_swing,
            factory,
        })
    }
}
