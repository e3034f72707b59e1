use std::collections::HashMap;

use tracing::info;

use crate::effects::tone::{FadeEffect, InvertEffect, MonoEffect, NoirEffect, PosterizeEffect, SepiaEffect};
use crate::effects::texture::{GrainEffect, SharpenEffect};
use crate::effects::traits::Effect;

/// Registry for the named pixel effects.
///
/// Resolution of an unknown name yields `None`; callers treat that as a
/// pass-through, not an error, so the output is identical to the input.
pub struct EffectRegistry {
    effects: HashMap<String, Box<dyn Fn() -> Box<dyn Effect>>>,
}

impl EffectRegistry {
    /// Create a new registry with all built-in effects
    pub fn new() -> Self {
        let mut registry = Self {
            effects: HashMap::new(),
        };

        registry.register_builtin_effects();
        registry
    }

    fn register_builtin_effects(&mut self) {
        self.effects
            .insert("noir".to_string(), Box::new(|| Box::new(NoirEffect::new())));
        self.effects
            .insert("sepia".to_string(), Box::new(|| Box::new(SepiaEffect::new())));
        self.effects
            .insert("mono".to_string(), Box::new(|| Box::new(MonoEffect::new())));
        self.effects
            .insert("invert".to_string(), Box::new(|| Box::new(InvertEffect::new())));
        self.effects.insert(
            "posterize".to_string(),
            Box::new(|| Box::new(PosterizeEffect::new())),
        );
        self.effects
            .insert("fade".to_string(), Box::new(|| Box::new(FadeEffect::new())));
        self.effects.insert(
            "sharpen".to_string(),
            Box::new(|| Box::new(SharpenEffect::new())),
        );
        self.effects
            .insert("grain".to_string(), Box::new(|| Box::new(GrainEffect::new())));
    }

    /// Register a custom effect factory under a unique name.
    pub fn register<F>(&mut self, name: String, factory: F)
    where
        F: Fn() -> Box<dyn Effect> + 'static,
    {
        self.effects.insert(name, Box::new(factory));
    }

    /// Resolve an effect by name.
    ///
    /// Returns a new instance, or `None` when the name is not registered.
    pub fn resolve(&self, name: &str) -> Option<Box<dyn Effect>> {
        let effect = self.effects.get(name).map(|factory| factory());
        if effect.is_none() {
            info!("No effect registered for '{}', frames pass through untouched", name);
        }
        effect
    }

    /// Get all available effect names
    pub fn available_effects(&self) -> Vec<String> {
        let mut names: Vec<String> = self.effects.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_effect(&self, name: &str) -> bool {
        self.effects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
