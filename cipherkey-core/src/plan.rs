//! Directive ordering and single-key validation.

use crate::directive::{Directive, Directives};
use crate::error::{KeyingError, KeyingResult};

/// Directives arranged into execution order.
///
/// Cipher selection runs first, then the `legacy` reset, then tuning
/// directives, and the single key-setting directive strictly last.
/// The sort is stable, so same-category directives keep their
/// insertion order. The key directive is held separately, so a valid
/// plan has exactly one by construction.
#[derive(Debug, Clone)]
pub struct OrderedPlan {
    settings: Vec<Directive>,
    key: Directive,
}

impl OrderedPlan {
    /// Validates and orders a directive set.
    ///
    /// Fails with [`KeyingError::InvalidKeyCount`] unless exactly one
    /// key-setting directive is present. Duplicate key names under
    /// case variation (`key` and `KeY`) count separately, so they are
    /// rejected rather than being applied twice.
    pub fn build(directives: Directives) -> KeyingResult<Self> {
        let (mut keys, mut settings): (Vec<_>, Vec<_>) = directives
            .into_entries()
            .into_iter()
            .partition(|d| d.kind().is_key());

        if keys.len() != 1 {
            return Err(KeyingError::InvalidKeyCount { count: keys.len() });
        }
        let key = keys.remove(0);

        settings.sort_by_key(|d| d.kind().rank());
        Ok(Self { settings, key })
    }

    /// Directives in execution order, the key directive last.
    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.settings.iter().chain(std::iter::once(&self.key))
    }

    /// Number of directives in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len() + 1
    }

    /// Whether the plan is empty. Never true: a valid plan always
    /// holds the key directive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The plan's single key-setting directive.
    #[must_use]
    pub fn key_directive(&self) -> &Directive {
        &self.key
    }
}
