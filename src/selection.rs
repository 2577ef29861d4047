//! Multi-select state machine for the catalog browser
//!
//! Every operation is a pure transform: the caller owns the state and
//! passes it back in, so there is no hidden mutable reference surviving
//! across renders. Range selection is anchored per set and never crosses
//! a set boundary.

use crate::models::VariantTag;
use std::collections::HashMap;

/// One row of a set's visible, ordered card list
#[derive(Debug, Clone)]
pub struct VisibleCard {
    pub card_key: String,
    pub default_variant: VariantTag,
}

impl VisibleCard {
    pub fn new(card_key: impl Into<String>, default_variant: VariantTag) -> Self {
        Self {
            card_key: card_key.into(),
            default_variant,
        }
    }
}

/// Click modifier keys
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
    };
}

/// Selection across all visible sets. Created empty per browsing context;
/// cleared on tab switch; never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    /// Selected card keys with the variant chosen for each
    selected: HashMap<String, VariantTag>,
    /// Last explicitly selected position within each set, the anchor for
    /// shift-click ranges
    anchor_index_by_set: HashMap<String, usize>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_selected(&self, card_key: &str) -> bool {
        self.selected.contains_key(card_key)
    }

    pub fn variant_for(&self, card_key: &str) -> Option<VariantTag> {
        self.selected.get(card_key).copied()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected card keys, unordered
    pub fn selected_keys(&self) -> Vec<String> {
        self.selected.keys().cloned().collect()
    }

    /// Selected keys with their chosen variants
    pub fn selections(&self) -> impl Iterator<Item = (&str, VariantTag)> {
        self.selected.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn anchor(&self, set_id: &str) -> Option<usize> {
        self.anchor_index_by_set.get(set_id).copied()
    }

    /// Explicit "deselect all": the empty state
    pub fn deselect_all(&self) -> SelectionState {
        SelectionState::default()
    }

    /// Apply one click against a set's visible, ordered card list.
    ///
    /// Plain and ctrl/cmd clicks toggle the clicked card; shift-click with
    /// an established anchor additively selects the inclusive range between
    /// anchor and click within this set only. Anchors in other sets are
    /// never disturbed.
    pub fn apply_click(
        &self,
        visible_set: &[VisibleCard],
        set_id: &str,
        index: usize,
        modifiers: Modifiers,
    ) -> SelectionState {
        let mut next = self.clone();
        let Some(clicked) = visible_set.get(index) else {
            log::debug!("Click index {} out of range for set {}", index, set_id);
            return next;
        };

        if modifiers.shift {
            if let Some(anchor) = next.anchor_index_by_set.get(set_id).copied() {
                // The view may have been reordered or shrunk since the
                // anchor was set; clamp it to the current list.
                let anchor = anchor.min(visible_set.len() - 1);
                let (lo, hi) = (anchor.min(index), anchor.max(index));
                for row in &visible_set[lo..=hi] {
                    next.selected
                        .entry(row.card_key.clone())
                        .or_insert(row.default_variant);
                }
                next.anchor_index_by_set.insert(set_id.to_string(), index);
                return next;
            }
            // No anchor yet: degrade to a plain click and establish one
        }

        // Plain and ctrl clicks share the toggle; ctrl differs only in UIs
        // that reset range state on unmodified clicks, which this model
        // deliberately does not do (anchors stay sticky).
        if next.selected.remove(&clicked.card_key).is_some() {
            next.anchor_index_by_set.remove(set_id);
        } else {
            next.selected
                .insert(clicked.card_key.clone(), clicked.default_variant);
            next.anchor_index_by_set.insert(set_id.to_string(), index);
        }
        next
    }
}
