//! Stack merging and splitting

use crate::error::InventoryError;
use crate::item::{ItemInstance, ItemUid};

/// Result of merging a dragged stack into a target stack
#[derive(Debug)]
pub enum MergeOutcome {
    /// The whole source fit into the target and was dropped
    Absorbed { uid: ItemUid, amount: u32 },
    /// The target filled up; the rest of the source comes back
    Overflow { moved: u32, remainder: ItemInstance },
    /// The stacks are not compatible; the source comes back untouched
    NotMergeable(ItemInstance),
}

/// Same-id stack arithmetic
pub struct StackMergeResolver;

impl StackMergeResolver {
    /// Check if `source` can be merged into `target`
    pub fn can_merge(target: &ItemInstance, source: &ItemInstance) -> bool {
        target.uid != source.uid
            && target.item_id == source.item_id
            && target.is_stackable()
            && source.is_stackable()
            && target.current_stack < target.max_stack
    }

    /// Move as much of `source` into `target` as fits
    pub fn resolve(target: &mut ItemInstance, mut source: ItemInstance) -> MergeOutcome {
        if !Self::can_merge(target, &source) {
            return MergeOutcome::NotMergeable(source);
        }

        let sum = target.current_stack + source.current_stack;
        if sum <= target.max_stack {
            target.current_stack = sum;
            log::debug!(
                "Absorbed {} x{} into {}",
                source.uid,
                source.current_stack,
                target.uid
            );
            MergeOutcome::Absorbed {
                uid: source.uid,
                amount: source.current_stack,
            }
        } else {
            let moved = target.max_stack - target.current_stack;
            target.current_stack = target.max_stack;
            source.current_stack = sum - target.max_stack;
            log::debug!(
                "Moved {} into {}, {} left on {}",
                moved,
                target.uid,
                source.current_stack,
                source.uid
            );
            MergeOutcome::Overflow {
                moved,
                remainder: source,
            }
        }
    }

    /// Take `amount` units off `source` as a new instance with id `uid`
    pub fn split(
        source: &mut ItemInstance,
        amount: u32,
        uid: ItemUid,
    ) -> Result<ItemInstance, InventoryError> {
        if amount == 0 || amount >= source.current_stack {
            return Err(InventoryError::InvalidSplit {
                amount,
                stack: source.current_stack,
            });
        }

        source.current_stack -= amount;
        let mut split = source.clone();
        split.uid = uid;
        split.current_stack = amount;
        split.position = None;
        split.contents = None;
        Ok(split)
    }
}
