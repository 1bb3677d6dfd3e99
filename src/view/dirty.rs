use std::collections::HashMap;

use crate::record::NodeId;

/// Unsaved-edit flags, one per displayed record.
///
/// Row "edited" markers and the save/reset controls of a form are derived
/// from this map, so they cannot drift apart from it.
#[derive(Debug, Default, Clone)]
pub struct DirtyTracker {
    flags: HashMap<NodeId, bool>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly rendered form as clean.
    pub fn track(&mut self, id: NodeId) {
        self.flags.insert(id, false);
    }

    /// Returns false when `id` is not tracked.
    pub fn mark_dirty(&mut self, id: &NodeId) -> bool {
        match self.flags.get_mut(id) {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_clean(&mut self, id: &NodeId) -> bool {
        match self.flags.get_mut(id) {
            Some(flag) => {
                *flag = false;
                true
            }
            None => false,
        }
    }

    pub fn is_dirty(&self, id: &NodeId) -> bool {
        self.flags.get(id).copied().unwrap_or(false)
    }

    pub fn any_dirty(&self) -> bool {
        self.flags.values().any(|dirty| *dirty)
    }

    pub fn dirty_count(&self) -> usize {
        self.flags.values().filter(|dirty| **dirty).count()
    }

    pub fn dirty_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .flags
            .iter()
            .filter(|(_, dirty)| **dirty)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn is_tracked(&self, id: &NodeId) -> bool {
        self.flags.contains_key(id)
    }

    pub fn remove(&mut self, id: &NodeId) {
        self.flags.remove(id);
    }

    pub fn clear(&mut self) {
        self.flags.clear();
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracking_lifecycle() {
        let mut tracker = DirtyTracker::new();
        let a = NodeId::from("a");
        let b = NodeId::from("b");
        tracker.track(a.clone());
        tracker.track(b.clone());
        assert!(!tracker.any_dirty());

        assert!(tracker.mark_dirty(&b));
        assert!(tracker.is_dirty(&b));
        assert!(tracker.any_dirty());
        assert_eq!(tracker.dirty_ids(), vec![b.clone()]);

        assert!(tracker.mark_clean(&b));
        assert!(!tracker.any_dirty());

        tracker.mark_dirty(&a);
        tracker.remove(&a);
        assert!(!tracker.any_dirty());
        assert!(!tracker.is_tracked(&a));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_untracked_ids_are_ignored() {
        let mut tracker = DirtyTracker::new();
        let ghost = NodeId::from("ghost");
        assert!(!tracker.mark_dirty(&ghost));
        assert!(!tracker.is_dirty(&ghost));
        assert!(tracker.is_empty());
    }
}
