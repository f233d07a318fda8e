// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation groups and the per-document animation set.

use crate::binding::TargetBinding;
use crate::clip::AnimationClip;
use indexmap::IndexMap;
use uuid::Uuid;

/// A named group of clips played together
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationGroup {
    /// Unique group ID
    pub uuid: String,
    /// Group name
    pub name: String,
    /// Clip identifiers, in timeline order
    pub animations: Vec<String>,
}

impl AnimationGroup {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string().to_uppercase(),
            name: name.into(),
            animations: Vec::new(),
        }
    }

    /// Append a clip reference
    pub fn add_clip(&mut self, clip: &AnimationClip) {
        if !self.contains(&clip.uuid) {
            self.animations.push(clip.uuid.clone());
        }
    }

    /// Drop a clip reference
    pub fn remove_clip(&mut self, clip_id: &str) -> bool {
        let before = self.animations.len();
        self.animations.retain(|id| id != clip_id);
        before != self.animations.len()
    }

    /// Whether the group references `clip_id`
    pub fn contains(&self, clip_id: &str) -> bool {
        self.animations.iter().any(|id| id == clip_id)
    }
}

/// All animation groups and clips of one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationSet {
    groups: IndexMap<String, AnimationGroup>,
    clips: IndexMap<String, AnimationClip>,
}

impl AnimationSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group, returning any group it replaced
    pub fn insert_group(&mut self, group: AnimationGroup) -> Option<AnimationGroup> {
        self.groups.insert(group.uuid.clone(), group)
    }

    /// Insert a clip, returning any clip it replaced
    pub fn insert_clip(&mut self, clip: AnimationClip) -> Option<AnimationClip> {
        self.clips.insert(clip.uuid.clone(), clip)
    }

    /// Remove a group
    pub fn remove_group(&mut self, id: &str) -> Option<AnimationGroup> {
        self.groups.shift_remove(id)
    }

    /// Remove a clip. Groups keep their reference until re-resolved.
    pub fn remove_clip(&mut self, id: &str) -> Option<AnimationClip> {
        self.clips.shift_remove(id)
    }

    /// Get a group
    pub fn group(&self, id: &str) -> Option<&AnimationGroup> {
        self.groups.get(id)
    }

    /// Get a mutable group
    pub fn group_mut(&mut self, id: &str) -> Option<&mut AnimationGroup> {
        self.groups.get_mut(id)
    }

    /// Get a clip
    pub fn clip(&self, id: &str) -> Option<&AnimationClip> {
        self.clips.get(id)
    }

    /// Get a mutable clip
    pub fn clip_mut(&mut self, id: &str) -> Option<&mut AnimationClip> {
        self.clips.get_mut(id)
    }

    /// Whether a group or clip uses `id`
    pub fn contains(&self, id: &str) -> bool {
        self.groups.contains_key(id) || self.clips.contains_key(id)
    }

    /// All groups in insertion order
    pub fn groups(&self) -> impl Iterator<Item = &AnimationGroup> {
        self.groups.values()
    }

    /// All clips in insertion order
    pub fn clips(&self) -> impl Iterator<Item = &AnimationClip> {
        self.clips.values()
    }

    /// Number of groups plus clips
    pub fn len(&self) -> usize {
        self.groups.len() + self.clips.len()
    }

    /// Whether the set holds nothing
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.clips.is_empty()
    }

    /// Point every clip bound to `old` at `new`, returning how many moved
    pub fn retarget(&mut self, old: &str, new: &str) -> usize {
        let mut moved = 0;
        for target in self.clips.values_mut().filter_map(|clip| clip.target.as_mut()) {
            if target.object == old {
                target.object = new.to_string();
                moved += 1;
            }
        }
        moved
    }

    /// Clear the target of every clip bound to one of `objects`
    ///
    /// Returns the cleared bindings keyed by clip id, for [`Self::bind`].
    pub fn unbind<S: AsRef<str>>(&mut self, objects: &[S]) -> Vec<(String, TargetBinding)> {
        self.clips
            .values_mut()
            .filter(|clip| {
                clip.target
                    .as_ref()
                    .is_some_and(|target| objects.iter().any(|o| o.as_ref() == target.object))
            })
            .filter_map(|clip| clip.target.take().map(|target| (clip.uuid.clone(), target)))
            .collect()
    }

    /// Bind a clip to a target; `false` when the clip is not in the set
    pub fn bind(&mut self, clip_id: &str, binding: TargetBinding) -> bool {
        match self.clips.get_mut(clip_id) {
            Some(clip) => {
                clip.target = Some(binding);
                true
            }
            None => false,
        }
    }

    /// Clips of a group that exist in this set
    pub fn resolve(&self, group_id: &str) -> Vec<&AnimationClip> {
        self.groups
            .get(group_id)
            .map(|group| {
                group
                    .animations
                    .iter()
                    .filter_map(|id| self.clips.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Earliest begin and latest end over a group's resolved clips
    pub fn span(&self, group_id: &str) -> Option<(f32, f32)> {
        self.resolve(group_id)
            .into_iter()
            .map(|clip| (clip.begin_time, clip.end_time))
            .reduce(|(b0, e0), (b1, e1)| (b0.min(b1), e0.max(e1)))
    }

    /// Clips of a group playing at `time`
    pub fn active_clips(&self, group_id: &str, time: f32) -> Vec<&AnimationClip> {
        self.resolve(group_id)
            .into_iter()
            .filter(|clip| clip.contains(time))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipKind;

    fn clip(begin: f32, end: f32) -> AnimationClip {
        AnimationClip::new("Clip", ClipKind::Tween)
            .with_span(begin, end)
            .unwrap()
    }

    #[test]
    fn test_resolve_skips_missing_clips() {
        let mut set = AnimationSet::new();
        let a = clip(0.0, 2.0);
        let b = clip(1.0, 5.0);
        let mut group = AnimationGroup::new("Intro");
        group.add_clip(&a);
        group.add_clip(&b);
        group.animations.push("missing".to_string());
        let group_id = group.uuid.clone();

        set.insert_clip(a);
        set.insert_clip(b);
        set.insert_group(group);

        assert_eq!(set.resolve(&group_id).len(), 2);
        assert_eq!(set.span(&group_id), Some((0.0, 5.0)));
        assert_eq!(set.active_clips(&group_id, 3.0).len(), 1);
    }

    #[test]
    fn test_remove_clip_leaves_group_reference() {
        let mut set = AnimationSet::new();
        let a = clip(0.0, 1.0);
        let mut group = AnimationGroup::new("Loop");
        group.add_clip(&a);
        group.add_clip(&a);
        let (group_id, clip_id) = (group.uuid.clone(), a.uuid.clone());
        set.insert_clip(a);
        set.insert_group(group);

        assert_eq!(set.group(&group_id).map(|g| g.animations.len()), Some(1));
        assert!(set.remove_clip(&clip_id).is_some());
        assert!(set.group(&group_id).unwrap().contains(&clip_id));
        assert!(set.resolve(&group_id).is_empty());
        assert_eq!(set.span(&group_id), None);
    }

    #[test]
    fn test_unbind_retarget_and_bind() {
        let mut set = AnimationSet::new();
        let a = clip(0.0, 1.0).with_target(TargetBinding::object("CRATE"));
        let b = clip(0.0, 1.0).with_target(TargetBinding::object("LAMP"));
        let (a_id, b_id) = (a.uuid.clone(), b.uuid.clone());
        set.insert_clip(a);
        set.insert_clip(b);

        assert_eq!(set.retarget("CRATE", "BOX"), 1);
        assert_eq!(set.clip(&a_id).and_then(|c| c.target.as_ref()).map(|t| t.object.as_str()), Some("BOX"));

        let cleared = set.unbind(&["BOX"]);
        assert_eq!(cleared, vec![(a_id.clone(), TargetBinding::object("BOX"))]);
        assert!(set.clip(&a_id).unwrap().target.is_none());
        assert!(set.clip(&b_id).unwrap().target.is_some());

        let (clip_id, binding) = cleared.into_iter().next().unwrap();
        assert!(set.bind(&clip_id, binding));
        assert!(!set.bind("missing", TargetBinding::object("BOX")));
        assert_eq!(set.retarget("BOX", "CRATE"), 1);
    }
}
