// Broad phase: candidate pair generation from the proxy tree

use super::aabb::{Aabb, RayCastInput};
use super::dynamic_tree::{DynamicTree, NULL_NODE};
use super::fixture::FixtureHandle;

/// Tracks fixture proxies and reports new overlapping pairs
///
/// Only proxies that were created, moved out of their fat box, or touched
/// since the last update are queried.
#[derive(Debug, Clone)]
pub struct BroadPhase {
    tree: DynamicTree<FixtureHandle>,
    move_buffer: Vec<usize>,
}

impl BroadPhase {
    pub fn new(margin: f32) -> Self {
        Self {
            tree: DynamicTree::new(margin),
            move_buffer: Vec::with_capacity(16),
        }
    }

    pub fn proxy_count(&self) -> usize {
        self.tree.proxy_count()
    }

    pub fn tree_height(&self) -> i32 {
        self.tree.height()
    }

    pub fn create_proxy(&mut self, aabb: Aabb, fixture: FixtureHandle) -> usize {
        let id = self.tree.create_proxy(aabb, fixture);
        self.move_buffer.push(id);
        id
    }

    pub fn destroy_proxy(&mut self, proxy_id: usize) {
        for entry in self.move_buffer.iter_mut() {
            if *entry == proxy_id {
                *entry = NULL_NODE;
            }
        }
        self.tree.destroy_proxy(proxy_id);
    }

    pub fn move_proxy(&mut self, proxy_id: usize, aabb: Aabb) {
        if self.tree.move_proxy(proxy_id, aabb) {
            self.move_buffer.push(proxy_id);
        }
    }

    /// Force the proxy to be re-queried on the next update
    pub fn touch_proxy(&mut self, proxy_id: usize) {
        self.move_buffer.push(proxy_id);
    }

    pub fn test_overlap(&self, a: usize, b: usize) -> bool {
        self.tree.test_overlap(a, b)
    }

    pub fn fat_aabb(&self, proxy_id: usize) -> Aabb {
        self.tree.fat_aabb(proxy_id)
    }

    /// Report each new candidate pair once, ordered by proxy id
    pub fn update_pairs(&mut self, mut add_pair: impl FnMut(FixtureHandle, FixtureHandle)) {
        let mut pairs: Vec<(usize, usize)> = Vec::with_capacity(self.move_buffer.len() * 2);

        for &query_id in &self.move_buffer {
            if query_id == NULL_NODE {
                continue;
            }
            let fat = self.tree.fat_aabb(query_id);
            let tree = &self.tree;
            tree.query(&fat, |proxy_id| {
                if proxy_id == query_id {
                    return true;
                }
                // Both moved: the lower id reports the pair
                if tree.was_moved(proxy_id) && proxy_id > query_id {
                    return true;
                }
                pairs.push((proxy_id.min(query_id), proxy_id.max(query_id)));
                true
            });
        }

        for &id in &self.move_buffer {
            if id != NULL_NODE {
                self.tree.clear_moved(id);
            }
        }
        self.move_buffer.clear();

        pairs.sort_unstable();
        pairs.dedup();

        for (a, b) in pairs {
            if let (Some(fa), Some(fb)) = (self.tree.user_data(a), self.tree.user_data(b)) {
                add_pair(fa, fb);
            }
        }
    }

    /// Visit fixtures whose fat box overlaps `aabb`
    pub fn query(&self, aabb: &Aabb, mut callback: impl FnMut(FixtureHandle) -> bool) {
        self.tree.query(aabb, |id| match self.tree.user_data(id) {
            Some(fixture) => callback(fixture),
            None => true,
        });
    }

    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        mut callback: impl FnMut(&RayCastInput, FixtureHandle) -> f32,
    ) {
        self.tree.ray_cast(input, |sub, id| match self.tree.user_data(id) {
            Some(fixture) => callback(sub, fixture),
            None => sub.max_fraction,
        });
    }
}
