// Dynamic AABB tree with surface-area-heuristic insertion and AVL-style rotations

use super::aabb::{Aabb, RayCastInput};

pub const NULL_NODE: usize = usize::MAX;

#[derive(Debug, Clone)]
struct TreeNode<T> {
    /// Fattened bounds for leaves, union of children for internal nodes
    aabb: Aabb,
    user_data: Option<T>,
    /// Parent index, or next free node while on the free list
    parent: usize,
    child1: usize,
    child2: usize,
    /// Leaf = 0, free node = -1
    height: i32,
    moved: bool,
}

impl<T> TreeNode<T> {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// Bounding volume hierarchy over fattened proxy AABBs
///
/// Proxies only get re-inserted when their tight box leaves the fat box, so
/// resting bodies cost nothing here.
#[derive(Debug, Clone)]
pub struct DynamicTree<T: Copy> {
    nodes: Vec<TreeNode<T>>,
    root: usize,
    free_list: usize,
    proxy_count: usize,
    margin: f32,
}

impl<T: Copy> DynamicTree<T> {
    pub fn new(margin: f32) -> Self {
        Self {
            nodes: Vec::with_capacity(16),
            root: NULL_NODE,
            free_list: NULL_NODE,
            proxy_count: 0,
            margin,
        }
    }

    pub fn proxy_count(&self) -> usize {
        self.proxy_count
    }

    /// Height of the tree, 0 for an empty or single-leaf tree
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            0
        } else {
            self.nodes[self.root].height
        }
    }

    fn allocate_node(&mut self) -> usize {
        if self.free_list == NULL_NODE {
            self.nodes.push(TreeNode {
                aabb: Aabb::new(glam::Vec2::ZERO, glam::Vec2::ZERO),
                user_data: None,
                parent: NULL_NODE,
                child1: NULL_NODE,
                child2: NULL_NODE,
                height: 0,
                moved: false,
            });
            return self.nodes.len() - 1;
        }

        let id = self.free_list;
        let node = &mut self.nodes[id];
        self.free_list = node.parent;
        node.parent = NULL_NODE;
        node.child1 = NULL_NODE;
        node.child2 = NULL_NODE;
        node.height = 0;
        node.user_data = None;
        node.moved = false;
        id
    }

    fn free_node(&mut self, id: usize) {
        let node = &mut self.nodes[id];
        node.parent = self.free_list;
        node.height = -1;
        node.user_data = None;
        self.free_list = id;
    }

    /// Insert a proxy, its stored box is `aabb` grown by the margin
    pub fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> usize {
        let id = self.allocate_node();
        let node = &mut self.nodes[id];
        node.aabb = aabb.fattened(self.margin);
        node.user_data = Some(user_data);
        node.height = 0;
        node.moved = true;

        self.insert_leaf(id);
        self.proxy_count += 1;
        id
    }

    pub fn destroy_proxy(&mut self, proxy_id: usize) {
        debug_assert!(self.nodes[proxy_id].is_leaf());
        self.remove_leaf(proxy_id);
        self.free_node(proxy_id);
        self.proxy_count -= 1;
    }

    /// Update a proxy's box, returns true when the proxy was re-inserted
    pub fn move_proxy(&mut self, proxy_id: usize, aabb: Aabb) -> bool {
        let fat = aabb.fattened(self.margin);
        let tree_aabb = self.nodes[proxy_id].aabb;

        if tree_aabb.contains(&aabb) {
            // Still enclosed; only shrink when the stored box has become huge
            let huge = fat.fattened(4.0 * self.margin);
            if huge.contains(&tree_aabb) {
                return false;
            }
        }

        self.remove_leaf(proxy_id);
        self.nodes[proxy_id].aabb = fat;
        self.insert_leaf(proxy_id);
        self.nodes[proxy_id].moved = true;
        true
    }

    pub fn fat_aabb(&self, proxy_id: usize) -> Aabb {
        self.nodes[proxy_id].aabb
    }

    pub fn user_data(&self, proxy_id: usize) -> Option<T> {
        self.nodes.get(proxy_id).and_then(|n| n.user_data)
    }

    pub fn was_moved(&self, proxy_id: usize) -> bool {
        self.nodes[proxy_id].moved
    }

    pub fn clear_moved(&mut self, proxy_id: usize) {
        self.nodes[proxy_id].moved = false;
    }

    pub fn test_overlap(&self, a: usize, b: usize) -> bool {
        self.nodes[a].aabb.overlaps(&self.nodes[b].aabb)
    }

    /// Visit every proxy whose fat box overlaps `aabb`; return false to stop
    pub fn query(&self, aabb: &Aabb, mut callback: impl FnMut(usize) -> bool) {
        if self.root == NULL_NODE {
            return;
        }
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.aabb.overlaps(aabb) {
                continue;
            }
            if node.is_leaf() {
                if !callback(id) {
                    return;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Walk proxies hit by a ray
    ///
    /// The callback returns the new max fraction: 0 terminates, a negative
    /// value ignores the proxy, otherwise the ray is clipped.
    pub fn ray_cast(
        &self,
        input: &RayCastInput,
        mut callback: impl FnMut(&RayCastInput, usize) -> f32,
    ) {
        if self.root == NULL_NODE {
            return;
        }
        let mut sub_input = *input;
        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.aabb.ray_cast(&sub_input).is_none() {
                continue;
            }
            if node.is_leaf() {
                let value = callback(&sub_input, id);
                if value == 0.0 {
                    return;
                }
                if value > 0.0 {
                    sub_input.max_fraction = value;
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    fn insert_leaf(&mut self, leaf: usize) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf].parent = NULL_NODE;
            return;
        }

        // Find the best sibling by descending along the cheapest branch
        let leaf_aabb = self.nodes[leaf].aabb;
        let mut index = self.root;
        while !self.nodes[index].is_leaf() {
            let node = &self.nodes[index];
            let (child1, child2) = (node.child1, node.child2);

            let area = node.aabb.perimeter();
            let combined_area = node.aabb.union(&leaf_aabb).perimeter();

            // Cost of creating a new parent for this node and the new leaf
            let cost = 2.0 * combined_area;
            // Minimum cost of pushing the leaf further down the tree
            let inheritance_cost = 2.0 * (combined_area - area);

            let child_cost = |child: usize| {
                let child_node = &self.nodes[child];
                let union_area = leaf_aabb.union(&child_node.aabb).perimeter();
                if child_node.is_leaf() {
                    union_area + inheritance_cost
                } else {
                    union_area - child_node.aabb.perimeter() + inheritance_cost
                }
            };
            let cost1 = child_cost(child1);
            let cost2 = child_cost(child2);

            if cost < cost1 && cost < cost2 {
                break;
            }
            index = if cost1 < cost2 { child1 } else { child2 };
        }

        let sibling = index;
        let old_parent = self.nodes[sibling].parent;
        let new_parent = self.allocate_node();
        {
            let sibling_aabb = self.nodes[sibling].aabb;
            let sibling_height = self.nodes[sibling].height;
            let node = &mut self.nodes[new_parent];
            node.parent = old_parent;
            node.user_data = None;
            node.aabb = leaf_aabb.union(&sibling_aabb);
            node.height = sibling_height + 1;
            node.child1 = sibling;
            node.child2 = leaf;
        }

        if old_parent != NULL_NODE {
            if self.nodes[old_parent].child1 == sibling {
                self.nodes[old_parent].child1 = new_parent;
            } else {
                self.nodes[old_parent].child2 = new_parent;
            }
        } else {
            self.root = new_parent;
        }
        self.nodes[sibling].parent = new_parent;
        self.nodes[leaf].parent = new_parent;

        let parent = self.nodes[leaf].parent;
        self.refit_from(parent);
    }

    fn remove_leaf(&mut self, leaf: usize) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf].parent;
        let grand_parent = self.nodes[parent].parent;
        let sibling = if self.nodes[parent].child1 == leaf {
            self.nodes[parent].child2
        } else {
            self.nodes[parent].child1
        };

        if grand_parent != NULL_NODE {
            // Splice the sibling into the grandparent
            if self.nodes[grand_parent].child1 == parent {
                self.nodes[grand_parent].child1 = sibling;
            } else {
                self.nodes[grand_parent].child2 = sibling;
            }
            self.nodes[sibling].parent = grand_parent;
            self.free_node(parent);
            self.refit_from(grand_parent);
        } else {
            self.root = sibling;
            self.nodes[sibling].parent = NULL_NODE;
            self.free_node(parent);
        }
    }

    /// Walk up from `index`, rebalancing and refitting every ancestor
    fn refit_from(&mut self, mut index: usize) {
        while index != NULL_NODE {
            index = self.balance(index);

            let (child1, child2) = (self.nodes[index].child1, self.nodes[index].child2);
            let height = 1 + self.nodes[child1].height.max(self.nodes[child2].height);
            let aabb = self.nodes[child1].aabb.union(&self.nodes[child2].aabb);

            let node = &mut self.nodes[index];
            node.height = height;
            node.aabb = aabb;
            index = node.parent;
        }
    }

    fn replace_child(&mut self, parent: usize, old: usize, new: usize) {
        if parent == NULL_NODE {
            self.root = new;
        } else if self.nodes[parent].child1 == old {
            self.nodes[parent].child1 = new;
        } else {
            self.nodes[parent].child2 = new;
        }
    }

    /// Rotate `ia` if it is imbalanced, returns the new subtree root
    fn balance(&mut self, ia: usize) -> usize {
        if self.nodes[ia].is_leaf() || self.nodes[ia].height < 2 {
            return ia;
        }

        let ib = self.nodes[ia].child1;
        let ic = self.nodes[ia].child2;
        let balance = self.nodes[ic].height - self.nodes[ib].height;

        if balance > 1 {
            // Rotate C up
            let i_f = self.nodes[ic].child1;
            let i_g = self.nodes[ic].child2;

            let a_parent = self.nodes[ia].parent;
            self.nodes[ic].child1 = ia;
            self.nodes[ic].parent = a_parent;
            self.nodes[ia].parent = ic;
            self.replace_child(a_parent, ia, ic);

            let (keep, moved_down) = if self.nodes[i_f].height > self.nodes[i_g].height {
                (i_f, i_g)
            } else {
                (i_g, i_f)
            };
            self.nodes[ic].child2 = keep;
            self.nodes[ia].child2 = moved_down;
            self.nodes[moved_down].parent = ia;

            self.nodes[ia].aabb = self.nodes[ib].aabb.union(&self.nodes[moved_down].aabb);
            self.nodes[ic].aabb = self.nodes[ia].aabb.union(&self.nodes[keep].aabb);
            self.nodes[ia].height =
                1 + self.nodes[ib].height.max(self.nodes[moved_down].height);
            self.nodes[ic].height = 1 + self.nodes[ia].height.max(self.nodes[keep].height);
            return ic;
        }

        if balance < -1 {
            // Rotate B up
            let i_d = self.nodes[ib].child1;
            let i_e = self.nodes[ib].child2;

            let a_parent = self.nodes[ia].parent;
            self.nodes[ib].child1 = ia;
            self.nodes[ib].parent = a_parent;
            self.nodes[ia].parent = ib;
            self.replace_child(a_parent, ia, ib);

            let (keep, moved_down) = if self.nodes[i_d].height > self.nodes[i_e].height {
                (i_d, i_e)
            } else {
                (i_e, i_d)
            };
            self.nodes[ib].child2 = keep;
            self.nodes[ia].child1 = moved_down;
            self.nodes[moved_down].parent = ia;

            self.nodes[ia].aabb = self.nodes[ic].aabb.union(&self.nodes[moved_down].aabb);
            self.nodes[ib].aabb = self.nodes[ia].aabb.union(&self.nodes[keep].aabb);
            self.nodes[ia].height =
                1 + self.nodes[ic].height.max(self.nodes[moved_down].height);
            self.nodes[ib].height = 1 + self.nodes[ia].height.max(self.nodes[keep].height);
            return ib;
        }

        ia
    }

    /// Check parent links, heights and bounds of the whole tree
    #[cfg(test)]
    fn validate(&self) {
        if self.root == NULL_NODE {
            return;
        }
        assert_eq!(self.nodes[self.root].parent, NULL_NODE);
        let mut stack = vec![self.root];
        let mut leaves = 0;
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.is_leaf() {
                assert_eq!(node.height, 0);
                leaves += 1;
                continue;
            }
            let (c1, c2) = (node.child1, node.child2);
            assert_eq!(self.nodes[c1].parent, id, "Child must point back to parent");
            assert_eq!(self.nodes[c2].parent, id, "Child must point back to parent");
            assert_eq!(
                node.height,
                1 + self.nodes[c1].height.max(self.nodes[c2].height)
            );
            assert!(node.aabb.contains(&self.nodes[c1].aabb));
            assert!(node.aabb.contains(&self.nodes[c2].aabb));
            stack.push(c1);
            stack.push(c2);
        }
        assert_eq!(leaves, self.proxy_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn unit_box(x: f32, y: f32) -> Aabb {
        Aabb::from_center(Vec2::new(x, y), Vec2::splat(0.5))
    }

    #[test]
    fn test_query_finds_overlapping_proxies() {
        let mut tree = DynamicTree::new(0.1);
        let a = tree.create_proxy(unit_box(0.0, 0.0), 'a');
        let _b = tree.create_proxy(unit_box(10.0, 0.0), 'b');
        let c = tree.create_proxy(unit_box(0.5, 0.5), 'c');
        tree.validate();

        let mut found = Vec::new();
        tree.query(&unit_box(0.2, 0.2), |id| {
            found.push(id);
            true
        });
        found.sort();
        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_tree_stays_balanced() {
        let mut tree = DynamicTree::new(0.1);
        // A line of boxes is the worst case for naive insertion
        let ids: Vec<usize> = (0..64)
            .map(|i| tree.create_proxy(unit_box(i as f32 * 2.0, 0.0), i))
            .collect();
        tree.validate();
        assert!(tree.height() < 20, "Height {} is too large", tree.height());

        for id in ids.iter().step_by(2) {
            tree.destroy_proxy(*id);
        }
        tree.validate();
        assert_eq!(tree.proxy_count(), 32);
    }

    #[test]
    fn test_small_moves_stay_inside_fat_box() {
        let mut tree = DynamicTree::new(0.1);
        let id = tree.create_proxy(unit_box(0.0, 0.0), 0u8);
        tree.clear_moved(id);

        assert!(!tree.move_proxy(id, unit_box(0.05, 0.0)));
        assert!(!tree.was_moved(id));

        assert!(tree.move_proxy(id, unit_box(1.0, 0.0)));
        assert!(tree.was_moved(id));
        assert!(tree.fat_aabb(id).contains(&unit_box(1.0, 0.0)));
        tree.validate();
    }

    #[test]
    fn test_freed_nodes_are_reused() {
        let mut tree = DynamicTree::new(0.1);
        let a = tree.create_proxy(unit_box(0.0, 0.0), 1);
        let b = tree.create_proxy(unit_box(3.0, 0.0), 2);
        let before = tree.nodes.len();
        tree.destroy_proxy(b);
        let c = tree.create_proxy(unit_box(6.0, 0.0), 3);
        assert_eq!(tree.nodes.len(), before, "Node storage should not grow");
        assert_eq!(tree.user_data(c), Some(3));
        assert_eq!(tree.user_data(a), Some(1));
        tree.validate();
    }

    #[test]
    fn test_ray_cast_visits_hit_proxies() {
        let mut tree = DynamicTree::new(0.0);
        let near = tree.create_proxy(unit_box(2.0, 0.0), "near");
        let _far = tree.create_proxy(unit_box(5.0, 0.0), "far");
        let _off = tree.create_proxy(unit_box(2.0, 5.0), "off");

        let input = RayCastInput {
            p1: Vec2::ZERO,
            p2: Vec2::new(10.0, 0.0),
            max_fraction: 1.0,
        };
        let mut hits = Vec::new();
        tree.ray_cast(&input, |sub, id| {
            hits.push(id);
            sub.max_fraction
        });
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&near));
    }
}
