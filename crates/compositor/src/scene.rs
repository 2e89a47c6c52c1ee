//! z-ordered scene graph.
//!
//! Nodes live in an arena addressed by generational [`DrawableId`]s. Each
//! parent (the screen root, or a viewport's child list) threads its children
//! through `prev`/`next` indices in non-increasing `z` order, so a composite
//! is a walk from head to tail with no sorting and no allocation.
//!
//! A node points back at its parent through a plain [`ParentId`]; the handle
//! never keeps the parent alive and is cleared when the parent goes away.

use std::any::Any;

use crate::canvas::Canvas;
use crate::gpu::RenderBackend;
use crate::types::Rect;

/// Something the compositor can paint.
pub trait Drawable<B: RenderBackend>: Any {
    fn paint(&mut self, canvas: &mut Canvas<'_, B>);

    /// Called when the geometry of the parent changes. Applying the same
    /// viewport twice must leave the drawable in the same state.
    fn on_viewport_changed(&mut self, _viewport: &ViewportRect) {}

    /// Releases resources owned by the drawable. Called at most once.
    fn dispose(&mut self) {}

    /// Lets a drawable that was disposed from outside the scene opt out of
    /// painting.
    fn is_disposed(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Geometry a parent exposes to its children: the clip rectangle on screen
/// and the scroll offset applied to child coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportRect {
    pub rect: Rect,
    pub ox: i32,
    pub oy: i32,
}

impl ViewportRect {
    pub fn new(rect: Rect) -> Self {
        Self { rect, ox: 0, oy: 0 }
    }

    /// Screen position of child coordinate `(0, 0)`.
    pub fn origin(&self) -> (i32, i32) {
        (self.rect.x - self.ox, self.rect.y - self.oy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DrawableId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentId {
    index: u32,
    generation: u32,
}

struct NodeEntry<B: RenderBackend> {
    z: i32,
    visible: bool,
    disposed: bool,
    parent: Option<ParentId>,
    prev: Option<u32>,
    next: Option<u32>,
    /// Child list this node composites before painting itself.
    children: Option<ParentId>,
    painter: Box<dyn Drawable<B>>,
}

struct NodeSlot<B: RenderBackend> {
    generation: u32,
    entry: Option<NodeEntry<B>>,
}

struct ParentEntry {
    head: Option<u32>,
    tail: Option<u32>,
    viewport: ViewportRect,
    owner: Option<u32>,
}

struct ParentSlot {
    generation: u32,
    entry: Option<ParentEntry>,
}

pub struct Scene<B: RenderBackend> {
    nodes: Vec<NodeSlot<B>>,
    free_nodes: Vec<u32>,
    parents: Vec<ParentSlot>,
    free_parents: Vec<u32>,
    root: ParentId,
    live: usize,
}

impl<B: RenderBackend> Scene<B> {
    pub fn new(viewport: ViewportRect) -> Self {
        let mut scene = Self {
            nodes: Vec::new(),
            free_nodes: Vec::new(),
            parents: Vec::new(),
            free_parents: Vec::new(),
            root: ParentId {
                index: 0,
                generation: 0,
            },
            live: 0,
        };
        scene.root = scene.create_parent(viewport);
        scene
    }

    /// The screen-level parent.
    pub fn root(&self) -> ParentId {
        self.root
    }

    /// Number of live drawables, attached or not.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: DrawableId) -> bool {
        self.entry(id).is_some()
    }

    pub fn create_parent(&mut self, viewport: ViewportRect) -> ParentId {
        let entry = ParentEntry {
            head: None,
            tail: None,
            viewport,
            owner: None,
        };
        match self.free_parents.pop() {
            Some(index) => {
                let slot = &mut self.parents[index as usize];
                slot.entry = Some(entry);
                ParentId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.parents.len() as u32;
                self.parents.push(ParentSlot {
                    generation: 0,
                    entry: Some(entry),
                });
                ParentId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    /// Destroys a parent. Its children stay alive but become detached. The
    /// screen root cannot be destroyed.
    pub fn destroy_parent(&mut self, parent: ParentId) {
        if parent == self.root {
            tracing::debug!("refusing to destroy the root parent");
            return;
        }
        let Some(entry) = self.parent_entry(parent) else {
            return;
        };
        let mut cursor = entry.head;
        if let Some(owner) = entry.owner {
            if let Some(node) = self.nodes[owner as usize].entry.as_mut() {
                node.children = None;
            }
        }
        while let Some(index) = cursor {
            let Some(node) = self.nodes[index as usize].entry.as_mut() else {
                break;
            };
            cursor = node.next;
            node.parent = None;
            node.prev = None;
            node.next = None;
        }
        let slot = &mut self.parents[parent.index as usize];
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_parents.push(parent.index);
    }

    pub fn parent_viewport(&self, parent: ParentId) -> Option<ViewportRect> {
        self.parent_entry(parent).map(|entry| entry.viewport)
    }

    /// Updates a parent's geometry without notifying its children.
    pub fn set_parent_viewport(&mut self, parent: ParentId, viewport: ViewportRect) {
        if let Some(entry) = self.parent_entry_mut(parent) {
            entry.viewport = viewport;
        }
    }

    /// Adds a drawable under `parent` (or detached when `None` or stale).
    pub fn attach(
        &mut self,
        parent: Option<ParentId>,
        z: i32,
        painter: Box<dyn Drawable<B>>,
    ) -> DrawableId {
        let parent = parent.filter(|parent| self.parent_entry(*parent).is_some());
        let entry = NodeEntry {
            z,
            visible: true,
            disposed: false,
            parent,
            prev: None,
            next: None,
            children: None,
            painter,
        };
        let id = match self.free_nodes.pop() {
            Some(index) => {
                let slot = &mut self.nodes[index as usize];
                slot.entry = Some(entry);
                DrawableId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.nodes.len() as u32;
                self.nodes.push(NodeSlot {
                    generation: 0,
                    entry: Some(entry),
                });
                DrawableId {
                    index,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        if let Some(parent) = parent {
            self.insert_sorted(parent, id.index);
        }
        id
    }

    /// Adds a drawable that owns a child list of its own. The children are
    /// clipped to `viewport` and composited before the drawable paints.
    pub fn attach_group(
        &mut self,
        parent: Option<ParentId>,
        z: i32,
        painter: Box<dyn Drawable<B>>,
        viewport: ViewportRect,
    ) -> (DrawableId, ParentId) {
        let id = self.attach(parent, z, painter);
        let children = self.create_parent(viewport);
        if let Some(entry) = self.parent_entry_mut(children) {
            entry.owner = Some(id.index);
        }
        if let Some(node) = self.entry_mut(id) {
            node.children = Some(children);
        }
        (id, children)
    }

    /// Child list owned by a group node.
    pub fn children_of(&self, id: DrawableId) -> Option<ParentId> {
        self.entry(id).and_then(|node| node.children)
    }

    /// Removes the drawable from its parent without destroying it.
    pub fn detach(&mut self, id: DrawableId) {
        if self.entry(id).is_none() {
            return;
        }
        self.unlink(id.index);
        if let Some(node) = self.entry_mut(id) {
            node.parent = None;
        }
    }

    /// Removes the drawable from the scene and hands its painter back. A
    /// group's child list is destroyed with it; the children are detached.
    pub fn destroy(&mut self, id: DrawableId) -> Option<Box<dyn Drawable<B>>> {
        self.entry(id)?;
        self.unlink(id.index);
        let slot = &mut self.nodes[id.index as usize];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_nodes.push(id.index);
        self.live -= 1;
        if let Some(children) = entry.children {
            if let Some(parent) = self.parent_entry_mut(children) {
                parent.owner = None;
            }
            self.destroy_parent(children);
        }
        Some(entry.painter)
    }

    /// Moves the drawable to `parent` and notifies it of the new geometry.
    pub fn set_parent(&mut self, id: DrawableId, parent: Option<ParentId>) {
        if self.entry(id).is_none() {
            return;
        }
        self.unlink(id.index);
        let parent = parent.filter(|parent| self.parent_entry(*parent).is_some());
        if let Some(node) = self.entry_mut(id) {
            node.parent = parent;
        }
        let Some(parent) = parent else {
            return;
        };
        self.insert_sorted(parent, id.index);
        if let Some(viewport) = self.parent_viewport(parent) {
            if let Some(node) = self.entry_mut(id) {
                node.painter.on_viewport_changed(&viewport);
            }
        }
    }

    /// Re-sorts the drawable under a new `z`. Detached drawables and
    /// unchanged values are left alone.
    pub fn set_z(&mut self, id: DrawableId, z: i32) {
        let Some(node) = self.entry(id) else {
            return;
        };
        let Some(parent) = node.parent else {
            return;
        };
        if node.z == z {
            return;
        }
        self.unlink(id.index);
        if let Some(node) = self.entry_mut(id) {
            node.z = z;
            node.parent = Some(parent);
        }
        self.insert_sorted(parent, id.index);
    }

    pub fn z(&self, id: DrawableId) -> Option<i32> {
        self.entry(id).map(|node| node.z)
    }

    pub fn set_visible(&mut self, id: DrawableId, visible: bool) {
        if let Some(node) = self.entry_mut(id) {
            node.visible = visible;
        }
    }

    pub fn visible(&self, id: DrawableId) -> Option<bool> {
        self.entry(id).map(|node| node.visible)
    }

    pub fn parent_of(&self, id: DrawableId) -> Option<ParentId> {
        self.entry(id).and_then(|node| node.parent)
    }

    /// Runs the drawable's disposal hook once and stops painting it. The node
    /// keeps its place in the ordering.
    pub fn dispose(&mut self, id: DrawableId) {
        if let Some(node) = self.entry_mut(id) {
            if !node.disposed {
                node.disposed = true;
                node.painter.dispose();
            }
        }
    }

    pub fn is_disposed(&self, id: DrawableId) -> bool {
        self.entry(id)
            .map_or(true, |node| node.disposed || node.painter.is_disposed())
    }

    /// Children of `parent` from head (highest z) to tail.
    pub fn children(&self, parent: ParentId) -> Children<'_, B> {
        Children {
            scene: self,
            parent_generation: self.parent_entry(parent).map(|_| parent.generation),
            cursor: self.parent_entry(parent).and_then(|entry| entry.head),
        }
    }

    pub fn painter<T: Drawable<B>>(&self, id: DrawableId) -> Option<&T> {
        self.entry(id)
            .and_then(|node| node.painter.as_any().downcast_ref::<T>())
    }

    pub fn painter_mut<T: Drawable<B>>(&mut self, id: DrawableId) -> Option<&mut T> {
        self.entry_mut(id)
            .and_then(|node| node.painter.as_any_mut().downcast_mut::<T>())
    }

    /// Paints every visible, undisposed child of `parent` from head to tail.
    pub fn composite(&mut self, parent: ParentId, canvas: &mut Canvas<'_, B>) {
        let mut cursor = self.parent_entry(parent).and_then(|entry| entry.head);
        while let Some(index) = cursor {
            let Some(node) = self.nodes[index as usize].entry.as_ref() else {
                break;
            };
            cursor = node.next;
            if !node.visible || node.disposed || node.painter.is_disposed() {
                continue;
            }
            if let Some(children) = node.children {
                if let Some(viewport) = self.parent_viewport(children) {
                    canvas.push(viewport.rect, viewport.origin());
                    self.composite(children, canvas);
                    if let Some(node) = self.nodes[index as usize].entry.as_mut() {
                        node.painter.paint(canvas);
                    }
                    canvas.pop();
                    continue;
                }
            }
            if let Some(node) = self.nodes[index as usize].entry.as_mut() {
                node.painter.paint(canvas);
            }
        }
    }

    /// Sends the parent's current geometry to each of its children.
    pub fn notify_viewport_changed(&mut self, parent: ParentId) {
        let Some(viewport) = self.parent_viewport(parent) else {
            return;
        };
        let mut cursor = self.parent_entry(parent).and_then(|entry| entry.head);
        while let Some(index) = cursor {
            let Some(node) = self.nodes[index as usize].entry.as_mut() else {
                break;
            };
            cursor = node.next;
            node.painter.on_viewport_changed(&viewport);
        }
    }

    /// Disposes every child of `parent` from tail to head, descending into
    /// group nodes before disposing the group itself.
    pub fn dispose_all_reverse(&mut self, parent: ParentId) {
        let mut cursor = self.parent_entry(parent).and_then(|entry| entry.tail);
        while let Some(index) = cursor {
            let Some(node) = self.nodes[index as usize].entry.as_ref() else {
                break;
            };
            cursor = node.prev;
            if let Some(children) = node.children {
                self.dispose_all_reverse(children);
            }
            if let Some(node) = self.nodes[index as usize].entry.as_mut() {
                if !node.disposed {
                    node.disposed = true;
                    node.painter.dispose();
                }
            }
        }
    }

    fn entry(&self, id: DrawableId) -> Option<&NodeEntry<B>> {
        self.nodes
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn entry_mut(&mut self, id: DrawableId) -> Option<&mut NodeEntry<B>> {
        self.nodes
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    fn parent_entry(&self, id: ParentId) -> Option<&ParentEntry> {
        self.parents
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn parent_entry_mut(&mut self, id: ParentId) -> Option<&mut ParentEntry> {
        self.parents
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// Inserts before the first node whose z is strictly lower, else appends.
    fn insert_sorted(&mut self, parent: ParentId, index: u32) {
        let Some(z) = self.nodes[index as usize].entry.as_ref().map(|node| node.z) else {
            return;
        };
        let Some(head) = self.parent_entry(parent).map(|entry| entry.head) else {
            return;
        };

        let mut cursor = head;
        let mut before = None;
        while let Some(current) = cursor {
            let Some(node) = self.nodes[current as usize].entry.as_ref() else {
                break;
            };
            if node.z < z {
                before = Some(current);
                break;
            }
            cursor = node.next;
        }

        let prev = match before {
            Some(next) => self.nodes[next as usize]
                .entry
                .as_ref()
                .and_then(|node| node.prev),
            None => self.parent_entry(parent).and_then(|entry| entry.tail),
        };

        if let Some(node) = self.nodes[index as usize].entry.as_mut() {
            node.prev = prev;
            node.next = before;
        }
        match prev {
            Some(prev) => {
                if let Some(node) = self.nodes[prev as usize].entry.as_mut() {
                    node.next = Some(index);
                }
            }
            None => {
                if let Some(entry) = self.parent_entry_mut(parent) {
                    entry.head = Some(index);
                }
            }
        }
        match before {
            Some(next) => {
                if let Some(node) = self.nodes[next as usize].entry.as_mut() {
                    node.prev = Some(index);
                }
            }
            None => {
                if let Some(entry) = self.parent_entry_mut(parent) {
                    entry.tail = Some(index);
                }
            }
        }
    }

    fn unlink(&mut self, index: u32) {
        let Some((parent, prev, next)) = self.nodes[index as usize]
            .entry
            .as_ref()
            .map(|node| (node.parent, node.prev, node.next))
        else {
            return;
        };
        let Some(parent) = parent else {
            return;
        };
        match prev {
            Some(prev) => {
                if let Some(node) = self.nodes[prev as usize].entry.as_mut() {
                    node.next = next;
                }
            }
            None => {
                if let Some(entry) = self.parent_entry_mut(parent) {
                    entry.head = next;
                }
            }
        }
        match next {
            Some(next) => {
                if let Some(node) = self.nodes[next as usize].entry.as_mut() {
                    node.prev = prev;
                }
            }
            None => {
                if let Some(entry) = self.parent_entry_mut(parent) {
                    entry.tail = prev;
                }
            }
        }
        if let Some(node) = self.nodes[index as usize].entry.as_mut() {
            node.prev = None;
            node.next = None;
        }
    }
}

/// Iterator over a parent's children, head to tail.
pub struct Children<'a, B: RenderBackend> {
    scene: &'a Scene<B>,
    parent_generation: Option<u32>,
    cursor: Option<u32>,
}

impl<B: RenderBackend> Iterator for Children<'_, B> {
    type Item = DrawableId;

    fn next(&mut self) -> Option<Self::Item> {
        self.parent_generation?;
        let index = self.cursor?;
        let slot = &self.scene.nodes[index as usize];
        let node = slot.entry.as_ref()?;
        self.cursor = node.next;
        Some(DrawableId {
            index,
            generation: slot.generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::gpu::HeadlessBackend;
    use crate::target::RenderTarget;
    use crate::types::Size;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        journal: Journal,
    }

    impl Probe {
        fn boxed(name: &'static str, journal: &Journal) -> Box<dyn Drawable<HeadlessBackend>> {
            Box::new(Self {
                name,
                journal: Rc::clone(journal),
            })
        }
    }

    impl Drawable<HeadlessBackend> for Probe {
        fn paint(&mut self, _canvas: &mut Canvas<'_, HeadlessBackend>) {
            self.journal.borrow_mut().push(format!("paint {}", self.name));
        }

        fn on_viewport_changed(&mut self, viewport: &ViewportRect) {
            self.journal
                .borrow_mut()
                .push(format!("viewport {} {}", self.name, viewport.rect.width));
        }

        fn dispose(&mut self) {
            self.journal.borrow_mut().push(format!("dispose {}", self.name));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn scene() -> Scene<HeadlessBackend> {
        Scene::new(ViewportRect::new(Rect::new(0, 0, 16, 16)))
    }

    fn zs(scene: &Scene<HeadlessBackend>, parent: ParentId) -> Vec<i32> {
        scene
            .children(parent)
            .filter_map(|id| scene.z(id))
            .collect()
    }

    #[test]
    fn equal_z_keeps_insertion_order() {
        let journal = Journal::default();
        let mut scene = scene();
        let root = scene.root();
        let first = scene.attach(Some(root), 5, Probe::boxed("a", &journal));
        let second = scene.attach(Some(root), 5, Probe::boxed("b", &journal));
        let top = scene.attach(Some(root), 10, Probe::boxed("c", &journal));
        let order: Vec<DrawableId> = scene.children(root).collect();
        assert_eq!(order, vec![top, first, second]);
        assert_eq!(zs(&scene, root), vec![10, 5, 5]);
    }

    #[test]
    fn arbitrary_inserts_keep_non_increasing_order() {
        let journal = Journal::default();
        let mut scene = scene();
        let root = scene.root();
        for z in [3, -1, 7, 3, 0, 7, 12, -5, 3] {
            scene.attach(Some(root), z, Probe::boxed("n", &journal));
        }
        let order = zs(&scene, root);
        assert!(order.windows(2).all(|pair| pair[0] >= pair[1]), "{order:?}");
        assert_eq!(order.len(), 9);
    }

    #[test]
    fn set_z_reorders_and_ignores_detached() {
        let journal = Journal::default();
        let mut scene = scene();
        let root = scene.root();
        let low = scene.attach(Some(root), 1, Probe::boxed("low", &journal));
        scene.attach(Some(root), 5, Probe::boxed("high", &journal));
        scene.set_z(low, 9);
        assert_eq!(zs(&scene, root), vec![9, 5]);

        let loose = scene.attach(None, 2, Probe::boxed("loose", &journal));
        scene.set_z(loose, 4);
        assert_eq!(scene.z(loose), Some(2));
    }

    #[test]
    fn set_parent_moves_and_notifies() {
        let journal = Journal::default();
        let mut scene = scene();
        let root = scene.root();
        let other = scene.create_parent(ViewportRect::new(Rect::new(0, 0, 4, 4)));
        let id = scene.attach(Some(root), 0, Probe::boxed("a", &journal));
        scene.set_parent(id, Some(other));
        assert_eq!(scene.children(root).count(), 0);
        assert_eq!(scene.children(other).collect::<Vec<_>>(), vec![id]);
        assert_eq!(scene.parent_of(id), Some(other));
        assert_eq!(journal.borrow().as_slice(), ["viewport a 4"]);
    }

    #[test]
    fn destroying_parent_detaches_children() {
        let journal = Journal::default();
        let mut scene = scene();
        let parent = scene.create_parent(ViewportRect::default());
        let a = scene.attach(Some(parent), 1, Probe::boxed("a", &journal));
        let b = scene.attach(Some(parent), 2, Probe::boxed("b", &journal));
        scene.destroy_parent(parent);
        assert_eq!(scene.parent_of(a), None);
        assert_eq!(scene.parent_of(b), None);
        assert!(scene.contains(a));
        assert_eq!(scene.children(parent).count(), 0);
    }

    #[test]
    fn stale_ids_are_ignored() {
        let journal = Journal::default();
        let mut scene = scene();
        let root = scene.root();
        let old = scene.attach(Some(root), 0, Probe::boxed("old", &journal));
        assert!(scene.destroy(old).is_some());
        let new = scene.attach(Some(root), 0, Probe::boxed("new", &journal));
        assert_ne!(old, new);
        assert!(scene.destroy(old).is_none());
        assert_eq!(scene.z(old), None);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn composite_skips_hidden_and_disposed_without_unlinking() {
        let journal = Journal::default();
        let mut scene = scene();
        let root = scene.root();
        scene.attach(Some(root), 3, Probe::boxed("a", &journal));
        let hidden = scene.attach(Some(root), 2, Probe::boxed("b", &journal));
        let disposed = scene.attach(Some(root), 1, Probe::boxed("c", &journal));
        scene.set_visible(hidden, false);
        scene.dispose(disposed);
        journal.borrow_mut().clear();

        let mut backend = HeadlessBackend::new(Size::new(16, 16));
        let target = RenderTarget::new(&mut backend, Size::new(16, 16)).unwrap();
        let mut canvas = target.bind(&mut backend);
        scene.composite(root, &mut canvas);
        drop(canvas);

        assert_eq!(journal.borrow().as_slice(), ["paint a"]);
        assert_eq!(scene.children(root).count(), 3);
    }

    #[test]
    fn dispose_all_reverse_walks_tail_to_head() {
        let journal = Journal::default();
        let mut scene = scene();
        let root = scene.root();
        scene.attach(Some(root), 1, Probe::boxed("low", &journal));
        let (_, children) = scene.attach_group(
            Some(root),
            5,
            Probe::boxed("group", &journal),
            ViewportRect::default(),
        );
        scene.attach(Some(children), 0, Probe::boxed("inner", &journal));
        scene.attach(Some(root), 9, Probe::boxed("high", &journal));
        scene.dispose_all_reverse(root);
        assert_eq!(
            journal.borrow().as_slice(),
            ["dispose low", "dispose inner", "dispose group", "dispose high"]
        );
    }

    #[test]
    fn typed_painter_lookup() {
        let journal = Journal::default();
        let mut scene = scene();
        let id = scene.attach(None, 0, Probe::boxed("typed", &journal));
        assert_eq!(scene.painter::<Probe>(id).map(|probe| probe.name), Some("typed"));
        if let Some(probe) = scene.painter_mut::<Probe>(id) {
            probe.name = "renamed";
        }
        assert_eq!(scene.painter::<Probe>(id).map(|probe| probe.name), Some("renamed"));
    }
}
