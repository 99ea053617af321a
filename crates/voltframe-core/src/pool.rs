//! Recycled sprites for the particle flow.
//!
//! Sprites are created lazily on one layer and never destroyed while the
//! pool lives: a released slot is hidden and pushed onto the free list, and
//! the next `acquire` pops it back.

use tracing::debug;
use voltframe_platform::{LayerId, RenderSurface, SpriteId};

/// Index of a sprite slot in a [`SpritePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug, Clone, Copy)]
struct Slot {
    sprite: SpriteId,
    in_use: bool,
}

#[derive(Debug, Default)]
pub struct SpritePool {
    slots: Vec<Slot>,
    free: Vec<SlotId>,
    layer: Option<LayerId>,
}

impl SpritePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer new sprites are created on. Without one `acquire` yields nothing.
    pub fn bind(&mut self, layer: LayerId) {
        self.layer = Some(layer);
    }

    pub fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    /// Reuses a free slot or creates a sprite for a new one. The sprite is
    /// returned hidden.
    pub fn acquire(&mut self, surface: &dyn RenderSurface) -> Option<SlotId> {
        if let Some(slot) = self.free.pop() {
            self.slots[slot.0].in_use = true;
            return Some(slot);
        }
        let layer = self.layer?;
        let slot = SlotId(self.slots.len());
        self.slots.push(Slot {
            sprite: surface.create_sprite(layer),
            in_use: true,
        });
        Some(slot)
    }

    /// Hides the slot's sprite and returns it to the free list. Releasing a
    /// free or unknown slot does nothing.
    pub fn release(&mut self, surface: Option<&dyn RenderSurface>, slot: SlotId) {
        let Some(entry) = self.slots.get_mut(slot.0) else {
            return;
        };
        if !entry.in_use {
            return;
        }
        entry.in_use = false;
        if let Some(surface) = surface {
            surface.set_sprite_visible(entry.sprite, false);
        }
        self.free.push(slot);
    }

    pub fn sprite(&self, slot: SlotId) -> Option<SpriteId> {
        self.slots.get(slot.0).map(|s| s.sprite)
    }

    /// Sprites created so far.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Destroys every sprite and forgets the layer.
    pub fn clear(&mut self, surface: Option<&dyn RenderSurface>) {
        if let Some(surface) = surface {
            for slot in &self.slots {
                surface.destroy_sprite(slot.sprite);
            }
        }
        debug!(sprites = self.slots.len(), "sprite pool cleared");
        self.slots.clear();
        self.free.clear();
        self.layer = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltframe_platform::headless::RecordingSurface;
    use voltframe_platform::LayerDesc;

    fn bound_pool(surface: &RecordingSurface) -> SpritePool {
        let mut pool = SpritePool::new();
        pool.bind(surface.create_layer(LayerDesc::default()));
        pool
    }

    #[test]
    fn unbound_pool_yields_nothing() {
        let surface = RecordingSurface::new();
        let mut pool = SpritePool::new();
        assert!(pool.acquire(&surface).is_none());
        assert_eq!(surface.sprites_created(), 0);
    }

    #[test]
    fn released_slots_are_reused() {
        let surface = RecordingSurface::new();
        let mut pool = bound_pool(&surface);
        let a = pool.acquire(&surface).unwrap();
        let b = pool.acquire(&surface).unwrap();
        assert_ne!(a, b);
        surface.set_sprite_visible(pool.sprite(a).unwrap(), true);

        pool.release(Some(&surface), a);
        assert_eq!(surface.visible_sprite_count(), 0);
        assert_eq!(pool.in_use(), 1);

        let c = pool.acquire(&surface).unwrap();
        assert_eq!(c, a);
        assert_eq!(surface.sprites_created(), 2);
        assert_eq!(pool.capacity(), 2);
    }

    #[test]
    fn double_release_is_ignored() {
        let surface = RecordingSurface::new();
        let mut pool = bound_pool(&surface);
        let a = pool.acquire(&surface).unwrap();
        pool.release(Some(&surface), a);
        pool.release(Some(&surface), a);
        assert_eq!(pool.free_count(), 1);
        let b = pool.acquire(&surface).unwrap();
        let c = pool.acquire(&surface).unwrap();
        assert_ne!(b, c);
    }

    #[test]
    fn clear_destroys_sprites() {
        let surface = RecordingSurface::new();
        let mut pool = bound_pool(&surface);
        for _ in 0..3 {
            pool.acquire(&surface);
        }
        assert_eq!(surface.sprite_count(), 3);
        pool.clear(Some(&surface));
        assert_eq!(surface.sprite_count(), 0);
        assert_eq!(pool.capacity(), 0);
        assert!(pool.layer().is_none());
    }
}
