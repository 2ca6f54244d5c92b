//! In-memory registry of managed windows.
//!
//! Each window the display system reports gets a [`WindowSlot`].  A slot is
//! first *registered* (no cell) and later *placed* (cell + geometry).
//! Destroying the window removes the slot and frees its cell.
//!
//! The registry enforces the occupancy invariant: no two slots hold the
//! same [`GridCell`] at the same time.

use crate::command::{WindowId, WindowKind};
use crate::grid::{Geometry, GridCell};
use std::collections::HashMap;

/// Cell and pixel geometry of a placed window.  Always set together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub cell: GridCell,
    pub geometry: Geometry,
}

/// Lifecycle state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Registered,
    Placed,
}

/// One managed window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSlot {
    id: WindowId,
    kind: WindowKind,
    placement: Option<Placement>,
}

impl WindowSlot {
    fn new(id: WindowId, kind: WindowKind) -> Self {
        Self {
            id,
            kind,
            placement: None,
        }
    }

    /// Window this slot belongs to.
    pub fn id(&self) -> &WindowId {
        &self.id
    }

    /// Type the window was registered with.
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    /// Held cell, `None` while unplaced.
    pub fn cell(&self) -> Option<GridCell> {
        self.placement.map(|p| p.cell)
    }

    /// Pixel geometry applied at placement.
    pub fn geometry(&self) -> Option<Geometry> {
        self.placement.map(|p| p.geometry)
    }

    /// Cell and geometry together.
    pub fn placement(&self) -> Option<Placement> {
        self.placement
    }

    /// `Placed` iff the slot holds a cell.
    pub fn state(&self) -> SlotState {
        match self.placement {
            Some(_) => SlotState::Placed,
            None => SlotState::Registered,
        }
    }
}

/// Errors produced by registry mutations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("window {0} is not registered")]
    UnknownWindow(WindowId),
    #[error("cell {cell} is already held by window {holder}")]
    CellTaken { cell: GridCell, holder: WindowId },
}

/// Mapping from window id to slot, plus a reverse index of held cells.
#[derive(Debug, Default)]
pub struct Registry {
    slots: HashMap<WindowId, WindowSlot>,
    occupied: HashMap<GridCell, WindowId>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` with no cell.
    ///
    /// Returns `false` (and leaves the existing slot untouched) when the
    /// window is already registered.
    pub fn register(&mut self, id: WindowId, kind: WindowKind) -> bool {
        if self.slots.contains_key(&id) {
            return false;
        }
        self.slots.insert(id.clone(), WindowSlot::new(id, kind));
        true
    }

    /// Place `id` at `cell`.
    ///
    /// A window that already holds another cell releases it first.  Fails if
    /// the window is unknown or the cell is held by a different window.
    pub fn assign(
        &mut self,
        id: &WindowId,
        cell: GridCell,
        geometry: Geometry,
    ) -> Result<(), RegistryError> {
        if let Some(holder) = self.occupied.get(&cell) {
            if holder != id {
                return Err(RegistryError::CellTaken {
                    cell,
                    holder: holder.clone(),
                });
            }
        }
        let slot = self
            .slots
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownWindow(id.clone()))?;
        if let Some(previous) = slot.placement.replace(Placement { cell, geometry }) {
            if previous.cell != cell {
                self.occupied.remove(&previous.cell);
            }
        }
        self.occupied.insert(cell, id.clone());
        Ok(())
    }

    /// Drop the slot for `id`, freeing its cell.
    pub fn remove(&mut self, id: &WindowId) -> Option<WindowSlot> {
        let slot = self.slots.remove(id)?;
        if let Some(cell) = slot.cell() {
            self.occupied.remove(&cell);
        }
        Some(slot)
    }

    /// Slot of `id`, if registered.
    pub fn get(&self, id: &WindowId) -> Option<&WindowSlot> {
        self.slots.get(id)
    }

    /// Whether `id` is registered, placed or not.
    pub fn contains(&self, id: &WindowId) -> bool {
        self.slots.contains_key(id)
    }

    /// The window holding `cell`, if any.
    pub fn occupant(&self, cell: GridCell) -> Option<&WindowId> {
        self.occupied.get(&cell)
    }

    /// Every slot, in no particular order.
    pub fn slots(&self) -> impl Iterator<Item = &WindowSlot> {
        self.slots.values()
    }

    /// Slots that hold a cell.
    pub fn placed(&self) -> impl Iterator<Item = &WindowSlot> {
        self.slots.values().filter(|s| s.placement.is_some())
    }

    /// Number of held cells.
    pub fn placed_count(&self) -> usize {
        self.occupied.len()
    }

    /// Number of registered windows.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` when no window is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
