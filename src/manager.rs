//! The window manager facade that ties the grid, the registry, the layout
//! store and the display server together.
//!
//! [`GridWindowManager`] reacts to window creation and destruction by
//! allocating or freeing grid cells, applies the resulting geometry through
//! the [`DisplayServer`] trait, and rewrites the persisted layout after every
//! placement.

use crate::command::{WindowId, WindowKind};
use crate::grid::{Geometry, Grid, GridCell};
use crate::layout::{Layout, LayoutError, LayoutStore};
use crate::registry::{Registry, RegistryError};
use crate::traits::DisplayServer;
use log::{debug, error, info, warn};

/// Opacity applied to placed windows unless configured otherwise.
pub const DEFAULT_OPACITY: f64 = 0.9;

/// Possible errors from the window manager.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// The display server returned an error.
    #[error("display error: {0}")]
    Display(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result of asking the manager to place a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The window holds `cell` and was moved to `geometry`.
    Placed { cell: GridCell, geometry: Geometry },
    /// Every cell is taken; the window was left where it is.
    Skipped,
    /// The window is not a normal window and is never auto-placed.
    Ignored,
}

/// Orchestrates cell allocation, display calls and layout persistence.
///
/// Generic over any [`DisplayServer`], so it knows nothing about Hyprland.
/// Dropping the manager writes the layout one last time.
///
/// # Typical usage
///
/// ```ignore
/// let mut wm = GridWindowManager::new(HyprlandDisplay::new(), Grid::new(4), store);
/// wm.load_layout();
/// wm.on_window_created("0x55d1c8a0".into(), WindowKind::Normal)?;
/// ```
pub struct GridWindowManager<D: DisplayServer> {
    display: D,
    grid: Grid,
    registry: Registry,
    store: LayoutStore,
    loaded: Layout,
    opacity: f64,
}

impl<D: DisplayServer> GridWindowManager<D> {
    /// Create a manager with an empty registry and no loaded layout.
    pub fn new(display: D, grid: Grid, store: LayoutStore) -> Self {
        Self {
            display,
            grid,
            registry: Registry::new(),
            store,
            loaded: Layout::new(),
            opacity: DEFAULT_OPACITY,
        }
    }

    /// Opacity applied to every window placed from now on.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Grid dimensions in use.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Windows tracked so far.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The display collaborator.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Records read by the last [`load_layout`](Self::load_layout).
    pub fn loaded_layout(&self) -> &Layout {
        &self.loaded
    }

    //  Window lifecycle

    /// Track `id` without placing it.  Returns `false` if it was already
    /// tracked.
    pub fn register_window(&mut self, id: WindowId, kind: WindowKind) -> bool {
        let added = self.registry.register(id.clone(), kind);
        if added {
            debug!("registered {} ({})", id, kind);
        }
        added
    }

    /// Register every window the display already shows.
    ///
    /// Nothing is placed; follow with [`apply_layout`](Self::apply_layout)
    /// to restore the windows that have a stored cell.
    pub fn adopt_existing_windows(&mut self) -> Result<usize, ManagerError> {
        let windows = self
            .display
            .windows()
            .map_err(|e| ManagerError::Display(e.to_string()))?;
        let adopted = windows
            .into_iter()
            .filter(|id| self.registry.register(id.clone(), WindowKind::Normal))
            .count();
        info!("adopted {} existing window(s)", adopted);
        Ok(adopted)
    }

    /// A window appeared.  Normal windows are registered and placed; every
    /// other kind is ignored.
    pub fn on_window_created(
        &mut self,
        id: WindowId,
        kind: WindowKind,
    ) -> Result<PlacementOutcome, ManagerError> {
        if !kind.is_normal() {
            debug!("ignoring {} window {}", kind, id);
            return Ok(PlacementOutcome::Ignored);
        }
        self.register_window(id.clone(), kind);
        self.place_window(&id)
    }

    /// A window went away.  Its slot is dropped and its cell becomes free.
    ///
    /// The layout file is not rewritten here; the next save leaves the
    /// window out.
    pub fn on_window_destroyed(&mut self, id: &WindowId) -> bool {
        match self.registry.remove(id) {
            Some(slot) => {
                match slot.cell() {
                    Some(cell) => info!("window {} closed, freed cell {}", id, cell),
                    None => debug!("unplaced window {} closed", id),
                }
                true
            }
            None => false,
        }
    }

    /// Give `id` the first free cell and move it there.
    ///
    /// A window that already holds a cell keeps it.  When the grid is full
    /// the window is left alone and [`PlacementOutcome::Skipped`] is
    /// returned.  The cell is recorded and the layout saved only after every
    /// display call succeeded; on a display error the cell stays free and
    /// the error is returned.
    pub fn place_window(&mut self, id: &WindowId) -> Result<PlacementOutcome, ManagerError> {
        let slot = self
            .registry
            .get(id)
            .ok_or_else(|| RegistryError::UnknownWindow(id.clone()))?;
        if let Some(placement) = slot.placement() {
            debug!("{} already placed at {}", id, placement.cell);
            return Ok(PlacementOutcome::Placed {
                cell: placement.cell,
                geometry: placement.geometry,
            });
        }

        let Some(cell) = self.grid.find_free_cell(&self.registry) else {
            info!(
                "grid full ({} cells), leaving {} unplaced",
                self.grid.capacity(),
                id
            );
            return Ok(PlacementOutcome::Skipped);
        };

        let geometry = self.geometry_for(cell)?;
        self.show(id, geometry)?;
        self.registry.assign(id, cell, geometry)?;
        info!("placed {} at {} -> {}", id, cell, geometry);
        self.persist();
        Ok(PlacementOutcome::Placed { cell, geometry })
    }

    //  Layout persistence

    /// Write every placed window to the layout file.
    pub fn save_layout(&self) -> Result<(), LayoutError> {
        self.store.save(&Layout::from_registry(&self.registry))
    }

    /// Read the layout file and hold its records for
    /// [`apply_layout`](Self::apply_layout).
    ///
    /// A missing or malformed file yields an empty layout.  Returns the
    /// number of records loaded.
    pub fn load_layout(&mut self) -> usize {
        self.loaded = match self.store.load() {
            Ok(layout) => layout,
            Err(e) => {
                warn!("{}; starting with an empty layout", e);
                Layout::new()
            }
        };
        info!(
            "loaded {} layout record(s) from {}",
            self.loaded.len(),
            self.store.path().display()
        );
        self.loaded.len()
    }

    /// Put every registered window that has a loaded record back on its
    /// stored cell.
    ///
    /// The allocator is not consulted.  Records pointing outside the grid,
    /// or at a cell another window holds, are skipped, as are windows the
    /// display fails to move.  Returns the windows that were restored.
    pub fn apply_layout(&mut self) -> Vec<WindowId> {
        let pending: Vec<(WindowId, GridCell)> = self
            .loaded
            .iter()
            .filter(|(id, _)| self.registry.contains(id))
            .map(|(id, record)| (id, record.position))
            .collect();

        let mut restored = Vec::new();
        for (id, cell) in pending {
            if !self.grid.contains(cell) {
                warn!(
                    "stored cell {} of {} is outside the {}x{} grid",
                    cell,
                    id,
                    self.grid.size(),
                    self.grid.size()
                );
                continue;
            }
            if let Some(holder) = self.registry.occupant(cell) {
                if *holder != id {
                    warn!("not restoring {}: cell {} is held by {}", id, cell, holder);
                    continue;
                }
            }
            match self.restore(&id, cell) {
                Ok(geometry) => {
                    info!("restored {} at {} -> {}", id, cell, geometry);
                    restored.push(id);
                }
                Err(e) => warn!("not restoring {}: {}", id, e),
            }
        }

        if !restored.is_empty() {
            self.persist();
        }
        restored
    }

    //  Internal

    /// Pixel geometry of `cell` on the current screen.
    fn geometry_for(&self, cell: GridCell) -> Result<Geometry, ManagerError> {
        let screen = self
            .display
            .screen_size()
            .map_err(|e| ManagerError::Display(e.to_string()))?;
        Ok(self.grid.geometry(cell, screen))
    }

    /// Move `id` onto `cell`, then record it.
    fn restore(&mut self, id: &WindowId, cell: GridCell) -> Result<Geometry, ManagerError> {
        let geometry = self.geometry_for(cell)?;
        self.show(id, geometry)?;
        self.registry.assign(id, cell, geometry)?;
        Ok(geometry)
    }

    /// Strip decorations, apply opacity, then move and resize.
    fn show(&self, id: &WindowId, geometry: Geometry) -> Result<(), ManagerError> {
        let apply = || -> Result<(), D::Error> {
            self.display.set_undecorated(id)?;
            self.display.hide_from_taskbar(id)?;
            self.display.set_opacity(id, self.opacity)?;
            self.display.move_window(id, geometry.x, geometry.y)?;
            self.display.resize_window(id, geometry.width, geometry.height)
        };
        apply().map_err(|e| ManagerError::Display(e.to_string()))
    }

    /// Save, logging instead of failing.
    fn persist(&self) {
        if let Err(e) = self.save_layout() {
            error!("failed to save layout: {}", e);
        }
    }
}

impl<D: DisplayServer> Drop for GridWindowManager<D> {
    fn drop(&mut self) {
        debug!("final layout save");
        self.persist();
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ScreenSize;
    use crate::layout::LayoutRecord;
    use crate::registry::SlotState;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_layout_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("astrodistro-manager-test-{}-{}", std::process::id(), id))
            .join("layout.json")
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Undecorate(String),
        HideFromTaskbar(String),
        Opacity(String, f64),
        Move(String, i32, i32),
        Resize(String, u32, u32),
    }

    /// Record-keeping mock display.
    #[derive(Debug)]
    struct RecorderDisplay {
        screen: ScreenSize,
        existing: Vec<WindowId>,
        calls: RefCell<Vec<Call>>,
        fail_screen: bool,
        fail_moves: bool,
        /// Moves still to reject before `move_window` succeeds again.
        failing_moves: RefCell<usize>,
    }

    impl RecorderDisplay {
        fn new(width: u32, height: u32) -> Self {
            Self {
                screen: ScreenSize::new(width, height),
                existing: Vec::new(),
                calls: RefCell::new(Vec::new()),
                fail_screen: false,
                fail_moves: false,
                failing_moves: RefCell::new(0),
            }
        }

        fn moves(&self) -> Vec<Call> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| matches!(c, Call::Move(..)))
                .cloned()
                .collect()
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recorder error")]
    struct RecorderErr;

    impl DisplayServer for RecorderDisplay {
        type Error = RecorderErr;

        fn screen_size(&self) -> Result<ScreenSize, RecorderErr> {
            if self.fail_screen {
                return Err(RecorderErr);
            }
            Ok(self.screen)
        }

        fn windows(&self) -> Result<Vec<WindowId>, RecorderErr> {
            Ok(self.existing.clone())
        }

        fn set_undecorated(&self, id: &WindowId) -> Result<(), RecorderErr> {
            self.calls.borrow_mut().push(Call::Undecorate(id.to_string()));
            Ok(())
        }

        fn hide_from_taskbar(&self, id: &WindowId) -> Result<(), RecorderErr> {
            self.calls
                .borrow_mut()
                .push(Call::HideFromTaskbar(id.to_string()));
            Ok(())
        }

        fn set_opacity(&self, id: &WindowId, opacity: f64) -> Result<(), RecorderErr> {
            self.calls
                .borrow_mut()
                .push(Call::Opacity(id.to_string(), opacity));
            Ok(())
        }

        fn move_window(&self, id: &WindowId, x: i32, y: i32) -> Result<(), RecorderErr> {
            if self.fail_moves {
                return Err(RecorderErr);
            }
            let mut failing = self.failing_moves.borrow_mut();
            if *failing > 0 {
                *failing -= 1;
                return Err(RecorderErr);
            }
            drop(failing);
            self.calls.borrow_mut().push(Call::Move(id.to_string(), x, y));
            Ok(())
        }

        fn resize_window(&self, id: &WindowId, w: u32, h: u32) -> Result<(), RecorderErr> {
            self.calls.borrow_mut().push(Call::Resize(id.to_string(), w, h));
            Ok(())
        }
    }

    fn make_manager(size: usize, width: u32, height: u32) -> GridWindowManager<RecorderDisplay> {
        GridWindowManager::new(
            RecorderDisplay::new(width, height),
            Grid::new(size),
            LayoutStore::new(tmp_layout_path()),
        )
    }

    fn create(wm: &mut GridWindowManager<RecorderDisplay>, id: &str) -> PlacementOutcome {
        wm.on_window_created(id.into(), WindowKind::Normal).unwrap()
    }

    fn placed(cell: (usize, usize), geom: (i32, i32, u32, u32)) -> PlacementOutcome {
        PlacementOutcome::Placed {
            cell: GridCell::new(cell.0, cell.1),
            geometry: Geometry::new(geom.0, geom.1, geom.2, geom.3),
        }
    }

    #[test]
    fn four_windows_fill_2x2_grid_and_fifth_is_skipped() {
        let mut wm = make_manager(2, 800, 600);
        assert_eq!(create(&mut wm, "w1"), placed((0, 0), (0, 0, 400, 300)));
        assert_eq!(create(&mut wm, "w2"), placed((0, 1), (400, 0, 400, 300)));
        assert_eq!(create(&mut wm, "w3"), placed((1, 0), (0, 300, 400, 300)));
        assert_eq!(create(&mut wm, "w4"), placed((1, 1), (400, 300, 400, 300)));

        let moves_before = wm.display().moves().len();
        assert_eq!(create(&mut wm, "w5"), PlacementOutcome::Skipped);
        assert_eq!(wm.display().moves().len(), moves_before);

        assert_eq!(wm.registry().placed_count(), 4);
        let w5 = wm.registry().get(&"w5".into()).unwrap();
        assert_eq!(w5.state(), SlotState::Registered);
        assert_eq!(
            wm.registry().get(&"w1".into()).unwrap().cell(),
            Some(GridCell::new(0, 0))
        );
    }

    #[test]
    fn every_window_gets_a_distinct_cell_until_full() {
        for n in 1..=4 {
            let mut wm = make_manager(n, 1920, 1080);
            let mut seen = std::collections::HashSet::new();
            for i in 0..n * n {
                match create(&mut wm, &format!("w{}", i)) {
                    PlacementOutcome::Placed { cell, .. } => {
                        assert!(seen.insert(cell), "cell {} handed out twice", cell)
                    }
                    other => panic!("window {} not placed: {:?}", i, other),
                }
            }
            let cells = |wm: &GridWindowManager<RecorderDisplay>| -> Vec<Option<GridCell>> {
                (0..n * n)
                    .map(|i| {
                        wm.registry()
                            .get(&WindowId::new(format!("w{}", i)))
                            .and_then(|s| s.cell())
                    })
                    .collect()
            };
            let before = cells(&wm);
            assert_eq!(create(&mut wm, "overflow"), PlacementOutcome::Skipped);
            let after = cells(&wm);
            assert_eq!(before, after);
        }
    }

    #[test]
    fn placement_drives_display_in_order() {
        let mut wm = make_manager(4, 1920, 1080);
        wm.set_opacity(0.75);
        create(&mut wm, "0xa");
        let calls = wm.display().calls.borrow().clone();
        assert_eq!(
            calls,
            vec![
                Call::Undecorate("0xa".into()),
                Call::HideFromTaskbar("0xa".into()),
                Call::Opacity("0xa".into(), 0.75),
                Call::Move("0xa".into(), 0, 0),
                Call::Resize("0xa".into(), 480, 270),
            ]
        );
    }

    #[test]
    fn default_opacity_is_applied() {
        let mut wm = make_manager(2, 800, 600);
        create(&mut wm, "w1");
        assert!(wm
            .display()
            .calls
            .borrow()
            .contains(&Call::Opacity("w1".into(), DEFAULT_OPACITY)));
    }

    #[test]
    fn non_normal_windows_are_ignored() {
        let mut wm = make_manager(2, 800, 600);
        for kind in [WindowKind::Dialog, WindowKind::Dock, WindowKind::Splash] {
            let outcome = wm.on_window_created("popup".into(), kind).unwrap();
            assert_eq!(outcome, PlacementOutcome::Ignored);
        }
        assert!(wm.registry().is_empty());
        assert!(wm.display().calls.borrow().is_empty());
    }

    #[test]
    fn placing_unknown_window_fails() {
        let mut wm = make_manager(2, 800, 600);
        let err = wm.place_window(&"ghost".into()).unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Registry(RegistryError::UnknownWindow(_))
        ));
    }

    #[test]
    fn placing_twice_keeps_cell() {
        let mut wm = make_manager(2, 800, 600);
        let first = create(&mut wm, "w1");
        let again = wm.place_window(&"w1".into()).unwrap();
        assert_eq!(first, again);
        assert_eq!(wm.registry().placed_count(), 1);
        assert_eq!(wm.display().moves().len(), 1);
    }

    #[test]
    fn duplicate_creation_event_does_not_take_second_cell() {
        let mut wm = make_manager(2, 800, 600);
        create(&mut wm, "w1");
        assert_eq!(create(&mut wm, "w1"), placed((0, 0), (0, 0, 400, 300)));
        assert_eq!(create(&mut wm, "w2"), placed((0, 1), (400, 0, 400, 300)));
    }

    #[test]
    fn destroyed_window_frees_its_cell() {
        let mut wm = make_manager(2, 800, 600);
        for id in ["w1", "w2", "w3", "w4"] {
            create(&mut wm, id);
        }
        assert!(wm.on_window_destroyed(&"w2".into()));
        assert!(!wm.registry().contains(&"w2".into()));
        assert_eq!(create(&mut wm, "w5"), placed((0, 1), (400, 0, 400, 300)));
        assert!(!wm.on_window_destroyed(&"w2".into()));
    }

    #[test]
    fn placement_saves_full_layout() {
        let mut wm = make_manager(2, 800, 600);
        create(&mut wm, "w1");
        create(&mut wm, "w2");
        let stored = LayoutStore::new(wm.store.path()).load().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(
            stored.get(&"w2".into()),
            Some(&LayoutRecord {
                position: GridCell::new(0, 1),
                size: (400, 300),
            })
        );
    }

    #[test]
    fn save_load_apply_restores_cells() {
        let path = tmp_layout_path();
        {
            let mut first = GridWindowManager::new(
                RecorderDisplay::new(800, 600),
                Grid::new(2),
                LayoutStore::new(&path),
            );
            for id in ["w1", "w2", "w3"] {
                create(&mut first, id);
            }
            first.save_layout().unwrap();
        }

        let mut second = GridWindowManager::new(
            RecorderDisplay::new(800, 600),
            Grid::new(2),
            LayoutStore::new(&path),
        );
        assert_eq!(second.load_layout(), 3);
        second.register_window("w3".into(), WindowKind::Normal);
        second.register_window("w1".into(), WindowKind::Normal);
        second.register_window("w9".into(), WindowKind::Normal);

        let mut restored = second.apply_layout();
        restored.sort();
        assert_eq!(restored, vec![WindowId::from("w1"), WindowId::from("w3")]);
        let reg = second.registry();
        assert_eq!(reg.get(&"w1".into()).unwrap().cell(), Some(GridCell::new(0, 0)));
        assert_eq!(reg.get(&"w3".into()).unwrap().cell(), Some(GridCell::new(1, 0)));
        assert_eq!(reg.get(&"w9".into()).unwrap().cell(), None);
    }

    #[test]
    fn apply_uses_stored_cell_not_allocator() {
        let path = tmp_layout_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"w1": {"position": [0, 0], "size": [400, 300]}}"#).unwrap();

        let mut wm = GridWindowManager::new(
            RecorderDisplay::new(800, 600),
            Grid::new(2),
            LayoutStore::new(&path),
        );
        wm.load_layout();
        wm.register_window("w1".into(), WindowKind::Normal);
        assert_eq!(wm.apply_layout(), vec![WindowId::from("w1")]);

        let slot = wm.registry().get(&"w1".into()).unwrap();
        assert_eq!(slot.cell(), Some(GridCell::new(0, 0)));
        assert_eq!(slot.geometry(), Some(Geometry::new(0, 0, 400, 300)));
    }

    #[test]
    fn apply_restores_non_first_free_cell() {
        let path = tmp_layout_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"w1": {"position": [1, 1], "size": [1, 1]}}"#).unwrap();

        let mut wm = GridWindowManager::new(
            RecorderDisplay::new(800, 600),
            Grid::new(2),
            LayoutStore::new(&path),
        );
        wm.load_layout();
        wm.register_window("w1".into(), WindowKind::Normal);
        wm.apply_layout();

        // Geometry comes from the cell and the current screen, not the
        // stored size.
        let slot = wm.registry().get(&"w1".into()).unwrap();
        assert_eq!(slot.cell(), Some(GridCell::new(1, 1)));
        assert_eq!(slot.geometry(), Some(Geometry::new(400, 300, 400, 300)));
        assert_eq!(wm.display().moves(), vec![Call::Move("w1".into(), 400, 300)]);
    }

    #[test]
    fn apply_skips_out_of_grid_and_conflicting_records() {
        let path = tmp_layout_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{
                "far": {"position": [5, 5], "size": [10, 10]},
                "late": {"position": [0, 0], "size": [400, 300]}
            }"#,
        )
        .unwrap();

        let mut wm = GridWindowManager::new(
            RecorderDisplay::new(800, 600),
            Grid::new(2),
            LayoutStore::new(&path),
        );
        wm.load_layout();
        create(&mut wm, "early");
        wm.register_window("far".into(), WindowKind::Normal);
        wm.register_window("late".into(), WindowKind::Normal);

        assert!(wm.apply_layout().is_empty());
        assert_eq!(
            wm.registry().occupant(GridCell::new(0, 0)),
            Some(&WindowId::from("early"))
        );
        assert_eq!(wm.registry().get(&"far".into()).unwrap().cell(), None);
        assert_eq!(wm.registry().get(&"late".into()).unwrap().cell(), None);
    }

    #[test]
    fn missing_and_malformed_layouts_load_empty() {
        let mut wm = make_manager(2, 800, 600);
        assert_eq!(wm.load_layout(), 0);

        let path = tmp_layout_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2, 3").unwrap();
        let mut wm = GridWindowManager::new(
            RecorderDisplay::new(800, 600),
            Grid::new(2),
            LayoutStore::new(&path),
        );
        assert_eq!(wm.load_layout(), 0);
        assert!(wm.loaded_layout().is_empty());
    }

    #[test]
    fn unwritable_store_does_not_break_placement() {
        let dir = tmp_layout_path().parent().unwrap().to_path_buf();
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let mut wm = GridWindowManager::new(
            RecorderDisplay::new(800, 600),
            Grid::new(2),
            LayoutStore::new(blocker.join("layout.json")),
        );
        assert_eq!(create(&mut wm, "w1"), placed((0, 0), (0, 0, 400, 300)));
        assert!(wm.save_layout().is_err());
        assert_eq!(create(&mut wm, "w2"), placed((0, 1), (400, 0, 400, 300)));
    }

    #[test]
    fn screen_failure_leaves_window_registered() {
        let mut display = RecorderDisplay::new(800, 600);
        display.fail_screen = true;
        let mut wm =
            GridWindowManager::new(display, Grid::new(2), LayoutStore::new(tmp_layout_path()));
        let err = wm
            .on_window_created("w1".into(), WindowKind::Normal)
            .unwrap_err();
        assert!(matches!(err, ManagerError::Display(_)));
        assert_eq!(
            wm.registry().get(&"w1".into()).unwrap().state(),
            SlotState::Registered
        );
    }

    #[test]
    fn display_failure_leaves_cell_free() {
        let mut display = RecorderDisplay::new(800, 600);
        display.fail_moves = true;
        let mut wm =
            GridWindowManager::new(display, Grid::new(2), LayoutStore::new(tmp_layout_path()));
        let err = wm
            .on_window_created("w1".into(), WindowKind::Normal)
            .unwrap_err();
        assert!(matches!(err, ManagerError::Display(_)));
        let slot = wm.registry().get(&"w1".into()).unwrap();
        assert_eq!(slot.state(), SlotState::Registered);
        assert_eq!(wm.registry().occupant(GridCell::new(0, 0)), None);
        assert_eq!(wm.registry().placed_count(), 0);
        assert!(!wm.store.path().exists());
    }

    #[test]
    fn window_is_laid_out_after_a_transient_display_error() {
        let display = RecorderDisplay::new(800, 600);
        *display.failing_moves.borrow_mut() = 1;
        let mut wm =
            GridWindowManager::new(display, Grid::new(2), LayoutStore::new(tmp_layout_path()));
        assert!(wm.on_window_created("w1".into(), WindowKind::Normal).is_err());
        assert!(wm.display().moves().is_empty());

        let outcome = wm.place_window(&"w1".into()).unwrap();
        assert_eq!(outcome, placed((0, 0), (0, 0, 400, 300)));
        assert_eq!(wm.display().moves(), vec![Call::Move("w1".into(), 0, 0)]);
        let stored = LayoutStore::new(wm.store.path()).load().unwrap();
        assert_eq!(
            stored.get(&"w1".into()).map(|r| r.position),
            Some(GridCell::new(0, 0))
        );
    }

    #[test]
    fn apply_skips_windows_the_display_cannot_move() {
        let path = tmp_layout_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let original = r#"{"w1": {"position": [1, 0], "size": [400, 300]}}"#;
        std::fs::write(&path, original).unwrap();

        let mut display = RecorderDisplay::new(800, 600);
        display.fail_moves = true;
        let mut wm = GridWindowManager::new(display, Grid::new(2), LayoutStore::new(&path));
        wm.load_layout();
        wm.register_window("w1".into(), WindowKind::Normal);

        assert!(wm.apply_layout().is_empty());
        assert_eq!(wm.registry().get(&"w1".into()).unwrap().cell(), None);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn adopt_registers_without_placing() {
        let mut display = RecorderDisplay::new(800, 600);
        display.existing = vec!["0x1".into(), "0x2".into()];
        let mut wm =
            GridWindowManager::new(display, Grid::new(2), LayoutStore::new(tmp_layout_path()));
        assert_eq!(wm.adopt_existing_windows().unwrap(), 2);
        assert_eq!(wm.adopt_existing_windows().unwrap(), 0);
        assert_eq!(wm.registry().len(), 2);
        assert_eq!(wm.registry().placed_count(), 0);
        assert!(wm.display().calls.borrow().is_empty());
    }

    #[test]
    fn drop_writes_final_layout() {
        let path = tmp_layout_path();
        {
            let mut wm = GridWindowManager::new(
                RecorderDisplay::new(800, 600),
                Grid::new(2),
                LayoutStore::new(&path),
            );
            wm.register_window("w1".into(), WindowKind::Normal);
            wm.place_window(&"w1".into()).unwrap();
            std::fs::remove_file(&path).unwrap();
        }
        let stored = LayoutStore::new(&path).load().unwrap();
        assert_eq!(stored.len(), 1);
    }
}
