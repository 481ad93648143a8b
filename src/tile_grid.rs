//! Two-layer tile grid: a collision layer (Blank/Block) and an event layer (enemy, item, boss
//! markers). Row 0 is the top of the map while world Y grows upwards, so every conversion between
//! world space and indices flips the row.
//!
//! Reads never fail. Anything outside the grid is Blank/None, which lets the integrator and the
//! enemy probes sample freely near the map edges without bounds checks of their own.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CellType {
    #[default]
    Blank,
    Block,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EventKind {
    #[default]
    None,
    Enemy,
    Item,
    BossGate,
    BossSpawn,
    LanternRow,
}

/// Cell index. `ix` grows to the right, `iy` grows downwards (row 0 = top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellIndex {
    pub ix: u32,
    pub iy: u32,
}

/// World-space bounds of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRect {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl CellRect {
    /// The same rectangle grown by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            left: self.left - margin,
            right: self.right + margin,
            bottom: self.bottom - margin,
            top: self.top + margin,
        }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::new(self.left, self.bottom, self.right, self.top)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.bottom && p.y <= self.top
    }
}

#[derive(Resource, Debug, Clone)]
pub struct TileGrid {
    width: u32,
    height: u32,
    cell_size: f32,
    cells: Vec<CellType>,
    events: Vec<EventKind>,
    variants: HashMap<CellIndex, u8>,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self::empty(100, 20, 1.0)
    }
}

impl TileGrid {
    pub fn empty(width: u32, height: u32, cell_size: f32) -> Self {
        let len = (width * height) as usize;
        Self {
            width,
            height,
            cell_size,
            cells: vec![CellType::Blank; len],
            events: vec![EventKind::None; len],
            variants: HashMap::new(),
        }
    }

    /// Builds a grid from the text of both layers. Rows beyond `height` and columns beyond
    /// `width` are dropped; short rows and missing rows stay Blank/None.
    pub fn from_csv(
        width: u32,
        height: u32,
        cell_size: f32,
        collision_csv: &str,
        event_csv: &str,
    ) -> Self {
        let mut grid = Self::empty(width, height, cell_size);
        grid.fill_collision(collision_csv);
        grid.fill_events(event_csv);
        grid
    }

    /// Loads both layer files. A missing event layer is tolerated (no events); a missing
    /// collision layer is an error the caller is expected to log and replace with `empty`.
    pub fn load(
        width: u32,
        height: u32,
        cell_size: f32,
        collision_path: &Path,
        event_path: &Path,
    ) -> anyhow::Result<Self> {
        let collision = std::fs::read_to_string(collision_path).with_context(|| {
            format!("reading collision layer {}", collision_path.display())
        })?;
        let events = match std::fs::read_to_string(event_path) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    "Event layer {} unavailable ({err}); map will have no events.",
                    event_path.display()
                );
                String::new()
            }
        };
        Ok(Self::from_csv(width, height, cell_size, &collision, &events))
    }

    fn fill_collision(&mut self, text: &str) {
        for (iy, line) in text.lines().take(self.height as usize).enumerate() {
            for (ix, token) in line.split(',').take(self.width as usize).enumerate() {
                let cell = match token.trim() {
                    "1" => CellType::Block,
                    _ => CellType::Blank,
                };
                let slot = self.slot(ix as u32, iy as u32);
                self.cells[slot] = cell;
            }
        }
    }

    fn fill_events(&mut self, text: &str) {
        for (iy, line) in text.lines().take(self.height as usize).enumerate() {
            for (ix, token) in line.split(',').take(self.width as usize).enumerate() {
                let token = token.trim().to_ascii_uppercase();
                let (event, variant) = parse_event_token(&token);
                let index = CellIndex {
                    ix: ix as u32,
                    iy: iy as u32,
                };
                let slot = self.slot(index.ix, index.iy);
                self.events[slot] = event;
                if let Some(variant) = variant {
                    self.variants.insert(index, variant);
                }
            }
        }
    }

    #[inline]
    fn slot(&self, ix: u32, iy: u32) -> usize {
        (iy * self.width + ix) as usize
    }

    #[inline]
    fn in_bounds(&self, ix: i64, iy: i64) -> bool {
        ix >= 0 && iy >= 0 && ix < self.width as i64 && iy < self.height as i64
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_type_at(&self, ix: i64, iy: i64) -> CellType {
        if !self.in_bounds(ix, iy) {
            return CellType::Blank;
        }
        self.cells[self.slot(ix as u32, iy as u32)]
    }

    pub fn is_block(&self, index: CellIndex) -> bool {
        self.cell_type_at(index.ix as i64, index.iy as i64) == CellType::Block
    }

    /// Solid test for an arbitrary world point. Points off the map are open space.
    pub fn is_solid_at(&self, p: Vec2) -> bool {
        self.try_world_to_index(p)
            .map(|index| self.is_block(index))
            .unwrap_or(false)
    }

    pub fn event_at(&self, ix: i64, iy: i64) -> EventKind {
        if !self.in_bounds(ix, iy) {
            return EventKind::None;
        }
        self.events[self.slot(ix as u32, iy as u32)]
    }

    /// 0 = Walker when no variant was recorded for the cell.
    pub fn enemy_variant(&self, index: CellIndex) -> u8 {
        self.variants.get(&index).copied().unwrap_or(0)
    }

    /// Unclamped index of a world point, `None` when it falls outside the grid.
    pub fn try_world_to_index(&self, p: Vec2) -> Option<CellIndex> {
        let half = self.cell_size * 0.5;
        let ix = ((p.x + half) / self.cell_size).floor() as i64;
        let row_from_bottom = ((p.y + half) / self.cell_size).floor() as i64;
        let iy = self.height as i64 - 1 - row_from_bottom;
        self.in_bounds(ix, iy).then_some(CellIndex {
            ix: ix as u32,
            iy: iy as u32,
        })
    }

    /// Centre-snapped index of a world point, clamped into the grid.
    pub fn world_to_index(&self, p: Vec2) -> CellIndex {
        let half = self.cell_size * 0.5;
        let ix = ((p.x + half) / self.cell_size).floor() as i64;
        let row_from_bottom = ((p.y + half) / self.cell_size).floor() as i64;
        let iy = self.height as i64 - 1 - row_from_bottom;

        CellIndex {
            ix: ix.clamp(0, self.width.saturating_sub(1) as i64) as u32,
            iy: iy.clamp(0, self.height.saturating_sub(1) as i64) as u32,
        }
    }

    /// World-space centre of a cell.
    pub fn index_to_world(&self, index: CellIndex) -> Vec2 {
        Vec2::new(
            self.cell_size * index.ix as f32,
            self.cell_size * (self.height as f32 - 1.0 - index.iy as f32),
        )
    }

    pub fn index_to_world_rect(&self, index: CellIndex) -> CellRect {
        let c = self.index_to_world(index);
        let half = self.cell_size * 0.5;
        CellRect {
            left: c.x - half,
            right: c.x + half,
            bottom: c.y - half,
            top: c.y + half,
        }
    }

    /// World rectangle covered by the whole grid.
    pub fn world_bounds(&self) -> CellRect {
        let half = self.cell_size * 0.5;
        CellRect {
            left: -half,
            right: self.cell_size * self.width as f32 - half,
            bottom: -half,
            top: self.cell_size * self.height as f32 - half,
        }
    }

    /// Cells of one column holding `kind`, top row first.
    pub fn events_in_column(&self, ix: u32, kind: EventKind) -> Vec<CellIndex> {
        if ix >= self.width {
            return Vec::new();
        }
        (0..self.height)
            .filter(|&iy| self.event_at(ix as i64, iy as i64) == kind)
            .map(|iy| CellIndex { ix, iy })
            .collect()
    }

    pub fn first_column_with(&self, kind: EventKind) -> Option<u32> {
        (0..self.width).find(|&ix| !self.events_in_column(ix, kind).is_empty())
    }

    /// Clears the event and any enemy variant stored for the cell. Safe to call repeatedly.
    pub fn consume_event(&mut self, index: CellIndex) {
        if index.ix >= self.width || index.iy >= self.height {
            return;
        }
        let slot = self.slot(index.ix, index.iy);
        self.events[slot] = EventKind::None;
        self.variants.remove(&index);
    }

    pub fn block_cells(&self) -> impl Iterator<Item = CellIndex> + '_ {
        (0..self.height).flat_map(move |iy| {
            (0..self.width)
                .filter(move |&ix| self.cells[self.slot(ix, iy)] == CellType::Block)
                .map(move |ix| CellIndex { ix, iy })
        })
    }

    pub fn count_events(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|&&e| e == kind).count()
    }
}

/// Event-layer token (already upper-cased) to event kind plus optional enemy variant.
fn parse_event_token(token: &str) -> (EventKind, Option<u8>) {
    match token {
        "" | "0" => (EventKind::None, None),
        "H" => (EventKind::Enemy, Some(1)),
        "S" => (EventKind::Enemy, Some(2)),
        "B" => (EventKind::BossSpawn, None),
        "G" => (EventKind::BossGate, None),
        "I" => (EventKind::Item, None),
        "L" => (EventKind::LanternRow, None),
        t if t.starts_with('E') => {
            let digits = &t[1..];
            let variant = if digits.is_empty() {
                0
            } else {
                digits.parse::<i64>().map(|n| n.clamp(0, 255) as u8).unwrap_or(0)
            };
            (EventKind::Enemy, Some(variant))
        }
        _ => (EventKind::None, None),
    }
}
