//! Nested scope-box accumulation used by the sequence layout.
//!
//! [`Bounds`] keeps a stack of scopes (the root plus one per open block) and a vertical cursor.
//! Every [`Bounds::insert`] grows all open scopes at once; closing a block expands it by
//! `box_margin` and folds it into its parent.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub start_x: f64,
    pub start_y: f64,
    pub stop_x: f64,
    pub stop_y: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    /// Identity for [`BoundingBox::include`].
    pub const EMPTY: Self = Self {
        start_x: f64::INFINITY,
        start_y: f64::INFINITY,
        stop_x: f64::NEG_INFINITY,
        stop_y: f64::NEG_INFINITY,
    };

    /// Corners may be given in any order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            start_x: x1.min(x2),
            start_y: y1.min(y2),
            stop_x: x1.max(x2),
            stop_y: y1.max(y2),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start_x > self.stop_x || self.start_y > self.stop_y
    }

    pub fn include(&mut self, other: &BoundingBox) {
        self.start_x = self.start_x.min(other.start_x);
        self.start_y = self.start_y.min(other.start_y);
        self.stop_x = self.stop_x.max(other.stop_x);
        self.stop_y = self.stop_y.max(other.stop_y);
    }

    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            start_x: self.start_x - margin,
            start_y: self.start_y - margin,
            stop_x: self.stop_x + margin,
            stop_y: self.stop_y + margin,
        }
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.stop_x - self.start_x
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.stop_y - self.start_y
    }
}

/// One nesting level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeBox {
    pub extent: BoundingBox,
    /// Cursor value when the scope was opened.
    pub opened_at: f64,
    /// Cursor values of `else` / `and` separators added while this scope was innermost.
    pub sections: Vec<f64>,
}

impl ScopeBox {
    fn root() -> Self {
        Self {
            extent: BoundingBox::EMPTY,
            opened_at: 0.0,
            sections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bounds {
    scopes: Vec<ScopeBox>,
    box_margin: f64,
    vertical_pos: f64,
}

impl Bounds {
    pub fn new(box_margin: f64) -> Self {
        Self {
            scopes: vec![ScopeBox::root()],
            box_margin,
            vertical_pos: 0.0,
        }
    }

    /// Drops every scope and resets the cursor.
    pub fn init(&mut self) {
        self.scopes.clear();
        self.scopes.push(ScopeBox::root());
        self.vertical_pos = 0.0;
    }

    pub fn insert(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        let b = BoundingBox::new(x1, y1, x2, y2);
        for scope in &mut self.scopes {
            scope.extent.include(&b);
        }
    }

    /// Opens a scope whose vertical extent starts at the cursor. Its horizontal extent stays empty
    /// until something is inserted.
    pub fn new_loop(&mut self) {
        let y = self.vertical_pos;
        self.scopes.push(ScopeBox {
            extent: BoundingBox {
                start_y: y,
                stop_y: y,
                ..BoundingBox::EMPTY
            },
            opened_at: y,
            sections: Vec::new(),
        });
    }

    /// Closes the innermost scope. `None` when only the root is open.
    pub fn end_loop(&mut self) -> Option<ScopeBox> {
        if self.scopes.len() <= 1 {
            return None;
        }
        let mut closed = self.scopes.pop()?;
        closed.extent = closed.extent.expanded(self.box_margin);
        if let Some(parent) = self.scopes.last_mut() {
            parent.extent.include(&closed.extent);
        }
        Some(closed)
    }

    /// Records the cursor as a section separator on the innermost open block. Returns `false` when
    /// no block is open.
    pub fn add_section(&mut self) -> bool {
        if self.scopes.len() <= 1 {
            return false;
        }
        let y = self.vertical_pos;
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.sections.push(y);
                true
            }
            None => false,
        }
    }

    pub fn get_bounds(&self) -> BoundingBox {
        self.scopes
            .first()
            .map_or(BoundingBox::EMPTY, |root| root.extent)
    }

    pub fn vertical_pos(&self) -> f64 {
        self.vertical_pos
    }

    pub fn set_vertical_pos(&mut self, pos: f64) {
        self.vertical_pos = pos;
    }

    /// Advances the cursor; the root's bottom edge follows it.
    pub fn bump_vertical_pos(&mut self, delta: f64) {
        self.vertical_pos += delta;
        if let Some(root) = self.scopes.first_mut() {
            root.extent.stop_y = root.extent.stop_y.max(self.vertical_pos);
        }
    }

    /// Number of open blocks (the root is not counted).
    pub fn depth(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    pub fn box_margin(&self) -> f64 {
        self.box_margin
    }
}
