use std::{collections::BTreeSet, fmt};

/// A point on the board. Used as pin identity: two pins at the same point are the same pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Location {
    /// Create a location at (`x`, `y`).
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// Width and height of a rectangle, board or note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    /// Horizontal extent.
    pub width: u32,
    /// Vertical extent.
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions of `width` by `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.width, self.height)
    }
}

/// A coloured rectangle with a message, placed at a fixed origin.
///
/// The size is fixed when the note is created and never re-read from the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    origin: Location,
    size: Dimensions,
    colour: String,
    message: String,
    pins: BTreeSet<Location>,
}

impl Note {
    /// Create an unpinned note. `colour` is stored as given; the board lower-cases it beforehand.
    pub fn new(origin: Location, size: Dimensions, colour: String, message: String) -> Self {
        Self {
            origin,
            size,
            colour,
            message,
            pins: BTreeSet::new(),
        }
    }

    /// Top-left corner.
    pub fn origin(&self) -> Location {
        self.origin
    }

    /// Width and height baked in at creation.
    pub fn size(&self) -> Dimensions {
        self.size
    }

    /// Lower-cased colour name.
    pub fn colour(&self) -> &str {
        &self.colour
    }

    /// Message text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Pins currently stuck in this note.
    pub fn pins(&self) -> impl Iterator<Item = Location> + '_ {
        self.pins.iter().copied()
    }

    // i64 so that origin + size cannot overflow.
    fn right(&self) -> i64 {
        i64::from(self.origin.x) + i64::from(self.size.width)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.origin.y) + i64::from(self.size.height)
    }

    /// Whether the whole rectangle lies inside a board of size `board`.
    pub fn in_bounds(&self, board: Dimensions) -> bool {
        self.origin.x >= 0
            && self.origin.y >= 0
            && self.right() <= i64::from(board.width)
            && self.bottom() <= i64::from(board.height)
    }

    /// Two notes overlap only if they share the exact same origin and size.
    /// Rectangles that merely intersect do not count.
    pub fn overlaps(&self, other: &Note) -> bool {
        self.origin == other.origin && self.size == other.size
    }

    /// Whether `point` lies in `[x, x + width) x [y, y + height)`.
    pub fn has_point(&self, point: Location) -> bool {
        let (px, py) = (i64::from(point.x), i64::from(point.y));
        px >= i64::from(self.origin.x)
            && px < self.right()
            && py >= i64::from(self.origin.y)
            && py < self.bottom()
    }

    /// Stick a pin at `at`. Pinning an already pinned point is a no-op.
    pub fn add_pin(&mut self, at: Location) {
        self.pins.insert(at);
    }

    /// Remove the pin at `at`, returning whether there was one.
    pub fn remove_pin(&mut self, at: Location) -> bool {
        self.pins.remove(&at)
    }

    /// Whether the note carries at least one pin.
    pub fn is_pinned(&self) -> bool {
        !self.pins.is_empty()
    }
}
