use std::collections::VecDeque;

use Direction::*;

/// A cell on the grid. Signed so a head that left the board is still representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// True when both coordinates lie in `[0, grid_count)`.
    pub fn within(&self, grid_count: i32) -> bool {
        (0..grid_count).contains(&self.x) && (0..grid_count).contains(&self.y)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Up => (0, -1),
            Down => (0, 1),
            Left => (-1, 0),
            Right => (1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }

    pub fn is_opposite(&self, other: Direction) -> bool {
        self.opposite() == other
    }
}

/// Cells touched by one move, for incremental redraws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moved {
    pub new_head: Position,
    pub old_head: Position,
    pub old_tail: Option<Position>,
}

/// Ordered body, head first, plus the heading of the last executed move and
/// at most one buffered turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    body: VecDeque<Position>,
    heading: Direction,
    pending: Option<Direction>,
}

impl Snake {
    /// Lays out `size` segments starting at `head` and trailing away from `heading`.
    pub fn new(head: Position, size: usize, heading: Direction) -> Self {
        let back = heading.opposite();
        let mut body = VecDeque::with_capacity(size);
        let mut pos = head;

        for _ in 0..size {
            body.push_back(pos);
            pos = pos.step(back);
        }

        Snake { body, heading, pending: None }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn body(&self) -> impl ExactSizeIterator<Item = &Position> + '_ {
        self.body.iter()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// The direction the next move will take.
    pub fn direction(&self) -> Direction {
        self.pending.unwrap_or(self.heading)
    }

    /// Buffers a turn for the next move. A reversal of the last executed
    /// heading is refused and leaves any earlier buffered turn in place.
    pub fn set_direction(&mut self, new_direction: Direction) -> bool {
        if self.heading.is_opposite(new_direction) {
            return false;
        }

        self.pending = Some(new_direction);
        true
    }

    /// Applies the buffered turn and returns the cell the head moves into.
    pub fn next_head(&mut self) -> Position {
        if let Some(dir) = self.pending.take() {
            self.heading = dir;
        }

        self.head().step(self.heading)
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.body.contains(&pos)
    }

    /// Would a head moving into `pos` hit the body? The tail is left out since
    /// it vacates its cell during the same step.
    pub fn hits_body(&self, pos: Position) -> bool {
        let keep = self.body.len().saturating_sub(1);
        self.body.iter().take(keep).any(|seg| *seg == pos)
    }

    /// Pushes the new head, then drops the tail unless growing.
    pub fn advance(&mut self, new_head: Position, grow: bool) -> Moved {
        let old_head = self.head();
        self.body.push_front(new_head);

        let old_tail = if grow { None } else { self.body.pop_back() };
        Moved { new_head, old_head, old_tail }
    }

    pub fn head_char(&self) -> char {
        match self.heading {
            Up => '^',
            Down => 'v',
            Left => '<',
            Right => '>',
        }
    }
}
