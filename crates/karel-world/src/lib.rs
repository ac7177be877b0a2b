//! The grid world the robot acts upon.
//!
//! A [`World`] is an immutable value: every action returns a new world or a
//! [`WorldError`]. [`WorldCell`] holds the current world for a running
//! program and replaces it atomically after each action, so observers can
//! read a consistent snapshot at any time.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

pub const WIDTH: usize = 10;
pub const HEIGHT: usize = 10;

pub const WALL_NONE: u8 = 0;
pub const WALL_EAST: u8 = 1;
pub const WALL_NORTH: u8 = 2;
pub const WALL_WEST: u8 = 4;
pub const WALL_SOUTH: u8 = 8;
pub const WALL_ALL: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("cannot move through wall")]
    BlockedByWall,
    #[error("there is no beeper to pick")]
    CellIsEmpty,
    #[error("cannot drop another beeper")]
    CellIsFull,
}

/// Compass direction, in counter-clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    East,
    North,
    West,
    South,
}

impl Direction {
    const ALL: [Direction; 4] = [Direction::East, Direction::North, Direction::West, Direction::South];

    fn index(self) -> usize {
        self as usize
    }

    /// Rotates counter-clockwise by `quarters` quarter turns.
    fn turn(self, quarters: usize) -> Direction {
        Self::ALL[(self.index() + quarters) & 3]
    }

    pub fn left(self) -> Direction {
        self.turn(1)
    }

    pub fn around(self) -> Direction {
        self.turn(2)
    }

    pub fn right(self) -> Direction {
        self.turn(3)
    }

    /// Unit step; `y` grows southwards.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::East => (1, 0),
            Direction::North => (0, -1),
            Direction::West => (-1, 0),
            Direction::South => (0, 1),
        }
    }

    pub fn wall(self) -> u8 {
        1 << self.index()
    }

    fn arrow(self) -> char {
        match self {
            Direction::East => '>',
            Direction::North => '^',
            Direction::West => '<',
            Direction::South => 'v',
        }
    }
}

/// Walls of every cell as a [`WALL_EAST`] .. [`WALL_SOUTH`] bitmask, row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloorPlan {
    walls: [u8; WIDTH * HEIGHT],
}

impl FloorPlan {
    pub fn new(walls: [u8; WIDTH * HEIGHT]) -> Self {
        Self { walls }
    }

    /// A room with walls around its border and nothing inside.
    pub fn empty() -> Self {
        let mut walls = [WALL_NONE; WIDTH * HEIGHT];
        for x in 0..WIDTH {
            walls[x] |= WALL_NORTH;
            walls[(HEIGHT - 1) * WIDTH + x] |= WALL_SOUTH;
        }
        for y in 0..HEIGHT {
            walls[y * WIDTH] |= WALL_WEST;
            walls[y * WIDTH + WIDTH - 1] |= WALL_EAST;
        }
        Self { walls }
    }

    pub fn walls_at(&self, x: usize, y: usize) -> u8 {
        self.walls[y * WIDTH + x] & WALL_ALL
    }

    pub fn is_clear(&self, x: usize, y: usize, direction: Direction) -> bool {
        self.walls_at(x, y) & direction.wall() == 0
    }

    /// Adds a wall on `direction`'s side of the cell and the matching side of
    /// its neighbour, if there is one.
    pub fn with_wall(mut self, x: usize, y: usize, direction: Direction) -> Self {
        self.walls[y * WIDTH + x] |= direction.wall();
        if let Some((nx, ny)) = neighbour(x, y, direction) {
            self.walls[ny * WIDTH + nx] |= direction.around().wall();
        }
        self
    }

    pub fn world(self) -> World {
        World {
            beepers: 0,
            x: 0,
            y: 0,
            direction: Direction::East,
            floor_plan: self,
        }
    }
}

impl Default for FloorPlan {
    fn default() -> Self {
        Self::empty()
    }
}

fn neighbour(x: usize, y: usize, direction: Direction) -> Option<(usize, usize)> {
    let (dx, dy) = direction.delta();
    let nx = x.checked_add_signed(dx)?;
    let ny = y.checked_add_signed(dy)?;
    (nx < WIDTH && ny < HEIGHT).then_some((nx, ny))
}

/// Beepers (at most one per cell), robot position and heading.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct World {
    beepers: u128,
    x: usize,
    y: usize,
    direction: Direction,
    floor_plan: FloorPlan,
}

impl Default for World {
    fn default() -> Self {
        FloorPlan::empty().world()
    }
}

impl World {
    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn floor_plan(&self) -> &FloorPlan {
        &self.floor_plan
    }

    pub fn with_karel_at(&self, x: usize, y: usize, direction: Direction) -> World {
        World { x, y, direction, ..self.clone() }
    }

    fn bit(x: usize, y: usize) -> u128 {
        1 << (y * WIDTH + x)
    }

    pub fn beeper_at(&self, x: usize, y: usize) -> bool {
        self.beepers & Self::bit(x, y) != 0
    }

    /// Places a beeper without going through the robot; used to set up puzzles.
    pub fn with_beeper_at(&self, x: usize, y: usize) -> World {
        World { beepers: self.beepers | Self::bit(x, y), ..self.clone() }
    }

    pub fn count_beepers(&self) -> u32 {
        self.beepers.count_ones()
    }

    // ROBOT

    pub fn move_forward(&self) -> Result<World, WorldError> {
        let (x, y) = self.ahead().ok_or(WorldError::BlockedByWall)?;
        Ok(World { x, y, ..self.clone() })
    }

    pub fn turn_left(&self) -> World {
        World { direction: self.direction.left(), ..self.clone() }
    }

    pub fn turn_around(&self) -> World {
        World { direction: self.direction.around(), ..self.clone() }
    }

    pub fn turn_right(&self) -> World {
        World { direction: self.direction.right(), ..self.clone() }
    }

    pub fn pick_beeper(&self) -> Result<World, WorldError> {
        if !self.on_beeper() {
            return Err(WorldError::CellIsEmpty);
        }
        Ok(World { beepers: self.beepers & !Self::bit(self.x, self.y), ..self.clone() })
    }

    pub fn drop_beeper(&self) -> Result<World, WorldError> {
        if self.on_beeper() {
            return Err(WorldError::CellIsFull);
        }
        Ok(World { beepers: self.beepers | Self::bit(self.x, self.y), ..self.clone() })
    }

    // QUERIES

    /// The cell in front of the robot, unless a wall or the grid edge is in the way.
    fn ahead(&self) -> Option<(usize, usize)> {
        self.clear_towards(self.direction)
    }

    fn clear_towards(&self, direction: Direction) -> Option<(usize, usize)> {
        if !self.floor_plan.is_clear(self.x, self.y, direction) {
            return None;
        }
        neighbour(self.x, self.y, direction)
    }

    pub fn on_beeper(&self) -> bool {
        self.beeper_at(self.x, self.y)
    }

    pub fn beeper_ahead(&self) -> bool {
        neighbour(self.x, self.y, self.direction).is_some_and(|(x, y)| self.beeper_at(x, y))
    }

    pub fn left_is_clear(&self) -> bool {
        self.clear_towards(self.direction.left()).is_some()
    }

    pub fn front_is_clear(&self) -> bool {
        self.ahead().is_some()
    }

    pub fn right_is_clear(&self) -> bool {
        self.clear_towards(self.direction.right()).is_some()
    }

    /// ASCII picture: `+-+` and `|` for walls, `o` for beepers, an arrow for
    /// the robot, `.` for empty floor.
    pub fn render(&self) -> String {
        let plan = &self.floor_plan;
        let mut out = String::new();
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let wall = plan.walls_at(x, y) & WALL_NORTH != 0
                    || (y > 0 && plan.walls_at(x, y - 1) & WALL_SOUTH != 0);
                out.push('+');
                out.push(if wall { '-' } else { ' ' });
            }
            out.push_str("+\n");
            for x in 0..WIDTH {
                let wall = plan.walls_at(x, y) & WALL_WEST != 0
                    || (x > 0 && plan.walls_at(x - 1, y) & WALL_EAST != 0);
                out.push(if wall { '|' } else { ' ' });
                out.push(self.cell_char(x, y));
            }
            out.push(if plan.walls_at(WIDTH - 1, y) & WALL_EAST != 0 { '|' } else { ' ' });
            out.push('\n');
        }
        for x in 0..WIDTH {
            out.push('+');
            out.push(if plan.walls_at(x, HEIGHT - 1) & WALL_SOUTH != 0 { '-' } else { ' ' });
        }
        out.push_str("+\n");
        out
    }

    fn cell_char(&self, x: usize, y: usize) -> char {
        if (x, y) == (self.x, self.y) {
            self.direction.arrow()
        } else if self.beeper_at(x, y) {
            'o'
        } else {
            '.'
        }
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// The current world of a running program.
///
/// Each update publishes a complete new world, so readers on other threads
/// never see a half-applied action. The VM is the only writer.
pub struct WorldCell {
    current: ArcSwap<World>,
}

impl WorldCell {
    pub fn new(world: World) -> Self {
        Self { current: ArcSwap::from_pointee(world) }
    }

    pub fn load(&self) -> Arc<World> {
        self.current.load_full()
    }

    pub fn store(&self, world: World) {
        self.current.store(Arc::new(world));
    }

    /// Applies `transition` to the current world. On failure the current
    /// world stays as it was.
    pub fn update<F>(&self, transition: F) -> Result<Arc<World>, WorldError>
    where
        F: FnOnce(&World) -> Result<World, WorldError>,
    {
        let next = Arc::new(transition(&self.current.load())?);
        self.current.store(Arc::clone(&next));
        Ok(next)
    }
}

impl Default for WorldCell {
    fn default() -> Self {
        Self::new(World::default())
    }
}

impl fmt::Debug for WorldCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WorldCell").field(&*self.current.load()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_blocks_the_robot() {
        let world = World::default();
        assert!(world.front_is_clear());
        assert!(!world.left_is_clear());
        assert_eq!(world.turn_left().move_forward(), Err(WorldError::BlockedByWall));
        let east_edge = world.with_karel_at(9, 0, Direction::East);
        assert_eq!(east_edge.move_forward(), Err(WorldError::BlockedByWall));
    }

    #[test]
    fn grid_edge_blocks_without_walls() {
        let world = FloorPlan::new([WALL_NONE; WIDTH * HEIGHT]).world();
        assert!(!world.turn_left().front_is_clear());
        assert!(world.turn_right().front_is_clear());
    }

    #[test]
    fn moving_follows_the_heading() {
        let world = World::default().turn_right().move_forward().unwrap();
        assert_eq!((world.x(), world.y(), world.direction()), (0, 1, Direction::South));
        let world = world.turn_left().move_forward().unwrap();
        assert_eq!((world.x(), world.y(), world.direction()), (1, 1, Direction::East));
    }

    #[test]
    fn turns_compose() {
        let d = Direction::North;
        assert_eq!(d.left(), Direction::West);
        assert_eq!(d.right(), Direction::East);
        assert_eq!(d.around(), Direction::South);
        assert_eq!(d.left().left(), d.around());
    }

    #[test]
    fn one_beeper_per_cell() {
        let world = World::default();
        assert_eq!(world.pick_beeper(), Err(WorldError::CellIsEmpty));
        let world = world.drop_beeper().unwrap();
        assert!(world.on_beeper());
        assert_eq!(world.drop_beeper(), Err(WorldError::CellIsFull));
        assert_eq!(world.pick_beeper().unwrap().count_beepers(), 0);
    }

    #[test]
    fn beeper_ahead_looks_through_walls_but_not_off_the_grid() {
        let world = World::default().with_beeper_at(1, 0);
        assert!(world.beeper_ahead());
        let walled = FloorPlan::empty().with_wall(0, 0, Direction::East).world().with_beeper_at(1, 0);
        assert!(walled.beeper_ahead());
        assert!(!walled.front_is_clear());
        assert!(!world.turn_left().beeper_ahead());
    }

    #[test]
    fn inner_walls_are_two_sided() {
        let plan = FloorPlan::empty().with_wall(4, 4, Direction::South);
        assert!(!plan.is_clear(4, 4, Direction::South));
        assert!(!plan.is_clear(4, 5, Direction::North));
    }

    #[test]
    fn render_draws_walls_robot_and_beepers() {
        let world = World::default().with_beeper_at(2, 0).with_karel_at(0, 0, Direction::South);
        let picture = world.render();
        let lines: Vec<&str> = picture.lines().collect();
        assert_eq!(lines.len(), 2 * HEIGHT + 1);
        assert_eq!(lines[0], "+-+-+-+-+-+-+-+-+-+-+");
        assert_eq!(lines[1], "|v . o . . . . . . .|");
        assert_eq!(lines[2], "+ + + + + + + + + + +");
    }

    #[test]
    fn failed_updates_keep_the_current_world() {
        let cell = WorldCell::default();
        let moved = cell.update(World::move_forward).unwrap();
        assert_eq!(moved.x(), 1);
        assert_eq!(cell.update(World::pick_beeper), Err(WorldError::CellIsEmpty));
        assert_eq!(*cell.load(), *moved);
    }
}
