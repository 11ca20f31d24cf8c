//! One player's game: the run state machine plus everything a tick mutates.
//!
//! Nothing here touches the terminal or the clock. The driver feeds commands
//! and ticks in, and reads a [`Snapshot`] back out for drawing.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GameConfig;
use crate::snake::{Direction, Moved, Position, Snake};
use crate::store::HighScoreStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Paused,
    Over,
}

/// Triggers that may move the session between run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Start,
    TogglePause,
    Crash,
}

impl RunState {
    /// The transition table. `None` means the trigger is a no-op in this state.
    fn on(self, trigger: Trigger) -> Option<RunState> {
        use RunState::*;

        match (self, trigger) {
            (NotStarted, Trigger::Start) | (Over, Trigger::Start) => Some(Running),
            (Running, Trigger::TogglePause) => Some(Paused),
            (Paused, Trigger::TogglePause) => Some(Running),
            (Running, Trigger::Crash) => Some(Over),
            _ => None,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collision {
    Wall,
    Body,
    /// The snake covers every cell, so no food can be placed.
    BoardFull,
}

impl Collision {
    /// Filling the board ends the session as a win; the snake did not die.
    pub fn is_win(&self) -> bool {
        matches!(self, Collision::BoardFull)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved(Moved),
    Ate(Moved),
    Crashed(Collision),
    /// The session was not running.
    Ignored,
}

/// Read-only view handed to the renderer after each change.
pub struct Snapshot<'a> {
    pub snake: &'a Snake,
    pub food: Position,
    pub score: u32,
    pub high_score: u32,
    pub state: RunState,
    pub collision: Option<Collision>,
    /// The last session beat the stored best.
    pub new_high_score: bool,
}

pub struct Session<S> {
    config: GameConfig,
    store: S,
    rng: StdRng,
    state: RunState,
    snake: Snake,
    food: Position,
    score: u32,
    high_score: u32,
    speed_ms: u64,
    collision: Option<Collision>,
    new_high_score: bool,
}

impl<S: HighScoreStore> Session<S> {
    pub fn new(config: GameConfig, store: S) -> Self {
        Self::with_rng(config, store, StdRng::from_entropy())
    }

    pub fn with_rng(config: GameConfig, store: S, rng: StdRng) -> Self {
        let high_score = match store.load() {
            Ok(score) => score.unwrap_or(0),
            Err(e) => {
                warn!("Could not read high score, starting from 0: {}", e);
                0
            }
        };

        let snake = starting_snake(&config);
        let mut session = Session {
            speed_ms: config.initial_speed_ms,
            config,
            store,
            rng,
            state: RunState::NotStarted,
            snake,
            food: Position::new(0, 0),
            score: 0,
            high_score,
            collision: None,
            new_high_score: false,
        };
        if let Some(food) = session.spawn_food() {
            session.food = food;
        }
        session
    }

    /// Begins a fresh session from `NotStarted` or `Over`.
    pub fn start(&mut self) -> bool {
        let next = match self.state.on(Trigger::Start) {
            Some(next) => next,
            None => return false,
        };

        self.snake = starting_snake(&self.config);
        self.score = 0;
        self.speed_ms = self.config.initial_speed_ms;
        self.collision = None;
        self.new_high_score = false;
        self.food = self.spawn_food().unwrap_or(self.food);
        self.state = next;

        info!("Session started, high score {}", self.high_score);
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.state.on(Trigger::TogglePause) {
            Some(next) => {
                debug!("{:?} -> {:?}", self.state, next);
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Buffers a turn. Ignored unless running, refused if it reverses the snake.
    pub fn set_direction(&mut self, direction: Direction) -> bool {
        if self.state != RunState::Running {
            return false;
        }

        let accepted = self.snake.set_direction(direction);
        if !accepted {
            debug!("Refused reversal to {:?}", direction);
        }
        accepted
    }

    /// Advances the snake one cell.
    pub fn update(&mut self) -> StepOutcome {
        if self.state != RunState::Running {
            return StepOutcome::Ignored;
        }

        let new_head = self.snake.next_head();

        if !new_head.within(self.config.grid_count) {
            return self.crash(Collision::Wall);
        }
        if self.snake.hits_body(new_head) {
            return self.crash(Collision::Body);
        }

        let ate = new_head == self.food;
        let moved = self.snake.advance(new_head, ate);

        if !ate {
            return StepOutcome::Moved(moved);
        }

        self.score += self.config.food_score;
        self.speed_ms = self.config.faster(self.speed_ms);
        debug!("Ate at {:?}, score {}, speed {}ms", new_head, self.score, self.speed_ms);

        match self.spawn_food() {
            Some(food) => {
                self.food = food;
                StepOutcome::Ate(moved)
            }
            None => self.crash(Collision::BoardFull),
        }
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            snake: &self.snake,
            food: self.food,
            score: self.score,
            high_score: self.high_score,
            state: self.state,
            collision: self.collision,
            new_high_score: self.new_high_score,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn speed_ms(&self) -> u64 {
        self.speed_ms
    }

    pub fn direction(&self) -> Direction {
        self.snake.direction()
    }

    ///////////////////////////////////////////////////////////////////////////

    fn crash(&mut self, collision: Collision) -> StepOutcome {
        if let Some(next) = self.state.on(Trigger::Crash) {
            self.state = next;
        }
        self.collision = Some(collision);
        info!("Game over ({:?}), score {}", collision, self.score);

        if self.score > self.high_score {
            self.high_score = self.score;
            self.new_high_score = true;
            info!("New high score {}", self.score);

            if let Err(e) = self.store.save(self.score) {
                warn!("Could not save high score: {}", e);
            }
        }

        StepOutcome::Crashed(collision)
    }

    /// Uniform over the grid, resampled until it misses every segment.
    /// `None` once the snake leaves no free cell.
    fn spawn_food(&mut self) -> Option<Position> {
        let n = self.config.grid_count;
        let taken = self.snake.body().filter(|p| p.within(n)).count();
        if taken >= self.config.cell_count() {
            return None;
        }

        loop {
            let pos = Position::new(self.rng.gen_range(0..n), self.rng.gen_range(0..n));
            if !self.snake.occupies(pos) {
                debug!("Food at {:?}", pos);
                return Some(pos);
            }
        }
    }
}

/// Vertical column centred on the grid, heading up.
fn starting_snake(config: &GameConfig) -> Snake {
    let c = config.grid_count / 2;
    Snake::new(Position::new(c, c), config.initial_length, Direction::Up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::collections::HashSet;
    use Direction::*;

    fn session() -> Session<MemoryStore> {
        session_with(GameConfig::default(), MemoryStore::default())
    }

    fn session_with(config: GameConfig, store: MemoryStore) -> Session<MemoryStore> {
        Session::with_rng(config, store, StdRng::seed_from_u64(7))
    }

    fn body(session: &Session<MemoryStore>) -> Vec<(i32, i32)> {
        session.snake.body().map(|p| (p.x, p.y)).collect()
    }

    /// Moves food out of the snake's way so a step is a plain move.
    fn park_food(session: &mut Session<MemoryStore>) {
        session.food = Position::new(0, 0);
    }

    #[test]
    fn test_start_resets_everything() {
        let mut s = session();
        assert_eq!(s.state(), RunState::NotStarted);
        assert!(s.start());

        assert_eq!(s.state(), RunState::Running);
        assert_eq!(body(&s), vec![(10, 10), (10, 11), (10, 12)]);
        assert_eq!(s.direction(), Up);
        assert_eq!(s.score(), 0);
        assert_eq!(s.speed_ms(), 250);
        assert!(!s.snake.occupies(s.food));
    }

    #[test]
    fn test_plain_move() {
        let mut s = session();
        s.start();
        park_food(&mut s);

        assert!(matches!(s.update(), StepOutcome::Moved(_)));
        assert_eq!(body(&s), vec![(10, 9), (10, 10), (10, 11)]);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn test_eating_grows_scores_and_speeds_up() {
        let mut s = session();
        s.start();
        s.food = Position::new(10, 9);

        assert!(matches!(s.update(), StepOutcome::Ate(_)));
        assert_eq!(body(&s), vec![(10, 9), (10, 10), (10, 11), (10, 12)]);
        assert_eq!(s.score(), 10);
        assert_eq!(s.speed_ms(), 248);
        assert!(!s.snake.occupies(s.food));
    }

    #[test]
    fn test_speed_stops_at_floor() {
        let mut s = session();
        s.start();
        s.speed_ms = 80;
        s.food = Position::new(10, 9);

        s.update();
        assert_eq!(s.score(), 10);
        assert_eq!(s.snake.len(), 4);
        assert_eq!(s.speed_ms(), 80);
    }

    #[test]
    fn test_reversal_is_ignored() {
        let mut s = session();
        s.start();
        assert!(s.set_direction(Right));
        park_food(&mut s);
        s.update();

        assert!(!s.set_direction(Left));
        assert_eq!(s.direction(), Right);
        s.update();
        assert_eq!(s.snake.head(), Position::new(12, 10));
    }

    #[test]
    fn test_direction_ignored_unless_running() {
        let mut s = session();
        assert!(!s.set_direction(Left));

        s.start();
        s.toggle_pause();
        assert!(!s.set_direction(Left));
        assert_eq!(s.direction(), Up);
    }

    #[test]
    fn test_wall_collision() {
        let mut s = session();
        s.start();
        s.snake = Snake::new(Position::new(0, 5), 3, Up);
        s.set_direction(Left);

        assert_eq!(s.update(), StepOutcome::Crashed(Collision::Wall));
        assert_eq!(s.state(), RunState::Over);
        assert_eq!(s.snapshot().collision, Some(Collision::Wall));
    }

    #[test]
    fn test_top_wall_after_running_straight() {
        let mut s = session();
        s.start();
        s.food = Position::new(19, 19);

        for _ in 0..10 {
            assert!(matches!(s.update(), StepOutcome::Moved(_)));
        }
        assert_eq!(s.snake.head(), Position::new(10, 0));
        assert_eq!(s.update(), StepOutcome::Crashed(Collision::Wall));
    }

    #[test]
    fn test_body_collision() {
        let mut s = session();
        s.start();
        s.food = Position::new(19, 19);
        // Five segments heading right, then curl back into the second one.
        s.snake = Snake::new(Position::new(5, 5), 5, Right);

        s.set_direction(Down);
        s.update();
        s.set_direction(Left);
        s.update();
        s.set_direction(Up);
        assert_eq!(s.update(), StepOutcome::Crashed(Collision::Body));
        assert_eq!(s.state(), RunState::Over);
    }

    #[test]
    fn test_moving_into_vacating_tail_is_legal() {
        let mut s = session();
        s.start();
        s.food = Position::new(19, 19);
        // Four segments in a loop: the head's next cell is the tail.
        s.snake = Snake::new(Position::new(5, 5), 4, Right);
        s.set_direction(Down);
        s.update();
        s.set_direction(Left);
        s.update();
        s.set_direction(Up);

        let tail = *s.snake.body().last().unwrap();
        assert_eq!(tail, Position::new(4, 5));
        assert!(matches!(s.update(), StepOutcome::Moved(_)));
        assert_eq!(s.snake.head(), tail);
        assert_eq!(s.snake.len(), 4);
    }

    #[test]
    fn test_pause_freezes_state() {
        let mut s = session();
        s.start();
        s.update();
        let (snake, food, score) = (s.snake.clone(), s.food, s.score);

        assert!(s.toggle_pause());
        assert_eq!(s.state(), RunState::Paused);
        for _ in 0..50 {
            assert_eq!(s.update(), StepOutcome::Ignored);
        }
        assert_eq!(s.snake, snake);
        assert_eq!(s.food, food);
        assert_eq!(s.score, score);

        assert!(s.toggle_pause());
        assert_eq!(s.state(), RunState::Running);
        assert_ne!(s.update(), StepOutcome::Ignored);
    }

    #[test]
    fn test_invalid_transitions_are_noops() {
        let mut s = session();
        assert!(!s.toggle_pause());
        assert_eq!(s.update(), StepOutcome::Ignored);
        assert_eq!(s.state(), RunState::NotStarted);

        s.start();
        assert!(!s.start());
        s.toggle_pause();
        assert!(!s.start());
        assert_eq!(s.state(), RunState::Paused);
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut s = session();
        s.start();
        s.snake = Snake::new(Position::new(0, 5), 3, Left);
        s.score = 30;
        s.update();
        assert_eq!(s.state(), RunState::Over);
        assert!(!s.toggle_pause());
        assert_eq!(s.update(), StepOutcome::Ignored);

        assert!(s.start());
        assert_eq!(s.state(), RunState::Running);
        assert_eq!(s.score(), 0);
        assert_eq!(s.snake.len(), 3);
        assert_eq!(s.snapshot().collision, None);
    }

    #[test]
    fn test_high_score_only_on_strict_improvement() {
        let mut s = session_with(GameConfig::default(), MemoryStore::with_score(30));
        assert_eq!(s.high_score(), 30);

        s.start();
        s.score = 30;
        s.snake = Snake::new(Position::new(0, 5), 3, Left);
        s.update();
        assert_eq!(s.high_score(), 30);
        assert!(!s.snapshot().new_high_score);

        s.start();
        s.score = 40;
        s.snake = Snake::new(Position::new(0, 5), 3, Left);
        s.update();
        assert_eq!(s.high_score(), 40);
        assert!(s.snapshot().new_high_score);
        assert_eq!(s.store.load().unwrap(), Some(40));

        s.start();
        assert!(!s.snapshot().new_high_score);
    }

    #[test]
    fn test_high_score_not_saved_mid_game() {
        let mut s = session();
        s.start();
        s.food = Position::new(10, 9);
        s.update();
        assert_eq!(s.score(), 10);
        assert_eq!(s.high_score(), 0);
        assert_eq!(s.store.load().unwrap(), None);
    }

    #[test]
    fn test_food_never_lands_on_snake() {
        let config = GameConfig { grid_count: 4, initial_length: 3, ..GameConfig::default() };
        let mut s = session_with(config, MemoryStore::default());
        // Fifteen of sixteen cells taken; only (3, 3) is free.
        let mut snake = Snake::new(Position::new(0, 0), 1, Right);
        let path: Vec<Position> = (0..4)
            .flat_map(|y| (0..4).map(move |x| Position::new(x, y)))
            .filter(|p| *p != Position::new(3, 3))
            .collect();
        for pos in path.iter().skip(1) {
            snake.advance(*pos, true);
        }
        s.snake = snake;

        for _ in 0..20 {
            assert_eq!(s.spawn_food(), Some(Position::new(3, 3)));
        }

        s.snake.advance(Position::new(3, 3), true);
        assert_eq!(s.spawn_food(), None);
    }

    #[test]
    fn test_filling_the_board_ends_the_game() {
        let config = GameConfig { grid_count: 2, initial_length: 1, ..GameConfig::default() };
        let mut s = session_with(config, MemoryStore::default());
        s.start();
        s.snake = {
            let mut snake = Snake::new(Position::new(0, 1), 1, Up);
            snake.advance(Position::new(1, 1), true);
            snake.advance(Position::new(1, 0), true);
            snake
        };
        s.food = Position::new(0, 0);
        s.set_direction(Left);

        assert_eq!(s.update(), StepOutcome::Crashed(Collision::BoardFull));
        assert!(Collision::BoardFull.is_win());
        assert!(!Collision::Wall.is_win());
        assert!(!Collision::Body.is_win());
        assert_eq!(s.state(), RunState::Over);
        assert_eq!(s.score(), 10);
        assert_eq!(s.high_score(), 10);
    }

    #[test]
    fn test_segments_stay_distinct_during_play() {
        let config = GameConfig { grid_count: 8, ..GameConfig::default() };
        let mut s = session_with(config, MemoryStore::default());
        let mut rng = StdRng::seed_from_u64(99);
        let dirs = [Up, Down, Left, Right];

        s.start();
        for _ in 0..2000 {
            if s.state() == RunState::Over {
                s.start();
            }
            s.set_direction(dirs[rng.gen_range(0..4)]);
            s.update();

            let unique: HashSet<_> = s.snake.body().collect();
            assert_eq!(unique.len(), s.snake.len());
            assert!(!s.snake.occupies(s.food) || s.state() == RunState::Over);
        }
    }

    #[test]
    fn test_tying_the_best_is_not_a_new_high_score() {
        let mut s = session_with(GameConfig::default(), MemoryStore::with_score(30));
        s.start();
        s.score = 30;
        s.snake = Snake::new(Position::new(0, 5), 3, Left);

        assert_eq!(s.update(), StepOutcome::Crashed(Collision::Wall));
        let snap = s.snapshot();
        assert_eq!(snap.score, snap.high_score);
        assert!(!snap.new_high_score);
    }
}
