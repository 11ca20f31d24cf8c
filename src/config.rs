use serde::{Deserialize, Serialize};

/// Tunables for one game. Defaults reproduce the classic 20x20 board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Cells per side of the square grid
    pub grid_count: i32,
    pub initial_length: usize,
    /// Tick interval at the start of a session
    pub initial_speed_ms: u64,
    /// Floor for the tick interval
    pub min_speed_ms: u64,
    /// Interval reduction per food eaten
    pub speed_decrement_ms: u64,
    pub food_score: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_count: 20,
            initial_length: 3,
            initial_speed_ms: 250,
            min_speed_ms: 80,
            speed_decrement_ms: 2,
            food_score: 10,
        }
    }
}

impl GameConfig {
    pub fn cell_count(&self) -> usize {
        (self.grid_count.max(0) as usize).pow(2)
    }

    /// The next interval after eating, never below the floor.
    pub fn faster(&self, current_ms: u64) -> u64 {
        current_ms
            .saturating_sub(self.speed_decrement_ms)
            .max(self.min_speed_ms)
            .min(current_ms)
    }
}
