/// Default debounce window for global state saves, in ticks (10s at 20Hz)
pub const DEFAULT_SAVE_DEBOUNCE_TICKS: u32 = 200;

/// Process-wide execution switches threaded through every invocation and tick
#[derive(Debug, Clone)]
pub struct ExecutionState {
    /// Halts all script invocation until cleared
    pub stop_all: bool,
    /// Ticks during which further global state writes stay in memory
    pub save_debounce_ticks: u32,
}

impl ExecutionState {
    pub fn new(save_debounce_ticks: u32) -> Self {
        Self {
            stop_all: false,
            save_debounce_ticks,
        }
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new(DEFAULT_SAVE_DEBOUNCE_TICKS)
    }
}
