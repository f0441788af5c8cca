use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Measures one timed region. `start` is called immediately before the first
/// timed call and `stop` immediately after the last one.
pub trait Timer {
    fn start(&mut self);
    fn stop(&mut self) -> Duration;
}

#[derive(Debug, Default)]
pub struct WallTimer {
    started: Option<Instant>,
}

impl WallTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for WallTimer {
    fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    fn stop(&mut self) -> Duration {
        self.started
            .take()
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }
}

/// Replays a fixed sequence of durations, then keeps returning `fallback`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTimer {
    script: VecDeque<Duration>,
    fallback: Duration,
}

impl ScriptedTimer {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Duration>,
    {
        Self {
            script: script.into_iter().collect(),
            fallback: Duration::ZERO,
        }
    }

    pub fn constant(duration: Duration) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: duration,
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Timer for ScriptedTimer {
    fn start(&mut self) {}

    fn stop(&mut self) -> Duration {
        self.script.pop_front().unwrap_or(self.fallback)
    }
}
