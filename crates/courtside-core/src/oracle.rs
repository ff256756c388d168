use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Default wall-clock budget spent per record.
pub const DEFAULT_WALL_CLOCK_BUDGET: Duration = Duration::from_millis(20);

/// How long the oracle keeps walking downward from its starting point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimeBudget {
    /// Stop once this much wall-clock time has elapsed.
    WallClock(Duration),
    /// Test exactly this many consecutive integers.
    Steps(u64),
}

impl Default for PrimeBudget {
    fn default() -> Self {
        Self::WallClock(DEFAULT_WALL_CLOCK_BUDGET)
    }
}

/// Deterministic trial-division primality test.
pub fn is_prime(n: i64) -> bool {
    trial_division(n, None).unwrap_or(false)
}

/// Trial divisors tested between two deadline checks.
const DEADLINE_CHECK_INTERVAL: u32 = 1024;

/// Classifies `n`, giving up with `None` once `deadline` has passed.
///
/// Small candidates finish before the first deadline check, so only numbers
/// needing more than [`DEADLINE_CHECK_INTERVAL`] divisor pairs can be cut short.
fn trial_division(n: i64, deadline: Option<Instant>) -> Option<bool> {
    if n <= 1 {
        return Some(false);
    }
    if n == 2 || n == 3 {
        return Some(true);
    }
    if n % 2 == 0 || n % 3 == 0 {
        return Some(false);
    }

    let mut divisor = 5i64;
    let mut until_check = DEADLINE_CHECK_INTERVAL;
    while divisor.saturating_mul(divisor) <= n {
        if n % divisor == 0 || n % (divisor + 2) == 0 {
            return Some(false);
        }
        divisor += 6;

        until_check -= 1;
        if until_check == 0 {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return None;
            }
            until_check = DEADLINE_CHECK_INTERVAL;
        }
    }
    Some(true)
}

/// Bounded CPU-bound enrichment: counts primes walking down from a start value.
///
/// The result only depends on the start value and the budget. With
/// [`PrimeBudget::Steps`] it is fully deterministic; with a wall-clock budget
/// it depends on machine speed, which is what production runs use to model
/// a fixed slice of work per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrimalityOracle {
    budget: PrimeBudget,
}

impl PrimalityOracle {
    /// Creates an oracle spending `budget` per call to [`Self::count_from`].
    pub fn new(budget: PrimeBudget) -> Self {
        Self { budget }
    }

    /// Work budget applied to every record.
    pub fn budget(&self) -> PrimeBudget {
        self.budget
    }

    /// Counts the primes in `start, start - 1, ...` until the budget runs out.
    pub fn count_from(&self, start: i64) -> u64 {
        match self.budget {
            PrimeBudget::Steps(steps) => count_steps(start, steps),
            PrimeBudget::WallClock(limit) => count_until(start, limit),
        }
    }
}

fn count_steps(start: i64, steps: u64) -> u64 {
    let mut count = 0u64;
    let mut number = start;
    for _ in 0..steps {
        if is_prime(number) {
            count += 1;
        }
        number = number.saturating_sub(1);
    }
    count
}

fn count_until(start: i64, limit: Duration) -> u64 {
    // An unrepresentable deadline means the budget never runs out.
    let deadline = Instant::now().checked_add(limit);
    let mut count = 0u64;
    let mut number = start;
    // At least one candidate is always tested, even with a zero budget. A
    // candidate interrupted by the deadline is not counted.
    loop {
        match trial_division(number, deadline) {
            Some(true) => count += 1,
            Some(false) => {}
            None => break,
        }
        number = number.saturating_sub(1);

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            break;
        }
    }
    count
}
