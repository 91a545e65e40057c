//! Splitting an amount across capacity-bounded paths.

/// Amounts closer than this are considered equal when allocating and
/// committing multi-path payments.
pub const ALLOCATION_TOLERANCE: f64 = 1e-6;

/// Max-min fair allocation of `amount` over paths with the given
/// capacities.
///
/// All paths rise together from zero; a path stops rising when it reaches
/// its capacity. The common level is raised until the amount is used up.
/// If the amount covers the total capacity every path is filled.
///
/// `water_fill(18.0, &[10.0, 10.0, 5.0]) == [6.5, 6.5, 5.0]`
pub fn water_fill(amount: f64, capacities: &[f64]) -> Vec<f64> {
    let caps: Vec<f64> = capacities.iter().map(|c| c.max(0.0)).collect();
    let total: f64 = caps.iter().sum();
    if amount >= total {
        return caps;
    }

    let mut order: Vec<usize> = (0..caps.len()).collect();
    order.sort_by(|&a, &b| caps[a].total_cmp(&caps[b]));

    let mut remaining = amount.max(0.0);
    let mut level = 0.0;
    for (rank, &i) in order.iter().enumerate() {
        let rising = (caps.len() - rank) as f64;
        let to_next = (caps[i] - level) * rising;
        if remaining <= to_next {
            level += remaining / rising;
            break;
        }
        remaining -= to_next;
        level = caps[i];
    }

    caps.iter().map(|&c| c.min(level)).collect()
}

/// Allocation that drains the fullest paths first.
///
/// Paths with the most capacity take flow until their leftover capacity
/// drops to that of the next path, after which they drain together. The
/// result leaves every used path with the same leftover capacity, which
/// keeps channel balances even.
///
/// `drain_largest(18.0, &[10.0, 10.0, 5.0])` leaves `7/3` on each path.
pub fn drain_largest(amount: f64, capacities: &[f64]) -> Vec<f64> {
    let caps: Vec<f64> = capacities.iter().map(|c| c.max(0.0)).collect();
    let total: f64 = caps.iter().sum();
    if amount >= total {
        return caps;
    }

    let mut order: Vec<usize> = (0..caps.len()).collect();
    order.sort_by(|&a, &b| caps[b].total_cmp(&caps[a]));

    let amount = amount.max(0.0);
    let mut prefix = 0.0;
    let mut leftover = 0.0;
    for (rank, &i) in order.iter().enumerate() {
        prefix += caps[i];
        let draining = (rank + 1) as f64;
        let candidate = (prefix - amount) / draining;
        let next = order.get(rank + 1).map_or(0.0, |&j| caps[j]);
        if candidate >= next {
            leftover = candidate;
            break;
        }
    }

    caps.iter().map(|&c| (c - leftover).max(0.0)).collect()
}
