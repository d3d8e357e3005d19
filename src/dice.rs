// Dice match engine: which of the six dice a target lets the player keep.

/// Dice rolled per turn segment
pub const DICE_COUNT: usize = 6;

pub type Dice = [u8; DICE_COUNT];
pub type Locks = [bool; DICE_COUNT];

/// Result of matching dice against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockResult {
    /// Lock set after matching (previous locks plus newly kept dice)
    pub locked: Locks,
    /// Newly kept singles (targets 1-6) or pairs (targets 7-12)
    pub gain: u8,
}

/// True for targets a single die can hit
pub fn is_single_die_target(target: u8) -> bool {
    (1..=6).contains(&target)
}

/// Match unlocked dice against `target`.
///
/// Targets 1-6 keep every unlocked die showing the target. Targets 7-12 keep
/// disjoint pairs summing to the target, walking the lower face of each pair
/// from 1 up to 6 and always taking the lowest-indexed dice first, so the
/// same dice and locks always produce the same lock set.
pub fn resolve(dice: &Dice, locked: &Locks, target: u8) -> LockResult {
    let mut next = *locked;
    let mut gain = 0u8;

    if is_single_die_target(target) {
        for i in 0..DICE_COUNT {
            if !next[i] && dice[i] == target {
                next[i] = true;
                gain += 1;
            }
        }
        return LockResult { locked: next, gain };
    }

    if !(7..=12).contains(&target) {
        return LockResult { locked: next, gain };
    }

    // Die indices per face value, in index order
    let mut buckets: [Vec<usize>; 6] = Default::default();
    for i in 0..DICE_COUNT {
        if !next[i] && (1..=6).contains(&dice[i]) {
            buckets[(dice[i] - 1) as usize].push(i);
        }
    }
    let mut heads = [0usize; 6];

    for v in 1..=6u8 {
        let c = target as i16 - v as i16;
        if !(1..=6).contains(&c) || v as i16 > c {
            continue;
        }
        let (a, b) = ((v - 1) as usize, (c - 1) as usize);
        if a == b {
            while buckets[a].len() - heads[a] >= 2 {
                next[buckets[a][heads[a]]] = true;
                next[buckets[a][heads[a] + 1]] = true;
                heads[a] += 2;
                gain += 1;
            }
        } else {
            while heads[a] < buckets[a].len() && heads[b] < buckets[b].len() {
                next[buckets[a][heads[a]]] = true;
                next[buckets[b][heads[b]]] = true;
                heads[a] += 1;
                heads[b] += 1;
                gain += 1;
            }
        }
    }

    LockResult { locked: next, gain }
}

/// Gain `target` would give against fresh (all unlocked) dice
pub fn gain_for(dice: &Dice, target: u8) -> u8 {
    resolve(dice, &[false; DICE_COUNT], target).gain
}

/// Convert a stored dice column into a fixed array, padding with 1s
pub fn dice_from_slice(values: &[u8]) -> Dice {
    std::array::from_fn(|i| values.get(i).copied().unwrap_or(1))
}

/// Convert a stored lock column into a fixed array, padding with unlocked
pub fn locks_from_slice(values: &[bool]) -> Locks {
    std::array::from_fn(|i| values.get(i).copied().unwrap_or(false))
}
