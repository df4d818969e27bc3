//! Reward emission that decreases linearly once per interval.
//!
//! Interval `k` (counted from `payout_start`, starting at zero) pays
//! `initial_reward - k * reward_decrease` spread evenly over its seconds. The
//! per-interval reward never goes below zero, so emission stops for good once
//! it gets there.

use crate::MathError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RewardCurve {
    pub initial_reward: i128,
    pub reward_decrease: i128,
    pub payout_start: u64,
    pub decrease_interval: u64,
}

impl RewardCurve {
    /// Reward emitted between `start` and `end`.
    pub fn period_reward(&self, start: u64, end: u64) -> Result<i128, MathError> {
        if self.decrease_interval == 0 {
            return Ok(0);
        }

        let interval = self.decrease_interval as i128;
        let payout_start = self.payout_start as i128;

        let start = (start as i128).max(payout_start);
        let end = (end as i128).min(self.emission_end());
        if start >= end {
            return Ok(0);
        }

        let first_index = (start - payout_start) / interval;
        let first_interval_end = interval
            .checked_mul(first_index + 1)
            .ok_or(MathError::Overflow)?;

        if first_interval_end >= end - payout_start {
            // Both ends fall into the same interval
            let reward = self.interval_reward(first_index)?;
            return reward
                .checked_mul(end - start)
                .map(|value| value / interval)
                .ok_or(MathError::Overflow);
        }

        let head = self.partial_reward(start, true)?;
        let body = self.full_intervals_reward(start, end)?;
        let tail = self.partial_reward(end, false)?;

        head.checked_add(body)
            .and_then(|value| value.checked_add(tail))
            .ok_or(MathError::Overflow)
    }

    /// First second at which nothing more is emitted.
    fn emission_end(&self) -> i128 {
        if self.reward_decrease <= 0 {
            return i128::MAX;
        }

        let intervals = div_ceil(self.initial_reward, self.reward_decrease);
        intervals
            .checked_mul(self.decrease_interval as i128)
            .and_then(|duration| duration.checked_add(self.payout_start as i128))
            .unwrap_or(i128::MAX)
    }

    fn interval_reward(&self, index: i128) -> Result<i128, MathError> {
        match index.checked_mul(self.reward_decrease) {
            Some(decrease) if decrease < self.initial_reward => Ok(self.initial_reward - decrease),
            Some(_) => Ok(0),
            None if self.reward_decrease > 0 => Ok(0),
            None => Err(MathError::Overflow),
        }
    }

    /// Reward of the interval containing `time`, either from `time` to the end
    /// of that interval (`to_end`) or from the start of that interval to `time`.
    fn partial_reward(&self, time: i128, to_end: bool) -> Result<i128, MathError> {
        let interval = self.decrease_interval as i128;
        let payout_start = self.payout_start as i128;

        let index = (time - payout_start) / interval;
        let reward = self.interval_reward(index)?;
        if reward == 0 {
            return Ok(0);
        }

        let interval_start = payout_start + index * interval;
        let part = if to_end {
            interval_start + interval - time
        } else {
            time - interval_start
        };

        // A whole interval is counted by `full_intervals_reward`
        if part == interval {
            return Ok(0);
        }

        reward
            .checked_mul(part)
            .map(|value| value / interval)
            .ok_or(MathError::Overflow)
    }

    /// Sum over every interval lying entirely inside `[start, end)`.
    fn full_intervals_reward(&self, start: i128, end: i128) -> Result<i128, MathError> {
        let interval = self.decrease_interval as i128;
        let payout_start = self.payout_start as i128;

        let first_index = div_ceil(start - payout_start, interval);
        let first_reward = self.interval_reward(first_index)?;
        if first_reward == 0 {
            return Ok(0);
        }

        let count = (end - payout_start - first_index * interval) / interval;
        if count <= 0 {
            return Ok(0);
        }

        // first * n - decrease * n * (n - 1) / 2
        let total = first_reward.checked_mul(count).ok_or(MathError::Overflow)?;
        let decrease = count
            .checked_mul(count - 1)
            .and_then(|value| value.checked_mul(self.reward_decrease))
            .map(|value| value / 2)
            .ok_or(MathError::Overflow)?;

        Ok(total - decrease)
    }
}

fn div_ceil(numerator: i128, denominator: i128) -> i128 {
    if numerator % denominator == 0 {
        numerator / denominator
    } else {
        numerator / denominator + 1
    }
}
