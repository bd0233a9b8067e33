use super::{Component, Counts};

/// Computes a load score from a component's counters; lower means less busy
pub type CalculateScore = fn(&Counts) -> u64;

/// Default score: `called + 2*accepted + 4*completed + 16*handling`
pub fn calculate_score_simple(counts: &Counts) -> u64 {
    counts
        .called_count
        .wrapping_add(counts.accepted_count << 1)
        .wrapping_add(counts.completed_count << 2)
        .wrapping_add(counts.handling_number << 4)
}

/// Recomputes a component's score, returning whether it changed
pub fn set_score<C: Component + ?Sized>(component: &C) -> bool {
    let calculator = component.score_calculator();
    let new_score = calculator(&component.counts());
    if new_score == component.score() {
        return false;
    }
    component.set_score(new_score);
    true
}
