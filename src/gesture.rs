//! Pinch classifier: thumb tip close to index tip means the pen is down.
//!
//! Every frame is judged on its own. There is no hysteresis, so a hand
//! hovering right at the threshold can flicker between UP and DOWN.

use crate::landmarks::{FrameObservation, Hand};
use crate::types::PenState;

/// Pinch distance in normalized camera space below which the pen is down.
pub const DEFAULT_PINCH_THRESHOLD: f32 = 0.05;

/// Euclidean distance between the index tip and the thumb tip.
pub fn pinch_distance(hand: &Hand) -> f32 {
    hand.index_tip().distance(&hand.thumb_tip())
}

/// Pure function of the current frame. `NoHand` is always UP.
pub fn classify(observation: &FrameObservation, threshold: f32) -> PenState {
    match observation.hand() {
        Some(hand) if pinch_distance(hand) < threshold => PenState::Down,
        _ => PenState::Up,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{INDEX_TIP, LANDMARK_COUNT, THUMB_TIP};
    use crate::types::Landmark;

    fn hand_with_tips(thumb: Landmark, index: Landmark) -> FrameObservation {
        let mut lms = vec![Landmark::new(0.5, 0.8); LANDMARK_COUNT];
        lms[THUMB_TIP] = thumb;
        lms[INDEX_TIP] = index;
        FrameObservation::from_hands(vec![lms])
    }

    #[test]
    fn no_hand_is_up() {
        assert_eq!(classify(&FrameObservation::NoHand, DEFAULT_PINCH_THRESHOLD), PenState::Up);
    }

    #[test]
    fn exact_threshold_is_up() {
        let obs = hand_with_tips(Landmark::new(0.0, 0.0), Landmark::new(0.05, 0.0));
        assert_eq!(pinch_distance(obs.hand().unwrap()), 0.05);
        assert_eq!(classify(&obs, 0.05), PenState::Up);
    }

    #[test]
    fn just_below_threshold_is_down() {
        let obs = hand_with_tips(Landmark::new(0.0, 0.0), Landmark::new(0.0499, 0.0));
        assert_eq!(classify(&obs, 0.05), PenState::Down);
    }

    #[test]
    fn distance_uses_both_axes() {
        // 0.03-0.04-0.05 triangle
        let obs = hand_with_tips(Landmark::new(0.40, 0.40), Landmark::new(0.43, 0.44));
        let d = pinch_distance(obs.hand().unwrap());
        assert!((d - 0.05).abs() < 1e-5);
        assert_eq!(classify(&obs, 0.06), PenState::Down);
        assert_eq!(classify(&obs, 0.04), PenState::Up);
    }

    #[test]
    fn threshold_is_a_parameter() {
        let obs = hand_with_tips(Landmark::new(0.2, 0.2), Landmark::new(0.2, 0.28));
        assert_eq!(classify(&obs, DEFAULT_PINCH_THRESHOLD), PenState::Up);
        assert_eq!(classify(&obs, 0.1), PenState::Down);
    }
}
