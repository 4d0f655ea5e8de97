//! The standard 21-point hand topology and the per-frame observation built
//! from it.
//!
//! Only the thumb tip (4) and the index tip (8) drive the pen; the rest are
//! carried for the overlay skeleton.

use crate::types::Landmark;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

pub const LANDMARK_COUNT: usize = 21;

/// Shortest list that still contains both the thumb tip and the index tip.
pub const MIN_LANDMARKS: usize = INDEX_TIP + 1;

/// Bones drawn by the overlay skeleton (fingers plus the palm outline).
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
    (INDEX_MCP, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
    (MIDDLE_MCP, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
    (RING_MCP, PINKY_MCP), (WRIST, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP),
    (PINKY_DIP, PINKY_TIP),
];

/// One validated hand: at least `MIN_LANDMARKS` points, all finite.
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    landmarks: Vec<Landmark>,
}

impl Hand {
    /// Returns `None` for lists the pen logic cannot use.
    pub fn new(landmarks: Vec<Landmark>) -> Option<Self> {
        if landmarks.len() < MIN_LANDMARKS {
            return None;
        }
        if !landmarks.iter().all(Landmark::is_finite) {
            return None;
        }
        Some(Self { landmarks })
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn thumb_tip(&self) -> Landmark {
        self.landmarks[THUMB_TIP]
    }

    pub fn index_tip(&self) -> Landmark {
        self.landmarks[INDEX_TIP]
    }
}

/// What the landmark source saw in one video frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FrameObservation {
    #[default]
    NoHand,
    OneHand(Hand),
}

impl FrameObservation {
    /// Keep the first detected hand only. A malformed first hand makes the
    /// whole frame `NoHand`; later hands are never promoted in its place.
    pub fn from_hands<I>(hands: I) -> Self
    where
        I: IntoIterator<Item = Vec<Landmark>>,
    {
        match hands.into_iter().next().and_then(Hand::new) {
            Some(hand) => FrameObservation::OneHand(hand),
            None => FrameObservation::NoHand,
        }
    }

    pub fn hand(&self) -> Option<&Hand> {
        match self {
            FrameObservation::NoHand => None,
            FrameObservation::OneHand(hand) => Some(hand),
        }
    }
}
