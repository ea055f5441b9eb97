use crate::alignment::AlignError;
use serde::{Deserialize, Serialize};

/// Bounding box reported by the external face detector, with the landmark
/// localizer's five keypoints when available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// The box's landmarks as a typed set, when the localizer supplied them.
    pub fn facial_landmarks(&self) -> Option<FacialLandmarks> {
        self.landmarks.map(FacialLandmarks::new)
    }
}

/// Five facial keypoints in source-image pixel coordinates, fixed order:
/// left eye, right eye, nose, left mouth corner, right mouth corner.
///
/// The exactly-five invariant is checked once at construction and carried by
/// the type from there on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FacialLandmarks([(f32, f32); 5]);

impl FacialLandmarks {
    pub fn new(points: [(f32, f32); 5]) -> Self {
        Self(points)
    }

    /// Validate a collaborator-supplied point list.
    pub fn from_points(points: &[(f32, f32)]) -> Result<Self, AlignError> {
        let array: [(f32, f32); 5] = points
            .try_into()
            .map_err(|_| AlignError::InvalidLandmarks(points.len()))?;
        Ok(Self(array))
    }

    pub fn points(&self) -> &[(f32, f32); 5] {
        &self.0
    }

    pub fn left_eye(&self) -> (f32, f32) {
        self.0[0]
    }

    pub fn right_eye(&self) -> (f32, f32) {
        self.0[1]
    }

    pub fn nose(&self) -> (f32, f32) {
        self.0[2]
    }

    pub fn left_mouth(&self) -> (f32, f32) {
        self.0[3]
    }

    pub fn right_mouth(&self) -> (f32, f32) {
        self.0[4]
    }
}

impl From<[(f32, f32); 5]> for FacialLandmarks {
    fn from(points: [(f32, f32); 5]) -> Self {
        Self::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points_requires_exactly_five() {
        let four = [(0.0, 0.0); 4];
        assert!(matches!(
            FacialLandmarks::from_points(&four),
            Err(AlignError::InvalidLandmarks(4))
        ));

        let six = [(0.0, 0.0); 6];
        assert!(matches!(
            FacialLandmarks::from_points(&six),
            Err(AlignError::InvalidLandmarks(6))
        ));

        let five = [(1.0, 2.0); 5];
        assert!(FacialLandmarks::from_points(&five).is_ok());
    }

    #[test]
    fn test_point_order_preserved() {
        let landmarks = FacialLandmarks::new([
            (1.0, 2.0),
            (3.0, 4.0),
            (5.0, 6.0),
            (7.0, 8.0),
            (9.0, 10.0),
        ]);
        assert_eq!(landmarks.left_eye(), (1.0, 2.0));
        assert_eq!(landmarks.right_eye(), (3.0, 4.0));
        assert_eq!(landmarks.nose(), (5.0, 6.0));
        assert_eq!(landmarks.left_mouth(), (7.0, 8.0));
        assert_eq!(landmarks.right_mouth(), (9.0, 10.0));
    }

    #[test]
    fn test_bounding_box_landmarks_passthrough() {
        let with = BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            confidence: 0.9,
            landmarks: Some([(1.0, 1.0); 5]),
        };
        assert!(with.facial_landmarks().is_some());

        let without = BoundingBox {
            landmarks: None,
            ..with
        };
        assert!(without.facial_landmarks().is_none());
    }
}
