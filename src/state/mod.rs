pub mod particle;
pub mod status;

pub mod pose {
    use core::ops::{Add, Sub};

    use nalgebra::Vector2;
    use num_traits::{AsPrimitive, Num};

    use crate::utils::math::normalize_orientation;

    /// Planar position in meters plus heading in radians.
    ///
    /// The same type doubles as a per-axis standard deviation when a prior
    /// is given as mean and spread.
    #[derive(Clone, Copy, PartialEq, Debug, Default)]
    pub struct Pose {
        pub position: Vector2<f64>,
        pub orientation: f64,
    }

    impl Sub for Pose {
        type Output = Self;

        fn sub(self, rhs: Self) -> Self {
            Self {
                position: self.position - rhs.position,
                orientation: normalize_orientation(self.orientation - rhs.orientation),
            }
        }
    }

    impl Add for Pose {
        type Output = Self;

        fn add(self, rhs: Self) -> Self {
            Self {
                position: self.position + rhs.position,
                orientation: normalize_orientation(self.orientation + rhs.orientation),
            }
        }
    }

    impl Pose {
        pub fn new<T: Num + AsPrimitive<f64>, U: Num + AsPrimitive<f64>, V: Num + AsPrimitive<f64>>(
            x: T,
            y: U,
            orientation: V,
        ) -> Self {
            Self {
                position: Vector2::<f64>::new(x.as_(), y.as_()),
                orientation: orientation.as_(),
            }
        }
        pub fn x(&self) -> f64 {
            self.position.x
        }
        pub fn y(&self) -> f64 {
            self.position.y
        }
        pub fn distance_to(&self, pose: &Self) -> f64 {
            self.position.metric_distance(&pose.position)
        }
    }

}

pub use particle::{Location, State};
pub use pose::Pose;
pub use status::{Status, UpdateKind};
