use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// An index range over structured data: `[xmin, xmax, ymin, ymax, zmin, zmax]`, bounds inclusive.
pub struct Extent(pub [i32; 6]);

impl Extent {
    /// The canonical empty extent.
    pub const EMPTY: Extent = Extent([0, -1, 0, -1, 0, -1]);

    pub fn new(xmin: i32, xmax: i32, ymin: i32, ymax: i32, zmin: i32, zmax: i32) -> Self {
        Self([xmin, xmax, ymin, ymax, zmin, zmax])
    }

    pub fn from_slice(values: &[i64]) -> Option<Self> {
        if values.len() != 6 {
            return None;
        }
        let mut extent = [0; 6];
        for (dst, src) in extent.iter_mut().zip(values) {
            *dst = i32::try_from(*src).ok()?;
        }
        Some(Self(extent))
    }

    pub fn to_vec(&self) -> Vec<i64> {
        self.0.iter().map(|v| *v as i64).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] > self.0[1] || self.0[2] > self.0[3] || self.0[4] > self.0[5]
    }

    /// Whether `other` lies inside `self`. An empty extent is contained in anything.
    pub fn contains(&self, other: &Extent) -> bool {
        if other.is_empty() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        (0..3).all(|axis| {
            self.0[2 * axis] <= other.0[2 * axis] && other.0[2 * axis + 1] <= self.0[2 * axis + 1]
        })
    }

    pub fn intersection(&self, other: &Extent) -> Extent {
        let mut result = [0; 6];
        for axis in 0..3 {
            result[2 * axis] = self.0[2 * axis].max(other.0[2 * axis]);
            result[2 * axis + 1] = self.0[2 * axis + 1].min(other.0[2 * axis + 1]);
        }
        let result = Extent(result);
        if result.is_empty() {
            Extent::EMPTY
        } else {
            result
        }
    }

    pub fn dimensions(&self) -> [usize; 3] {
        if self.is_empty() {
            return [0; 3];
        }
        [
            (self.0[1] - self.0[0] + 1) as usize,
            (self.0[3] - self.0[2] + 1) as usize,
            (self.0[5] - self.0[4] + 1) as usize,
        ]
    }

    pub fn number_of_points(&self) -> usize {
        self.dimensions().iter().product()
    }
}

impl Default for Extent {
    fn default() -> Self {
        Extent::EMPTY
    }
}

impl Display for Extent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let e = &self.0;
        write!(f, "({} {} {} {} {} {})", e[0], e[1], e[2], e[3], e[4], e[5])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_and_intersection() {
        let whole = Extent::new(0, 9, 0, 9, 0, 0);
        let sub = Extent::new(2, 4, 0, 9, 0, 0);
        assert!(whole.contains(&sub));
        assert!(!sub.contains(&whole));
        assert!(sub.contains(&Extent::EMPTY));
        assert!(!Extent::EMPTY.contains(&sub));

        let other = Extent::new(3, 20, 5, 6, 0, 0);
        assert_eq!(sub.intersection(&other), Extent::new(3, 4, 5, 6, 0, 0));
        assert_eq!(
            sub.intersection(&Extent::new(10, 12, 0, 0, 0, 0)),
            Extent::EMPTY
        );
    }

    #[test]
    fn test_point_count() {
        assert_eq!(Extent::new(0, 9, 0, 4, 0, 0).number_of_points(), 50);
        assert_eq!(Extent::EMPTY.number_of_points(), 0);
        assert_eq!(Extent::from_slice(&[0, 1, 0, 1, 0, 1]).unwrap().dimensions(), [2, 2, 2]);
        assert!(Extent::from_slice(&[0, 1]).is_none());
    }
}
