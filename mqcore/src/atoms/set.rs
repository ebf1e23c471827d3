use std::{
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use nalgebra::Point3;
use once_cell::unsync::OnceCell;

use crate::{atoms::mask::Mask, model::Model};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl BoundingSphere {
    /// Sphere centred on the centroid of `points`, enclosing all of them.
    pub fn enclosing<'a>(points: impl Iterator<Item = &'a Point3<f64>> + Clone) -> Self {
        let (sum, count) = points
            .clone()
            .fold((nalgebra::Vector3::zeros(), 0usize), |(s, c), p| (s + p.coords, c + 1));
        let center = if count == 0 {
            Point3::origin()
        } else {
            Point3::from(sum / count as f64)
        };
        let radius = points
            .map(|p| nalgebra::distance(&center, p))
            .fold(0.0, f64::max);
        Self { center, radius }
    }
}

#[derive(Debug)]
pub struct AtomSetData {
    indices: Box<[u32]>,
    hash: OnceCell<u32>,
    sphere: OnceCell<BoundingSphere>,
}

/// Immutable set of atom indices.
///
/// A single atom is stored inline; larger sets share an ascending index array
/// whose hash code and bounding sphere are computed on first use and cached.
#[derive(Clone)]
pub enum AtomSet {
    Single(u32),
    Many(Rc<AtomSetData>),
}

impl AtomSet {
    pub fn single(index: u32) -> Self {
        AtomSet::Single(index)
    }

    /// Build from ascending, duplicate-free indices.
    ///
    /// Returns `None` for an empty input.
    pub fn from_sorted(indices: Vec<u32>) -> Option<Self> {
        debug_assert!(
            indices.windows(2).all(|w| w[0] < w[1]),
            "atom set indices must be ascending and unique"
        );
        match indices.as_slice() {
            [] => None,
            [single] => Some(AtomSet::Single(*single)),
            _ => Some(AtomSet::Many(Rc::new(AtomSetData {
                indices: indices.into_boxed_slice(),
                hash: OnceCell::new(),
                sphere: OnceCell::new(),
            }))),
        }
    }

    /// Build from indices in any order, possibly repeated.
    pub fn from_unsorted(mut indices: Vec<u32>) -> Option<Self> {
        indices.sort_unstable();
        indices.dedup();
        Self::from_sorted(indices)
    }

    pub fn indices(&self) -> &[u32] {
        match self {
            AtomSet::Single(i) => std::slice::from_ref(i),
            AtomSet::Many(data) => &data.indices,
        }
    }

    pub fn len(&self) -> usize {
        self.indices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices().is_empty()
    }

    pub fn first(&self) -> u32 {
        self.indices()[0]
    }

    pub fn contains(&self, index: u32) -> bool {
        match self {
            AtomSet::Single(i) => *i == index,
            AtomSet::Many(data) => data.indices.binary_search(&index).is_ok(),
        }
    }

    /// `h = 23; h = 31 * h + i` over the indices, with wrapping arithmetic.
    pub fn hash_code(&self) -> u32 {
        fn compute(indices: &[u32]) -> u32 {
            indices
                .iter()
                .fold(23u32, |h, &i| h.wrapping_mul(31).wrapping_add(i))
        }

        match self {
            AtomSet::Single(i) => compute(std::slice::from_ref(i)),
            AtomSet::Many(data) => *data.hash.get_or_init(|| compute(&data.indices)),
        }
    }

    pub fn bounding_sphere(&self, model: &Model) -> BoundingSphere {
        match self {
            AtomSet::Single(i) => BoundingSphere {
                center: *model.position(*i),
                radius: 0.0,
            },
            AtomSet::Many(data) => *data.sphere.get_or_init(|| {
                BoundingSphere::enclosing(data.indices.iter().map(|&i| model.position(i)))
            }),
        }
    }

    pub fn union(a: &AtomSet, b: &AtomSet) -> AtomSet {
        let (xs, ys) = (a.indices(), b.indices());
        let mut merged = Vec::with_capacity(xs.len() + ys.len());
        let (mut i, mut j) = (0, 0);
        while i < xs.len() && j < ys.len() {
            match xs[i].cmp(&ys[j]) {
                std::cmp::Ordering::Less => {
                    merged.push(xs[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(ys[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    merged.push(xs[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&xs[i..]);
        merged.extend_from_slice(&ys[j..]);
        // Both inputs are non-empty, so the union is too.
        Self::from_sorted(merged).unwrap_or_else(|| a.clone())
    }

    /// Union of many sets; `None` when `sets` is empty.
    pub fn union_many<'a>(sets: impl IntoIterator<Item = &'a AtomSet>) -> Option<AtomSet> {
        let indices: Vec<u32> = sets
            .into_iter()
            .flat_map(|s| s.indices().iter().copied())
            .collect();
        Self::from_unsorted(indices)
    }

    /// Minimum pairwise distance between members of `a` and `b`.
    pub fn distance(model: &Model, a: &AtomSet, b: &AtomSet) -> f64 {
        if a == b {
            return 0.0;
        }
        let mut best = f64::INFINITY;
        for &i in a.indices() {
            let p = model.position(i);
            for &j in b.indices() {
                best = best.min(nalgebra::distance(p, model.position(j)));
            }
        }
        best
    }

    /// Whether some member of `a` lies within `max_distance` of some member of `b`.
    pub fn are_within(model: &Model, a: &AtomSet, b: &AtomSet, max_distance: f64) -> bool {
        let (sa, sb) = (a.bounding_sphere(model), b.bounding_sphere(model));
        if nalgebra::distance(&sa.center, &sb.center) - sa.radius - sb.radius > max_distance {
            return false;
        }

        let max_sq = max_distance * max_distance;
        a.indices().iter().any(|&i| {
            let p = model.position(i);
            b.indices()
                .iter()
                .any(|&j| nalgebra::distance_squared(p, model.position(j)) <= max_sq)
        })
    }

    /// Members also in `mask`.
    pub fn intersect_mask(&self, mask: &Mask) -> Option<AtomSet> {
        Self::from_sorted(self.indices().iter().copied().filter(|&i| mask.has(i)).collect())
    }

    /// Members not in `mask`.
    pub fn except_mask(&self, mask: &Mask) -> Option<AtomSet> {
        Self::from_sorted(self.indices().iter().copied().filter(|&i| !mask.has(i)).collect())
    }

    pub fn to_mask(&self, density_threshold: f64) -> Mask {
        Mask::from_sorted(self.indices().to_vec(), density_threshold)
    }
}

impl PartialEq for AtomSet {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AtomSet::Single(a), AtomSet::Single(b)) => a == b,
            (AtomSet::Many(a), AtomSet::Many(b)) if Rc::ptr_eq(a, b) => true,
            _ => self.indices() == other.indices(),
        }
    }
}

impl Eq for AtomSet {}

impl Hash for AtomSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(self.hash_code());
    }
}

impl fmt::Debug for AtomSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.indices()).finish()
    }
}
