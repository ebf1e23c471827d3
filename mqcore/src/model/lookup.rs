use std::collections::HashMap;

use nalgebra::Point3;
use smallvec::SmallVec;

type Cell = [i64; 3];

/// Uniform hash grid over spheres.
///
/// Each item is a point with a radius (zero for atoms, the bounding radius for
/// atom sets). A query returns every item whose sphere intersects the query
/// sphere, in ascending item order.
#[derive(Debug, Clone)]
pub struct GridLookup {
    cell_size: f64,
    cells: HashMap<Cell, SmallVec<u32, 8>>,
    centers: Vec<Point3<f64>>,
    radii: Vec<f64>,
    max_radius: f64,
}

impl GridLookup {
    pub fn new(items: impl IntoIterator<Item = (Point3<f64>, f64)>, cell_size: f64) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let mut lookup = Self {
            cell_size,
            cells: HashMap::new(),
            centers: Vec::new(),
            radii: Vec::new(),
            max_radius: 0.0,
        };

        for (index, (center, radius)) in items.into_iter().enumerate() {
            let cell = lookup.cell_of(&center);
            lookup.cells.entry(cell).or_default().push(index as u32);
            lookup.centers.push(center);
            lookup.radii.push(radius);
            lookup.max_radius = lookup.max_radius.max(radius);
        }
        lookup
    }

    /// Grid over points without extent.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>, cell_size: f64) -> Self {
        Self::new(points.into_iter().map(|p| (*p, 0.0)), cell_size)
    }

    fn cell_of(&self, p: &Point3<f64>) -> Cell {
        [
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        ]
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Items whose sphere comes within `radius` of `center`.
    pub fn query(&self, center: &Point3<f64>, radius: f64) -> Vec<u32> {
        let mut found = Vec::new();
        if self.centers.is_empty() || radius < 0.0 {
            return found;
        }

        let reach = radius + self.max_radius;
        let side = 2.0 * (reach / self.cell_size).ceil() + 1.0;
        if !(side.powi(3) <= (8 * self.cells.len()) as f64) {
            // Visiting the covered cells would cost more than a linear scan.
            for (i, c) in self.centers.iter().enumerate() {
                if nalgebra::distance(center, c) <= radius + self.radii[i] {
                    found.push(i as u32);
                }
            }
            return found;
        }

        let span = (reach / self.cell_size).ceil() as i64;
        let [cx, cy, cz] = self.cell_of(center);
        for x in cx - span..=cx + span {
            for y in cy - span..=cy + span {
                for z in cz - span..=cz + span {
                    let Some(items) = self.cells.get(&[x, y, z]) else {
                        continue;
                    };
                    for &item in items {
                        let i = item as usize;
                        let d = nalgebra::distance(center, &self.centers[i]);
                        if d <= radius + self.radii[i] {
                            found.push(item);
                        }
                    }
                }
            }
        }
        found.sort_unstable();
        found
    }
}
