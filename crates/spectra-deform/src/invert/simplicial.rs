//! Scattered-data inversion over a tetrahedral mesh of the deformed grid.
//!
//! Every cell of the forward-mapped lattice is split into six tetrahedra
//! sharing the cell's main diagonal (Kuhn decomposition). Neighbouring cells
//! split their shared faces identically, so the tetrahedra tile the mapped
//! domain without gaps wherever the field does not fold. Cells are indexed by
//! their bounding boxes in a uniform bucket grid, so locating the tetrahedron
//! that encloses a query point costs O(1) on average.
//!
//! Only the part of the mapped domain that overlaps the regular grid is
//! indexed. Cells touching a non-finite site are dropped, and cells spanning
//! more than [`MAX_SPAN_BUCKETS`] buckets are kept in a short overflow list
//! that every query scans after its bucket, so a few wild displacements
//! neither blow up the index nor pile every cell into one bucket.

use nalgebra::{Matrix3, Vector3};
use spectra_core::image::{flat_index, voxel_count};

/// Vertex paths through the unit cube, one per tetrahedron. Tetrahedron `t`
/// visits `000`, then steps along axes `KUHN_PATHS[t][0]`, `[1]`, `[2]`,
/// ending at `111`.
const KUHN_PATHS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

/// Relative volume below which a tetrahedron is treated as flat.
const DEGENERATE_VOLUME: f64 = 1e-10;

/// Hard ceiling on buckets per indexed cell.
const BUCKETS_PER_CELL: usize = 8;

/// Cells overlapping more buckets than this go to the overflow list.
const MAX_SPAN_BUCKETS: f64 = 512.0;

/// Axis-aligned box in world coordinates.
#[derive(Debug, Clone, Copy)]
struct Aabb {
    min: Vector3<f64>,
    max: Vector3<f64>,
}

impl Aabb {
    fn empty() -> Self {
        Self {
            min: Vector3::repeat(f64::INFINITY),
            max: Vector3::repeat(f64::NEG_INFINITY),
        }
    }

    fn grow(&mut self, p: &Vector3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    fn union(&mut self, other: &Aabb) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    fn padded(&self, pad: f64) -> Self {
        Self {
            min: self.min.add_scalar(-pad),
            max: self.max.add_scalar(pad),
        }
    }

    fn intersection(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.sup(&other.min),
            max: self.max.inf(&other.max),
        }
    }

    fn is_finite(&self) -> bool {
        self.min.iter().chain(self.max.iter()).all(|v| v.is_finite())
    }

    fn is_empty(&self) -> bool {
        (0..3).any(|a| !(self.min[a] <= self.max[a]))
    }

    fn intersects(&self, other: &Aabb) -> bool {
        !self.intersection(other).is_empty()
    }

    fn contains(&self, p: &Vector3<f64>) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }
}

/// Uniform grid of buckets, each listing the cells whose bounding box
/// overlaps it. Stored in compressed form: bucket `b` owns
/// `cells[offsets[b]..offsets[b + 1]]`. Cells too large to bucket live in
/// `overflow` and are candidates for every query inside the domain.
#[derive(Debug)]
struct BucketGrid {
    domain: Aabb,
    edge: f64,
    dims: [usize; 3],
    offsets: Vec<usize>,
    cells: Vec<usize>,
    overflow: Vec<usize>,
}

impl BucketGrid {
    /// Index the finite cells of `bounds` that overlap `region`.
    fn build(bounds: &[Aabb], region: Aabb, edge: f64) -> Self {
        let mut domain = Aabb::empty();
        for bbox in bounds.iter().filter(|b| b.is_finite()) {
            domain.union(bbox);
        }
        let domain = domain.intersection(&region);

        let cap = (BUCKETS_PER_CELL * bounds.len() + 64) as f64;
        let mut edge = edge;
        let mut counts = [1.0f64; 3];
        if !domain.is_empty() {
            let extent = domain.max - domain.min;
            loop {
                for a in 0..3 {
                    counts[a] = (extent[a] / edge).floor() + 1.0;
                }
                if counts.iter().product::<f64>() <= cap {
                    break;
                }
                edge *= 2.0;
            }
        }
        let dims = counts.map(|c| c as usize);

        let mut grid = Self {
            domain,
            edge,
            dims,
            offsets: vec![0; voxel_count(dims) + 1],
            cells: Vec::new(),
            overflow: Vec::new(),
        };

        let mut indexed = Vec::with_capacity(bounds.len());
        for (cell, bbox) in bounds.iter().enumerate() {
            if !bbox.is_finite() || !bbox.intersects(&grid.domain) {
                continue;
            }
            let (lo, hi) = grid.bucket_range(bbox);
            let span: f64 = (0..3).map(|a| (hi[a] - lo[a] + 1) as f64).product();
            if span > MAX_SPAN_BUCKETS {
                grid.overflow.push(cell);
            } else {
                indexed.push((cell, lo, hi));
            }
        }

        // Pass 1: count entries per bucket.
        for &(_, lo, hi) in &indexed {
            for_each_bucket(grid.dims, lo, hi, |b| grid.offsets[b + 1] += 1);
        }
        for b in 0..grid.offsets.len() - 1 {
            grid.offsets[b + 1] += grid.offsets[b];
        }

        // Pass 2: scatter cell ids.
        let total = grid.offsets[grid.offsets.len() - 1];
        let mut cursor = grid.offsets.clone();
        let mut cells = vec![0usize; total];
        for &(cell, lo, hi) in &indexed {
            for_each_bucket(grid.dims, lo, hi, |b| {
                cells[cursor[b]] = cell;
                cursor[b] += 1;
            });
        }
        grid.cells = cells;
        grid
    }

    fn bucket_coord(&self, value: f64, axis: usize) -> usize {
        let t = ((value - self.domain.min[axis]) / self.edge).floor();
        t.clamp(0.0, (self.dims[axis] - 1) as f64) as usize
    }

    fn bucket_range(&self, bbox: &Aabb) -> ([usize; 3], [usize; 3]) {
        let mut lo = [0; 3];
        let mut hi = [0; 3];
        for a in 0..3 {
            lo[a] = self.bucket_coord(bbox.min[a], a);
            hi[a] = self.bucket_coord(bbox.max[a], a);
        }
        (lo, hi)
    }

    /// Cells whose bounding box may contain `p`: its bucket first, then the
    /// overflow list.
    fn candidates(&self, p: &Vector3<f64>) -> impl Iterator<Item = &usize> + '_ {
        let (bucket, overflow): (&[usize], &[usize]) = if self.domain.contains(p) {
            let b = flat_index(
                self.dims,
                self.bucket_coord(p[0], 0),
                self.bucket_coord(p[1], 1),
                self.bucket_coord(p[2], 2),
            );
            (&self.cells[self.offsets[b]..self.offsets[b + 1]], &self.overflow)
        } else {
            (&[], &[])
        };
        bucket.iter().chain(overflow)
    }
}

/// Barycentric coordinates of `q` in the tetrahedron `v`, or `None` when the
/// tetrahedron is flat.
fn barycentric(v: [&Vector3<f64>; 4], q: &Vector3<f64>) -> Option<[f64; 4]> {
    let e1 = v[1] - v[0];
    let e2 = v[2] - v[0];
    let e3 = v[3] - v[0];
    let scale = e1.norm() * e2.norm() * e3.norm();
    let t = Matrix3::from_columns(&[e1, e2, e3]);
    let det = t.determinant();
    if scale == 0.0 || det.abs() <= DEGENERATE_VOLUME * scale {
        return None;
    }
    let r = q - v[0];
    let l1 = Matrix3::from_columns(&[r, e2, e3]).determinant() / det;
    let l2 = Matrix3::from_columns(&[e1, r, e3]).determinant() / det;
    let l3 = Matrix3::from_columns(&[e1, e2, r]).determinant() / det;
    Some([1.0 - l1 - l2 - l3, l1, l2, l3])
}

/// Output of a simplicial inversion on host memory.
#[derive(Debug, Clone)]
pub(crate) struct SimplicialInverse {
    /// Inverse displacement in voxel units, `[X, Y, Z, 3]` row-major.
    pub values: Vec<f64>,
    /// Grid points that no tetrahedron enclosed.
    pub unresolved: usize,
}

/// Piecewise-linear inverse of a sampled deformation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SimplicialInverter {
    pub barycentric_tolerance: f64,
    pub bucket_scale: f64,
}

impl SimplicialInverter {
    /// Invert `displacement` (voxel units, `[X, Y, Z, 3]` row-major) on a
    /// grid of `shape` with per-axis `spacing`. Every extent must be ≥ 2.
    pub fn invert(&self, displacement: &[f64], shape: [usize; 3], spacing: [f64; 3]) -> SimplicialInverse {
        let s = Vector3::from(spacing);
        let n = voxel_count(shape);

        let sites: Vec<Vector3<f64>> = (0..n)
            .map(|i| {
                let [x, y, z] = unflatten(shape, i);
                let d = Vector3::new(
                    displacement[3 * i],
                    displacement[3 * i + 1],
                    displacement[3 * i + 2],
                );
                (Vector3::new(x as f64, y as f64, z as f64) + d).component_mul(&s)
            })
            .collect();

        let cell_shape = [shape[0] - 1, shape[1] - 1, shape[2] - 1];
        let max_spacing = s.max();
        let pad = spectra_core::interpolation::BOUNDARY_TOLERANCE * max_spacing;

        // Cells with a non-finite corner keep an empty box and are never
        // candidates.
        let bounds: Vec<Aabb> = (0..voxel_count(cell_shape))
            .map(|c| {
                let origin = unflatten(cell_shape, c);
                let mut bbox = Aabb::empty();
                for corner in 0..8 {
                    let v = corner_of(origin, [(corner >> 2) & 1, (corner >> 1) & 1, corner & 1]);
                    let site = &sites[flat_index(shape, v[0], v[1], v[2])];
                    if !site.iter().all(|c| c.is_finite()) {
                        return Aabb::empty();
                    }
                    bbox.grow(site);
                }
                bbox.padded(pad)
            })
            .collect();

        let queries = Aabb {
            min: Vector3::zeros(),
            max: Vector3::new(
                (shape[0] - 1) as f64,
                (shape[1] - 1) as f64,
                (shape[2] - 1) as f64,
            )
            .component_mul(&s),
        }
        .padded(pad);
        let buckets = BucketGrid::build(&bounds, queries, max_spacing * self.bucket_scale);
        tracing::debug!(
            "Indexed {} cells in {:?} buckets of edge {:.4} ({} oversized)",
            bounds.len(),
            buckets.dims,
            buckets.edge,
            buckets.overflow.len()
        );

        let mut values = vec![0.0; 3 * n];
        let mut unresolved = 0;
        for i in 0..n {
            let voxel = unflatten(shape, i);
            let x = Vector3::new(voxel[0] as f64, voxel[1] as f64, voxel[2] as f64);
            let q = x.component_mul(&s);
            match self.locate(&q, &sites, &bounds, &buckets, shape, cell_shape) {
                Some(preimage) => {
                    let g = preimage - x;
                    values[3 * i..3 * i + 3].copy_from_slice(g.as_slice());
                }
                None => unresolved += 1,
            }
        }

        SimplicialInverse { values, unresolved }
    }

    /// Voxel position whose forward image is `q`, interpolated over the
    /// enclosing tetrahedron.
    fn locate(
        &self,
        q: &Vector3<f64>,
        sites: &[Vector3<f64>],
        bounds: &[Aabb],
        buckets: &BucketGrid,
        shape: [usize; 3],
        cell_shape: [usize; 3],
    ) -> Option<Vector3<f64>> {
        let tol = self.barycentric_tolerance;
        for &cell in buckets.candidates(q) {
            if !bounds[cell].contains(q) {
                continue;
            }
            let origin = unflatten(cell_shape, cell);
            for path in KUHN_PATHS {
                let mut offset = [0usize; 3];
                let mut corners = [origin; 4];
                for (step, &axis) in path.iter().enumerate() {
                    offset[axis] = 1;
                    corners[step + 1] = corner_of(origin, offset);
                }
                let vertices = corners.map(|c| &sites[flat_index(shape, c[0], c[1], c[2])]);
                let Some(lambda) = barycentric(vertices, q) else {
                    continue;
                };
                if lambda.iter().all(|&l| l >= -tol) {
                    let mut preimage = Vector3::zeros();
                    for (l, c) in lambda.iter().zip(corners.iter()) {
                        preimage += Vector3::new(c[0] as f64, c[1] as f64, c[2] as f64) * *l;
                    }
                    return Some(preimage);
                }
            }
        }
        None
    }
}

fn for_each_bucket<F: FnMut(usize)>(dims: [usize; 3], lo: [usize; 3], hi: [usize; 3], mut f: F) {
    for i in lo[0]..=hi[0] {
        for j in lo[1]..=hi[1] {
            for k in lo[2]..=hi[2] {
                f(flat_index(dims, i, j, k));
            }
        }
    }
}

fn unflatten(shape: [usize; 3], index: usize) -> [usize; 3] {
    let z = index % shape[2];
    let y = (index / shape[2]) % shape[1];
    let x = index / (shape[1] * shape[2]);
    [x, y, z]
}

fn corner_of(origin: [usize; 3], offset: [usize; 3]) -> [usize; 3] {
    [origin[0] + offset[0], origin[1] + offset[1], origin[2] + offset[2]]
}
