//! Planar neighbour resolution.
//!
//! The classifier asks which boreholes are adjacent to a query point, passing
//! every borehole position followed by the query position. `DelaunayNeighbors`
//! answers with natural neighbours: boreholes whose Voronoi cell touches the
//! query point's cell, i.e. the query's Delaunay edges. Layouts that cannot be
//! triangulated fall back to the nearest boreholes.

use std::collections::HashMap;

use crate::borehole::PlanarPoint;
use crate::config::ClassifierConfig;

/// Resolves the neighbours of `points[query_index]` among the other points.
///
/// Returned indices refer to `points`, never include `query_index`, and come
/// in a deterministic order: the classifier's first-contribution tie-break
/// follows it.
pub trait NeighborResolver: Sync {
    fn neighbors(&self, points: &[PlanarPoint], query_index: usize) -> Vec<usize>;
}

/// The `k` closest points, nearest first (ties by index).
#[derive(Debug, Clone, Copy)]
pub struct NearestNeighbors {
    pub k: usize,
}

impl NearestNeighbors {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl NeighborResolver for NearestNeighbors {
    fn neighbors(&self, points: &[PlanarPoint], query_index: usize) -> Vec<usize> {
        let Some(&q) = points.get(query_index) else {
            return Vec::new();
        };
        let mut order: Vec<(f64, usize)> = points
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != query_index)
            .map(|(i, p)| (p.distance_sq(q), i))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        order.into_iter().take(self.k).map(|(_, i)| i).collect()
    }
}

/// Natural neighbours from a Bowyer–Watson Delaunay triangulation.
///
/// Fallbacks, in order:
/// - points within `coincidence_tolerance` of the query are its only neighbours;
/// - fewer than three other points, or all points collinear: `fallback`;
/// - an empty neighbour set: `fallback`.
///
/// Coincident boreholes are triangulated once; if that vertex is a neighbour,
/// all of its duplicates are too.
#[derive(Debug, Clone, Copy)]
pub struct DelaunayNeighbors {
    pub fallback: NearestNeighbors,
    pub coincidence_tolerance: f64,
}

impl DelaunayNeighbors {
    pub fn new(fallback_k: usize, coincidence_tolerance: f64) -> Self {
        Self { fallback: NearestNeighbors::new(fallback_k), coincidence_tolerance }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.fallback_neighbors, config.coincidence_tolerance)
    }
}

impl Default for DelaunayNeighbors {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl NeighborResolver for DelaunayNeighbors {
    fn neighbors(&self, points: &[PlanarPoint], query_index: usize) -> Vec<usize> {
        let Some(&q) = points.get(query_index) else {
            return Vec::new();
        };
        let tol_sq = self.coincidence_tolerance * self.coincidence_tolerance;

        let coincident: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|&(i, p)| i != query_index && p.distance_sq(q) <= tol_sq)
            .map(|(i, _)| i)
            .collect();
        if !coincident.is_empty() {
            return coincident;
        }

        // Map every point onto the first point it coincides with.
        let mut representative: Vec<usize> = Vec::with_capacity(points.len());
        let mut unique: Vec<usize> = Vec::new();
        for (i, p) in points.iter().enumerate() {
            match unique.iter().find(|&&u| points[u].distance_sq(*p) <= tol_sq) {
                Some(&u) => representative.push(u),
                None => {
                    unique.push(i);
                    representative.push(i);
                }
            }
        }

        if unique.len() < 4 || all_collinear(points, &unique) {
            tracing::debug!(points = unique.len(), "degenerate layout, using nearest neighbours");
            return self.fallback.neighbors(points, query_index);
        }

        let mut adjacent = delaunay_adjacent(points, &unique, query_index);
        // The super triangle can swallow hull edges; test the rest directly.
        for &v in &unique {
            if v != query_index && !adjacent.contains(&v) && shares_empty_circle(points, &unique, query_index, v) {
                adjacent.push(v);
            }
        }
        let found: Vec<usize> = (0..points.len())
            .filter(|&i| i != query_index && adjacent.contains(&representative[i]))
            .collect();

        if found.is_empty() {
            return self.fallback.neighbors(points, query_index);
        }
        found
    }
}

fn all_collinear(points: &[PlanarPoint], subset: &[usize]) -> bool {
    let Some(&first) = subset.first() else {
        return true;
    };
    let p0 = points[first];
    let Some(far) = subset
        .iter()
        .map(|&i| points[i])
        .max_by(|a, b| a.distance_sq(p0).total_cmp(&b.distance_sq(p0)))
    else {
        return true;
    };
    let (ux, uy) = (far.x - p0.x, far.y - p0.y);
    let scale = ux * ux + uy * uy;
    if scale == 0.0 {
        return true;
    }
    subset.iter().all(|&i| {
        let p = points[i];
        let cross = ux * (p.y - p0.y) - uy * (p.x - p0.x);
        cross.abs() <= 1e-10 * scale
    })
}

#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [usize; 3],
    cx: f64,
    cy: f64,
    r2: f64,
}

impl Triangle {
    fn new(v: [usize; 3], pts: &[PlanarPoint]) -> Self {
        let (a, b, c) = (pts[v[0]], pts[v[1]], pts[v[2]]);
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        if d.abs() < f64::EPSILON {
            // Flat triangle: any later point removes it.
            return Self { v, cx: a.x, cy: a.y, r2: f64::INFINITY };
        }
        let a2 = a.x * a.x + a.y * a.y;
        let b2 = b.x * b.x + b.y * b.y;
        let c2 = c.x * c.x + c.y * c.y;
        let cx = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
        let cy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
        let r2 = (a.x - cx).powi(2) + (a.y - cy).powi(2);
        Self { v, cx, cy, r2 }
    }

    #[inline]
    fn circumcircle_contains(&self, p: PlanarPoint) -> bool {
        (p.x - self.cx).powi(2) + (p.y - self.cy).powi(2) < self.r2
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.v;
        [edge(a, b), edge(b, c), edge(c, a)]
    }
}

#[inline]
fn edge(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Triangulate `subset` of `points` and return the vertices sharing a
/// triangle with `query`, which must be in `subset`.
fn delaunay_adjacent(points: &[PlanarPoint], subset: &[usize], query: usize) -> Vec<usize> {
    let n = points.len();
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &i in subset {
        min_x = min_x.min(points[i].x);
        min_y = min_y.min(points[i].y);
        max_x = max_x.max(points[i].x);
        max_y = max_y.max(points[i].y);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1.0);
    let (mid_x, mid_y) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

    // Work around the centre of the layout; survey coordinates are large.
    // Super triangle vertices live past the end of the caller's points.
    let mut pts: Vec<PlanarPoint> = points.iter().map(|p| PlanarPoint::new(p.x - mid_x, p.y - mid_y)).collect();
    pts.push(PlanarPoint::new(-50.0 * span, -50.0 * span));
    pts.push(PlanarPoint::new(0.0, 50.0 * span));
    pts.push(PlanarPoint::new(50.0 * span, -50.0 * span));

    let mut triangles = vec![Triangle::new([n, n + 1, n + 2], &pts)];

    for &i in subset {
        let p = pts[i];
        let (bad, keep): (Vec<Triangle>, Vec<Triangle>) =
            triangles.into_iter().partition(|t| t.circumcircle_contains(p));

        let mut edge_count: HashMap<(usize, usize), u32> = HashMap::new();
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for t in &bad {
            for e in t.edges() {
                let count = edge_count.entry(e).or_insert(0);
                if *count == 0 {
                    boundary.push(e);
                }
                *count += 1;
            }
        }

        triangles = keep;
        for (a, b) in boundary {
            if edge_count[&(a, b)] == 1 {
                triangles.push(Triangle::new([a, b, i], &pts));
            }
        }
    }

    let mut adjacent: Vec<usize> = triangles
        .iter()
        .filter(|t| t.v.contains(&query))
        .flat_map(|t| t.v)
        .filter(|&v| v != query && v < n)
        .collect();
    adjacent.sort_unstable();
    adjacent.dedup();
    adjacent
}

/// Whether some circle through `points[q]` and `points[v]` has no other point
/// of `subset` strictly inside it. A half-plane counts as a circle, so hull
/// edges qualify. Circles that only exist at a single tangent position (four
/// or more cocircular points) do not.
fn shares_empty_circle(points: &[PlanarPoint], subset: &[usize], q: usize, v: usize) -> bool {
    let origin = points[q];
    let (vx, vy) = (points[v].x - origin.x, points[v].y - origin.y);
    // Centres run along the bisector of qv: c(t) = v/2 + t·n, n ⟂ v.
    let (nx, ny) = (-vy, vx);
    let (mut lo, mut hi) = (f64::NEG_INFINITY, f64::INFINITY);
    for &i in subset {
        if i == q || i == v {
            continue;
        }
        let (px, py) = (points[i].x - origin.x, points[i].y - origin.y);
        // p lies inside the circle centred at c(t) exactly when a·t < b.
        let a = -2.0 * (nx * px + ny * py);
        let b = vx * px + vy * py - (px * px + py * py);
        if a > 0.0 {
            lo = lo.max(b / a);
        } else if a < 0.0 {
            hi = hi.min(b / a);
        } else if b > 0.0 {
            // p sits on the segment qv.
            return false;
        }
        if lo >= hi {
            return false;
        }
    }
    if lo.is_infinite() || hi.is_infinite() {
        return true;
    }
    hi - lo > 1e-9 * (1.0 + lo.abs().max(hi.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<PlanarPoint> {
        coords.iter().map(|&(x, y)| PlanarPoint::new(x, y)).collect()
    }

    #[test]
    fn nearest_orders_by_distance() {
        let p = pts(&[(10.0, 0.0), (1.0, 0.0), (5.0, 0.0), (0.0, 0.0)]);
        assert_eq!(NearestNeighbors::new(2).neighbors(&p, 3), vec![1, 2]);
        assert_eq!(NearestNeighbors::new(10).neighbors(&p, 3), vec![1, 2, 0]);
    }

    #[test]
    fn square_centre_touches_all_corners() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0), (5.0, 5.0)]);
        assert_eq!(DelaunayNeighbors::default().neighbors(&p, 4), vec![0, 1, 2, 3]);
    }

    #[test]
    fn distant_borehole_is_not_a_natural_neighbour() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (100.0, 100.0), (2.0, 2.0)]);
        assert_eq!(DelaunayNeighbors::default().neighbors(&p, 4), vec![0, 1, 2]);
    }

    #[test]
    fn triangle_interior_sees_all_three_vertices() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (3.0, 3.0)]);
        assert_eq!(DelaunayNeighbors::default().neighbors(&p, 3), vec![0, 1, 2]);
    }

    #[test]
    fn grid_interior_point_has_local_neighbours_only() {
        let mut coords = Vec::new();
        for r in 0..5 {
            for c in 0..5 {
                coords.push((c as f64 * 10.0 + (r % 2) as f64 * 0.5, r as f64 * 10.0));
            }
        }
        coords.push((21.0, 23.0));
        let p = pts(&coords);
        let found = DelaunayNeighbors::default().neighbors(&p, coords.len() - 1);
        assert!(found.len() >= 3 && found.len() <= 8, "{found:?}");
        for &i in &found {
            assert!(p[i].distance(p[coords.len() - 1]) < 20.0, "{i} is too far");
        }
    }

    /// Delaunay adjacency by definition: q and v share an empty circumcircle
    /// with some third point, or qv is an edge of the convex hull.
    fn brute_force_neighbors(points: &[PlanarPoint], q: usize) -> Vec<usize> {
        let origin = points[q];
        let p: Vec<PlanarPoint> = points.iter().map(|a| PlanarPoint::new(a.x - origin.x, a.y - origin.y)).collect();
        let cross = |a: PlanarPoint, b: PlanarPoint, c: PlanarPoint| (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        (0..p.len())
            .filter(|&v| v != q)
            .filter(|&v| {
                let rest: Vec<usize> = (0..p.len()).filter(|&i| i != q && i != v).collect();
                let sides: Vec<f64> = rest.iter().map(|&i| cross(p[q], p[v], p[i])).collect();
                let hull_edge = sides.iter().all(|&s| s > 0.0) || sides.iter().all(|&s| s < 0.0);
                hull_edge
                    || rest.iter().any(|&w| {
                        let t = Triangle::new([q, v, w], &p);
                        t.r2.is_finite() && rest.iter().all(|&i| i == w || !t.circumcircle_contains(p[i]))
                    })
            })
            .collect()
    }

    fn scattered_layout(seed: u64, offset: (f64, f64)) -> Vec<Vec<PlanarPoint>> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(seed);
        let boreholes: Vec<PlanarPoint> = (0..30)
            .map(|_| PlanarPoint::new(offset.0 + rng.gen_range(0.0..200.0), offset.1 + rng.gen_range(0.0..200.0)))
            .collect();
        (0..200)
            .map(|_| {
                let mut layout = boreholes.clone();
                layout.push(PlanarPoint::new(
                    offset.0 + rng.gen_range(-400.0..600.0),
                    offset.1 + rng.gen_range(-400.0..600.0),
                ));
                layout
            })
            .collect()
    }

    #[test]
    fn queries_outside_the_hull_keep_every_hull_neighbour() {
        let resolver = DelaunayNeighbors::default();
        for offset in [(0.0, 0.0), (500_000.0, 3_400_000.0)] {
            for layout in scattered_layout(17, offset) {
                let q = layout.len() - 1;
                assert_eq!(
                    resolver.neighbors(&layout, q),
                    brute_force_neighbors(&layout, q),
                    "query at {:?}",
                    layout[q]
                );
            }
        }
    }

    #[test]
    fn exterior_query_sees_both_ends_of_the_facing_edge() {
        // Flat, wide layout: the circle through q and either end of the bottom
        // edge is far larger than the layout.
        let p = pts(&[(0.0, 0.0), (100.0, 0.0), (50.0, 1.0), (50.0, 40.0), (50.0, -1000.0)]);
        let found = DelaunayNeighbors::default().neighbors(&p, 4);
        assert_eq!(found, brute_force_neighbors(&p, 4));
        assert!(found.contains(&0) && found.contains(&1), "{found:?}");
    }

    #[test]
    fn too_few_boreholes_fall_back_to_nearest() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (2.0, 1.0)]);
        assert_eq!(DelaunayNeighbors::new(3, 1e-9).neighbors(&p, 2), vec![0, 1]);
    }

    #[test]
    fn collinear_layout_falls_back_to_nearest() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (30.0, 0.0), (12.0, 0.0)]);
        assert_eq!(DelaunayNeighbors::new(2, 1e-9).neighbors(&p, 4), vec![1, 2]);
    }

    #[test]
    fn coincident_query_returns_that_borehole() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 0.0)]);
        assert_eq!(DelaunayNeighbors::default().neighbors(&p, 3), vec![1]);
    }

    #[test]
    fn duplicate_boreholes_are_both_neighbours() {
        let p = pts(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (0.0, 10.0), (3.0, 3.0)]);
        assert_eq!(DelaunayNeighbors::default().neighbors(&p, 4), vec![0, 1, 2, 3]);
    }
}
