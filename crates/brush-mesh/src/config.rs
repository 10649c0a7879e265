//! Tolerances used while polygonizing brushes.

/// Minimum cross-product magnitude for three points to define a plane.
pub const COLLINEAR_EPSILON: f32 = 1e-6;

/// Minimum `|n_a · (n_b × n_c)|` for three planes to meet in a single point.
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Tolerance of the inside test for candidate face vertices.
///
/// Map coordinates are usually integer-like level units, so this absorbs the
/// error of a triple-plane intersection on shared edges. It was tuned
/// empirically rather than derived from an error bound.
pub const INSIDE_EPSILON: f32 = 0.01;

/// Distance under which consecutive polygon vertices are merged before triangulation.
pub const WELD_EPSILON: f32 = 1e-3;

/// Tolerances for plane construction, face extraction and triangulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonizeConfig {
    /// Points whose cross product is shorter than this are collinear.
    pub collinear_epsilon: f32,
    /// Plane triplets with a smaller determinant have no unique vertex.
    pub parallel_epsilon: f32,
    /// Candidates at most this far outside a bounding plane are still accepted.
    pub inside_epsilon: f32,
    /// Merge distance for duplicate vertices, `None` keeps every vertex.
    pub weld_epsilon: Option<f32>,
}

impl Default for PolygonizeConfig {
    fn default() -> Self {
        Self {
            collinear_epsilon: COLLINEAR_EPSILON,
            parallel_epsilon: PARALLEL_EPSILON,
            inside_epsilon: INSIDE_EPSILON,
            weld_epsilon: Some(WELD_EPSILON),
        }
    }
}

impl PolygonizeConfig {
    /// Creates a configuration with the default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tolerance of the inside test.
    pub fn with_inside_epsilon(mut self, epsilon: f32) -> Self {
        self.inside_epsilon = epsilon;
        self
    }

    /// Sets the collinearity and parallel-plane tolerances.
    pub fn with_degeneracy_epsilon(mut self, collinear: f32, parallel: f32) -> Self {
        self.collinear_epsilon = collinear;
        self.parallel_epsilon = parallel;
        self
    }

    /// Sets the weld distance (`None` disables welding).
    pub fn with_weld_epsilon(mut self, epsilon: Option<f32>) -> Self {
        self.weld_epsilon = epsilon;
        self
    }
}
