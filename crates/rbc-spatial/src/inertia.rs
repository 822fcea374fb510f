//! Spatial inertia: the 6×6 generalized mass operator.

use nalgebra::{Cholesky, Isometry3, Matrix3, Matrix6, Rotation3, U3, Vector3};
use std::fmt;
use std::str::FromStr;

use crate::{skew, SpatialError, Twist, Wrench};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tolerance for structural checks when reading a 6×6 matrix form.
const STRUCTURE_TOL: f64 = 1e-8;

/// The linear operator mapping spatial acceleration to spatial force.
///
/// Stored in the canonical compact form (mass, center-of-mass offset, and
/// the symmetric rotational inertia tensor about the center of mass) and
/// convertible to/from the expanded 6×6 matrix used for direct algebraic
/// composition.
///
/// Inverse application caches a Cholesky factor of the rotational block; the
/// factor is computed on first use and invalidated by every mutating
/// operation, so inverse-heavy callers pay the factorization once.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialInertia {
    mass: f64,
    com: Vector3<f64>,
    /// Rotational inertia about the center of mass.
    rot: Matrix3<f64>,
    #[cfg_attr(feature = "serde", serde(skip))]
    chol: Option<Cholesky<f64, U3>>,
}

impl PartialEq for SpatialInertia {
    fn eq(&self, other: &Self) -> bool {
        self.mass == other.mass && self.com == other.com && self.rot == other.rot
    }
}

impl Default for SpatialInertia {
    fn default() -> Self {
        Self::zero()
    }
}

impl SpatialInertia {
    /// The zero inertia.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            mass: 0.0,
            com: Vector3::zeros(),
            rot: Matrix3::zeros(),
            chol: None,
        }
    }

    /// Create from mass, center of mass, and rotational inertia about the
    /// center of mass. The tensor is symmetrized.
    #[must_use]
    pub fn new(mass: f64, com: Vector3<f64>, rot: Matrix3<f64>) -> Self {
        Self {
            mass,
            com,
            rot: 0.5 * (rot + rot.transpose()),
            chol: None,
        }
    }

    /// Inertia of a solid sphere of given mass and radius, centered at the
    /// origin.
    #[must_use]
    pub fn sphere(mass: f64, radius: f64) -> Self {
        let j = 0.4 * mass * radius * radius;
        Self::new(mass, Vector3::zeros(), Matrix3::from_diagonal_element(j))
    }

    /// Inertia of a solid axis-aligned box with the given side widths,
    /// centered at the origin.
    #[must_use]
    pub fn box_shape(mass: f64, wx: f64, wy: f64, wz: f64) -> Self {
        let k = mass / 12.0;
        Self::new(
            mass,
            Vector3::zeros(),
            Matrix3::from_diagonal(&Vector3::new(
                k * (wy * wy + wz * wz),
                k * (wx * wx + wz * wz),
                k * (wx * wx + wy * wy),
            )),
        )
    }

    /// Inertia of a solid cylinder with axis along z, centered at the origin.
    #[must_use]
    pub fn cylinder(mass: f64, radius: f64, height: f64) -> Self {
        let jt = mass * (3.0 * radius * radius + height * height) / 12.0;
        let ja = 0.5 * mass * radius * radius;
        Self::new(
            mass,
            Vector3::zeros(),
            Matrix3::from_diagonal(&Vector3::new(jt, jt, ja)),
        )
    }

    /// Inertia of a solid ellipsoid with semi-axes (a, b, c), centered at the
    /// origin.
    #[must_use]
    pub fn ellipsoid(mass: f64, a: f64, b: f64, c: f64) -> Self {
        let k = mass / 5.0;
        Self::new(
            mass,
            Vector3::zeros(),
            Matrix3::from_diagonal(&Vector3::new(
                k * (b * b + c * c),
                k * (a * a + c * c),
                k * (a * a + b * b),
            )),
        )
    }

    /// Body mass.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Center-of-mass offset from the reference frame origin.
    #[must_use]
    pub fn com(&self) -> Vector3<f64> {
        self.com
    }

    /// Rotational inertia tensor about the center of mass.
    #[must_use]
    pub fn rotational_inertia(&self) -> Matrix3<f64> {
        self.rot
    }

    /// Set mass, center of mass, and rotational inertia in one call,
    /// invalidating the cached factor.
    pub fn set(&mut self, mass: f64, com: Vector3<f64>, rot: Matrix3<f64>) {
        self.mass = mass;
        self.com = com;
        self.rot = 0.5 * (rot + rot.transpose());
        self.chol = None;
    }

    /// Accumulate a point mass at `p`.
    pub fn add_point_mass(&mut self, mass: f64, p: Vector3<f64>) {
        self.accumulate(mass, p, Matrix3::zeros());
    }

    /// Accumulate a thin uniform rod between `p0` and `p1`.
    pub fn add_line_segment(&mut self, mass: f64, p0: Vector3<f64>, p1: Vector3<f64>) {
        let d = p1 - p0;
        let com = 0.5 * (p0 + p1);
        // Rod about its midpoint: (m/12)(|d|² I − d dᵀ).
        let j = (mass / 12.0) * (d.norm_squared() * Matrix3::identity() - d * d.transpose());
        self.accumulate(mass, com, j);
    }

    /// Accumulate a uniform triangular lamina with vertices `a`, `b`, `c`.
    ///
    /// Uses the exact second-moment integral
    /// `∫ p pᵀ dm = (m/12)(a aᵀ + b bᵀ + c cᵀ + s sᵀ)` with `s = a + b + c`.
    pub fn add_triangle(&mut self, mass: f64, a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) {
        let s = a + b + c;
        let com = s / 3.0;
        let second = (mass / 12.0)
            * (a * a.transpose() + b * b.transpose() + c * c.transpose() + s * s.transpose());
        // Shift the second moment to the centroid, then convert to a tensor.
        let centered = second - mass * com * com.transpose();
        let j = centered.trace() * Matrix3::identity() - centered;
        self.accumulate(mass, com, j);
    }

    /// Combine another body into this one: masses add, the center of mass is
    /// the mass-weighted mean, and both tensors are shifted to the combined
    /// center by the parallel-axis rule.
    pub fn add(&mut self, other: &SpatialInertia) {
        self.accumulate(other.mass, other.com, other.rot);
    }

    /// Remove a previously combined body. The caller is responsible for the
    /// difference remaining physically meaningful.
    pub fn sub(&mut self, other: &SpatialInertia) {
        self.accumulate(-other.mass, other.com, -other.rot);
    }

    /// Scale mass and rotational inertia by `s` (center of mass unchanged).
    pub fn scale(&mut self, s: f64) {
        self.mass *= s;
        self.rot *= s;
        self.chol = None;
    }

    fn accumulate(&mut self, mass: f64, com: Vector3<f64>, rot_about_com: Matrix3<f64>) {
        let total = self.mass + mass;
        let new_com = if total.abs() > 0.0 {
            (self.mass * self.com + mass * com) / total
        } else {
            self.com
        };
        let shift = |m: f64, c: Vector3<f64>| {
            let d = c - new_com;
            m * (d.norm_squared() * Matrix3::identity() - d * d.transpose())
        };
        self.rot = self.rot + shift(self.mass, self.com) + rot_about_com + shift(mass, com);
        self.mass = total;
        self.com = new_com;
        self.chol = None;
    }

    /// Rotate into a new frame: congruence transform of the tensor, rotation
    /// of the center of mass.
    pub fn rotate(&mut self, r: &Rotation3<f64>) {
        let rm = r.matrix();
        self.rot = rm * self.rot * rm.transpose();
        self.com = r * self.com;
        self.chol = None;
    }

    /// Transform into a new frame by a full rigid transform. The tensor about
    /// the center of mass sees only the rotation; the center of mass moves
    /// with the transform.
    pub fn transform(&mut self, x: &Isometry3<f64>) {
        let rm = x.rotation.to_rotation_matrix();
        let rmm = rm.matrix();
        self.rot = rmm * self.rot * rmm.transpose();
        self.com = x.rotation * self.com + x.translation.vector;
        self.chol = None;
    }

    /// Forward multiply: map a spatial acceleration (as a [`Twist`]) to a
    /// spatial force, with the moment taken about the frame origin.
    #[must_use]
    pub fn mul(&self, acc: &Twist) -> Wrench {
        let f = self.mass * (acc.v + acc.w.cross(&self.com));
        let m = self.rot * acc.w + self.com.cross(&f);
        Wrench::new(m, f)
    }

    /// Inverse multiply: map a spatial force back to the spatial acceleration
    /// producing it.
    ///
    /// Fails with [`SpatialError::NotPositiveDefinite`] if the rotational
    /// inertia cannot be Cholesky-factored, or [`SpatialError::ZeroMass`] for
    /// a massless body; a wrong inverse mass would corrupt the dynamics
    /// step, so neither is approximated.
    pub fn mul_inverse(&mut self, wr: &Wrench) -> crate::Result<Twist> {
        if self.mass <= 0.0 {
            return Err(SpatialError::ZeroMass);
        }
        if self.chol.is_none() {
            self.chol = Cholesky::new(self.rot);
        }
        let Some(chol) = self.chol.as_ref() else {
            return Err(SpatialError::NotPositiveDefinite);
        };
        let m_com = wr.m - self.com.cross(&wr.f);
        let w = chol.solve(&m_com);
        let v = wr.f / self.mass - w.cross(&self.com);
        Ok(Twist::new(v, w))
    }

    /// Coriolis (bias) force for a velocity expressed in a frame fixed to the
    /// body: `vel ×* (M vel)`.
    #[must_use]
    pub fn coriolis_force(&self, vel: &Twist) -> Wrench {
        let p_lin = self.mass * (vel.v + vel.w.cross(&self.com));
        let h = self.rot * vel.w + self.com.cross(&p_lin);
        Wrench::new(
            vel.w.cross(&h) + vel.v.cross(&p_lin),
            vel.w.cross(&p_lin),
        )
    }

    /// Coriolis (bias) force for a velocity expressed in a frame
    /// instantaneously coincident with, but not rotating with, the body.
    ///
    /// Only the centripetal terms survive: `f = m ω × (ω × c)`,
    /// `m = ω × (J ω) + c × f`.
    #[must_use]
    pub fn fixed_frame_coriolis_force(&self, vel: &Twist) -> Wrench {
        let f = self.mass * vel.w.cross(&vel.w.cross(&self.com));
        let m = vel.w.cross(&(self.rot * vel.w)) + self.com.cross(&f);
        Wrench::new(m, f)
    }

    /// Expand to the 6×6 matrix form, angular rows/columns first:
    ///
    /// ```text
    /// [ J_o      m·skew(c) ]
    /// [ m·skew(c)ᵀ  m·I    ]
    /// ```
    ///
    /// with `J_o` the tensor shifted to the frame origin.
    #[must_use]
    pub fn to_matrix(&self) -> Matrix6<f64> {
        let mut out = Matrix6::zeros();
        let d = self.com;
        let j_o =
            self.rot + self.mass * (d.norm_squared() * Matrix3::identity() - d * d.transpose());
        let coupling = self.mass * skew(&d);
        out.fixed_view_mut::<3, 3>(0, 0).copy_from(&j_o);
        out.fixed_view_mut::<3, 3>(0, 3).copy_from(&coupling);
        out.fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&coupling.transpose());
        out.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(self.mass * Matrix3::identity()));
        out
    }

    /// Rebuild the compact form from a 6×6 matrix, validating that the matrix
    /// has spatial-inertia structure.
    pub fn from_matrix(m: &Matrix6<f64>) -> crate::Result<Self> {
        let scale = m.amax().max(1.0);
        let tol = STRUCTURE_TOL * scale;

        let mass = m[(3, 3)];
        if (m[(4, 4)] - mass).abs() > tol || (m[(5, 5)] - mass).abs() > tol {
            return Err(SpatialError::Structure {
                reason: "mass block diagonal is not uniform".into(),
            });
        }
        for i in 3..6 {
            for j in 3..6 {
                if i != j && m[(i, j)].abs() > tol {
                    return Err(SpatialError::Structure {
                        reason: "mass block has off-diagonal entries".into(),
                    });
                }
            }
        }
        let coupling = m.fixed_view::<3, 3>(0, 3).into_owned();
        if (coupling + coupling.transpose()).amax() > tol {
            return Err(SpatialError::Structure {
                reason: "coupling block is not skew-symmetric".into(),
            });
        }
        let lower = m.fixed_view::<3, 3>(3, 0).into_owned();
        if (lower - coupling.transpose()).amax() > tol {
            return Err(SpatialError::Structure {
                reason: "coupling blocks are not transposes".into(),
            });
        }
        let j_o = m.fixed_view::<3, 3>(0, 0).into_owned();
        if (j_o - j_o.transpose()).amax() > tol {
            return Err(SpatialError::Structure {
                reason: "rotational block is not symmetric".into(),
            });
        }

        let com = if mass.abs() > 0.0 {
            Vector3::new(coupling[(2, 1)], coupling[(0, 2)], coupling[(1, 0)]) / mass
        } else {
            Vector3::zeros()
        };
        let rot =
            j_o - mass * (com.norm_squared() * Matrix3::identity() - com * com.transpose());
        Ok(Self::new(mass, com, rot))
    }

    /// Write the full 36-value row-major 6×6 text form.
    #[must_use]
    pub fn to_matrix_string(&self) -> String {
        let m = self.to_matrix();
        let mut s = String::from("[");
        for i in 0..6 {
            s.push_str("\n ");
            for j in 0..6 {
                s.push_str(&format!(" {}", m[(i, j)]));
            }
        }
        s.push_str("\n]");
        s
    }
}

impl fmt::Display for SpatialInertia {
    /// The 13-value form: mass, center of mass, and the full row-major
    /// rotational inertia about the center of mass.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {} {} {} {}", self.mass, self.com.x, self.com.y, self.com.z)?;
        for i in 0..3 {
            for j in 0..3 {
                write!(f, " {}", self.rot[(i, j)])?;
            }
        }
        write!(f, " ]")
    }
}

impl FromStr for SpatialInertia {
    type Err = SpatialError;

    /// Parse either text form by value count: 13 values (mass, center of
    /// mass, row-major rotational inertia) or 36 values (row-major 6×6,
    /// structure-checked). Any other count is an error.
    fn from_str(s: &str) -> crate::Result<Self> {
        let cleaned = s.replace(['[', ']', ','], " ");
        let mut values = Vec::new();
        for tok in cleaned.split_whitespace() {
            let v: f64 = tok.parse().map_err(|_| SpatialError::Parse {
                reason: format!("bad number {tok:?}"),
            })?;
            values.push(v);
        }
        match values.len() {
            13 => {
                let rot = Matrix3::from_row_slice(&values[4..13]);
                if (rot - rot.transpose()).amax() > STRUCTURE_TOL * rot.amax().max(1.0) {
                    return Err(SpatialError::Structure {
                        reason: "rotational inertia is not symmetric".into(),
                    });
                }
                Ok(Self::new(
                    values[0],
                    Vector3::new(values[1], values[2], values[3]),
                    rot,
                ))
            }
            36 => Self::from_matrix(&Matrix6::from_row_slice(&values)),
            count => Err(SpatialError::ParseCount { count }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_spd_inertia(rng: &mut StdRng) -> SpatialInertia {
        // A composite of point masses is always physically valid.
        let mut si = SpatialInertia::sphere(rng.gen_range(0.5..3.0), rng.gen_range(0.2..1.5));
        for _ in 0..4 {
            si.add_point_mass(
                rng.gen_range(0.1..2.0),
                Vector3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                ),
            );
        }
        si
    }

    #[test]
    fn test_sphere_matrix_round_trip() {
        let si = SpatialInertia::sphere(2.0, 0.5);
        let back = SpatialInertia::from_matrix(&si.to_matrix()).unwrap();
        assert_relative_eq!(back.mass(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(back.rotational_inertia(), si.rotational_inertia(), epsilon = 1e-12);
    }

    #[test]
    fn test_offset_matrix_round_trip() {
        let mut si = SpatialInertia::box_shape(3.0, 0.2, 0.4, 0.8);
        si.transform(&Isometry3::translation(0.3, -0.1, 0.9));
        let back = SpatialInertia::from_matrix(&si.to_matrix()).unwrap();
        assert_relative_eq!(back.com(), si.com(), epsilon = 1e-12);
        assert_relative_eq!(back.rotational_inertia(), si.rotational_inertia(), epsilon = 1e-10);
    }

    #[test]
    fn test_text_round_trip_13() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let si = random_spd_inertia(&mut rng);
            let back: SpatialInertia = si.to_string().parse().unwrap();
            assert_relative_eq!(back.mass(), si.mass(), max_relative = 1e-12);
            assert_relative_eq!(back.com(), si.com(), epsilon = 1e-12);
            assert_relative_eq!(back.rotational_inertia(), si.rotational_inertia(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_text_round_trip_36() {
        let mut rng = StdRng::seed_from_u64(8);
        let si = random_spd_inertia(&mut rng);
        let back: SpatialInertia = si.to_matrix_string().parse().unwrap();
        assert_relative_eq!(back.mass(), si.mass(), max_relative = 1e-10);
        assert_relative_eq!(back.com(), si.com(), epsilon = 1e-10);
        assert_relative_eq!(back.rotational_inertia(), si.rotational_inertia(), epsilon = 1e-8);
    }

    #[test]
    fn test_bad_value_count_rejected() {
        let err = "[ 1 2 3 ]".parse::<SpatialInertia>().unwrap_err();
        assert_eq!(err, SpatialError::ParseCount { count: 3 });
    }

    #[test]
    fn test_mul_inverse_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let mut si = random_spd_inertia(&mut rng);
            let tw = Twist::new(
                Vector3::new(
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                ),
                Vector3::new(
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                    rng.gen_range(-2.0..2.0),
                ),
            );
            let wr = si.mul(&tw);
            let back = si.mul_inverse(&wr).unwrap();
            assert_relative_eq!(back.v, tw.v, epsilon = 1e-9);
            assert_relative_eq!(back.w, tw.w, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_mul_matches_matrix_form() {
        let mut rng = StdRng::seed_from_u64(3);
        let si = random_spd_inertia(&mut rng);
        let tw = Twist::new(Vector3::new(0.3, -0.8, 0.2), Vector3::new(1.0, 0.4, -0.6));
        let wr = si.mul(&tw);
        // Matrix form is angular-first: [w; v] -> [m; f].
        let m6 = si.to_matrix();
        let mut x = nalgebra::Vector6::zeros();
        x.fixed_rows_mut::<3>(0).copy_from(&tw.w);
        x.fixed_rows_mut::<3>(3).copy_from(&tw.v);
        let y = m6 * x;
        assert_relative_eq!(wr.m, y.fixed_rows::<3>(0).into_owned(), epsilon = 1e-10);
        assert_relative_eq!(wr.f, y.fixed_rows::<3>(3).into_owned(), epsilon = 1e-10);
    }

    #[test]
    fn test_non_spd_inversion_fails() {
        let mut si = SpatialInertia::new(
            1.0,
            Vector3::zeros(),
            Matrix3::from_diagonal(&Vector3::new(1.0, -1.0, 1.0)),
        );
        let wr = Wrench::from_moment(Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(si.mul_inverse(&wr), Err(SpatialError::NotPositiveDefinite));

        let mut zero = SpatialInertia::zero();
        assert_eq!(zero.mul_inverse(&wr), Err(SpatialError::ZeroMass));
    }

    #[test]
    fn test_add_two_point_masses() {
        let mut si = SpatialInertia::zero();
        si.add_point_mass(1.0, Vector3::new(1.0, 0.0, 0.0));
        si.add_point_mass(1.0, Vector3::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(si.mass(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(si.com(), Vector3::zeros(), epsilon = 1e-12);
        // Two unit masses at ±x: Jyy = Jzz = 2, Jxx = 0.
        let j = si.rotational_inertia();
        assert_relative_eq!(j[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(j[(1, 1)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(j[(2, 2)], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_line_segment_matches_rod() {
        let mut si = SpatialInertia::zero();
        si.add_line_segment(
            3.0,
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 0.0, 1.0),
        );
        // Rod of length 2 along z: Jxx = Jyy = m L²/12 = 1, Jzz = 0.
        let j = si.rotational_inertia();
        assert_relative_eq!(j[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(j[(1, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(j[(2, 2)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_triangle_moments_against_point_refinement() {
        // Compare the closed-form triangle integral against a dense uniform
        // point sampling of the same lamina.
        let (a, b, c) = (
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 2.0, 0.5),
        );
        let mass = 2.0;
        let mut exact = SpatialInertia::zero();
        exact.add_triangle(mass, a, b, c);

        // Tile the parameter triangle with n² congruent sub-triangles and put
        // a point mass at each centroid, an exactly uniform refinement.
        let n = 128;
        let mut sampled = SpatialInertia::zero();
        let dm = mass / (n * n) as f64;
        for i in 0..n {
            for j in 0..(n - i) {
                let u = (i as f64 + 1.0 / 3.0) / n as f64;
                let v = (j as f64 + 1.0 / 3.0) / n as f64;
                sampled.add_point_mass(dm, a + u * (b - a) + v * (c - a));
                if i + j < n - 1 {
                    let u2 = (i as f64 + 2.0 / 3.0) / n as f64;
                    let v2 = (j as f64 + 2.0 / 3.0) / n as f64;
                    sampled.add_point_mass(dm, a + u2 * (b - a) + v2 * (c - a));
                }
            }
        }
        assert_relative_eq!(exact.com(), sampled.com(), epsilon = 1e-2);
        assert_relative_eq!(
            exact.rotational_inertia(),
            sampled.rotational_inertia(),
            epsilon = 2e-2
        );
    }

    #[test]
    fn test_coriolis_conventions_agree_for_centered_body() {
        // With the COM at the origin and zero linear velocity the two
        // conventions coincide: both reduce to ω × (J ω).
        let si = SpatialInertia::box_shape(2.0, 0.3, 0.5, 0.9);
        let vel = Twist::new(Vector3::zeros(), Vector3::new(0.7, -0.2, 1.1));
        let body = si.coriolis_force(&vel);
        let fixed = si.fixed_frame_coriolis_force(&vel);
        assert_relative_eq!(body.m, fixed.m, epsilon = 1e-12);
        assert_relative_eq!(body.f, fixed.f, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_preserves_mass_and_spectrum() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut si = random_spd_inertia(&mut rng);
        let before = si.rotational_inertia().symmetric_eigenvalues();
        si.transform(&Isometry3::from_parts(
            nalgebra::Translation3::new(0.4, 0.1, -0.2),
            nalgebra::UnitQuaternion::from_scaled_axis(Vector3::new(0.2, 0.8, -0.3)),
        ));
        let mut after = si.rotational_inertia().symmetric_eigenvalues();
        let mut b = before;
        let bs = b.as_mut_slice();
        bs.sort_by(|x, y| x.partial_cmp(y).unwrap());
        let asl = after.as_mut_slice();
        asl.sort_by(|x, y| x.partial_cmp(y).unwrap());
        for i in 0..3 {
            assert_relative_eq!(bs[i], asl[i], epsilon = 1e-10);
        }
    }
}
