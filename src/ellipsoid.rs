//! # Ellipsoidal geometry
//!
//! Conversions between Earth-centred Cartesian coordinates (ECEF, meters) and geodetic
//! longitude/latitude/height on a reference ellipsoid, and the rotation into a
//! station-centred **east-north-up** (ENU) frame.
//!
//! ## Conventions
//! -----------------
//! - Longitudes and latitudes are in **degrees**, longitude east positive in `(-180, 180]`.
//! - Heights are ellipsoidal heights in **meters**.
//! - [`Ellipsoid::enu_axes`] returns a matrix whose **rows** are the east, north and up unit
//!   vectors, so `enu = R · dxyz`.
//!
//! The geodetic latitude uses Bowring's closed form followed by a fixed-point refinement,
//! which is accurate well below a millimetre for terrestrial positions.
use nalgebra::{Matrix3, Vector3};

use crate::constants::{Degree, Meter, GRS80_INVERSE_FLATTENING, GRS80_MAJOR_AXIS};

/// A reference ellipsoid defined by its semi-major axis and inverse flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    a: f64,
    rf: f64,
}

/// The GRS80 ellipsoid.
pub const GRS80: Ellipsoid = Ellipsoid::new(GRS80_MAJOR_AXIS, GRS80_INVERSE_FLATTENING);

impl Ellipsoid {
    /// Build an ellipsoid from its semi-major axis (meters) and inverse flattening.
    pub const fn new(a: f64, rf: f64) -> Self {
        Ellipsoid { a, rf }
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.a
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.a * (1.0 - 1.0 / self.rf)
    }

    pub fn inverse_flattening(&self) -> f64 {
        self.rf
    }

    /// First eccentricity squared.
    pub fn eccentricity_squared(&self) -> f64 {
        let f = 1.0 / self.rf;
        2.0 * f - f * f
    }

    /// Convert geodetic coordinates to Cartesian ECEF.
    ///
    /// Arguments
    /// -----------------
    /// * `lon`, `lat` – Geodetic longitude and latitude in **degrees**.
    /// * `hgt` – Ellipsoidal height in **meters**.
    pub fn xyz(&self, lon: Degree, lat: Degree, hgt: Meter) -> Vector3<f64> {
        let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        // Prime vertical radius of curvature
        let e2 = self.eccentricity_squared();
        let n = self.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        Vector3::new(
            (n + hgt) * cos_lat * cos_lon,
            (n + hgt) * cos_lat * sin_lon,
            (n * (1.0 - e2) + hgt) * sin_lat,
        )
    }

    /// Convert Cartesian ECEF coordinates to geodetic `(lon, lat, hgt)`.
    ///
    /// Return
    /// ----------
    /// * Longitude and latitude in **degrees** (longitude in `(-180, 180]`), height in **meters**.
    pub fn geodetic(&self, xyz: &Vector3<f64>) -> (Degree, Degree, Meter) {
        let (x, y, z) = (xyz.x, xyz.y, xyz.z);
        let (a, b, e2) = (self.a, self.semi_minor_axis(), self.eccentricity_squared());
        let lon = y.atan2(x);
        let p = x.hypot(y);

        // Second eccentricity squared
        let ep2 = e2 / (1.0 - e2);
        let theta = (z * a).atan2(p * b);
        let (sin_t, cos_t) = theta.sin_cos();
        let mut lat = (z + ep2 * b * sin_t.powi(3)).atan2(p - e2 * a * cos_t.powi(3));

        for _ in 0..2 {
            let sin_lat = lat.sin();
            let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
            lat = (z + e2 * n * sin_lat).atan2(p);
        }

        let (sin_lat, cos_lat) = lat.sin_cos();
        let hgt = p * cos_lat + z * sin_lat - a * (1.0 - e2 * sin_lat * sin_lat).sqrt();

        (lon.to_degrees(), lat.to_degrees(), hgt)
    }

    /// Rotation from ECEF difference vectors to the local east-north-up frame.
    ///
    /// Arguments
    /// -----------------
    /// * `lon`, `lat` – Station longitude and latitude in **degrees**.
    ///
    /// Return
    /// ----------
    /// * An orthonormal matrix whose rows are the east, north and up unit vectors.
    pub fn enu_axes(&self, lon: Degree, lat: Degree) -> Matrix3<f64> {
        let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
        let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
        Matrix3::new(
            -sin_lon,
            cos_lon,
            0.0,
            -sin_lat * cos_lon,
            -sin_lat * sin_lon,
            cos_lat,
            cos_lat * cos_lon,
            cos_lat * sin_lon,
            sin_lat,
        )
    }
}

#[cfg(test)]
mod ellipsoid_test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_grs80_parameters() {
        assert_abs_diff_eq!(GRS80.semi_minor_axis(), 6_356_752.314_140, epsilon = 1e-5);
        assert_abs_diff_eq!(GRS80.eccentricity_squared(), 0.006_694_380_022_90, epsilon = 1e-14);
    }

    #[test]
    fn test_geodetic_round_trip() {
        for (lon, lat, hgt) in [
            (174.7762, -41.2865, 21.5),
            (-10.0, 45.0, 100.0),
            (0.0, 0.0, 0.0),
            (172.5, -89.9, 2835.0),
            (-61.528, 16.262, -25.0),
        ] {
            let xyz = GRS80.xyz(lon, lat, hgt);
            let (lon2, lat2, hgt2) = GRS80.geodetic(&xyz);
            assert_abs_diff_eq!(lon2, lon, epsilon = 1e-9);
            assert_abs_diff_eq!(lat2, lat, epsilon = 1e-9);
            assert_abs_diff_eq!(hgt2, hgt, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_known_station() {
        // Wellington area, approximately 174.78E 41.29S
        let xyz = Vector3::new(-4_777_000.0, 436_000.0, -4_185_000.0);
        let (lon, lat, _) = GRS80.geodetic(&xyz);
        assert!(lon > 174.0 && lon < 175.5, "lon = {lon}");
        assert!(lat < -41.0 && lat > -41.5, "lat = {lat}");
    }

    #[test]
    fn test_enu_axes_orthonormal() {
        let r = GRS80.enu_axes(174.78, -41.29);
        assert_abs_diff_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-12);

        // Up axis points along the ellipsoid normal
        let up = r.row(2).transpose();
        let normal = GRS80.xyz(174.78, -41.29, 1.0) - GRS80.xyz(174.78, -41.29, 0.0);
        assert_abs_diff_eq!(up, normal, epsilon = 1e-8);
    }

    #[test]
    fn test_enu_at_origin() {
        // At lon = 0, lat = 0: east = +Y, north = +Z, up = +X
        let r = GRS80.enu_axes(0.0, 0.0);
        let enu = r * Vector3::new(1.0, 2.0, 3.0);
        assert_abs_diff_eq!(enu, Vector3::new(2.0, 3.0, 1.0), epsilon = 1e-15);
    }
}
