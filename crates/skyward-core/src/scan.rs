//! Horizontal 360 degree range scanning.
//!
//! The scanner casts a fixed fan of world-frame rays around the vehicle and
//! records the free distance along each one. Actual ray queries are delegated
//! to a [`RangeSensor`] so the same scanner works against a simulated
//! obstacle field or a hardware driver.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::spatial;

/// Scanner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of rays, evenly spaced around the vertical axis
    pub rays: usize,
    /// Maximum reported distance in meters
    pub range_m: f64,
    /// Distance below which a sample counts as a hazard
    pub safe_distance_m: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            rays: 36,
            range_m: 10.0,
            safe_distance_m: 2.0,
        }
    }
}

/// Anything that can answer "how far until I hit something along this ray".
pub trait RangeSensor {
    /// Distance to the nearest hit within `max_distance`, or `None` if clear.
    /// `direction` is unit length.
    fn raycast(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_distance: f64,
    ) -> Option<f64>;
}

/// Sensor for an empty world.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSky;

impl RangeSensor for OpenSky {
    fn raycast(&self, _: &Vector3<f64>, _: &Vector3<f64>, _: f64) -> Option<f64> {
        None
    }
}

/// Spherical obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereObstacle {
    pub center: Vector3<f64>,
    pub radius: f64,
}

impl SphereObstacle {
    pub fn new(center: Vector3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    fn intersect(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> Option<f64> {
        let oc = origin - self.center;
        let b = oc.dot(direction);
        let c = oc.norm_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let far = -b + root;
        if far < 0.0 {
            return None;
        }
        let near = -b - root;
        Some(if near >= 0.0 { near } else { 0.0 })
    }
}

/// Collection of sphere obstacles, used for simulation and tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleField {
    obstacles: Vec<SphereObstacle>,
}

impl ObstacleField {
    pub fn new(obstacles: Vec<SphereObstacle>) -> Self {
        Self { obstacles }
    }

    pub fn push(&mut self, obstacle: SphereObstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn obstacles(&self) -> &[SphereObstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

impl RangeSensor for ObstacleField {
    fn raycast(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
        max_distance: f64,
    ) -> Option<f64> {
        self.obstacles
            .iter()
            .filter_map(|o| o.intersect(origin, direction))
            .filter(|d| *d <= max_distance)
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// One ray of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScanSample {
    /// Bearing about +Y in degrees, 0 = world +Z
    pub bearing_deg: f64,
    /// Unit world-frame direction of the ray
    pub direction: Vector3<f64>,
    /// Free distance along the ray, capped at the scan range
    pub distance: f64,
}

/// Ordered result of one scan. Sample order is bearing order and is
/// significant: hazard resolution takes the first match.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    samples: Vec<ScanSample>,
}

impl ScanResult {
    pub fn from_samples(samples: Vec<ScanSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[ScanSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First sample (in scan order) closer than `threshold`.
    pub fn first_below(&self, threshold: f64) -> Option<(usize, &ScanSample)> {
        self.samples
            .iter()
            .enumerate()
            .find(|(_, s)| s.distance < threshold)
    }

    /// All samples closer than `threshold`.
    pub fn hazards(&self, threshold: f64) -> impl Iterator<Item = &ScanSample> {
        self.samples.iter().filter(move |s| s.distance < threshold)
    }

    pub fn nearest(&self) -> Option<&ScanSample> {
        self.samples
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Casts the configured ray fan against a sensor.
#[derive(Debug, Clone)]
pub struct RangeScanner {
    config: ScanConfig,
    bearings: Vec<(f64, Vector3<f64>)>,
}

impl Default for RangeScanner {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl RangeScanner {
    pub fn new(config: ScanConfig) -> Self {
        let step = if config.rays == 0 {
            0.0
        } else {
            360.0 / config.rays as f64
        };
        let bearings = (0..config.rays)
            .map(|i| {
                let bearing = step * i as f64;
                (bearing, spatial::yaw_deg(bearing) * spatial::forward_axis())
            })
            .collect();
        Self { config, bearings }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan(&self, sensor: &dyn RangeSensor, origin: &Vector3<f64>) -> ScanResult {
        let range = self.config.range_m;
        let samples = self
            .bearings
            .iter()
            .map(|(bearing_deg, direction)| ScanSample {
                bearing_deg: *bearing_deg,
                direction: *direction,
                distance: sensor
                    .raycast(origin, direction, range)
                    .map(|d| d.clamp(0.0, range))
                    .unwrap_or(range),
            })
            .collect();
        ScanResult { samples }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_sky_reports_full_range() {
        let scanner = RangeScanner::default();
        let result = scanner.scan(&OpenSky, &Vector3::zeros());
        assert_eq!(result.len(), 36);
        assert!(result.samples().iter().all(|s| s.distance == 10.0));
        assert!(result.first_below(2.0).is_none());
    }

    #[test]
    fn test_bearing_order_starts_forward() {
        let scanner = RangeScanner::default();
        let result = scanner.scan(&OpenSky, &Vector3::zeros());
        let first = result.samples()[0];
        let ninth = result.samples()[9];
        assert_eq!(first.bearing_deg, 0.0);
        assert!((first.direction - Vector3::z()).norm() < 1e-9);
        assert!((ninth.bearing_deg - 90.0).abs() < 1e-9);
        assert!((ninth.direction - Vector3::x()).norm() < 1e-9);
    }

    #[test]
    fn test_sphere_hit_distance() {
        let field = ObstacleField::new(vec![SphereObstacle::new(Vector3::new(0.0, 0.0, 5.0), 1.0)]);
        let scanner = RangeScanner::default();
        let result = scanner.scan(&field, &Vector3::zeros());
        assert!((result.samples()[0].distance - 4.0).abs() < 1e-9);
        assert_eq!(result.samples()[18].distance, 10.0);
    }

    #[test]
    fn test_origin_inside_obstacle_reads_zero() {
        let field = ObstacleField::new(vec![SphereObstacle::new(Vector3::zeros(), 1.0)]);
        let result = RangeScanner::default().scan(&field, &Vector3::zeros());
        assert!(result.samples().iter().all(|s| s.distance == 0.0));
    }

    #[test]
    fn test_hits_beyond_range_are_clear() {
        let field = ObstacleField::new(vec![SphereObstacle::new(Vector3::new(0.0, 0.0, 30.0), 1.0)]);
        let result = RangeScanner::default().scan(&field, &Vector3::zeros());
        assert_eq!(result.samples()[0].distance, 10.0);
    }

    #[test]
    fn test_first_below_is_scan_order() {
        let field = ObstacleField::new(vec![
            SphereObstacle::new(Vector3::new(1.5, 0.0, 0.0), 0.2),
            SphereObstacle::new(Vector3::new(-1.2, 0.0, 0.0), 0.2),
        ]);
        let result = RangeScanner::default().scan(&field, &Vector3::zeros());
        let (index, sample) = result.first_below(2.0).unwrap();
        assert_eq!(index, 9);
        assert!((sample.distance - 1.3).abs() < 1e-9);
        assert!((result.nearest().unwrap().distance - 1.0).abs() < 1e-9);
        assert_eq!(result.hazards(2.0).count(), 2);
    }
}
