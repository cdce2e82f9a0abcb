//! Constant-velocity Kalman filter for box state

use crate::config::KalmanConfig;
use nalgebra::{Matrix4, Matrix4x6, Matrix6, Vector4, Vector6};

/// Kalman filter with state [cx, cy, w, h, vx, vy] and measurement [cx, cy, w, h]
#[derive(Debug, Clone)]
pub struct BoxKalmanFilter {
    /// State vector
    x: Vector6<f32>,
    /// State covariance
    p: Matrix6<f32>,
    /// State transition
    f: Matrix6<f32>,
    /// Observation model
    h: Matrix4x6<f32>,
    /// Process noise covariance
    q: Matrix6<f32>,
    /// Measurement noise covariance
    r: Matrix4<f32>,
}

impl BoxKalmanFilter {
    /// Create a filter at rest on the initial measurement
    pub fn new(z: [f32; 4], config: &KalmanConfig) -> Self {
        let x = Vector6::new(z[0], z[1], z[2], z[3], 0.0, 0.0);

        // Velocity starts unknown
        let mut p = Matrix6::identity() * config.initial_covariance;
        p[(4, 4)] = config.initial_covariance * 10.0;
        p[(5, 5)] = config.initial_covariance * 10.0;

        let mut f = Matrix6::identity();
        f[(0, 4)] = 1.0; // cx' = cx + vx
        f[(1, 5)] = 1.0; // cy' = cy + vy

        let h = Matrix4x6::identity();

        let mut q = Matrix6::zeros();
        q[(0, 0)] = config.process_noise_pos;
        q[(1, 1)] = config.process_noise_pos;
        q[(2, 2)] = config.process_noise_pos * 0.1; // size drifts slowly
        q[(3, 3)] = config.process_noise_pos * 0.1;
        q[(4, 4)] = config.process_noise_vel;
        q[(5, 5)] = config.process_noise_vel;

        let r = Matrix4::identity() * config.measurement_noise;

        Self { x, p, f, h, q, r }
    }

    /// x = F * x, P = F * P * F^T + Q
    pub fn predict(&mut self) {
        self.x = self.f * self.x;
        self.p = self.f * self.p * self.f.transpose() + self.q;
    }

    /// Fold in a measurement. Returns `None` when the innovation covariance
    /// cannot be inverted or its inverse is not finite; the state is left
    /// untouched in that case.
    pub fn update(&mut self, z: [f32; 4]) -> Option<()> {
        let z = Vector4::from(z);
        let y = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;
        let s_inv = s.try_inverse().filter(|inv| inv.iter().all(|v| v.is_finite()))?;
        let k = self.p * self.h.transpose() * s_inv;

        self.x += k * y;
        self.p = (Matrix6::identity() - k * self.h) * self.p;
        Some(())
    }

    /// Measured part of the state [cx, cy, w, h]
    pub fn measurement_state(&self) -> [f32; 4] {
        [self.x[0], self.x[1], self.x[2], self.x[3]]
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.x[4], self.x[5])
    }
}
