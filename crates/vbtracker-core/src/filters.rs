//! One-euro adaptive low-pass filters.
//!
//! The smoothing factor of each update depends on how fast the signal is
//! moving: the cutoff frequency is `min_cutoff + beta * |dx|`, where `dx` is
//! itself a low-passed derivative. Slow signals are smoothed heavily, fast
//! signals track with little lag.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{Real, UnitQuat, Vec3};

/// Tuning of a single one-euro filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneEuroParams {
    /// Cutoff frequency (Hz) used when the signal is at rest.
    pub min_cutoff: Real,
    /// Cutoff increase per unit of derivative magnitude.
    pub beta: Real,
    /// Cutoff frequency (Hz) of the derivative low-pass.
    pub derivative_cutoff: Real,
}

impl Default for OneEuroParams {
    fn default() -> Self {
        Self {
            min_cutoff: 1.0,
            beta: 0.5,
            derivative_cutoff: 1.0,
        }
    }
}

/// Exponential smoothing factor for a first-order low-pass at `cutoff` Hz.
pub fn smoothing_alpha(dt: Real, cutoff: Real) -> Real {
    let tau = 1.0 / (2.0 * PI * cutoff);
    1.0 / (1.0 + tau / dt)
}

/// Signal types a [`OneEuroFilter`] can smooth.
pub trait OneEuroSignal: Clone {
    type Derivative: Clone;

    fn rest_value() -> Self;
    fn zero_derivative() -> Self::Derivative;
    /// Rate of change from `prev` to `curr` over `dt` seconds.
    fn derivative(prev: &Self, curr: &Self, dt: Real) -> Self::Derivative;
    fn derivative_magnitude(dx: &Self::Derivative) -> Real;
    fn blend_derivative(prev: &Self::Derivative, curr: &Self::Derivative, alpha: Real) -> Self::Derivative;
    /// Move `alpha` of the way from `prev` towards `curr`.
    fn blend(prev: &Self, curr: &Self, alpha: Real) -> Self;
}

impl OneEuroSignal for Vec3 {
    type Derivative = Vec3;

    fn rest_value() -> Self {
        Vec3::zeros()
    }

    fn zero_derivative() -> Vec3 {
        Vec3::zeros()
    }

    fn derivative(prev: &Self, curr: &Self, dt: Real) -> Vec3 {
        (curr - prev) / dt
    }

    fn derivative_magnitude(dx: &Vec3) -> Real {
        dx.norm()
    }

    fn blend_derivative(prev: &Vec3, curr: &Vec3, alpha: Real) -> Vec3 {
        prev.lerp(curr, alpha)
    }

    fn blend(prev: &Self, curr: &Self, alpha: Real) -> Self {
        prev.lerp(curr, alpha)
    }
}

/// Rotations are differentiated into an angular velocity (rad/s, scaled axis)
/// and blended by spherical interpolation along the shortest arc.
impl OneEuroSignal for UnitQuat {
    type Derivative = Vec3;

    fn rest_value() -> Self {
        UnitQuat::identity()
    }

    fn zero_derivative() -> Vec3 {
        Vec3::zeros()
    }

    fn derivative(prev: &Self, curr: &Self, dt: Real) -> Vec3 {
        let mut delta = curr * prev.inverse();
        if delta.w < 0.0 {
            delta = UnitQuat::new_unchecked(-delta.into_inner());
        }
        delta.scaled_axis() / dt
    }

    fn derivative_magnitude(dx: &Vec3) -> Real {
        dx.norm()
    }

    fn blend_derivative(prev: &Vec3, curr: &Vec3, alpha: Real) -> Vec3 {
        prev.lerp(curr, alpha)
    }

    fn blend(prev: &Self, curr: &Self, alpha: Real) -> Self {
        prev.try_slerp(curr, alpha, 1e-9).unwrap_or(*curr)
    }
}

/// One-euro filter over a single signal.
#[derive(Debug, Clone)]
pub struct OneEuroFilter<T: OneEuroSignal> {
    params: OneEuroParams,
    state: T,
    derivative: T::Derivative,
    initialized: bool,
}

impl<T: OneEuroSignal> OneEuroFilter<T> {
    pub fn new(params: OneEuroParams) -> Self {
        Self {
            params,
            state: T::rest_value(),
            derivative: T::zero_derivative(),
            initialized: false,
        }
    }

    pub fn params(&self) -> &OneEuroParams {
        &self.params
    }

    /// Feed a sample taken `dt` seconds after the previous one.
    ///
    /// The first sample is adopted as-is. `dt` must be positive.
    pub fn filter(&mut self, dt: Real, value: &T) -> &T {
        if !self.initialized {
            self.state = value.clone();
            self.derivative = T::zero_derivative();
            self.initialized = true;
            return &self.state;
        }
        let raw = T::derivative(&self.state, value, dt);
        let d_alpha = smoothing_alpha(dt, self.params.derivative_cutoff);
        self.derivative = T::blend_derivative(&self.derivative, &raw, d_alpha);

        let cutoff = self.params.min_cutoff + self.params.beta * T::derivative_magnitude(&self.derivative);
        self.state = T::blend(&self.state, value, smoothing_alpha(dt, cutoff));
        &self.state
    }

    pub fn state(&self) -> &T {
        &self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl<T: OneEuroSignal> Default for OneEuroFilter<T> {
    fn default() -> Self {
        Self::new(OneEuroParams::default())
    }
}
