//! Pure progress-to-value curves.
//!
//! Every function here is a closed-form function of its inputs, so samples taken concurrently
//! from different frames never depend on each other or on call order.

use crate::animation::ease::Ease;
use crate::foundation::error::{CapsyncError, CapsyncResult};

/// Linear interpolation between `from` and `to`.
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from * (1.0 - t) + to * t
}

/// Physical parameters of a damped spring.
///
/// `duration_secs` is the amount of spring time covered by progress `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpringParams {
    /// Spring constant `k`.
    pub stiffness: f64,
    /// Damping coefficient `c`.
    pub damping: f64,
    /// Mass `m`.
    pub mass: f64,
    /// Spring time mapped onto progress `1.0`.
    pub duration_secs: f64,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            stiffness: 170.0,
            damping: 12.0,
            mass: 1.0,
            duration_secs: 1.0,
        }
    }
}

impl SpringParams {
    /// Reject parameters that do not describe a physical spring.
    pub fn validate(&self) -> CapsyncResult<()> {
        let all_finite = [self.stiffness, self.damping, self.mass, self.duration_secs]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(CapsyncError::validation("spring parameters must be finite"));
        }
        if self.stiffness <= 0.0 || self.mass <= 0.0 {
            return Err(CapsyncError::validation(
                "spring stiffness and mass must be > 0",
            ));
        }
        if self.damping < 0.0 {
            return Err(CapsyncError::validation("spring damping must be >= 0"));
        }
        if self.duration_secs <= 0.0 {
            return Err(CapsyncError::validation(
                "spring duration_secs must be > 0",
            ));
        }
        Ok(())
    }

    /// Undamped angular frequency `sqrt(k / m)`.
    pub fn natural_frequency(&self) -> f64 {
        (self.stiffness / self.mass).sqrt()
    }

    /// Damping ratio `c / (2 sqrt(k m))`.
    pub fn damping_ratio(&self) -> f64 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }

    /// Normalized remaining displacement at spring time `t` for a spring released from rest.
    ///
    /// Equals `1` at `t = 0` and decays toward `0`.
    fn displacement(&self, t: f64) -> f64 {
        let w0 = self.natural_frequency();
        let zeta = self.damping_ratio();

        if (zeta - 1.0).abs() < 1e-9 {
            return (-w0 * t).exp() * (1.0 + w0 * t);
        }
        if zeta < 1.0 {
            let wd = w0 * (1.0 - zeta * zeta).sqrt();
            let decay = (-zeta * w0 * t).exp();
            return decay * ((wd * t).cos() + (zeta * w0 / wd) * (wd * t).sin());
        }

        let root = (zeta * zeta - 1.0).sqrt();
        let r1 = -w0 * (zeta - root);
        let r2 = -w0 * (zeta + root);
        (r2 * (r1 * t).exp() - r1 * (r2 * t).exp()) / (r2 - r1)
    }
}

/// Damped-spring curve from `from` toward `to`, evaluated at `progress` (clamped to `[0, 1]`).
///
/// Yields exactly `from` at progress 0 and settles toward `to` as progress grows.
pub fn spring(from: f64, to: f64, params: &SpringParams, progress: f64) -> f64 {
    let p = if progress.is_finite() {
        progress.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let t = p * params.duration_secs;
    to + (from - to) * params.displacement(t)
}

/// Curve shape used by [`Interp`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Curve {
    /// Straight-line interpolation.
    Linear,
    /// Eased interpolation.
    Eased {
        /// Easing function applied to progress before interpolating.
        ease: Ease,
    },
    /// Damped spring.
    Spring(SpringParams),
}

/// An animated scalar: a curve between two values.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Interp {
    /// Value at progress 0.
    pub from: f64,
    /// Target value.
    pub to: f64,
    /// Curve shape.
    pub curve: Curve,
}

impl Interp {
    /// Linear curve between `from` and `to`.
    pub fn linear(from: f64, to: f64) -> Self {
        Self {
            from,
            to,
            curve: Curve::Linear,
        }
    }

    /// Eased curve between `from` and `to`.
    pub fn eased(from: f64, to: f64, ease: Ease) -> Self {
        Self {
            from,
            to,
            curve: Curve::Eased { ease },
        }
    }

    /// Spring curve between `from` and `to`.
    pub fn spring(from: f64, to: f64, params: SpringParams) -> Self {
        Self {
            from,
            to,
            curve: Curve::Spring(params),
        }
    }

    /// Validate curve parameters.
    pub fn validate(&self) -> CapsyncResult<()> {
        if !self.from.is_finite() || !self.to.is_finite() {
            return Err(CapsyncError::validation(
                "interpolation endpoints must be finite",
            ));
        }
        match &self.curve {
            Curve::Spring(p) => p.validate(),
            Curve::Linear | Curve::Eased { .. } => Ok(()),
        }
    }

    /// Sample the curve at normalized `progress`.
    pub fn sample(&self, progress: f64) -> f64 {
        match &self.curve {
            Curve::Linear => lerp(self.from, self.to, progress.clamp(0.0, 1.0)),
            Curve::Eased { ease } => lerp(self.from, self.to, ease.apply(progress)),
            Curve::Spring(p) => spring(self.from, self.to, p, progress),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/interp.rs"]
mod tests;
