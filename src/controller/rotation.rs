use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::config::RotationConfig;
use crate::error::{ConfigurationError, InvalidInputError};
use crate::model::ViewportHandle;

/// Default spread of the spring gain; each instance picks one value once
pub const EASING_RANGE: Range<f64> = 0.55..0.615;
/// Default spread of the velocity damping factor
pub const FRICTION_RANGE: Range<f64> = 0.09..0.14;

/// How pointer input is mapped onto the rotation target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Drag deltas accumulate into the target and the spring integrator chases it
    #[default]
    InertialDrag,
    /// The horizontal pointer offset from the viewport center is the angle, applied as-is
    DirectPointer,
}

/// Spring gain and damping, validated once and then fixed for the controller's lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    easing: f64,
    friction: f64,
}

impl SpringParams {
    /// `friction` outside `[0, 1)` makes velocity grow without bound, and a
    /// non-positive `easing` never closes the gap.
    pub fn new(easing: f64, friction: f64) -> Result<Self, ConfigurationError> {
        if !easing.is_finite() || easing <= 0.0 {
            return Err(ConfigurationError::Easing(easing));
        }
        if !friction.is_finite() || !(0.0..1.0).contains(&friction) {
            return Err(ConfigurationError::Friction(friction));
        }
        Ok(Self { easing, friction })
    }

    pub fn easing(&self) -> f64 {
        self.easing
    }

    pub fn friction(&self) -> f64 {
        self.friction
    }
}

/// Integrator state. Readable by anyone, written only by [`RotationController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationState {
    pub position: f64,
    pub target: f64,
    pub velocity: f64,
    pub delta: f64,
    pub easing: f64,
    pub friction: f64,
    pub last_input_x: f64,
}

impl RotationState {
    fn at_rest(params: SpringParams) -> Self {
        Self {
            position: 0.0,
            target: 0.0,
            velocity: 0.0,
            delta: 0.0,
            easing: params.easing,
            friction: params.friction,
            last_input_x: 0.0,
        }
    }
}

/// Turns pointer samples into a smoothed rotation angle, advanced once per frame
pub struct RotationController {
    state: RotationState,
    mode: RotationMode,
    pointer_range: f64,
    viewport: ViewportHandle,
}

impl RotationController {
    pub fn new(mode: RotationMode, params: SpringParams, viewport: ViewportHandle) -> Self {
        Self {
            state: RotationState::at_rest(params),
            mode,
            pointer_range: RotationConfig::default().pointer_range,
            viewport,
        }
    }

    /// Build from config, randomizing whichever constant is not pinned.
    /// A configured seed makes the draw reproducible.
    pub fn from_config(config: &RotationConfig, viewport: ViewportHandle) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let params = match config.seed {
            Some(seed) => spring_from_config(config, &mut ChaCha8Rng::seed_from_u64(seed))?,
            None => spring_from_config(config, &mut rand::rng())?,
        };
        tracing::info!(
            mode = ?config.mode,
            easing = params.easing,
            friction = params.friction,
            "rotation controller ready"
        );
        Ok(Self {
            state: RotationState::at_rest(params),
            mode: config.mode,
            pointer_range: config.pointer_range,
            viewport,
        })
    }

    pub fn mode(&self) -> RotationMode {
        self.mode
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    pub fn position(&self) -> f64 {
        self.state.position
    }

    /// Start of a drag gesture: remember where it began
    pub fn on_drag_start(&mut self, x: f64) -> Result<(), InvalidInputError> {
        check_finite(x, 0.0)?;
        if self.mode == RotationMode::InertialDrag {
            self.state.last_input_x = x;
        }
        Ok(())
    }

    /// Drag continues: move the target by the horizontal distance since the last sample
    pub fn on_drag_move(&mut self, x: f64) -> Result<(), InvalidInputError> {
        check_finite(x, 0.0)?;
        if self.mode == RotationMode::InertialDrag {
            let dx = x - self.state.last_input_x;
            self.state.target += dx;
            self.state.last_input_x = x;
        }
        Ok(())
    }

    /// Hover sample in viewport (logical pixel) coordinates
    pub fn on_pointer_move(&mut self, x: f64, y: f64) -> Result<(), InvalidInputError> {
        check_finite(x, y)?;
        if self.mode == RotationMode::DirectPointer {
            let viewport = self.viewport.get();
            let half_width = viewport.logical_width() / 2.0;
            let offset = (x - viewport.logical_center_x()) / half_width.max(f64::EPSILON);
            self.state.target = offset * self.pointer_range / 2.0;
            self.state.last_input_x = x;
        }
        Ok(())
    }

    /// One integrator step; call exactly once per rendered frame.
    ///
    /// The gap is folded into the velocity with `easing`, the velocity is then
    /// damped by `friction`, and the position moves by what is left. The angle
    /// is not wrapped.
    pub fn advance(&mut self) -> f64 {
        let s = &mut self.state;
        s.delta = s.target - s.position;
        match self.mode {
            RotationMode::InertialDrag => {
                s.velocity += s.delta * s.easing;
                s.velocity *= s.friction;
                s.position += s.velocity;
            }
            RotationMode::DirectPointer => {
                s.velocity = 0.0;
                s.position = s.target;
            }
        }
        s.position
    }

    /// Position within `epsilon` of the target and no momentum left
    pub fn is_settled(&self, epsilon: f64) -> bool {
        (self.state.target - self.state.position).abs() <= epsilon && self.state.velocity.abs() <= epsilon
    }
}

fn spring_from_config<R: Rng + ?Sized>(config: &RotationConfig, rng: &mut R) -> Result<SpringParams, ConfigurationError> {
    let [easing_lo, easing_hi] = config.easing_range;
    let [friction_lo, friction_hi] = config.friction_range;
    let easing = config.easing.unwrap_or_else(|| rng.random_range(easing_lo..easing_hi));
    let friction = config.friction.unwrap_or_else(|| rng.random_range(friction_lo..friction_hi));
    SpringParams::new(easing, friction)
}

fn check_finite(x: f64, y: f64) -> Result<(), InvalidInputError> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        tracing::debug!(x, y, "dropping non-finite pointer sample");
        Err(InvalidInputError { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViewportState;

    fn inertial(easing: f64, friction: f64) -> RotationController {
        RotationController::new(
            RotationMode::InertialDrag,
            SpringParams::new(easing, friction).unwrap(),
            ViewportHandle::default(),
        )
    }

    #[test]
    fn first_step_after_drag() {
        let mut c = inertial(0.6, 0.1);
        c.on_drag_start(100.0).unwrap();
        c.on_drag_move(150.0).unwrap();
        assert_eq!(c.state().target, 50.0);

        let position = c.advance();
        assert!((c.state().delta - 50.0).abs() < 1e-12);
        assert!((c.state().velocity - 3.0).abs() < 1e-12);
        assert!((position - 3.0).abs() < 1e-12);
    }

    #[test]
    fn held_target_settles() {
        let mut c = inertial(0.6, 0.1);
        c.on_drag_start(100.0).unwrap();
        c.on_drag_move(150.0).unwrap();
        c.advance();
        for _ in 0..200 {
            c.advance();
        }
        assert!((c.position() - 50.0).abs() < 1e-3);
        assert!(c.is_settled(1e-3));
    }

    #[test]
    fn approach_is_monotone_for_default_ranges() {
        for (easing, friction) in [(0.55, 0.09), (0.6149, 0.1399), (0.58, 0.12)] {
            let mut c = inertial(easing, friction);
            c.on_drag_start(0.0).unwrap();
            c.on_drag_move(80.0).unwrap();
            let mut last = c.position();
            for _ in 0..500 {
                let p = c.advance();
                assert!(p >= last, "position moved away from target");
                assert!(p <= 80.0 + 1e-9, "position overshot target");
                last = p;
            }
            assert!((last - 80.0).abs() < 1e-6);
        }
    }

    #[test]
    fn advance_without_input_keeps_target() {
        let mut c = inertial(0.6, 0.1);
        c.on_drag_start(0.0).unwrap();
        c.on_drag_move(-30.0).unwrap();
        let target = c.state().target;
        let before = (target - c.position()).abs();
        c.advance();
        let after = (target - c.position()).abs();
        assert_eq!(c.state().target, target);
        assert!(after < before);
    }

    #[test]
    fn settled_controller_stays_put() {
        let mut c = inertial(0.6, 0.1);
        let p = c.advance();
        assert_eq!(p, 0.0);
        assert_eq!(c.advance(), 0.0);
    }

    #[test]
    fn drag_deltas_compose() {
        let mut split = inertial(0.6, 0.1);
        split.on_drag_start(10.0).unwrap();
        split.on_drag_move(25.0).unwrap();
        split.on_drag_move(4.0).unwrap();

        let mut single = inertial(0.6, 0.1);
        single.on_drag_start(10.0).unwrap();
        single.on_drag_move(4.0).unwrap();

        assert_eq!(split.state().target, single.state().target);
        assert_eq!(split.state().last_input_x, 4.0);
    }

    #[test]
    fn zero_friction_kills_velocity() {
        let mut c = inertial(0.6, 0.0);
        c.on_drag_start(0.0).unwrap();
        c.on_drag_move(100.0).unwrap();
        c.advance();
        assert_eq!(c.state().velocity, 0.0);
        let frozen = c.position();
        for _ in 0..10 {
            assert_eq!(c.advance(), frozen);
        }
    }

    #[test]
    fn invalid_constants_are_rejected() {
        assert_eq!(SpringParams::new(0.6, 1.0), Err(ConfigurationError::Friction(1.0)));
        assert_eq!(SpringParams::new(0.6, -0.1), Err(ConfigurationError::Friction(-0.1)));
        assert_eq!(SpringParams::new(0.0, 0.1), Err(ConfigurationError::Easing(0.0)));
        assert!(SpringParams::new(f64::NAN, 0.1).is_err());
        assert!(SpringParams::new(0.6, f64::INFINITY).is_err());
    }

    #[test]
    fn non_finite_samples_leave_state_untouched() {
        let mut c = inertial(0.6, 0.1);
        c.on_drag_start(5.0).unwrap();
        c.on_drag_move(9.0).unwrap();
        let before = *c.state();

        assert!(c.on_drag_move(f64::NAN).is_err());
        assert!(c.on_drag_start(f64::INFINITY).is_err());
        assert!(c.on_pointer_move(1.0, f64::NEG_INFINITY).is_err());
        assert_eq!(*c.state(), before);
        assert!(c.advance().is_finite());
    }

    #[test]
    fn randomized_constants_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = RotationConfig::default();
        for _ in 0..100 {
            let p = spring_from_config(&config, &mut rng).unwrap();
            assert!(EASING_RANGE.contains(&p.easing()));
            assert!(FRICTION_RANGE.contains(&p.friction()));
        }
    }

    #[test]
    fn configured_ranges_bound_the_draw() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let config = RotationConfig {
            easing_range: [0.2, 0.25],
            friction_range: [0.5, 0.6],
            ..RotationConfig::default()
        };
        for _ in 0..50 {
            let p = spring_from_config(&config, &mut rng).unwrap();
            assert!((0.2..0.25).contains(&p.easing()));
            assert!((0.5..0.6).contains(&p.friction()));
        }
    }

    #[test]
    fn seeded_config_is_reproducible() {
        let config = RotationConfig { seed: Some(9), ..RotationConfig::default() };
        let a = RotationController::from_config(&config, ViewportHandle::default()).unwrap();
        let b = RotationController::from_config(&config, ViewportHandle::default()).unwrap();
        assert_eq!(a.state().easing, b.state().easing);
        assert_eq!(a.state().friction, b.state().friction);
    }

    #[test]
    fn pinned_constants_win_over_ranges() {
        let config = RotationConfig { easing: Some(0.6), friction: Some(0.1), ..RotationConfig::default() };
        let c = RotationController::from_config(&config, ViewportHandle::default()).unwrap();
        assert_eq!(c.state().easing, 0.6);
        assert_eq!(c.state().friction, 0.1);
    }

    #[test]
    fn direct_pointer_maps_offset_from_center() {
        let viewport = ViewportHandle::new(ViewportState::new(800, 600, 1.0));
        let config = RotationConfig { mode: RotationMode::DirectPointer, ..RotationConfig::default() };
        let mut c = RotationController::from_config(&config, viewport).unwrap();

        c.on_pointer_move(400.0, 10.0).unwrap();
        assert_eq!(c.advance(), 0.0);

        c.on_pointer_move(800.0, 10.0).unwrap();
        assert_eq!(c.advance(), 100.0);
        assert_eq!(c.state().velocity, 0.0);

        c.on_pointer_move(0.0, 300.0).unwrap();
        assert_eq!(c.advance(), -100.0);
    }

    #[test]
    fn direct_pointer_uses_logical_pixels() {
        let viewport = ViewportHandle::new(ViewportState::new(1600, 1200, 2.0));
        let config = RotationConfig { mode: RotationMode::DirectPointer, ..RotationConfig::default() };
        let mut c = RotationController::from_config(&config, viewport).unwrap();
        c.on_pointer_move(600.0, 0.0).unwrap();
        assert_eq!(c.advance(), 50.0);
    }

    #[test]
    fn inputs_of_the_other_mode_are_ignored() {
        let mut drag = inertial(0.6, 0.1);
        drag.on_pointer_move(700.0, 0.0).unwrap();
        assert_eq!(drag.state().target, 0.0);

        let config = RotationConfig { mode: RotationMode::DirectPointer, ..RotationConfig::default() };
        let mut direct = RotationController::from_config(&config, ViewportHandle::default()).unwrap();
        direct.on_drag_start(0.0).unwrap();
        direct.on_drag_move(300.0).unwrap();
        assert_eq!(direct.state().target, 0.0);
    }
}
