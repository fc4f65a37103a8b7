use glam::Vec3;

pub trait Interpolatable: Clone + Copy {
    fn zero() -> Self;
    fn add(self, other: Self) -> Self;
    fn sub(self, other: Self) -> Self;
    fn scale(self, factor: f32) -> Self;
    fn magnitude(self) -> f32;
}

impl Interpolatable for f32 {
    fn zero() -> Self { 0.0 }
    fn add(self, other: Self) -> Self { self + other }
    fn sub(self, other: Self) -> Self { self - other }
    fn scale(self, factor: f32) -> Self { self * factor }
    fn magnitude(self) -> f32 { self.abs() }
}

impl Interpolatable for Vec3 {
    fn zero() -> Self { Vec3::ZERO }
    fn add(self, other: Self) -> Self { self + other }
    fn sub(self, other: Self) -> Self { self - other }
    fn scale(self, factor: f32) -> Self { self * factor }
    fn magnitude(self) -> f32 { self.length() }
}

/// Critically damped step of `current` toward `target`.
///
/// `velocity` is carried between calls. `smooth_time` is roughly the time to reach
/// the target. A non-positive `delta_time` leaves both value and velocity untouched.
pub fn smooth_damp<T: Interpolatable>(
    current: T,
    target: T,
    velocity: &mut T,
    smooth_time: f32,
    max_speed: f32,
    delta_time: f32,
) -> T {
    if delta_time <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * delta_time;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let mut change = current.sub(target);
    let max_change = max_speed * smooth_time;
    let change_magnitude = change.magnitude();
    if change_magnitude > max_change && change_magnitude > 0.0 {
        change = change.scale(max_change / change_magnitude);
    }
    let clamped_target = current.sub(change);

    let temp = velocity.add(change.scale(omega)).scale(delta_time);
    *velocity = velocity.sub(temp.scale(omega)).scale(decay);
    let mut output = clamped_target.add(change.add(temp).scale(decay));

    // Never overshoot the unclamped target.
    let to_target = target.sub(current);
    let past_target = output.sub(target);
    if dot(to_target, past_target) > 0.0 {
        output = target;
        *velocity = T::zero();
    }

    output
}

fn dot<T: Interpolatable>(a: T, b: T) -> f32 {
    let sum = a.add(b).magnitude();
    let diff = a.sub(b).magnitude();
    0.25 * (sum * sum - diff * diff)
}

/// Value smoothed toward a moving target, with the velocity kept alongside.
#[derive(Debug, Clone, Copy)]
pub struct SmoothDamped<T: Interpolatable> {
    value: T,
    velocity: T,
    smooth_time: f32,
}

impl<T: Interpolatable> SmoothDamped<T> {
    pub fn new(smooth_time: f32, initial: T) -> Self {
        Self {
            value: initial,
            velocity: T::zero(),
            smooth_time,
        }
    }

    pub fn reset(&mut self, value: T) {
        self.value = value;
        self.velocity = T::zero();
    }

    pub fn update(&mut self, target: T, dt: f32) -> T {
        self.value = smooth_damp(
            self.value,
            target,
            &mut self.velocity,
            self.smooth_time,
            f32::INFINITY,
            dt,
        );
        self.value
    }

    pub fn current(&self) -> T {
        self.value
    }
}
