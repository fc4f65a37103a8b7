use glam::{Mat3, Quat, Vec3};

const EPSILON_SQ: f32 = 1e-10;

/// Wraps an angle in degrees into `(-180, 180]`.
pub fn normalize_angle(degrees: f32) -> f32 {
    let mut angle = degrees % 360.0;
    if angle > 180.0 {
        angle -= 360.0;
    } else if angle <= -180.0 {
        angle += 360.0;
    }
    angle
}

/// Unsigned angle between two vectors, in degrees. Zero when either vector is degenerate.
pub fn angle(from: Vec3, to: Vec3) -> f32 {
    let denominator = (from.length_squared() * to.length_squared()).sqrt();
    if denominator < EPSILON_SQ {
        return 0.0;
    }
    (from.dot(to) / denominator).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Angle from `from` to `to` in degrees, signed by the rotation direction around `axis`.
pub fn signed_angle(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    let unsigned = angle(from, to);
    if axis.dot(from.cross(to)) < 0.0 {
        -unsigned
    } else {
        unsigned
    }
}

pub fn project_on_plane(vector: Vec3, plane_normal: Vec3) -> Vec3 {
    let length_sq = plane_normal.length_squared();
    if length_sq < EPSILON_SQ {
        return vector;
    }
    vector - plane_normal * (vector.dot(plane_normal) / length_sq)
}

/// Rotation that maps +Z onto `forward` and +Y as close as possible onto `up`.
///
/// Falls back to an arbitrary perpendicular up when `up` is parallel to `forward`,
/// and to identity when `forward` is zero.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let Some(forward) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };

    let right = match up.cross(forward).try_normalize() {
        Some(right) => right,
        None => forward.any_orthonormal_vector(),
    };
    let up = forward.cross(right);

    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}

/// Rotates `from` toward `to` by at most `max_degrees`.
pub fn rotate_towards(from: Quat, to: Quat, max_degrees: f32) -> Quat {
    let angle = from.angle_between(to).to_degrees();
    if angle <= max_degrees || angle < 1e-4 {
        return to;
    }
    if max_degrees <= 0.0 {
        return from;
    }
    from.slerp(to, max_degrees / angle)
}

/// Twist of `rotation` around `axis`, in degrees within `(-180, 180]`.
pub fn twist_angle(rotation: Quat, axis: Vec3) -> f32 {
    let axis = axis.normalize_or_zero();
    let projection = Vec3::new(rotation.x, rotation.y, rotation.z).dot(axis);
    normalize_angle((2.0 * projection.atan2(rotation.w)).to_degrees())
}

/// Direction `a` interpolated spherically toward `b`.
pub fn slerp_direction(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    let (Some(a), Some(b)) = (a.try_normalize(), b.try_normalize()) else {
        return a.normalize_or_zero();
    };
    let arc = Quat::from_rotation_arc(a, b);
    Quat::IDENTITY.slerp(arc, t.clamp(0.0, 1.0)) * a
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normalize_angle_wraps_into_half_open_range() {
        assert_abs_diff_eq!(normalize_angle(190.0), -170.0, epsilon = 1e-4);
        assert_abs_diff_eq!(normalize_angle(-180.0), 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(normalize_angle(180.0), 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(normalize_angle(-540.0), 180.0, epsilon = 1e-4);
        assert_abs_diff_eq!(normalize_angle(725.0), 5.0, epsilon = 1e-4);
    }

    #[test]
    fn signed_angle_follows_axis() {
        assert_abs_diff_eq!(signed_angle(Vec3::X, Vec3::Y, Vec3::Z), 90.0, epsilon = 1e-3);
        assert_abs_diff_eq!(signed_angle(Vec3::X, Vec3::Y, -Vec3::Z), -90.0, epsilon = 1e-3);
        assert_eq!(signed_angle(Vec3::ZERO, Vec3::Y, Vec3::Z), 0.0);
    }

    #[test]
    fn look_rotation_maps_forward_and_up() {
        let rotation = look_rotation(Vec3::X, Vec3::Y);
        assert_abs_diff_eq!(rotation * Vec3::Z, Vec3::X, epsilon = 1e-5);
        assert_abs_diff_eq!(rotation * Vec3::Y, Vec3::Y, epsilon = 1e-5);

        assert!(look_rotation(Vec3::Z, Vec3::Y).abs_diff_eq(Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn look_rotation_survives_parallel_up() {
        let rotation = look_rotation(Vec3::Y, Vec3::Y);
        assert_abs_diff_eq!(rotation * Vec3::Z, Vec3::Y, epsilon = 1e-5);
        assert!(rotation.is_normalized());
    }

    #[test]
    fn rotate_towards_limits_step() {
        let from = Quat::IDENTITY;
        let to = Quat::from_rotation_y(90f32.to_radians());

        let step = rotate_towards(from, to, 30.0);

        assert_abs_diff_eq!(from.angle_between(step).to_degrees(), 30.0, epsilon = 1e-2);
        assert!(rotate_towards(from, to, 120.0).abs_diff_eq(to, 1e-6));
        assert!(rotate_towards(from, to, 0.0).abs_diff_eq(from, 1e-6));
    }

    #[test]
    fn twist_angle_extracts_rotation_around_axis() {
        let twist = Quat::from_rotation_z(40f32.to_radians());
        let swing = Quat::from_rotation_x(10f32.to_radians());

        assert_abs_diff_eq!(twist_angle(twist, Vec3::Z), 40.0, epsilon = 1e-3);
        assert_abs_diff_eq!(twist_angle(twist * swing, Vec3::Z), 40.0, epsilon = 0.5);
    }
}
