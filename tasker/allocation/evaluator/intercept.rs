use crate::model::Vec3;

const EPSILON: f64 = 1e-9;

/// Earliest time at which a pursuer leaving `origin` at `speed` can reach a target at
/// `target` moving with `target_velocity`, assuming straight-line flight for both.
///
/// Returns `None` when no positive intercept time exists.
#[must_use]
pub fn intercept_time(origin: Vec3, speed: f64, target: Vec3, target_velocity: Vec3) -> Option<f64> {
    let relative = target - origin;
    // |relative + v t| = speed t  =>  a t^2 + b t + c = 0
    let a = target_velocity.dot(target_velocity) - speed * speed;
    let b = 2.0 * relative.dot(target_velocity);
    let c = relative.dot(relative);

    if a.abs() < EPSILON {
        if b.abs() < EPSILON {
            return None;
        }
        let t = -c / b;
        return (t > 0.0).then_some(t);
    }

    let discriminant = b.mul_add(b, -4.0 * a * c);
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let t1 = (-b - root) / (2.0 * a);
    let t2 = (-b + root) / (2.0 * a);
    [t1, t2]
        .into_iter()
        .filter(|t| *t > 0.0)
        .min_by(f64::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_on_closure() {
        let t = intercept_time(
            Vec3::ZERO,
            100.0,
            Vec3::new(1000.0, 0.0, 0.0),
            Vec3::new(-100.0, 0.0, 0.0),
        )
        .unwrap();
        assert!((t - 5.0).abs() < 1e-9);
    }

    #[test]
    fn stationary_target() {
        let t = intercept_time(Vec3::ZERO, 50.0, Vec3::new(0.0, 500.0, 0.0), Vec3::ZERO).unwrap();
        assert!((t - 10.0).abs() < 1e-9);
    }

    #[test]
    fn faster_receding_target_is_unreachable() {
        assert!(intercept_time(
            Vec3::ZERO,
            100.0,
            Vec3::new(1000.0, 0.0, 0.0),
            Vec3::new(200.0, 0.0, 0.0)
        )
        .is_none());
    }

    #[test]
    fn equal_speed_crossing_target_is_unreachable() {
        let crossing = intercept_time(
            Vec3::ZERO,
            100.0,
            Vec3::new(1000.0, 0.0, 0.0),
            Vec3::new(0.0, 100.0, 0.0),
        );
        assert!(crossing.is_none());
        assert!(intercept_time(Vec3::ZERO, 0.0, Vec3::new(10.0, 0.0, 0.0), Vec3::ZERO).is_none());
    }
}
