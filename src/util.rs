use nalgebra::{Scalar, Vector3, Vector4};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::Rng;
use std::ops::RangeBounds;

pub fn random_vec<T, R, G>(rng: &mut G, range: R) -> Vector3<T>
where
    T: SampleUniform + Scalar,
    R: RangeBounds<T> + SampleRange<T> + Clone,
    G: Rng,
{
    Vector3::new(
        rng.gen_range(range.clone()),
        rng.gen_range(range.clone()),
        rng.gen_range(range),
    )
}

// 정육면체 안에서 뽑고 정규화 하는 방식이라 구 표면에 완전히 균일하진 않음
pub fn random_in_unit_sphere<G: Rng>(rng: &mut G) -> Vector3<f32> {
    loop {
        if let Some(direction) = random_vec(rng, -1.0..=1.0f32).try_normalize(f32::EPSILON) {
            return direction;
        }
    }
}

/// 선형 색상을 [0, 1]로 자르고 8비트 RGBA로 바꿈.
pub fn to_rgba(color: &Vector4<f32>) -> [u8; 4] {
    let quantize = |channel: f32| (channel.clamp(0.0, 1.0) * 255.0) as u8;
    [
        quantize(color.x),
        quantize(color.y),
        quantize(color.z),
        quantize(color.w),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::rng::XorShift128Plus;

    #[test]
    fn test_random_in_unit_sphere_is_unit_length() {
        let mut rng = XorShift128Plus::from_state(7, 11);
        for _ in 0..1000 {
            let v = random_in_unit_sphere(&mut rng);
            assert!((v.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_random_vec_in_range() {
        let mut rng = XorShift128Plus::from_state(3, 5);
        for _ in 0..1000 {
            let v = random_vec(&mut rng, -0.5..0.5f32);
            assert!(v.iter().all(|c| (-0.5..0.5).contains(c)));
        }
    }

    #[test]
    fn test_to_rgba_clamps() {
        assert_eq!(to_rgba(&Vector4::new(-1.0, 0.5, 2.0, 1.0)), [0, 127, 255, 255]);
        assert_eq!(to_rgba(&Vector4::new(0.0, 0.0, 0.0, 1.0)), [0, 0, 0, 255]);
    }
}
