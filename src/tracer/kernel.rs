use nalgebra::{Point3, Reflection3, Unit, Vector3, Vector4};
use rand::Rng;

use crate::tracer::ray::Ray;
use crate::tracer::scene::{Material, Scene};
use crate::util::{random_in_unit_sphere, random_vec};

// 표면에서 바로 다시 부딪히지 않도록 살짝 띄우는 거리
pub const SURFACE_OFFSET: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scatter {
    /// 법선 + 단위 구 안의 무작위 점. 대충 코사인 가중 확산.
    Diffuse,
    /// 거칠기 만큼 흔든 법선을 기준으로 반사.
    Reflect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lighting {
    /// 발광 재질만 빛을 냄
    Emissive,
    /// 방향광 하나. direction은 빛이 나아가는 방향.
    Directional {
        direction: Unit<Vector3<f32>>,
        shadows: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct KernelConfig {
    pub max_bounces: u32,
    pub sky: Option<Vector3<f32>>,
    pub scatter: Scatter,
    pub lighting: Lighting,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_bounces: 10,
            sky: None,
            scatter: Scatter::Diffuse,
            lighting: Lighting::Emissive,
        }
    }
}

// Cherno씨와 같은 디자인 선택, HitPayload는 빛의 경로에 대한 정보만 담고
// 이를 이용해 색상을 알아내는건 나중에 함
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPayload {
    pub hit_distance: f32,
    pub world_position: Point3<f32>,
    pub world_normal: Unit<Vector3<f32>>,
    pub object_index: usize,
}

pub struct Kernel<'a> {
    scene: &'a Scene,
    config: &'a KernelConfig,
}

impl<'a> Kernel<'a> {
    pub fn new(scene: &'a Scene, config: &'a KernelConfig) -> Self {
        Self { scene, config }
    }

    // DirectX의 RayGen 쉐이더와 같음
    pub fn per_pixel<G: Rng>(&self, mut ray: Ray, rng: &mut G) -> Vector4<f32> {
        let mut light = Vector3::zeros();
        let mut contribution = Vector3::repeat(1.0);

        for _ in 0..self.config.max_bounces {
            let Some(payload) = self.trace_ray(&ray) else {
                if let Some(sky) = self.config.sky {
                    light += contribution.component_mul(&sky);
                }
                break;
            };

            let sphere = &self.scene.spheres[payload.object_index];
            let material = self.scene.material_of(sphere);

            match self.config.lighting {
                Lighting::Emissive => {
                    // 자기 자신의 albedo로 발광색을 물들이지 않도록 먼저 더함
                    light += contribution.component_mul(&material.emission());
                    contribution.component_mul_assign(&material.albedo);
                }
                Lighting::Directional { direction, shadows } => {
                    let mut intensity = payload.world_normal.dot(&-direction.into_inner()).max(0.0);
                    if shadows && intensity > 0.0 && self.is_occluded(&payload, &direction) {
                        intensity = 0.0;
                    }

                    light += contribution.component_mul(&(material.albedo * intensity));
                    contribution *= 0.5;
                }
            }

            // position 자체가 구에 접하기 때문에 position을 다음 레이 트레이싱에 바로 사용하면 제대로 안할 것임.
            // 그래서 조금이라도 옮겨야 함
            let origin = payload.world_position + payload.world_normal.into_inner() * SURFACE_OFFSET;
            let direction = self.scatter(&ray, &payload, material, rng);
            ray = Ray::new(origin, direction);
        }

        Vector4::new(light.x, light.y, light.z, 1.0)
    }

    fn scatter<G: Rng>(
        &self,
        ray: &Ray,
        payload: &HitPayload,
        material: &Material,
        rng: &mut G,
    ) -> Vector3<f32> {
        let normal = payload.world_normal.into_inner();

        match self.config.scatter {
            Scatter::Diffuse => (normal + random_in_unit_sphere(rng))
                .try_normalize(f32::EPSILON)
                .unwrap_or(normal),
            Scatter::Reflect => {
                let axis = Unit::new_normalize(
                    normal + random_vec(rng, -0.5..0.5f32) * material.roughness,
                );
                let mut direction = ray.direction;
                Reflection3::new(axis, 0.0).reflect(&mut direction);
                direction
            }
        }
    }

    fn is_occluded(&self, payload: &HitPayload, direction: &Unit<Vector3<f32>>) -> bool {
        let shadow_ray = Ray::new(
            payload.world_position + payload.world_normal.into_inner() * SURFACE_OFFSET,
            -direction.into_inner(),
        );
        self.trace_ray(&shadow_ray).is_some()
    }

    pub fn trace_ray(&self, ray: &Ray) -> Option<HitPayload> {
        let mut closest: Option<(usize, f32)> = None;

        for (index, sphere) in self.scene.spheres.iter().enumerate() {
            // (D·D) t^2 + 2 (O-C)·D t + |O-C|^2 - r^2 = 0
            // 구가 원점에 있다고 가정하고 풀기 위해 레이 시작점을 그만큼 옮김
            let origin = ray.origin.coords - sphere.center;

            let a = ray.direction.norm_squared();
            let b = 2.0 * origin.dot(&ray.direction);
            let c = origin.norm_squared() - sphere.radius * sphere.radius;

            // 판별식
            let discriminant = b * b - 4.0 * a * c;
            if discriminant < 0.0 {
                continue;
            }

            // 가까운 근만 봄. 구 안에서 쏜 레이는 맞지 않은 걸로 취급됨
            let distance = (-b - discriminant.sqrt()) / (2.0 * a);
            if distance.is_nan() || distance <= 0.0 {
                continue;
            }

            // 거리가 같으면 먼저 나온 구가 이김
            match closest {
                Some((_, previous)) if previous <= distance => {}
                _ => closest = Some((index, distance)),
            }
        }

        closest.map(|(index, distance)| self.closest_hit(ray, distance, index))
    }

    pub fn closest_hit(&self, ray: &Ray, hit_distance: f32, object_index: usize) -> HitPayload {
        let sphere = &self.scene.spheres[object_index];

        let origin = ray.origin.coords - sphere.center;
        let hit_point = origin + ray.direction * hit_distance;

        HitPayload {
            hit_distance,
            world_position: Point3::from(hit_point + sphere.center),
            world_normal: Unit::new_normalize(hit_point / sphere.radius),
            object_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::rng::XorShift128Plus;
    use crate::tracer::scene::Sphere;

    fn emissive_unit_sphere(albedo: Vector3<f32>) -> Scene {
        let mut scene = Scene::new();
        let light = scene.add_material(Material {
            albedo,
            emission_color: Vector3::new(1.0, 1.0, 1.0),
            emission_intensity: 1.0,
            ..Default::default()
        });
        scene.add_sphere(Sphere {
            center: Vector3::zeros(),
            radius: 1.0,
            material_index: light,
        });
        scene
    }

    fn front_ray() -> Ray {
        Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0))
    }

    #[test]
    fn test_empty_scene_is_black() {
        let scene = Scene::new();
        let config = KernelConfig::default();
        let kernel = Kernel::new(&scene, &config);
        let mut rng = XorShift128Plus::from_state(1, 2);

        for direction in [
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, -2.0, 0.5),
            Vector3::new(-0.3, 0.9, -4.0),
        ] {
            let ray = Ray::new(Point3::origin(), direction);
            assert!(kernel.trace_ray(&ray).is_none());
            assert_eq!(kernel.per_pixel(ray, &mut rng), Vector4::new(0.0, 0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn test_sky_on_miss() {
        let scene = Scene::new();
        let config = KernelConfig {
            sky: Some(Vector3::new(0.6, 0.7, 0.9)),
            ..Default::default()
        };
        let kernel = Kernel::new(&scene, &config);
        let mut rng = XorShift128Plus::from_state(1, 2);

        let light = kernel.per_pixel(front_ray(), &mut rng);
        assert_eq!(light, Vector4::new(0.6, 0.7, 0.9, 1.0));
    }

    #[test]
    fn test_single_sphere_hit_matches_closed_form() {
        let scene = emissive_unit_sphere(Vector3::new(0.3, 0.6, 0.9));
        let config = KernelConfig::default();
        let kernel = Kernel::new(&scene, &config);

        let payload = kernel.trace_ray(&front_ray()).unwrap();
        assert_eq!(payload.object_index, 0);
        assert_eq!(payload.hit_distance, 4.0);
        assert_eq!(payload.world_position, Point3::new(0.0, 0.0, -1.0));
        assert_eq!(payload.world_normal.into_inner(), Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_single_sphere_radiance_is_emission() {
        let scene = emissive_unit_sphere(Vector3::new(0.3, 0.6, 0.9));
        let config = KernelConfig::default();
        let kernel = Kernel::new(&scene, &config);

        // 튕긴 레이는 볼록한 구에서 멀어지기만 하니 발광 한 번만 더해짐
        for seed in 1..20 {
            let mut rng = XorShift128Plus::from_state(seed, seed * 31);
            let light = kernel.per_pixel(front_ray(), &mut rng);
            assert_eq!(light, Vector4::new(1.0, 1.0, 1.0, 1.0));
        }
    }

    #[test]
    fn test_unnormalized_direction_hits_same_point() {
        let scene = emissive_unit_sphere(Vector3::repeat(1.0));
        let config = KernelConfig::default();
        let kernel = Kernel::new(&scene, &config);

        let ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 4.0));
        let payload = kernel.trace_ray(&ray).unwrap();
        assert_eq!(payload.hit_distance, 1.0);
        assert_eq!(payload.world_position, Point3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_sphere_behind_origin_is_ignored() {
        let scene = emissive_unit_sphere(Vector3::repeat(1.0));
        let config = KernelConfig::default();
        let kernel = Kernel::new(&scene, &config);

        let ray = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(kernel.trace_ray(&ray).is_none());

        // 구 안쪽에서는 가까운 근이 음수라 맞지 않음
        let inside = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));
        assert!(kernel.trace_ray(&inside).is_none());
    }

    #[test]
    fn test_closest_sphere_wins() {
        let mut scene = Scene::new();
        scene.add_material(Material::default());
        scene.add_sphere(Sphere {
            center: Vector3::new(0.0, 0.0, 5.0),
            radius: 1.0,
            material_index: 0,
        });
        scene.add_sphere(Sphere {
            center: Vector3::new(0.0, 0.0, 2.0),
            radius: 0.5,
            material_index: 0,
        });
        let config = KernelConfig::default();
        let kernel = Kernel::new(&scene, &config);

        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));
        let payload = kernel.trace_ray(&ray).unwrap();
        assert_eq!(payload.object_index, 1);
        assert_eq!(payload.hit_distance, 1.5);
    }

    #[test]
    fn test_tie_goes_to_first_sphere() {
        let mut scene = Scene::new();
        scene.add_material(Material::default());
        scene.add_material(Material::default());
        for material_index in [0, 1] {
            scene.add_sphere(Sphere {
                center: Vector3::new(0.0, 0.0, 3.0),
                radius: 1.0,
                material_index,
            });
        }
        let config = KernelConfig::default();
        let kernel = Kernel::new(&scene, &config);

        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(kernel.trace_ray(&ray).unwrap().object_index, 0);
    }

    #[test]
    fn test_directional_light_front_face() {
        let mut scene = Scene::new();
        scene.add_material(Material {
            albedo: Vector3::new(0.5, 0.25, 1.0),
            ..Default::default()
        });
        scene.add_sphere(Sphere::default());
        let config = KernelConfig {
            max_bounces: 1,
            lighting: Lighting::Directional {
                direction: Vector3::z_axis(),
                shadows: true,
            },
            ..Default::default()
        };
        let kernel = Kernel::new(&scene, &config);
        let mut rng = XorShift128Plus::from_state(5, 6);

        let light = kernel.per_pixel(front_ray(), &mut rng);
        assert_eq!(light, Vector4::new(0.5, 0.25, 1.0, 1.0));
    }

    #[test]
    fn test_directional_shadow_blocks_light() {
        let mut scene = Scene::new();
        scene.add_material(Material::default());
        scene.add_sphere(Sphere::default());
        // 빛과 첫 번째 구 사이를 가로막는 구
        scene.add_sphere(Sphere {
            center: Vector3::new(0.0, 0.0, -3.0),
            radius: 0.5,
            material_index: 0,
        });
        let config = KernelConfig {
            max_bounces: 1,
            lighting: Lighting::Directional {
                direction: Vector3::z_axis(),
                shadows: true,
            },
            ..Default::default()
        };
        let kernel = Kernel::new(&scene, &config);
        let mut rng = XorShift128Plus::from_state(5, 6);

        let ray = Ray::new(Point3::new(2.0, 0.0, -1.5), Vector3::new(-2.0, 0.0, 0.5));
        let payload = kernel.trace_ray(&ray).unwrap();
        assert_eq!(payload.object_index, 0);
        assert_eq!(kernel.per_pixel(ray, &mut rng), Vector4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_reflect_mirrors_with_zero_roughness() {
        let mut scene = Scene::new();
        scene.add_material(Material {
            roughness: 0.0,
            ..Default::default()
        });
        scene.add_sphere(Sphere::default());
        let config = KernelConfig {
            scatter: Scatter::Reflect,
            ..Default::default()
        };
        let kernel = Kernel::new(&scene, &config);
        let mut rng = XorShift128Plus::from_state(9, 10);

        let ray = front_ray();
        let payload = kernel.trace_ray(&ray).unwrap();
        let material = &scene.materials[0];
        let reflected = kernel.scatter(&ray, &payload, material, &mut rng);
        assert!((reflected - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-6);
    }
}
