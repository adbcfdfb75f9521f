use nalgebra::Vector3;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub albedo: Vector3<f32>,
    pub roughness: f32,
    pub metallic: f32,
    pub emission_color: Vector3<f32>,
    pub emission_intensity: f32,
}

impl Material {
    pub fn emission(&self) -> Vector3<f32> {
        self.emission_color * self.emission_intensity
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            roughness: 1.0,
            metallic: 0.0,
            emission_color: Vector3::zeros(),
            emission_intensity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub center: Vector3<f32>,
    pub radius: f32,
    pub material_index: usize,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            center: Vector3::zeros(),
            radius: 1.0,
            material_index: 0,
        }
    }
}

// 넣은 순서가 곧 인덱스. 삭제는 없음.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub materials: Vec<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// 분홍 구, 빛나는 주황 구, 파란 바닥 구로 구성된 기본 장면.
    pub fn showcase() -> Self {
        let mut scene = Self::new();

        let pink = scene.add_material(Material {
            albedo: Vector3::new(1.0, 0.0, 1.0),
            roughness: 0.0,
            ..Default::default()
        });
        let blue = scene.add_material(Material {
            albedo: Vector3::new(0.2, 0.3, 1.0),
            roughness: 0.1,
            ..Default::default()
        });
        let orange = scene.add_material(Material {
            albedo: Vector3::new(0.8, 0.5, 0.2),
            roughness: 0.1,
            emission_color: Vector3::new(0.8, 0.5, 0.2),
            emission_intensity: 2.0,
            ..Default::default()
        });

        scene.add_sphere(Sphere {
            center: Vector3::zeros(),
            radius: 1.0,
            material_index: pink,
        });
        scene.add_sphere(Sphere {
            center: Vector3::new(2.0, 0.0, 0.0),
            radius: 1.0,
            material_index: orange,
        });
        scene.add_sphere(Sphere {
            center: Vector3::new(0.0, -101.0, 0.0),
            radius: 100.0,
            material_index: blue,
        });

        scene
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> usize {
        self.spheres.push(sphere);
        self.spheres.len() - 1
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    // 잘못된 인덱스는 장면 데이터가 깨졌다는 뜻이라 복구하지 않음
    pub fn material_of(&self, sphere: &Sphere) -> &Material {
        self.materials.get(sphere.material_index).unwrap_or_else(|| {
            panic!(
                "sphere material index {} out of bounds ({} materials)",
                sphere.material_index,
                self.materials.len()
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (index, sphere) in self.spheres.iter().enumerate() {
            if sphere.material_index >= self.materials.len() {
                return Err(Error::MissingMaterial {
                    sphere: index,
                    material_index: sphere.material_index,
                    material_count: self.materials.len(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emission_scales_color() {
        let material = Material {
            emission_color: Vector3::new(0.5, 1.0, 0.25),
            emission_intensity: 2.0,
            ..Default::default()
        };
        assert_eq!(material.emission(), Vector3::new(1.0, 2.0, 0.5));
    }

    #[test]
    fn test_insertion_order_defines_index() {
        let mut scene = Scene::new();
        assert_eq!(scene.add_material(Material::default()), 0);
        assert_eq!(scene.add_material(Material::default()), 1);
        assert_eq!(scene.add_sphere(Sphere::default()), 0);
        assert_eq!(
            scene.add_sphere(Sphere {
                material_index: 1,
                ..Default::default()
            }),
            1
        );
        assert_eq!(scene.spheres[1].material_index, 1);
    }

    #[test]
    fn test_showcase_is_valid() {
        let scene = Scene::showcase();
        assert_eq!(scene.spheres.len(), 3);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_material() {
        let mut scene = Scene::new();
        scene.add_material(Material::default());
        scene.add_sphere(Sphere {
            material_index: 3,
            ..Default::default()
        });

        assert_eq!(
            scene.validate(),
            Err(Error::MissingMaterial {
                sphere: 0,
                material_index: 3,
                material_count: 1,
            })
        );
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_material_of_panics_on_bad_index() {
        let scene = Scene::new();
        let _ = scene.material_of(&Sphere::default());
    }
}
