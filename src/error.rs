use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// 카메라의 레이 테이블이 이미지 크기와 맞지 않음
    #[error("camera provides {actual} ray directions, image needs {expected}")]
    RayTableMismatch { expected: usize, actual: usize },

    /// 구가 존재하지 않는 재질을 가리킴
    #[error("sphere {sphere} uses material {material_index}, but the scene has {material_count} materials")]
    MissingMaterial {
        sphere: usize,
        material_index: usize,
        material_count: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
