use glam::{Mat4, Vec3};

use crate::config::CameraConfig;
use crate::model::ViewportState;

pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self::from_config(&CameraConfig::default());
        camera.set_aspect(width, height);
        camera
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            eye: Vec3::from_array(config.position),
            target: Vec3::from_array(config.look_at),
            up: Vec3::Y,
            fov_y: config.fov_y_deg.to_radians(),
            aspect: 4.0 / 3.0,
            z_near: config.z_near,
            z_far: config.z_far,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Match the projection to the current draw surface
    pub fn sync_viewport(&mut self, viewport: &ViewportState) {
        self.aspect = viewport.aspect();
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn view_proj(&self) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.z_near, self.z_far);
        proj * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_target_projects_to_center() {
        let camera = Camera::new(1280, 720);
        let clip = camera.view_proj().project_point3(camera.target);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn aspect_follows_viewport() {
        let mut camera = Camera::new(800, 600);
        camera.sync_viewport(&ViewportState::new(1000, 500, 1.0));
        assert_eq!(camera.aspect, 2.0);
        camera.set_aspect(0, 0);
        assert_eq!(camera.aspect, 1.0);
    }
}
