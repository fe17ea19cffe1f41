use glam::{Mat4, Vec2, Vec3};

/// Side-scrolling orthographic camera that follows the ground.
/// Camera motion is presentation only; nothing in the terrain depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowCamera {
    pub position: Vec2,
    /// Half the visible height in world units.
    pub zoom: f32,
    pub aspect: f32,
    /// Horizontal scroll speed in world units per second.
    pub speed: f32,
    /// How quickly the camera settles on a new height, per second.
    pub follow_rate: f32,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 8.0,
            aspect: 16.0 / 9.0,
            speed: 10.0,
            follow_rate: 4.0,
        }
    }
}

impl FollowCamera {
    pub fn with_speed(speed: f32) -> Self {
        Self {
            speed,
            ..Self::default()
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    /// Move horizontally; `direction` is -1, 0 or 1.
    pub fn scroll(&mut self, direction: f32, dt: f32) {
        self.position.x += direction * self.speed * dt;
    }

    /// Ease the camera height toward `target_y`. Frame-rate independent.
    pub fn follow_height(&mut self, target_y: f32, dt: f32) {
        let t = 1.0 - (-self.follow_rate * dt).exp();
        self.position.y += (target_y - self.position.y) * t;
    }

    /// World-space x range currently on screen.
    pub fn visible_x(&self) -> (f32, f32) {
        let half = self.zoom * self.aspect;
        (self.position.x - half, self.position.x + half)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        let half_w = self.zoom * self.aspect;
        Mat4::orthographic_rh(-half_w, half_w, -self.zoom, self.zoom, -1.0, 1.0)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(-self.position.x, -self.position.y, 0.0))
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}
