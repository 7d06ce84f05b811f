/// Gameplay tuning for tanks.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer
/// sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct TankTuning {
    /// World-space collision radius in pixels (server-side hit checks).
    pub radius: f32,
}

impl Default for TankTuning {
    fn default() -> Self {
        Self { radius: 40.0 }
    }
}
