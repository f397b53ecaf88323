//! The animated point light set and its GPU storage buffer.

use cgmath::{InnerSpace, Vector3};
use wgpu::util::DeviceExt;

pub const MAX_LIGHTS_POWER: u32 = 10;
pub const MAX_LIGHTS: u32 = 1 << MAX_LIGHTS_POWER;

/// Orbit speed of the outermost lights in radians per second.
const LIGHT_ROTATION_SPEED: f32 = 0.05;
const LIGHT_FIELD_RADIUS: f32 = 100.0;
const LIGHT_FIELD_HEIGHT: f32 = 50.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLight {
    pub position: [f32; 3],
    pub attenuation_begin: f32,
    pub color: [f32; 3],
    pub attenuation_end: f32,
}

/// Where a light starts and how fast it orbits the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LightOrbit {
    radius: f32,
    angle: f32,
    height: f32,
    /// radians per second
    speed: f32,
}

impl LightOrbit {
    fn position(&self, time: f32) -> [f32; 3] {
        let angle = self.angle + self.speed * time;
        [self.radius * angle.cos(), self.height, self.radius * angle.sin()]
    }
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h = (h.fract() + 1.0).fract() * 6.0;
    let c = v * s;
    let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

/// Round `count` to the power of two the light slider would show, within
/// `1..=MAX_LIGHTS`.
pub fn snap_light_count(count: u32) -> u32 {
    let count = count.clamp(1, MAX_LIGHTS);
    let lower = 1 << (31 - count.leading_zeros());
    if lower == count {
        return count;
    }
    let upper = (lower << 1).min(MAX_LIGHTS);
    if count - lower < upper - count { lower } else { upper }
}

/// All `MAX_LIGHTS` lights; only the first `active_lights` are shaded.
///
/// Placement is deterministic so every run shows the same scene: angle,
/// radius and height follow low-discrepancy sequences and colours walk the
/// hue circle.
#[derive(Debug, Clone)]
pub struct LightSet {
    orbits: Vec<LightOrbit>,
    lights: Vec<PointLight>,
    active_lights: u32,
    total_time: f32,
}

impl LightSet {
    pub fn new(active_lights: u32) -> Self {
        let orbits: Vec<LightOrbit> = (0..MAX_LIGHTS)
            .map(|i| {
                let direction = if i % 2 == 0 { 1.0 } else { -1.0 };
                let i = i as f32;
                let radius = (i * 0.754_877_7).fract().sqrt() * LIGHT_FIELD_RADIUS;
                LightOrbit {
                    radius,
                    angle: (i * 0.618_034).fract() * std::f32::consts::TAU,
                    height: (i * 0.569_840_3).fract() * LIGHT_FIELD_HEIGHT,
                    // inner lights orbit faster
                    speed: direction * LIGHT_ROTATION_SPEED * LIGHT_FIELD_RADIUS / radius.max(10.0),
                }
            })
            .collect();
        let lights = orbits
            .iter()
            .enumerate()
            .map(|(i, orbit)| {
                let attenuation_end = 8.0 + (i as f32 * 0.381_966).fract() * 6.0;
                PointLight {
                    position: orbit.position(0.0),
                    attenuation_begin: attenuation_end * 0.1,
                    color: hsv_to_rgb(i as f32 * 0.618_034, 0.8, 1.0),
                    attenuation_end,
                }
            })
            .collect();
        Self {
            orbits,
            lights,
            active_lights: snap_light_count(active_lights),
            total_time: 0.0,
        }
    }

    pub fn with_power(power: u32) -> Self {
        Self::new(1 << power.min(MAX_LIGHTS_POWER))
    }

    pub fn set_active_lights(&mut self, count: u32) -> u32 {
        self.active_lights = snap_light_count(count);
        self.active_lights
    }

    pub fn active_lights(&self) -> u32 {
        self.active_lights
    }

    /// Advance the orbit of every light by `dt` seconds.
    pub fn move_lights(&mut self, dt: f32) {
        self.total_time += dt;
        for (light, orbit) in self.lights.iter_mut().zip(&self.orbits) {
            light.position = orbit.position(self.total_time);
        }
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    /// The shaded prefix of [`lights`](Self::lights).
    pub fn active(&self) -> &[PointLight] {
        &self.lights[..self.active_lights as usize]
    }

    /// Horizontal distance of a light from the vertical axis.
    pub fn orbit_radius(light: &PointLight) -> f32 {
        Vector3::new(light.position[0], 0.0, light.position[2]).magnitude()
    }
}

pub fn mk_buffer(device: &wgpu::Device, lights: &LightSet) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Point Light Buffer"),
        contents: bytemuck::cast_slice(lights.lights()),
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
    })
}
