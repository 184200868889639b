//! Lightweight xorshift32 PRNG - seeded per emitter so runs are reproducible

use spark_core::Vec3;

#[derive(Debug, Clone)]
pub struct ParticleRng {
    state: u32,
}

impl ParticleRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Returns a float in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        // 24 random bits keep the result strictly below 1.0
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Returns a float in [min, max)
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }

    /// Returns an integer in [min, max] (both inclusive)
    pub fn range_inclusive(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as u64;
        min + (self.next_u32() as u64 % span) as usize
    }

    /// Returns true with probability `chance`
    pub fn chance(&mut self, chance: f32) -> bool {
        self.next_f32() < chance
    }

    /// Returns -1.0 or 1.0 with equal probability
    pub fn sign(&mut self) -> f32 {
        if self.next_u32() & 1 == 0 {
            1.0
        } else {
            -1.0
        }
    }

    /// Returns a random unit direction vector (uniformly on sphere surface)
    pub fn random_direction(&mut self) -> Vec3 {
        // Marsaglia method for uniform sphere sampling
        loop {
            let x = self.range(-1.0, 1.0);
            let y = self.range(-1.0, 1.0);
            let s = x * x + y * y;
            if s < 1.0 {
                let factor = 2.0 * (1.0 - s).sqrt();
                return Vec3::new(x * factor, y * factor, 1.0 - 2.0 * s);
            }
        }
    }

    /// Returns a random unit vector perpendicular to `normal`
    pub fn random_tangent(&mut self, normal: Vec3) -> Vec3 {
        let n = normal.normalized();
        if n == Vec3::ZERO {
            return self.random_direction();
        }
        let d = self.random_direction();
        let tangent = d - n * d.dot(&n);
        if tangent.length_squared() < 1e-8 {
            return n.any_orthogonal();
        }
        tangent.normalized()
    }
}
