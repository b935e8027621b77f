//! Particles and their per-kind update rules.
//!
//! - contin: additive velocity, position confined to the value range
//! - disc: additive velocity damped by the constriction factor, applied to
//!   a continuous shadow position that is rounded on decode
//! - bit: velocity read as log-odds; each update redraws the bit with
//!   probability `sigmoid(v)` of being set
//!
//! Term knobs are not moved; particles keep the values of the instance
//! they were built from.

use super::config::{KindParams, PsConfig};
use crate::representation::{Disc, FieldSet, Instance};
use crate::scoring::CompositeScore;
use rand::Rng;

/// One velocity update, clamped to the kind's velocity range.
pub fn update_velocity<R: Rng>(
    params: &KindParams,
    vel: f64,
    current: f64,
    personal: f64,
    global: f64,
    damping: f64,
    rng: &mut R,
) -> f64 {
    let cognitive = params.c1 * rng.random::<f64>() * (personal - current);
    let social = params.c2 * rng.random::<f64>() * (global - current);
    params.clamp_velocity((params.inertia * vel + cognitive + social) * damping)
}

#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Rounds a shadow position to the nearest of `multiplicity` values spread
/// over the kind's value range.
pub fn shadow_to_disc(params: &KindParams, shadow: f64, multiplicity: Disc) -> Disc {
    let range = params.max_value - params.min_value;
    if range <= 0.0 || multiplicity < 2 {
        return 0;
    }
    let unit = ((shadow - params.min_value) / range).clamp(0.0, 1.0);
    (unit * f64::from(multiplicity - 1)).round() as Disc
}

/// Inverse of [`shadow_to_disc`] at the exact grid points.
pub fn disc_to_shadow(params: &KindParams, value: Disc, multiplicity: Disc) -> f64 {
    if multiplicity < 2 {
        return params.min_value;
    }
    let unit = f64::from(value) / f64::from(multiplicity - 1);
    params.min_value + unit * (params.max_value - params.min_value)
}

/// A swarm member.
///
/// `velocity` is laid out contin first, then disc, then bit; the disc and
/// bit parts are absent for a contin-only swarm.
#[derive(Debug, Clone)]
pub(crate) struct Particle {
    pub(crate) position: Instance,
    pub(crate) shadow: Vec<f64>,
    pub(crate) velocity: Vec<f64>,
    pub(crate) best: Instance,
    pub(crate) best_shadow: Vec<f64>,
    pub(crate) best_score: CompositeScore,
}

impl Particle {
    /// Keeps the current position as personal best if `score` beats it.
    pub(crate) fn record(&mut self, score: CompositeScore) -> bool {
        if score > self.best_score {
            self.best = self.position.clone();
            self.best_shadow.clone_from(&self.shadow);
            self.best_score = score;
            true
        } else {
            false
        }
    }
}

/// The update table for one field set.
#[derive(Debug, Clone)]
pub(crate) struct SwarmRules<'a> {
    fs: &'a FieldSet,
    bit: KindParams,
    disc: KindParams,
    contin: KindParams,
    constriction: f64,
    contin_only: bool,
}

impl<'a> SwarmRules<'a> {
    pub(crate) fn new(fs: &'a FieldSet, config: &PsConfig) -> Self {
        Self {
            fs,
            bit: config.bit,
            disc: config.disc,
            contin: config.contin,
            constriction: config.disc_constriction(),
            contin_only: false,
        }
    }

    /// Rules that move contin knobs only.
    pub(crate) fn contin_only(fs: &'a FieldSet, contin: KindParams) -> Self {
        Self {
            fs,
            bit: KindParams::bit(),
            disc: KindParams::disc(),
            contin,
            constriction: 1.0,
            contin_only: true,
        }
    }

    /// Number of dimensions a particle moves in.
    pub(crate) fn dims(&self) -> usize {
        if self.contin_only {
            self.fs.n_contin_fields()
        } else {
            self.fs.dimension()
        }
    }

    fn random_velocity<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let mut velocity = Vec::with_capacity(self.dims());
        for _ in 0..self.fs.n_contin_fields() {
            velocity.push(self.contin.random_velocity(rng));
        }
        if !self.contin_only {
            for _ in 0..self.fs.n_disc_fields() {
                velocity.push(self.disc.random_velocity(rng));
            }
            for _ in 0..self.fs.n_bits() {
                velocity.push(self.bit.random_velocity(rng));
            }
        }
        velocity
    }

    fn new_particle<R: Rng>(&self, position: Instance, shadow: Vec<f64>, rng: &mut R) -> Particle {
        Particle {
            best: position.clone(),
            best_shadow: shadow.clone(),
            velocity: self.random_velocity(rng),
            position,
            shadow,
            best_score: CompositeScore::worst(),
        }
    }

    /// A particle at `position` with a random velocity. Disc shadows sit
    /// on the grid point of the current value.
    pub(crate) fn particle_at<R: Rng>(&self, position: Instance, rng: &mut R) -> Particle {
        let shadow = if self.contin_only {
            Vec::new()
        } else {
            self.fs
                .disc()
                .iter()
                .enumerate()
                .map(|(i, ds)| {
                    disc_to_shadow(&self.disc, self.fs.get_disc(&position, i), ds.multiplicity)
                })
                .collect()
        };
        self.new_particle(position, shadow, rng)
    }

    /// A particle at a uniformly random position. Knobs the rules do not
    /// move keep their values from `base`.
    pub(crate) fn random_particle<R: Rng>(&self, base: &Instance, rng: &mut R) -> Particle {
        let fs = self.fs;
        let mut position = base.clone();
        for i in 0..fs.n_contin_fields() {
            fs.set_contin(&mut position, i, self.contin.random_value(rng));
        }
        let mut shadow = Vec::new();
        if !self.contin_only {
            shadow.reserve(fs.n_disc_fields());
            for (i, ds) in fs.disc().iter().enumerate() {
                let s = self.disc.random_value(rng);
                fs.set_disc(&mut position, i, shadow_to_disc(&self.disc, s, ds.multiplicity));
                shadow.push(s);
            }
            for i in 0..fs.n_bits() {
                fs.set_bit(&mut position, i, rng.random_bool(0.5));
            }
        }
        self.new_particle(position, shadow, rng)
    }

    /// Moves `particle` toward its personal best and the global best.
    pub(crate) fn update<R: Rng>(
        &self,
        particle: &mut Particle,
        global: &Instance,
        global_shadow: &[f64],
        rng: &mut R,
    ) {
        let fs = self.fs;
        let n_contin = fs.n_contin_fields();
        let (contin_vel, rest) = particle.velocity.split_at_mut(n_contin);

        for (i, vel) in contin_vel.iter_mut().enumerate() {
            let x = fs.get_contin(&particle.position, i);
            *vel = update_velocity(
                &self.contin,
                *vel,
                x,
                fs.get_contin(&particle.best, i),
                fs.get_contin(global, i),
                1.0,
                rng,
            );
            fs.set_contin(&mut particle.position, i, self.contin.confine(x + *vel));
        }
        if self.contin_only {
            return;
        }

        let (disc_vel, bit_vel) = rest.split_at_mut(fs.n_disc_fields());
        for (i, (vel, ds)) in disc_vel.iter_mut().zip(fs.disc()).enumerate() {
            let x = particle.shadow[i];
            *vel = update_velocity(
                &self.disc,
                *vel,
                x,
                particle.best_shadow[i],
                global_shadow[i],
                self.constriction,
                rng,
            );
            let moved = self.disc.confine(x + *vel);
            particle.shadow[i] = moved;
            fs.set_disc(
                &mut particle.position,
                i,
                shadow_to_disc(&self.disc, moved, ds.multiplicity),
            );
        }

        for (i, vel) in bit_vel.iter_mut().enumerate() {
            let as_f64 = |b: bool| if b { 1.0 } else { 0.0 };
            *vel = update_velocity(
                &self.bit,
                *vel,
                as_f64(fs.get_bit(&particle.position, i)),
                as_f64(fs.get_bit(&particle.best, i)),
                as_f64(fs.get_bit(global, i)),
                1.0,
                rng,
            );
            let set = rng.random::<f64>() < sigmoid(*vel);
            fs.set_bit(&mut particle.position, i, set);
        }
    }

    /// True if every velocity and every moved value of `particle` lies in
    /// its kind's range.
    pub(crate) fn in_bounds(&self, particle: &Particle) -> bool {
        let fs = self.fs;
        let n_contin = fs.n_contin_fields();
        let within = |p: &KindParams, v: f64| v >= p.min_vel && v <= p.max_vel;

        let contin_ok = (0..n_contin).all(|i| {
            let x = fs.get_contin(&particle.position, i);
            within(&self.contin, particle.velocity[i])
                && x >= self.contin.min_value
                && x <= self.contin.max_value
        });
        if !contin_ok || self.contin_only {
            return contin_ok;
        }
        let n_disc = fs.n_disc_fields();
        let disc_ok = (0..n_disc).all(|i| {
            let s = particle.shadow[i];
            within(&self.disc, particle.velocity[n_contin + i])
                && s >= self.disc.min_value
                && s <= self.disc.max_value
        });
        let bit_ok = particle.velocity[n_contin + n_disc..]
            .iter()
            .all(|&v| within(&self.bit, v));
        disc_ok && bit_ok
    }
}
