use crate::core::interval::Interval;
use crate::evo::individual::{AMPLITUDE, FREQUENCY, Genes, OFFSET, SHIFT, SLOPE};

/// Sinusoid with a linear term: `a*sin(f*(t-s)) + o + m*t`.
pub fn lin_sin(a: f32, f: f32, s: f32, o: f32, m: f32, t: f32) -> f32 {
    a * (f * (t - s)).sin() + o + m * t
}

/// First time-derivative of [`lin_sin`].
pub fn lin_sin1(a: f32, f: f32, s: f32, _o: f32, m: f32, t: f32) -> f32 {
    a * f * (f * (t - s)).cos() + m
}

/// Second time-derivative of [`lin_sin`].
pub fn lin_sin2(a: f32, f: f32, s: f32, _o: f32, _m: f32, t: f32) -> f32 {
    -a * f * f * (f * (t - s)).sin()
}

/// Third time-derivative of [`lin_sin`].
pub fn lin_sin3(a: f32, f: f32, s: f32, _o: f32, _m: f32, t: f32) -> f32 {
    -a * f * f * f * (f * (t - s)).cos()
}

/// Requested derivative order of the oscillator evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deriv {
    Value,
    First,
    Second,
    Third,
}

/// Decoded oscillator bound to one interval: the offset gene drifts by the
/// slope gene relative to the interval's start frame, so each window fits
/// its own local trend.
#[derive(Debug, Clone, Copy)]
pub struct Phenotype {
    pub interval: Interval,
    pub framerate: f32,
}

impl Phenotype {
    pub fn new(interval: Interval, framerate: f32) -> Self {
        Self {
            interval,
            framerate,
        }
    }

    pub fn evaluate(&self, genes: &Genes, frame: usize, order: Deriv) -> f32 {
        let a = genes[AMPLITUDE];
        let f = genes[FREQUENCY];
        let s = genes[SHIFT];
        let drift = (frame as f32 - self.interval.start as f32) * genes[SLOPE] / self.framerate;
        let o = genes[OFFSET] - drift;
        let m = genes[SLOPE];
        let t = frame as f32 / self.framerate;
        match order {
            Deriv::Value => lin_sin(a, f, s, o, m, t),
            Deriv::First => lin_sin1(a, f, s, o, m, t),
            Deriv::Second => lin_sin2(a, f, s, o, m, t),
            Deriv::Third => lin_sin3(a, f, s, o, m, t),
        }
    }

    pub fn value(&self, genes: &Genes, frame: usize) -> f32 {
        self.evaluate(genes, frame, Deriv::Value)
    }
}

#[cfg(test)]
mod tests {
    use super::{Deriv, Phenotype, lin_sin};
    use crate::core::interval::Interval;

    #[test]
    fn derivatives_match_finite_differences() {
        let pheno = Phenotype::new(Interval::new(0, 99), 1000.0);
        let genes = [2.0, 3.0, 0.4, 1.0, 0.0];
        let h = 1.0 / 1000.0;
        for frame in [10usize, 40, 70] {
            let f0 = pheno.evaluate(&genes, frame - 1, Deriv::Value);
            let f1 = pheno.evaluate(&genes, frame, Deriv::Value);
            let f2 = pheno.evaluate(&genes, frame + 1, Deriv::Value);
            let d1 = pheno.evaluate(&genes, frame, Deriv::First);
            let d2 = pheno.evaluate(&genes, frame, Deriv::Second);
            let num_d1 = (f2 - f0) / (2.0 * h);
            let num_d2 = (f2 - 2.0 * f1 + f0) / (h * h);
            assert!((d1 - num_d1).abs() < 1e-2, "d1 {d1} vs {num_d1}");
            assert!((d2 - num_d2).abs() < 1e-1, "d2 {d2} vs {num_d2}");
        }
    }

    #[test]
    fn slope_drift_is_interval_local() {
        // With slope active, the drift term cancels the global linear part
        // relative to the interval start, so the value at the start frame
        // only sees offset plus the start-time linear contribution.
        let pheno = Phenotype::new(Interval::new(30, 59), 30.0);
        let genes = [0.0, 1.0, 0.0, 2.0, 6.0];
        let at_start = pheno.value(&genes, 30);
        assert!((at_start - (2.0 + 6.0 * 1.0)).abs() < 1e-5);
        // One frame later the drift subtracts exactly what the linear term
        // adds, so the value is unchanged for a zero-amplitude oscillator.
        let next = pheno.value(&genes, 31);
        assert!((next - at_start).abs() < 1e-4);
    }

    #[test]
    fn lin_sin_components() {
        let v = lin_sin(1.0, 2.0, 0.0, 3.0, 4.0, 0.0);
        assert!((v - 3.0).abs() < 1e-6);
    }
}
