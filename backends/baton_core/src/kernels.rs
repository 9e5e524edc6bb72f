//! Numeric series a worker accumulates one unit at a time.
//!
//! Worker `w` of `n` owns the indices `w, w+n, w+2n, ...`; unit `u` covers the
//! `unit_len` consecutive entries `u*unit_len .. (u+1)*unit_len` of that
//! progression. Summing every worker's units therefore covers a prefix of the
//! series without overlap, whatever the scheduling.

/// `Kernel` computes the terms of a series.
pub trait Kernel: Send + Sync {
    fn term(&self, index: u64) -> f64;

    /// `scale` multiplies the combined sum of all terms.
    fn scale(&self) -> f64 {
        1.0
    }

    fn name(&self) -> &'static str;
}

/// `Leibniz` is the alternating series `(-1)^i / (2i+1)`, scaled by 4 it
/// converges to π.
#[derive(Clone, Copy, Debug, Default)]
pub struct Leibniz;

impl Kernel for Leibniz {
    #[allow(clippy::cast_precision_loss)]
    fn term(&self, index: u64) -> f64 {
        let sign = if index % 2 == 0 { 1.0 } else { -1.0 };
        sign / (2.0 * index as f64 + 1.0)
    }

    fn scale(&self) -> f64 {
        4.0
    }

    fn name(&self) -> &'static str {
        "leibniz"
    }
}

/// `Ones` contributes exactly 1 per term, so a run sums to its term count.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ones;

impl Kernel for Ones {
    fn term(&self, _index: u64) -> f64 {
        1.0
    }

    fn name(&self) -> &'static str {
        "ones"
    }
}

/// `Identity` contributes its own index.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Kernel for Identity {
    #[allow(clippy::cast_precision_loss)]
    fn term(&self, index: u64) -> f64 {
        index as f64
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// `Stride` is a worker's position in the interleaved series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stride {
    pub offset: u64,
    pub step: u64,
    pub unit_len: u64,
}

impl Stride {
    /// `unit` returns the sum of the kernel terms making up unit `unit`.
    pub fn unit(&self, kernel: &dyn Kernel, unit: u64) -> f64 {
        let first = unit * self.unit_len;
        (first..first + self.unit_len)
            .map(|j| kernel.term(self.offset + j * self.step))
            .sum()
    }
}
