//! Seedable Random Sources
//!
//! Parameter defaults are drawn from a [`RandomSource`] supplied by the host.
//! The same seed always yields the same sketch, so the source is passed
//! explicitly into every operation instead of living in global state.
//!
//! [`Rng`] is a small Xorshift128+ generator that is good enough for picking
//! colors and options. With the `rand` feature, any `rand` generator can be
//! wrapped in [`RandAdapter`].

/// Capability for drawing uniform values and picking options
pub trait RandomSource {
    /// A uniform value in `[0.0, 1.0)`
    fn value(&mut self) -> f64;

    /// Pick one option uniformly, or `None` when there are no options
    fn pick<'a, T>(&mut self, options: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        pick_with(self, options)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn value(&mut self) -> f64 {
        (**self).value()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn value(&mut self) -> f64 {
        (**self).value()
    }
}

/// Pick through a possibly unsized source, using a single `value()` draw
pub fn pick_with<'a, R, T>(random: &mut R, options: &'a [T]) -> Option<&'a T>
where
    R: RandomSource + ?Sized,
{
    if options.is_empty() {
        return None;
    }
    let index = (random.value() * options.len() as f64) as usize;
    options.get(index.min(options.len() - 1))
}

/// A seedable random number generator using Xorshift128+.
#[derive(Debug, Clone, Copy)]
pub struct Rng {
    s0: u64,
    s1: u64,
}

impl Rng {
    /// Create a new RNG with the given seed values.
    ///
    /// The seeds should not both be zero.
    #[inline]
    pub const fn new(s0: u64, s1: u64) -> Self {
        // Ensure at least one seed is non-zero
        let s0 = if s0 == 0 && s1 == 0 { 1 } else { s0 };
        Self { s0, s1 }
    }

    /// Create a new RNG from a single 64-bit seed.
    #[inline]
    pub fn from_seed(seed: u64) -> Self {
        let s0 = splitmix64(seed);
        let s1 = splitmix64(seed.wrapping_add(0x9e3779b97f4a7c15));
        Self::new(s0, s1)
    }

    /// Create a new RNG seeded from the wall clock.
    pub fn from_system_time() -> Self {
        use web_time::{SystemTime, UNIX_EPOCH};

        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        Self::from_seed(duration.as_nanos() as u64)
    }

    /// Generate the next u64 value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.s0;
        let mut s1 = self.s1;
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.s0 = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.s1 = s1.rotate_left(37);

        result
    }

    /// Generate a random f64 in the range [0.0, 1.0).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        // Upper 53 bits become the mantissa
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::from_system_time()
    }
}

impl RandomSource for Rng {
    fn value(&mut self) -> f64 {
        self.next_f64()
    }
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// Wraps any `rand` generator as a [`RandomSource`]
#[cfg(feature = "rand")]
#[derive(Debug, Clone)]
pub struct RandAdapter<R>(pub R);

#[cfg(feature = "rand")]
impl<R: rand::RngCore> RandomSource for RandAdapter<R> {
    fn value(&mut self) -> f64 {
        use rand::Rng as _;
        self.0.gen::<f64>()
    }
}
