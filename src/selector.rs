//! Sort-order-preserving bucket selection.
//!
//! `bucket_index` is deliberately *not* a modulo: the multiply-then-divide
//! form guarantees that for any `h1 < h2`, `bucket_index(h1) <=
//! bucket_index(h2)`. Concatenating buckets in index order then requires
//! sorting only *within* each bucket to obtain a globally sorted stream.

/// Returns the bucket (shard) index `[0, num_buckets)` for a given hashed key.
///
/// `bucket_index(hkey, B) = min(floor(hkey * B / 2^128), B - 1)`. The
/// division by `2^128` is computed via `u128::MAX` (i.e. `2^128 - 1`)
/// widened into `u256`-equivalent arithmetic using a 128x128 -> high/low
/// multiply, since `hkey * num_buckets` can itself overflow a `u128`.
#[inline]
pub fn bucket_index(hkey: u128, num_buckets: usize) -> usize {
    let num_buckets = num_buckets.max(1) as u128;

    // hkey * num_buckets can overflow u128, so split hkey into 64-bit
    // halves and compute floor(hkey * num_buckets / 2^128) as exact
    // 256-bit-equivalent arithmetic using only u128 operations.
    //
    // hkey = hi*2^64 + lo
    // hkey*num_buckets = hi*num_buckets*2^128/2^64 ... rearranged as:
    //   A = hi*num_buckets, B = lo*num_buckets  (each fits in u128)
    //   hkey*num_buckets = A*2^64 + B
    //                     = A_hi*2^128 + (A_lo*2^64 + B)
    // where A_hi = A>>64, A_lo = A & u64::MAX (both < 2^64).
    // floor(hkey*num_buckets / 2^128) = A_hi + carry, where carry is 1
    // iff (A_lo<<64) + B overflows u128 (i.e. would need a 129th bit).
    let hi = hkey >> 64;
    let lo = hkey & u128::from(u64::MAX);

    let a = hi * num_buckets;
    let b = lo * num_buckets;
    let a_hi = a >> 64;
    let a_lo = a & u128::from(u64::MAX);

    let (_, overflowed) = (a_lo << 64).overflowing_add(b);
    let carry = if overflowed { 1 } else { 0 };

    let idx = (a_hi + carry).min(num_buckets - 1);
    idx as usize
}
