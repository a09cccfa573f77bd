#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Set operations over sorted, duplicate-free `u64` slices.
pub struct SimdOps;

impl SimdOps {
    /// Whether the vectorized intersection can run on this CPU.
    pub fn simd_available() -> bool {
        #[cfg(target_arch = "x86_64")]
        {
            is_x86_feature_detected!("avx2")
        }

        #[cfg(not(target_arch = "x86_64"))]
        {
            false
        }
    }

    /// Writes `a ∩ b` into `out` and returns its length. `out` must hold at
    /// least `min(a.len(), b.len())` values.
    pub fn intersect(a: &[u64], b: &[u64], out: &mut [u64], allow_simd: bool) -> usize {
        #[cfg(target_arch = "x86_64")]
        {
            if allow_simd && a.len() >= 4 && b.len() >= 4 && Self::simd_available() {
                return unsafe { intersect_avx2(a, b, out) };
            }
        }
        let _ = allow_simd;
        Self::intersect_scalar(a, b, out)
    }

    /// Two-pointer merge intersection with a galloping block skip.
    pub fn intersect_scalar(a: &[u64], b: &[u64], out: &mut [u64]) -> usize {
        const GALLOP_THRESHOLD: usize = 8;

        let (mut i, mut j, mut k) = (0, 0, 0);
        while i < a.len() && j < b.len() {
            if i + GALLOP_THRESHOLD <= a.len() && a[i + GALLOP_THRESHOLD - 1] < b[j] {
                i += GALLOP_THRESHOLD;
                continue;
            }
            if j + GALLOP_THRESHOLD <= b.len() && b[j + GALLOP_THRESHOLD - 1] < a[i] {
                j += GALLOP_THRESHOLD;
                continue;
            }

            if a[i] < b[j] {
                i += 1;
            } else if a[i] > b[j] {
                j += 1;
            } else {
                out[k] = a[i];
                k += 1;
                i += 1;
                j += 1;
            }
        }
        k
    }

    /// Intersects `buffer[..count]` in place with `other`; returns the new length.
    pub fn intersect_in_place(buffer: &mut [u64], count: usize, other: &[u64], allow_simd: bool) -> usize {
        let mut scratch = crate::memory::buffer_pool::BufferPool::get(count.min(other.len()));
        let found = Self::intersect(&buffer[..count], other, &mut scratch, allow_simd);
        buffer[..found].copy_from_slice(&scratch[..found]);
        found
    }

    /// Merges two sorted arrays into one sorted array with no duplicates
    pub fn union_sorted(a: &[u64], b: &[u64]) -> Vec<u64> {
        let mut result = Vec::with_capacity(a.len() + b.len());
        let mut i = 0;
        let mut j = 0;

        while i < a.len() && j < b.len() {
            if a[i] < b[j] {
                result.push(a[i]);
                i += 1;
            } else if a[i] > b[j] {
                result.push(b[j]);
                j += 1;
            } else {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }

        result.extend_from_slice(&a[i..]);
        result.extend_from_slice(&b[j..]);
        result
    }

    /// Values of `a` that are not in `b`, written over `a`. Returns the new length.
    pub fn difference_in_place(a: &mut [u64], count: usize, b: &[u64]) -> usize {
        let mut j = 0;
        let mut k = 0;
        for i in 0..count {
            let value = a[i];
            j += b[j..].partition_point(|v| *v < value);
            if j >= b.len() || b[j] != value {
                a[k] = value;
                k += 1;
            }
        }
        k
    }
}

/// Block-wise intersection over 256-bit lanes (four ids per block).
///
/// Every block of `a` is compared against all four rotations of the current
/// block of `b`; whichever block ends first advances. Blocks lying entirely
/// below the other side's current block are skipped without comparing.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn intersect_avx2(a: &[u64], b: &[u64], out: &mut [u64]) -> usize {
    const LANES: usize = 4;
    let (mut i, mut j, mut k) = (0, 0, 0);

    unsafe {
        while i + LANES <= a.len() && j + LANES <= b.len() {
            let a_max = a[i + LANES - 1];
            let b_max = b[j + LANES - 1];
            if a_max < b[j] {
                i += LANES;
                continue;
            }
            if b_max < a[i] {
                j += LANES;
                continue;
            }

            let va = _mm256_loadu_si256(a.as_ptr().add(i) as *const __m256i);
            let vb = _mm256_loadu_si256(b.as_ptr().add(j) as *const __m256i);
            let rot1 = _mm256_permute4x64_epi64(vb, 0b00_11_10_01);
            let rot2 = _mm256_permute4x64_epi64(vb, 0b01_00_11_10);
            let rot3 = _mm256_permute4x64_epi64(vb, 0b10_01_00_11);

            let eq = _mm256_or_si256(
                _mm256_or_si256(_mm256_cmpeq_epi64(va, vb), _mm256_cmpeq_epi64(va, rot1)),
                _mm256_or_si256(_mm256_cmpeq_epi64(va, rot2), _mm256_cmpeq_epi64(va, rot3)),
            );
            let mut mask = _mm256_movemask_pd(_mm256_castsi256_pd(eq)) as u32;
            while mask != 0 {
                let lane = mask.trailing_zeros() as usize;
                out[k] = a[i + lane];
                k += 1;
                mask &= mask - 1;
            }

            if a_max <= b_max {
                i += LANES;
            }
            if b_max <= a_max {
                j += LANES;
            }
        }
    }

    k + SimdOps::intersect_scalar(&a[i..], &b[j..], &mut out[k..])
}
