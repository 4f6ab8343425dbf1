//! Nearest-neighbour raster resampling.

/// Resample a row-major `src_w × src_h` raster to `dst_w × dst_h`.
///
/// Nearest neighbour, no averaging. Rows are flipped: destination row `i`
/// reads source row `(dst_h − i − 1) · src_h / dst_h`, so resampling to the
/// same size mirrors the raster vertically and two resamples restore it.
///
/// # Arguments
/// * `src` - Source elements, `src_w * src_h` of them
/// * `src_w`, `src_h` - Source dimensions
/// * `dst_w`, `dst_h` - Destination dimensions
///
/// # Returns
/// A new buffer of `dst_w * dst_h` elements. An empty source yields default
/// elements.
pub fn resample<T: Copy + Default>(
    src: &[T],
    src_w: usize,
    src_h: usize,
    dst_w: usize,
    dst_h: usize,
) -> Vec<T> {
    if src_w == 0 || src_h == 0 || src.len() < src_w * src_h {
        return vec![T::default(); dst_w * dst_h];
    }

    let x_ratio = src_w as f64 / dst_w as f64;
    let y_ratio = src_h as f64 / dst_h as f64;

    // Column lookups are identical for every row.
    let columns: Vec<usize> = (0..dst_w)
        .map(|j| ((j as f64 * x_ratio).floor() as usize).min(src_w - 1))
        .collect();

    let mut output = Vec::with_capacity(dst_w * dst_h);
    for i in 0..dst_h {
        let py = (((dst_h - i - 1) as f64 * y_ratio).floor() as usize).min(src_h - 1);
        let row = &src[py * src_w..(py + 1) * src_w];
        output.extend(columns.iter().map(|&px| row[px]));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 4x4 raster where each value encodes its (row, col).
    fn grid4() -> Vec<u16> {
        (0..4u16)
            .flat_map(|row| (0..4u16).map(move |col| row * 10 + col))
            .collect()
    }

    #[test]
    fn test_identity_size_flips_rows_once() {
        let src = grid4();
        let out = resample(&src, 4, 4, 4, 4);
        for i in 0..4 {
            assert_eq!(&out[i * 4..(i + 1) * 4], &src[(3 - i) * 4..(4 - i) * 4]);
        }
        assert_eq!(resample(&out, 4, 4, 4, 4), src);
    }

    #[test]
    fn test_half_resolution_selects_every_other() {
        let out = resample(&grid4(), 4, 4, 2, 2);
        // dst row 0 <- src row 2, dst row 1 <- src row 0; cols 0 and 2
        assert_eq!(out, vec![20, 22, 0, 2]);
    }

    #[test]
    fn test_upsample_repeats() {
        let out = resample(&[1u8, 2, 3, 4], 2, 2, 4, 4);
        assert_eq!(&out[0..4], &[3, 3, 4, 4]);
        assert_eq!(&out[4..8], &[3, 3, 4, 4]);
        assert_eq!(&out[8..12], &[1, 1, 2, 2]);
        assert_eq!(&out[12..16], &[1, 1, 2, 2]);
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(resample::<u8>(&[], 0, 0, 2, 2), vec![0; 4]);
        assert!(resample(&[1u8], 1, 1, 0, 0).is_empty());
    }
}
